//! Request-scoped cancellation and deadlines
//!
//! Every RPC hands a `Context` to the provider code. The server keeps one root
//! context and cancels it when Terraform calls StopProvider, so long-running
//! work such as polling loops can bail out early.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time;

/// Context carries the cancellation signal and an optional deadline
/// CRITICAL: Pass this as first parameter to ALL async trait methods
#[derive(Clone)]
pub struct Context {
    cancel: Arc<watch::Sender<bool>>,
    deadline: Option<Instant>,
}

impl Context {
    pub fn new() -> Self {
        let (cancel, _) = watch::channel(false);

        Self {
            cancel: Arc::new(cancel),
            deadline: None,
        }
    }

    /// Derive a context that also expires after `timeout`
    /// The new context shares cancellation with its parent
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };

        Self {
            cancel: self.cancel.clone(),
            deadline: Some(deadline),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow() || self.is_expired()
    }

    pub fn is_expired(&self) -> bool {
        self.deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels this context and every context sharing its signal
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Resolves once the context is cancelled or its deadline passes
    pub async fn done(&self) {
        let mut rx = self.cancel.subscribe();
        let cancelled = async move {
            // An Err means the sender is gone, which can't happen while self lives
            let _ = rx.wait_for(|cancelled| *cancelled).await;
        };

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = cancelled => {}
                    _ = time::sleep_until(deadline.into()) => {}
                }
            }
            None => cancelled.await,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn context_timeout_expires() {
        let ctx = Context::new().with_timeout(Duration::from_millis(50));

        assert!(!ctx.is_cancelled());

        sleep(Duration::from_millis(80)).await;

        assert!(ctx.is_expired());
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_reaches_derived_contexts() {
        let root = Context::new();
        let child = root.with_timeout(Duration::from_secs(60));

        assert!(!child.is_cancelled());

        root.cancel();

        assert!(child.is_cancelled());
        assert!(!child.is_expired());
    }

    #[tokio::test]
    async fn derived_deadline_never_extends_parent() {
        let parent = Context::new().with_timeout(Duration::from_secs(1));
        let child = parent.with_timeout(Duration::from_secs(60));

        assert_eq!(parent.deadline(), child.deadline());
    }

    #[tokio::test]
    async fn done_resolves_on_cancel() {
        let ctx = Context::new();
        let waiter = ctx.clone();

        let handle = tokio::spawn(async move { waiter.done().await });
        ctx.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("done() should resolve after cancel")
            .unwrap();
    }

    #[tokio::test]
    async fn done_resolves_on_deadline() {
        let ctx = Context::new().with_timeout(Duration::from_millis(20));

        tokio::time::timeout(Duration::from_secs(1), ctx.done())
            .await
            .expect("done() should resolve at the deadline");
    }
}
