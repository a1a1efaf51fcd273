//! Provider data structure passed to resources and data sources

use crate::api::Client;
use std::sync::Arc;

#[derive(Clone)]
pub struct TamaProviderData {
    pub client: Arc<Client>,
}

impl TamaProviderData {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}
