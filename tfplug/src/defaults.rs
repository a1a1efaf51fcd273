//! Default value providers for attributes
//!
//! Defaults are evaluated during planning when an optional+computed attribute
//! is null in configuration.
//!
//! ```no_run
//! use tfplug::schema::{AttributeBuilder, AttributeType};
//! use tfplug::defaults::StaticDefault;
//!
//! let layer = AttributeBuilder::new("layer", AttributeType::Number)
//!     .optional()
//!     .default(StaticDefault::number(0.0))
//!     .build();
//! ```

use crate::schema::{Default, DefaultRequest, DefaultResponse};
use crate::types::{Dynamic, DynamicValue};

/// StaticDefault provides a static default value
pub struct StaticDefault {
    value: Dynamic,
}

impl StaticDefault {
    pub fn create(value: Dynamic) -> Box<dyn Default> {
        Box::new(Self { value })
    }

    pub fn string(value: &str) -> Box<dyn Default> {
        Self::create(Dynamic::String(value.to_string()))
    }

    pub fn number(value: f64) -> Box<dyn Default> {
        Self::create(Dynamic::Number(value))
    }

    pub fn bool(value: bool) -> Box<dyn Default> {
        Self::create(Dynamic::Bool(value))
    }
}

impl Default for StaticDefault {
    fn description(&self) -> String {
        format!("static default value: {:?}", self.value)
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: DynamicValue::new(self.value.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributePath;

    #[test]
    fn static_defaults_return_their_value() {
        let request = || DefaultRequest {
            path: AttributePath::new("main"),
        };

        assert_eq!(
            StaticDefault::bool(false).default_value(request()).value.value,
            Dynamic::Bool(false)
        );
        assert_eq!(
            StaticDefault::number(0.0).default_value(request()).value.value,
            Dynamic::Number(0.0)
        );
        assert_eq!(
            StaticDefault::string("required")
                .default_value(request())
                .value
                .value,
            Dynamic::String("required".into())
        );
    }
}
