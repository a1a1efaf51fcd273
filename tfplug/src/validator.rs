//! Built-in attribute validators
//!
//! Validators run during ValidateResourceConfig for attributes whose config
//! value is known. Null and unknown values are skipped; required-ness is
//! checked separately by the framework.

use crate::schema::{Validator, ValidatorRequest, ValidatorResponse};
use crate::types::{Diagnostic, Dynamic};

fn known(request: &ValidatorRequest) -> Option<&Dynamic> {
    match &request.config_value.value {
        Dynamic::Null | Dynamic::Unknown => None,
        value => Some(value),
    }
}

/// Accepts only one of a fixed set of strings
pub struct StringOneOf {
    values: Vec<String>,
}

impl StringOneOf {
    pub fn create(values: &[&str]) -> Box<dyn Validator> {
        Box::new(Self {
            values: values.iter().map(|v| v.to_string()).collect(),
        })
    }
}

impl Validator for StringOneOf {
    fn description(&self) -> String {
        format!("value must be one of: {}", self.values.join(", "))
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];

        if let Some(s) = known(&request).and_then(Dynamic::as_str) {
            if !self.values.iter().any(|v| v == s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Invalid value for {}", request.path),
                        format!("Got {:?}, {}", s, self.description()),
                    )
                    .with_attribute(request.path.clone()),
                );
            }
        }

        ValidatorResponse { diagnostics }
    }
}

pub struct ListLength {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl ListLength {
    pub fn at_least(min: usize) -> Box<dyn Validator> {
        Box::new(Self {
            min: Some(min),
            max: None,
        })
    }
}

impl Validator for ListLength {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("must have between {} and {} items", min, max),
            (Some(min), None) => format!("must have at least {} items", min),
            (None, Some(max)) => format!("must have at most {} items", max),
            (None, None) => "any number of items".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];

        if let Some(items) = known(&request).and_then(Dynamic::as_list) {
            let too_few = self.min.map(|min| items.len() < min).unwrap_or(false);
            let too_many = self.max.map(|max| items.len() > max).unwrap_or(false);
            if too_few || too_many {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Invalid number of items for {}", request.path),
                        format!("Got {} items, {}", items.len(), self.description()),
                    )
                    .with_attribute(request.path.clone()),
                );
            }
        }

        ValidatorResponse { diagnostics }
    }
}

/// Requires the string to hold a JSON document
pub struct JsonString;

impl JsonString {
    pub fn create() -> Box<dyn Validator> {
        Box::new(Self)
    }
}

impl Validator for JsonString {
    fn description(&self) -> String {
        "value must be valid JSON".to_string()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];

        if let Some(s) = known(&request).and_then(Dynamic::as_str) {
            if let Err(e) = serde_json::from_str::<serde_json::Value>(s) {
                diagnostics.push(
                    Diagnostic::error(format!("Invalid JSON in {}", request.path), e.to_string())
                        .with_attribute(request.path.clone()),
                );
            }
        }

        ValidatorResponse { diagnostics }
    }
}
