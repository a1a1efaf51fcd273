//! Core type system for tfplug
//!
//! This module provides the core types used throughout the framework,
//! including Dynamic values, attribute paths and diagnostics.

use crate::error::{Result, TfplugError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Dynamic represents Terraform values that can be of any type
/// This is the core type for all configuration and state data
/// IMPORTANT: Always use type-safe accessors instead of matching directly
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    /// Explicit null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Number value (all numbers are f64 to match Terraform)
    Number(f64),
    /// String value
    String(String),
    /// List of values (lists, sets and tuples)
    List(Vec<Dynamic>),
    /// Map of string keys to values (objects are represented as Maps)
    Map(HashMap<String, Dynamic>),
    /// Value not yet known (during planning)
    Unknown,
}

/// msgpack extension code Terraform uses for unknown values
const UNKNOWN_EXT_CODE: i8 = 0;

impl Dynamic {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Dynamic::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Dynamic::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Dynamic::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Dynamic>> {
        match self {
            Dynamic::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, Dynamic>> {
        match self {
            Dynamic::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Dynamic::Unknown)
    }

    /// True when the value and everything nested in it is known
    pub fn is_fully_known(&self) -> bool {
        match self {
            Dynamic::Unknown => false,
            Dynamic::List(items) => items.iter().all(Dynamic::is_fully_known),
            Dynamic::Map(fields) => fields.values().all(Dynamic::is_fully_known),
            _ => true,
        }
    }

    /// Replaces every unknown value with null
    pub fn unknowns_to_null(self) -> Dynamic {
        match self {
            Dynamic::Unknown => Dynamic::Null,
            Dynamic::List(items) => {
                Dynamic::List(items.into_iter().map(Dynamic::unknowns_to_null).collect())
            }
            Dynamic::Map(fields) => Dynamic::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, v.unknowns_to_null()))
                    .collect(),
            ),
            other => other,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Null => "null",
            Dynamic::Bool(_) => "bool",
            Dynamic::Number(_) => "number",
            Dynamic::String(_) => "string",
            Dynamic::List(_) => "list",
            Dynamic::Map(_) => "map",
            Dynamic::Unknown => "unknown",
        }
    }
}

/// Payload of the unknown-value extension: `(code, data)`
struct UnknownExt;

impl Serialize for UnknownExt {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeTuple;

        struct Payload;

        impl Serialize for Payload {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_bytes(&[0])
            }
        }

        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&UNKNOWN_EXT_CODE)?;
        tuple.serialize_element(&Payload)?;
        tuple.end()
    }
}

impl Serialize for Dynamic {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Dynamic::Null => serializer.serialize_unit(),
            Dynamic::Bool(b) => serializer.serialize_bool(*b),
            Dynamic::Number(n) => {
                // Whole numbers go out as integers, which keeps msgpack compact
                if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Dynamic::String(s) => serializer.serialize_str(s),
            Dynamic::List(l) => l.serialize(serializer),
            Dynamic::Map(m) => m.serialize(serializer),
            Dynamic::Unknown => {
                if serializer.is_human_readable() {
                    serializer.serialize_unit()
                } else {
                    serializer
                        .serialize_newtype_struct(rmp_serde::MSGPACK_EXT_STRUCT_NAME, &UnknownExt)
                }
            }
        }
    }
}

impl<'de> Deserialize<'de> for Dynamic {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct DynamicVisitor;

        impl<'de> Visitor<'de> for DynamicVisitor {
            type Value = Dynamic;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a valid Dynamic value")
            }

            fn visit_unit<E>(self) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Null)
            }

            fn visit_none<E>(self) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> std::result::Result<Dynamic, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                Dynamic::deserialize(deserializer)
            }

            fn visit_bool<E>(self, value: bool) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_u64<E>(self, value: u64) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_f64<E>(self, value: f64) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Number(value))
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::String(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::String(value))
            }

            // msgpack extensions arrive as a newtype; Terraform only sends
            // them for unknown values
            fn visit_newtype_struct<D>(
                self,
                deserializer: D,
            ) -> std::result::Result<Dynamic, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                de::IgnoredAny::deserialize(deserializer)?;
                Ok(Dynamic::Unknown)
            }

            fn visit_seq<V>(self, mut seq: V) -> std::result::Result<Dynamic, V::Error>
            where
                V: de::SeqAccess<'de>,
            {
                let mut vec = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(elem) = seq.next_element()? {
                    vec.push(elem);
                }
                Ok(Dynamic::List(vec))
            }

            fn visit_map<V>(self, mut map: V) -> std::result::Result<Dynamic, V::Error>
            where
                V: de::MapAccess<'de>,
            {
                let mut hashmap = HashMap::new();
                while let Some((key, value)) = map.next_entry()? {
                    hashmap.insert(key, value);
                }
                Ok(Dynamic::Map(hashmap))
            }
        }

        deserializer.deserialize_any(DynamicVisitor)
    }
}

impl From<serde_json::Value> for Dynamic {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Dynamic::Null,
            serde_json::Value::Bool(b) => Dynamic::Bool(b),
            serde_json::Value::Number(n) => Dynamic::Number(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => Dynamic::String(s),
            serde_json::Value::Array(items) => {
                Dynamic::List(items.into_iter().map(Dynamic::from).collect())
            }
            serde_json::Value::Object(fields) => Dynamic::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Dynamic::from(v)))
                    .collect(),
            ),
        }
    }
}

/// DynamicValue wraps Dynamic and provides encoding/decoding capabilities
/// This is what gets passed between Terraform and the provider
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicValue {
    pub value: Dynamic,
}

impl DynamicValue {
    pub fn new(value: Dynamic) -> Self {
        Self { value }
    }

    pub fn null() -> Self {
        Self {
            value: Dynamic::Null,
        }
    }

    pub fn unknown() -> Self {
        Self {
            value: Dynamic::Unknown,
        }
    }

    /// An empty object, the usual starting point for building state
    pub fn object() -> Self {
        Self {
            value: Dynamic::Map(HashMap::new()),
        }
    }

    /// Encoding/decoding for wire protocol - Terraform uses msgpack by default
    pub fn encode_msgpack(&self) -> Result<Vec<u8>> {
        rmp_serde::encode::to_vec(&self.value)
            .map_err(|e| TfplugError::EncodingError(format!("msgpack encoding failed: {}", e)))
    }

    pub fn decode_msgpack(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::null());
        }

        let value = rmp_serde::decode::from_slice::<Dynamic>(data)
            .map_err(|e| TfplugError::DecodingError(format!("msgpack decoding failed: {}", e)))?;
        Ok(Self { value })
    }

    pub fn decode_json(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::null());
        }

        let value = serde_json::from_slice::<serde_json::Value>(data)
            .map_err(|e| TfplugError::DecodingError(format!("json decoding failed: {}", e)))?;
        Ok(Self {
            value: Dynamic::from(value),
        })
    }

    /// Raw access to the value at `path`
    pub fn get(&self, path: &AttributePath) -> Result<&Dynamic> {
        self.navigate_path(path)
    }

    /// Type-safe accessors - ALWAYS use these instead of pattern matching
    /// Null and unknown values are reported as type mismatches
    pub fn get_string(&self, path: &AttributePath) -> Result<String> {
        let value = self.navigate_path(path)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch("string", value))
    }

    pub fn get_number(&self, path: &AttributePath) -> Result<f64> {
        let value = self.navigate_path(path)?;
        value.as_number().ok_or_else(|| mismatch("number", value))
    }

    pub fn get_bool(&self, path: &AttributePath) -> Result<bool> {
        let value = self.navigate_path(path)?;
        value.as_bool().ok_or_else(|| mismatch("bool", value))
    }

    pub fn get_list(&self, path: &AttributePath) -> Result<Vec<Dynamic>> {
        let value = self.navigate_path(path)?;
        value.as_list().cloned().ok_or_else(|| mismatch("list", value))
    }

    /// Type-safe setters - Use for building state/config objects
    pub fn set_string(&mut self, path: &AttributePath, value: String) -> Result<()> {
        self.set_value(path, Dynamic::String(value))
    }

    pub fn set_number(&mut self, path: &AttributePath, value: f64) -> Result<()> {
        self.set_value(path, Dynamic::Number(value))
    }

    pub fn set_bool(&mut self, path: &AttributePath, value: bool) -> Result<()> {
        self.set_value(path, Dynamic::Bool(value))
    }

    pub fn set_list(&mut self, path: &AttributePath, value: Vec<Dynamic>) -> Result<()> {
        self.set_value(path, Dynamic::List(value))
    }

    pub fn set_null(&mut self, path: &AttributePath) -> Result<()> {
        self.set_value(path, Dynamic::Null)
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn is_unknown(&self) -> bool {
        self.value.is_unknown()
    }

    /// Mark computed values as unknown during planning
    pub fn mark_unknown(&mut self, path: &AttributePath) -> Result<()> {
        self.set_value(path, Dynamic::Unknown)
    }

    fn navigate_path<'a>(&'a self, path: &AttributePath) -> Result<&'a Dynamic> {
        let mut current = &self.value;

        for step in &path.steps {
            current = match (current, step) {
                (Dynamic::Map(m), AttributePathStep::AttributeName(name))
                | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => m
                    .get(name)
                    .ok_or_else(|| TfplugError::AttributeNotFound(name.clone()))?,
                (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => {
                    l.get(*idx as usize).ok_or_else(|| {
                        TfplugError::InvalidPath(format!("list index {} out of bounds", idx))
                    })?
                }
                (value, step) => {
                    return Err(TfplugError::InvalidPath(format!(
                        "cannot apply {} to {}",
                        step,
                        value.type_name()
                    )))
                }
            };
        }

        Ok(current)
    }

    pub fn set_value(&mut self, path: &AttributePath, new_value: Dynamic) -> Result<()> {
        let Some((last, parents)) = path.steps.split_last() else {
            self.value = new_value;
            return Ok(());
        };

        // For non-empty paths, ensure we have a map at the root
        if !matches!(self.value, Dynamic::Map(_)) {
            self.value = Dynamic::Map(HashMap::new());
        }

        let mut current = &mut self.value;
        for (idx, step) in parents.iter().enumerate() {
            let next_step = &path.steps[idx + 1];
            current = match (current, step) {
                (Dynamic::Map(m), AttributePathStep::AttributeName(name))
                | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => {
                    let entry = m.entry(name.clone()).or_insert(Dynamic::Null);
                    // Fill in missing intermediate containers based on the next step
                    if entry.is_null() {
                        *entry = match next_step {
                            AttributePathStep::ElementKeyInt(_) => Dynamic::List(Vec::new()),
                            _ => Dynamic::Map(HashMap::new()),
                        };
                    }
                    entry
                }
                (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => {
                    let len = l.len();
                    l.get_mut(*idx as usize).ok_or_else(|| {
                        TfplugError::InvalidPath(format!(
                            "list index {} out of bounds (len {})",
                            idx, len
                        ))
                    })?
                }
                (value, step) => {
                    return Err(TfplugError::InvalidPath(format!(
                        "cannot apply {} to {}",
                        step,
                        value.type_name()
                    )))
                }
            };
        }

        match (current, last) {
            (Dynamic::Map(m), AttributePathStep::AttributeName(name))
            | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => {
                m.insert(name.clone(), new_value);
                Ok(())
            }
            (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => {
                let idx = *idx as usize;
                if idx < l.len() {
                    l[idx] = new_value;
                } else if idx == l.len() {
                    l.push(new_value);
                } else {
                    return Err(TfplugError::InvalidPath(format!(
                        "list index {} out of bounds",
                        idx
                    )));
                }
                Ok(())
            }
            (value, step) => Err(TfplugError::InvalidPath(format!(
                "cannot apply {} to {}",
                step,
                value.type_name()
            ))),
        }
    }
}

fn mismatch(expected: &str, actual: &Dynamic) -> TfplugError {
    TfplugError::TypeMismatch {
        expected: expected.to_string(),
        actual: actual.type_name().to_string(),
    }
}

/// AttributePath represents a path to an attribute within a DynamicValue
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributePath {
    pub steps: Vec<AttributePathStep>,
}

impl AttributePath {
    pub fn new(name: &str) -> Self {
        Self {
            steps: vec![AttributePathStep::AttributeName(name.to_string())],
        }
    }

    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn attribute(mut self, name: &str) -> Self {
        self.steps
            .push(AttributePathStep::AttributeName(name.to_string()));
        self
    }

    pub fn index(mut self, idx: i64) -> Self {
        self.steps.push(AttributePathStep::ElementKeyInt(idx));
        self
    }

    pub fn key(mut self, key: &str) -> Self {
        self.steps
            .push(AttributePathStep::ElementKeyString(key.to_string()));
        self
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                AttributePathStep::AttributeName(name) if i == 0 => write!(f, "{}", name)?,
                _ => write!(f, "{}", step)?,
            }
        }
        Ok(())
    }
}

/// Individual step in an AttributePath
#[derive(Debug, Clone, PartialEq)]
pub enum AttributePathStep {
    /// Access attribute by name in object/map
    AttributeName(String),
    /// Access element by string key (for maps)
    ElementKeyString(String),
    /// Access element by integer index (for lists)
    ElementKeyInt(i64),
}

impl fmt::Display for AttributePathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributePathStep::AttributeName(name) => write!(f, ".{}", name),
            AttributePathStep::ElementKeyString(key) => write!(f, "[\"{}\"]", key),
            AttributePathStep::ElementKeyInt(idx) => write!(f, "[{}]", idx),
        }
    }
}

/// RawState holds the stored state for a resource to be upgraded
#[derive(Debug, Clone, Default)]
pub struct RawState {
    pub json: Option<Vec<u8>>,
    pub flatmap: Option<HashMap<String, String>>,
}

/// Diagnostic represents a warning or error from the provider
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    pub detail: String,
    pub attribute: Option<AttributePath>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, path: AttributePath) -> Self {
        self.attribute = Some(path);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

/// True when any diagnostic in the slice is an error
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiagnosticSeverity {
    Invalid,
    Error,
    Warning,
}

/// ServerCapabilities indicates provider capabilities
#[derive(Debug, Clone, Default)]
pub struct ServerCapabilities {
    pub plan_destroy: bool,
    pub get_provider_schema_optional: bool,
    pub move_resource_state: bool,
}

/// ClientCapabilities indicates Terraform client capabilities
#[derive(Debug, Clone, Default)]
pub struct ClientCapabilities {
    pub deferral_allowed: bool,
    pub write_only_attributes_allowed: bool,
}

/// Deferred indicates a deferred change
#[derive(Debug, Clone)]
pub struct Deferred {
    pub reason: DeferredReason,
}

/// Reason for deferring a change
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeferredReason {
    Unknown,
    ResourceConfigUnknown,
    ProviderConfigUnknown,
    AbsentPrereq,
}

/// ResourceIdentityData contains actual identity data
#[derive(Debug, Clone)]
pub struct ResourceIdentityData {
    pub identity_data: DynamicValue,
}

/// Config represents configuration values
pub type Config = DynamicValue;

/// State represents resource state values
pub type State = DynamicValue;
