//! Schema types and builders for tfplug
//!
//! This module provides the schema system for defining provider, resource and
//! data source schemas, including attribute types, nested blocks, and the
//! validator / plan modifier / default hooks attached to attributes.

use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;

/// AttributeType defines the type system for Terraform attributes
/// This must match Terraform's type system exactly
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number, // Always f64
    Bool,
    List(Box<AttributeType>),               // Ordered, allows duplicates
    Set(Box<AttributeType>),                // Unordered, no duplicates
    Map(Box<AttributeType>),                // String keys only
    Object(HashMap<String, AttributeType>), // Fixed structure
}

impl AttributeType {
    /// Terraform's JSON type syntax, e.g. `"string"` or `["list","number"]`
    pub fn to_type_json(&self) -> serde_json::Value {
        use serde_json::{json, Value};

        match self {
            AttributeType::String => json!("string"),
            AttributeType::Number => json!("number"),
            AttributeType::Bool => json!("bool"),
            AttributeType::List(elem) => json!(["list", elem.to_type_json()]),
            AttributeType::Set(elem) => json!(["set", elem.to_type_json()]),
            AttributeType::Map(elem) => json!(["map", elem.to_type_json()]),
            AttributeType::Object(fields) => {
                let fields: serde_json::Map<String, Value> = fields
                    .iter()
                    .map(|(name, ty)| (name.clone(), ty.to_type_json()))
                    .collect();
                json!(["object", Value::Object(fields)])
            }
        }
    }

    /// Encoded form used in the protocol's `Schema.Attribute.type` field
    pub fn to_type_bytes(&self) -> Vec<u8> {
        self.to_type_json().to_string().into_bytes()
    }

    /// Whether a (known, non-null) value fits this type
    pub fn accepts(&self, value: &Dynamic) -> bool {
        match (self, value) {
            (_, Dynamic::Null) | (_, Dynamic::Unknown) => true,
            (AttributeType::String, Dynamic::String(_)) => true,
            (AttributeType::Number, Dynamic::Number(_)) => true,
            (AttributeType::Bool, Dynamic::Bool(_)) => true,
            (AttributeType::List(elem), Dynamic::List(items))
            | (AttributeType::Set(elem), Dynamic::List(items)) => {
                items.iter().all(|item| elem.accepts(item))
            }
            (AttributeType::Map(elem), Dynamic::Map(entries)) => {
                entries.values().all(|v| elem.accepts(v))
            }
            (AttributeType::Object(fields), Dynamic::Map(entries)) => entries
                .iter()
                .all(|(k, v)| fields.get(k).map(|ty| ty.accepts(v)).unwrap_or(false)),
            _ => false,
        }
    }
}

/// Schema is returned by providers/resources/data sources
/// Version is used for state migration
#[derive(Debug)]
pub struct Schema {
    pub version: i64, // Increment when schema changes require migration
    pub block: Block, // Root block containing all attributes
}

/// Block represents a configuration block
#[derive(Debug)]
pub struct Block {
    pub version: i64,
    pub attributes: Vec<Attribute>,
    pub block_types: Vec<NestedBlock>,
    pub description: String,
    pub description_kind: StringKind,
    pub deprecated: bool,
}

impl Block {
    fn empty() -> Self {
        Self {
            version: 0,
            attributes: Vec::new(),
            block_types: Vec::new(),
            description: String::new(),
            description_kind: StringKind::Plain,
            deprecated: false,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn block_type(&self, name: &str) -> Option<&NestedBlock> {
        self.block_types.iter().find(|b| b.type_name == name)
    }

    /// Shapes an object value to exactly this block's structure
    ///
    /// Missing attributes become null, unknown keys are dropped and absent
    /// list/set blocks become empty lists. Terraform rejects objects that
    /// don't line up with the schema.
    pub fn normalize(&self, value: &Dynamic) -> Dynamic {
        let fields = match value {
            Dynamic::Map(fields) => fields,
            Dynamic::Unknown => return Dynamic::Unknown,
            _ => return Dynamic::Null,
        };

        let mut normalized = HashMap::new();
        for attr in &self.attributes {
            let value = fields.get(&attr.name).cloned().unwrap_or(Dynamic::Null);
            normalized.insert(attr.name.clone(), value);
        }

        for nested in &self.block_types {
            let value = fields.get(&nested.type_name).unwrap_or(&Dynamic::Null);
            normalized.insert(nested.type_name.clone(), nested.normalize(value));
        }

        Dynamic::Map(normalized)
    }
}

/// Attribute represents a single configuration attribute
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub validators: Vec<Box<dyn Validator>>,
    pub plan_modifiers: Vec<Box<dyn PlanModifier>>,
    pub default: Option<Box<dyn Default>>,
    pub deprecated: bool,
}

// Manual Debug implementation since validators/modifiers don't implement Debug
impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field(
                "validators",
                &format!("{} validators", self.validators.len()),
            )
            .field(
                "plan_modifiers",
                &format!("{} plan modifiers", self.plan_modifiers.len()),
            )
            .field("default", &self.default.is_some())
            .finish()
    }
}

/// NestedBlock represents a nested configuration block
#[derive(Debug)]
pub struct NestedBlock {
    pub type_name: String,
    pub block: Block,
    pub nesting: NestingMode,
    pub min_items: i64,
    pub max_items: i64,
}

impl NestedBlock {
    fn normalize(&self, value: &Dynamic) -> Dynamic {
        match (self.nesting, value) {
            (_, Dynamic::Unknown) => Dynamic::Unknown,
            (NestingMode::List | NestingMode::Set, Dynamic::List(items)) => Dynamic::List(
                items
                    .iter()
                    .map(|item| self.block.normalize(item))
                    .collect(),
            ),
            (NestingMode::List | NestingMode::Set, _) => Dynamic::List(Vec::new()),
            (NestingMode::Map, Dynamic::Map(entries)) => Dynamic::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), self.block.normalize(v)))
                    .collect(),
            ),
            (NestingMode::Map, _) => Dynamic::Map(HashMap::new()),
            (NestingMode::Group, Dynamic::Null) => self.block.normalize(&Dynamic::Map(HashMap::new())),
            (_, value) => self.block.normalize(value),
        }
    }
}

/// NestingMode defines how nested blocks are structured
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NestingMode {
    Invalid,
    Single,
    List,
    Set,
    Map,
    Group,
}

/// StringKind represents the format of string values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StringKind {
    Plain,
    Markdown,
}

/// Validator performs validation on attribute values during planning
/// Implement this for custom validation logic
pub trait Validator: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    /// Perform validation
    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse;
}

/// Request for validators
pub struct ValidatorRequest {
    pub config_value: DynamicValue,
    pub path: AttributePath,
}

/// Response from validators
pub struct ValidatorResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// PlanModifier modifies planned values during planning
/// Common uses: RequiresReplace, UseStateForUnknown
pub trait PlanModifier: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    /// Modify the planned value
    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse;
}

/// Request for plan modifiers
pub struct PlanModifierRequest {
    pub config_value: DynamicValue,
    pub state_value: DynamicValue,
    pub plan_value: DynamicValue,
    pub path: AttributePath,
}

/// Response from plan modifiers
pub struct PlanModifierResponse {
    pub plan_value: DynamicValue,
    pub requires_replace: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Default provides default values for optional attributes
/// Called when attribute is not set in configuration
pub trait Default: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    /// Provide default value
    fn default_value(&self, request: DefaultRequest) -> DefaultResponse;
}

/// Request for default values
pub struct DefaultRequest {
    pub path: AttributePath,
}

/// Response with default value
pub struct DefaultResponse {
    pub value: DynamicValue,
}

/// AttributeBuilder provides fluent API for building attributes
/// ALWAYS use this instead of constructing Attribute directly
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    /// Create a new attribute builder
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                default: None,
                deprecated: false,
            },
        }
    }

    /// Set description
    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    /// Mark as required
    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    /// Mark as optional
    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    /// Mark as computed
    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    /// Mark as sensitive (hidden)
    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    /// Mark as deprecated
    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    /// Add validator
    pub fn validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.attribute.validators.push(validator);
        self
    }

    /// Add plan modifier
    pub fn plan_modifier(mut self, modifier: Box<dyn PlanModifier>) -> Self {
        self.attribute.plan_modifiers.push(modifier);
        self
    }

    /// Set default. Defaults only apply to optional+computed attributes,
    /// so this marks the attribute computed as well.
    pub fn default(mut self, default: Box<dyn Default>) -> Self {
        self.attribute.default = Some(default);
        self.attribute.computed = true;
        self
    }

    /// Finalize the attribute
    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// NestedBlockBuilder builds blocks such as `wait_for { ... }`
pub struct NestedBlockBuilder {
    nested: NestedBlock,
}

impl NestedBlockBuilder {
    pub fn new(type_name: &str, nesting: NestingMode) -> Self {
        Self {
            nested: NestedBlock {
                type_name: type_name.to_string(),
                block: Block::empty(),
                nesting,
                min_items: 0,
                max_items: 0,
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.nested.block.description = desc.to_string();
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.nested.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.nested.block.block_types.push(block);
        self
    }

    pub fn min_items(mut self, min: i64) -> Self {
        self.nested.min_items = min;
        self
    }

    pub fn max_items(mut self, max: i64) -> Self {
        self.nested.max_items = max;
        self
    }

    pub fn build(self) -> NestedBlock {
        self.nested
    }
}

/// SchemaBuilder provides fluent API for building schemas
/// ALWAYS use this for consistency
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block::empty(),
            },
        }
    }

    /// Set schema version
    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self.schema.block.version = version;
        self
    }

    /// Add attribute
    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    /// Add nested block
    pub fn block(mut self, block: NestedBlock) -> Self {
        self.schema.block.block_types.push(block);
        self
    }

    /// Set description
    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    /// Set description kind
    pub fn description_kind(mut self, kind: StringKind) -> Self {
        self.schema.block.description_kind = kind;
        self
    }

    /// Mark as deprecated
    pub fn deprecated(mut self) -> Self {
        self.schema.block.deprecated = true;
        self
    }

    /// Finalize the schema
    pub fn build(self) -> Schema {
        self.schema
    }
}

impl std::default::Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_builder_creates_required_string() {
        let attr = AttributeBuilder::new("name", AttributeType::String)
            .description("The name of the space")
            .required()
            .build();

        assert_eq!(attr.name, "name");
        assert!(matches!(attr.r#type, AttributeType::String));
        assert!(attr.required);
        assert!(!attr.optional);
        assert_eq!(attr.description, "The name of the space");
    }

    #[test]
    fn schema_builder_creates_schema_with_attributes_and_blocks() {
        let schema = SchemaBuilder::new()
            .version(1)
            .description("Test resource schema")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("completion", NestingMode::List)
                    .attribute(
                        AttributeBuilder::new("temperature", AttributeType::Number)
                            .optional()
                            .build(),
                    )
                    .max_items(1)
                    .build(),
            )
            .build();

        assert_eq!(schema.version, 1);
        assert_eq!(schema.block.attributes.len(), 1);
        assert_eq!(schema.block.block_types[0].max_items, 1);
        assert!(schema.block.block_type("completion").is_some());
        assert!(schema.block.attribute("id").unwrap().computed);
    }

    #[test]
    fn type_json_matches_terraform_syntax() {
        assert_eq!(AttributeType::String.to_type_bytes(), br#""string""#.to_vec());
        assert_eq!(
            AttributeType::List(Box::new(AttributeType::Number)).to_type_json(),
            serde_json::json!(["list", "number"])
        );
        assert_eq!(
            AttributeType::Object(HashMap::from([(
                "from".to_string(),
                AttributeType::String
            )]))
            .to_type_json(),
            serde_json::json!(["object", {"from": "string"}])
        );
    }

    #[test]
    fn type_accepts_checks_nested_values() {
        let codes = AttributeType::List(Box::new(AttributeType::Number));
        assert!(codes.accepts(&Dynamic::List(vec![Dynamic::Number(200.0)])));
        assert!(!codes.accepts(&Dynamic::List(vec![Dynamic::String("ok".into())])));
        assert!(codes.accepts(&Dynamic::Unknown));
        assert!(!AttributeType::Bool.accepts(&Dynamic::String("true".into())));
    }

    #[test]
    fn normalize_fills_missing_and_drops_extra() {
        let schema = SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("wait_for", NestingMode::List)
                    .attribute(
                        AttributeBuilder::new("name", AttributeType::String)
                            .required()
                            .build(),
                    )
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("validation", NestingMode::Single)
                    .attribute(
                        AttributeBuilder::new("path", AttributeType::String)
                            .required()
                            .build(),
                    )
                    .build(),
            )
            .build();

        let value = Dynamic::Map(HashMap::from([
            ("name".to_string(), Dynamic::String("core".into())),
            ("leftover".to_string(), Dynamic::Bool(true)),
        ]));

        let normalized = schema.block.normalize(&value);
        let fields = normalized.as_map().unwrap();

        assert_eq!(fields.len(), 4);
        assert_eq!(fields["id"], Dynamic::Null);
        assert_eq!(fields["name"], Dynamic::String("core".into()));
        assert_eq!(fields["wait_for"], Dynamic::List(vec![]));
        assert_eq!(fields["validation"], Dynamic::Null);
        assert!(!fields.contains_key("leftover"));
    }
}
