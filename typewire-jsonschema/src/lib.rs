//! # typewire-jsonschema
//!
//! Renders resolved [`typewire`] schema trees as JSON Schema documents.
//!
//! The generator walks a tree read-only and produces a `serde_json::Value`
//! per node, cached by node identity so shared subtrees render once.
//! Optional fields surface through the enclosing object's `required` list,
//! nullable wrappers become `anyOf` with a null branch, and refinement
//! brands map onto standard keywords (`format`, `minimum`, `minLength`,
//! ...). Two shapes cannot be rendered and fail loudly instead of
//! degrading: custom brands, which have no standard keyword, and
//! self-referential trees, which JSON Schema cannot express inline.
//!
//! ```
//! use typewire::{FieldSchema, SchemaNode};
//! use typewire_jsonschema::JsonSchemaGenerator;
//!
//! let schema = SchemaNode::object([
//!     FieldSchema::new("name", SchemaNode::string()),
//!     FieldSchema::new("bio", SchemaNode::optional(SchemaNode::string())),
//! ])
//! .unwrap();
//!
//! let generator = JsonSchemaGenerator::new();
//! let document = generator.generate(&schema).unwrap();
//! assert_eq!(document["required"], serde_json::json!(["name"]));
//! ```

use dashmap::DashMap;
use serde_json::{json, Map, Value as JsonValue};
use thiserror::Error;
use tracing::trace;

use typewire::{Brand, NativeType, NodeId, RefinementSchema, SchemaKind, SchemaRef};

// ============================================================================
// Errors
// ============================================================================

/// Failures while rendering a schema tree to JSON Schema.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerateError {
    /// The tree contains a custom brand with no JSON Schema rendering.
    #[error("no JSON Schema rendering for custom refinement `{0}`")]
    UnhandledRefinement(String),

    /// The tree references itself and cannot be rendered inline.
    #[error("schema node {0} is self-referential")]
    RecursiveSchema(NodeId),
}

// ============================================================================
// Generator
// ============================================================================

/// Renders schema trees as JSON Schema values.
///
/// Rendered documents are cached by node identity, so a node shared across
/// several trees is rendered once per generator. Only successful renders
/// are cached.
#[derive(Debug)]
pub struct JsonSchemaGenerator {
    discriminant: String,
    cache: DashMap<NodeId, JsonValue>,
}

impl Default for JsonSchemaGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonSchemaGenerator {
    /// A generator using the `type` discriminant for tagged unions.
    pub fn new() -> Self {
        Self {
            discriminant: "type".to_string(),
            cache: DashMap::new(),
        }
    }

    /// Replaces the tagged-union discriminant key.
    pub fn with_discriminant(mut self, name: impl Into<String>) -> Self {
        self.discriminant = name.into();
        self
    }

    /// Renders `schema` as a JSON Schema document.
    pub fn generate(&self, schema: &SchemaRef) -> Result<JsonValue, GenerateError> {
        trace!(node = schema.id(), "generate json schema");
        let mut in_progress = Vec::new();
        self.render(schema, &mut in_progress)
    }

    fn render(
        &self,
        node: &SchemaRef,
        in_progress: &mut Vec<NodeId>,
    ) -> Result<JsonValue, GenerateError> {
        if let Some(cached) = self.cache.get(&node.id()) {
            return Ok(cached.clone());
        }
        if in_progress.contains(&node.id()) {
            return Err(GenerateError::RecursiveSchema(node.id()));
        }
        in_progress.push(node.id());
        let rendered = self.render_kind(node, in_progress);
        in_progress.pop();
        let rendered = rendered?;
        Ok(self.cache.entry(node.id()).or_insert(rendered).clone())
    }

    // The match stays wildcard-free so a new node kind fails to compile
    // here instead of rendering as something silently wrong.
    fn render_kind(
        &self,
        node: &SchemaRef,
        in_progress: &mut Vec<NodeId>,
    ) -> Result<JsonValue, GenerateError> {
        match node.kind() {
            SchemaKind::Any => Ok(json!({})),
            SchemaKind::Primitive(native) => Ok(primitive_schema(*native)),
            SchemaKind::Enum(members) => {
                let values: Vec<JsonValue> = members
                    .iter()
                    .map(|(_, value)| JsonValue::from(value.to_wire()))
                    .collect();
                Ok(json!({ "enum": values }))
            }
            // Absence is not representable in a JSON document; the
            // enclosing object's `required` list carries it instead.
            SchemaKind::Optional(child) => self.render(child, in_progress),
            SchemaKind::Nullable(child) => {
                let child = self.render(child, in_progress)?;
                Ok(json!({ "anyOf": [child, { "type": "null" }] }))
            }
            SchemaKind::List(child) => {
                let items = self.render(child, in_progress)?;
                Ok(json!({ "type": "array", "items": items }))
            }
            SchemaKind::Dictionary(child) => {
                let values = self.render(child, in_progress)?;
                Ok(json!({ "type": "object", "additionalProperties": values }))
            }
            SchemaKind::Tuple(items) => {
                let rendered = items
                    .iter()
                    .map(|item| self.render(item, in_progress))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(json!({
                    "type": "array",
                    "prefixItems": rendered,
                    "items": false,
                    "minItems": items.len(),
                    "maxItems": items.len(),
                }))
            }
            SchemaKind::Object(fields) => {
                let mut properties = Map::new();
                let mut required = Vec::new();
                for field in fields {
                    let child = field.schema();
                    properties.insert(
                        field.wire_key().to_string(),
                        self.render(&child, in_progress)?,
                    );
                    if !accepts_absence(&child) {
                        required.push(json!(field.wire_key()));
                    }
                }
                let mut schema = Map::new();
                schema.insert("type".to_string(), json!("object"));
                schema.insert("properties".to_string(), JsonValue::Object(properties));
                if !required.is_empty() {
                    schema.insert("required".to_string(), JsonValue::Array(required));
                }
                Ok(JsonValue::Object(schema))
            }
            SchemaKind::Refinement(refinement) => self.render_refinement(refinement, in_progress),
            SchemaKind::TaggedUnion(variants) => {
                let mut branches = Vec::with_capacity(variants.len());
                for (tag, payload) in variants {
                    let payload_schema = self.render(payload, in_progress)?;
                    let mut properties = Map::new();
                    properties.insert(self.discriminant.clone(), json!({ "const": tag }));
                    properties.insert(tag.clone(), payload_schema);
                    let mut required = vec![json!(self.discriminant)];
                    if !accepts_absence(payload) {
                        required.push(json!(tag));
                    }
                    branches.push(json!({
                        "type": "object",
                        "properties": properties,
                        "required": required,
                    }));
                }
                Ok(json!({ "oneOf": branches }))
            }
        }
    }

    fn render_refinement(
        &self,
        refinement: &RefinementSchema,
        in_progress: &mut Vec<NodeId>,
    ) -> Result<JsonValue, GenerateError> {
        let base = self.render(refinement.base(), in_progress)?;
        Ok(match refinement.brand() {
            Brand::Email => with_keyword(base, "format", json!("email")),
            Brand::Uri => with_keyword(base, "format", json!("uri")),
            Brand::Hostname => with_keyword(base, "format", json!("hostname")),
            Brand::Uuid => with_keyword(base, "format", json!("uuid")),
            Brand::Integer => with_keyword(base, "type", json!("integer")),
            Brand::Port => {
                let bounded = with_keyword(base, "minimum", json!(0));
                with_keyword(bounded, "maximum", json!(65535))
            }
            Brand::Ip => json!({
                "anyOf": [
                    { "type": "string", "format": "ipv4" },
                    { "type": "string", "format": "ipv6" },
                ]
            }),
            Brand::Min(bound) => with_keyword(base, "minimum", json!(bound)),
            Brand::Max(bound) => with_keyword(base, "maximum", json!(bound)),
            Brand::MinLength(len) => with_keyword(base, "minLength", json!(len)),
            Brand::MaxLength(len) => with_keyword(base, "maxLength", json!(len)),
            Brand::MinItems(len) => with_keyword(base, "minItems", json!(len)),
            Brand::MaxItems(len) => with_keyword(base, "maxItems", json!(len)),
            Brand::UniqueItems => with_keyword(base, "uniqueItems", json!(true)),
            Brand::Default(fallback) => {
                with_keyword(base, "default", JsonValue::from(fallback.clone()))
            }
            Brand::Custom { tag, .. } => {
                return Err(GenerateError::UnhandledRefinement(tag.clone()))
            }
        })
    }
}

/// Whether a field of this schema may be left off the wire entirely.
fn accepts_absence(node: &SchemaRef) -> bool {
    match node.kind() {
        SchemaKind::Optional(_) => true,
        SchemaKind::Refinement(refinement) => accepts_absence(refinement.base()),
        _ => false,
    }
}

fn with_keyword(schema: JsonValue, key: &str, keyword: JsonValue) -> JsonValue {
    let mut map = match schema {
        JsonValue::Object(map) => map,
        other => return other,
    };
    map.insert(key.to_string(), keyword);
    JsonValue::Object(map)
}

fn primitive_schema(native: NativeType) -> JsonValue {
    match native {
        NativeType::Boolean => json!({ "type": "boolean" }),
        NativeType::Number => json!({ "type": "number" }),
        NativeType::String => json!({ "type": "string" }),
        NativeType::BigInt => json!({ "type": "string", "pattern": "^-?[0-9]+$" }),
        NativeType::Date | NativeType::Instant => {
            json!({ "type": "string", "format": "date-time" })
        }
        NativeType::Bytes => json!({ "type": "string", "contentEncoding": "base64" }),
        NativeType::Regex => json!({ "type": "string", "format": "regex" }),
        NativeType::Url => json!({ "type": "string", "format": "uri" }),
        NativeType::LocalDate => json!({ "type": "string", "format": "date" }),
        NativeType::LocalTime => json!({ "type": "string", "format": "time" }),
        // JSON Schema defines no offset-free datetime format.
        NativeType::LocalDateTime => json!({
            "type": "string",
            "pattern": "^\\d{4}-\\d{2}-\\d{2}T\\d{2}:\\d{2}(:\\d{2}(\\.\\d+)?)?$",
        }),
    }
}

// ============================================================================
// Tests
// ============================================================================
