//! # typewire-zod
//!
//! Renders resolved [`typewire`] schema trees as TypeScript Zod source
//! text.
//!
//! Each node maps to a `z.*` expression: primitives to their `z.string()`
//! family, wrappers to `.optional()`/`.nullable()` suffixes, composites to
//! `z.object`/`z.array`/`z.record`/`z.tuple`, and tagged unions to
//! `z.discriminatedUnion`. Refinement brands become the matching Zod
//! validator chains. Rendered text is cached by node identity. Custom
//! brands and self-referential trees fail loudly instead of emitting a
//! weaker schema.
//!
//! ```
//! use typewire::{FieldSchema, SchemaNode};
//! use typewire_zod::ZodGenerator;
//!
//! let schema = SchemaNode::object([
//!     FieldSchema::new("name", SchemaNode::string()),
//!     FieldSchema::new("age", SchemaNode::optional(SchemaNode::number())),
//! ])
//! .unwrap();
//!
//! let generator = ZodGenerator::new();
//! let source = generator.generate_named("User", &schema).unwrap();
//! assert!(source.starts_with("export const UserSchema = z.object({"));
//! assert!(source.ends_with("export type User = z.infer<typeof UserSchema>;\n"));
//! ```

use dashmap::DashMap;
use thiserror::Error;
use tracing::trace;

use typewire::{Brand, NativeType, NodeId, RefinementSchema, SchemaKind, SchemaRef, WireValue};

// ============================================================================
// Errors
// ============================================================================

/// Failures while rendering a schema tree to Zod source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerateError {
    /// The tree contains a custom brand with no Zod rendering.
    #[error("no Zod rendering for custom refinement `{0}`")]
    UnhandledRefinement(String),

    /// The tree references itself and cannot be rendered inline.
    #[error("schema node {0} is self-referential")]
    RecursiveSchema(NodeId),
}

// ============================================================================
// Generator
// ============================================================================

/// Renders schema trees as Zod schema expressions.
///
/// Rendered text is cached by node identity, so a node shared across
/// several trees is rendered once per generator. Only successful renders
/// are cached.
#[derive(Debug)]
pub struct ZodGenerator {
    discriminant: String,
    cache: DashMap<NodeId, String>,
}

impl Default for ZodGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ZodGenerator {
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

    /// Renders `schema` as a Zod expression.
    pub fn generate(&self, schema: &SchemaRef) -> Result<String, GenerateError> {
        trace!(node = schema.id(), "generate zod schema");
        let mut in_progress = Vec::new();
        self.render(schema, &mut in_progress)
    }

    /// Renders `schema` as an exported named declaration with its inferred
    /// type alias.
    pub fn generate_named(
        &self,
        type_name: &str,
        schema: &SchemaRef,
    ) -> Result<String, GenerateError> {
        let body = self.generate(schema)?;
        let mut source = String::new();
        source.push_str(&format!("export const {}Schema = {};\n", type_name, body));
        source.push_str(&format!(
            "export type {} = z.infer<typeof {}Schema>;\n",
            type_name, type_name
        ));
        Ok(source)
    }

    fn render(
        &self,
        node: &SchemaRef,
        in_progress: &mut Vec<NodeId>,
    ) -> Result<String, GenerateError> {
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
    ) -> Result<String, GenerateError> {
        match node.kind() {
            SchemaKind::Any => Ok("z.any()".to_string()),
            SchemaKind::Primitive(native) => Ok(primitive_schema(*native).to_string()),
            SchemaKind::Enum(members) => Ok(render_enum(members)),
            SchemaKind::Optional(child) => {
                Ok(format!("{}.optional()", self.render(child, in_progress)?))
            }
            SchemaKind::Nullable(child) => {
                Ok(format!("{}.nullable()", self.render(child, in_progress)?))
            }
            SchemaKind::List(child) => {
                Ok(format!("z.array({})", self.render(child, in_progress)?))
            }
            SchemaKind::Dictionary(child) => Ok(format!(
                "z.record(z.string(), {})",
                self.render(child, in_progress)?
            )),
            SchemaKind::Tuple(items) => {
                let rendered = items
                    .iter()
                    .map(|item| self.render(item, in_progress))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("z.tuple([{}])", rendered.join(", ")))
            }
            SchemaKind::Object(fields) => {
                let mut rendered = Vec::with_capacity(fields.len());
                for field in fields {
                    rendered.push(format!(
                        "  {}: {}",
                        render_key(field.wire_key()),
                        self.render(&field.schema(), in_progress)?
                    ));
                }
                if rendered.is_empty() {
                    Ok("z.object({})".to_string())
                } else {
                    Ok(format!("z.object({{\n{}\n}})", rendered.join(",\n")))
                }
            }
            SchemaKind::Refinement(refinement) => self.render_refinement(refinement, in_progress),
            SchemaKind::TaggedUnion(variants) => {
                let mut branches = Vec::with_capacity(variants.len());
                for (tag, payload) in variants {
                    branches.push(format!(
                        "  z.object({{ {}: z.literal(\"{}\"), {}: {} }})",
                        render_key(&self.discriminant),
                        escape_string(tag),
                        render_key(tag),
                        self.render(payload, in_progress)?
                    ));
                }
                Ok(format!(
                    "z.discriminatedUnion(\"{}\", [\n{}\n])",
                    escape_string(&self.discriminant),
                    branches.join(",\n")
                ))
            }
        }
    }

    fn render_refinement(
        &self,
        refinement: &RefinementSchema,
        in_progress: &mut Vec<NodeId>,
    ) -> Result<String, GenerateError> {
        let base = self.render(refinement.base(), in_progress)?;
        Ok(match refinement.brand() {
            Brand::Email => format!("{}.email()", base),
            // The url primitive already renders with `.url()`.
            Brand::Uri => {
                if matches!(refinement.base().kind(), SchemaKind::Primitive(NativeType::Url)) {
                    base
                } else {
                    format!("{}.url()", base)
                }
            }
            Brand::Integer => format!("{}.int()", base),
            Brand::Port => format!("{}.min(0).max(65535)", base),
            Brand::Ip => format!("{}.ip()", base),
            Brand::Hostname => format!("{}.regex(/{}/)", base, escape_regex(HOSTNAME_PATTERN)),
            Brand::Uuid => format!("{}.uuid()", base),
            Brand::Min(bound) => format!("{}.min({})", base, bound),
            Brand::Max(bound) => format!("{}.max({})", base, bound),
            Brand::MinLength(len) => format!("{}.min({})", base, len),
            Brand::MaxLength(len) => format!("{}.max({})", base, len),
            Brand::MinItems(len) => format!("{}.min({})", base, len),
            Brand::MaxItems(len) => format!("{}.max({})", base, len),
            Brand::UniqueItems => format!(
                "{}.refine((items) => new Set(items).size === items.length)",
                base
            ),
            Brand::Default(fallback) => {
                format!("{}.default({})", base, render_literal(fallback))
            }
            Brand::Custom { tag, .. } => {
                return Err(GenerateError::UnhandledRefinement(tag.clone()))
            }
        })
    }
}

// Mirrors the validating pattern the hostname refinement decodes with.
const HOSTNAME_PATTERN: &str =
    r"^(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)*[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$";

fn primitive_schema(native: NativeType) -> &'static str {
    match native {
        NativeType::Boolean => "z.boolean()",
        NativeType::Number => "z.number()",
        NativeType::String => "z.string()",
        NativeType::BigInt => "z.string().regex(/^-?[0-9]+$/)",
        NativeType::Date | NativeType::Instant => "z.string().datetime()",
        NativeType::Bytes => "z.string().base64()",
        NativeType::Regex => "z.string()",
        NativeType::Url => "z.string().url()",
        NativeType::LocalDate => "z.string().date()",
        NativeType::LocalTime => "z.string().time()",
        NativeType::LocalDateTime => "z.string().datetime({ local: true })",
    }
}

fn render_enum(members: &[(String, typewire::Value)]) -> String {
    let all_strings = members
        .iter()
        .all(|(_, value)| matches!(value.to_wire(), WireValue::String(_)));
    if all_strings {
        let names: Vec<String> = members
            .iter()
            .map(|(_, value)| render_literal(&value.to_wire()))
            .collect();
        format!("z.enum([{}])", names.join(", "))
    } else {
        let literals: Vec<String> = members
            .iter()
            .map(|(_, value)| format!("z.literal({})", render_literal(&value.to_wire())))
            .collect();
        format!("z.union([{}])", literals.join(", "))
    }
}

/// Renders a wire value as a JavaScript literal.
fn render_literal(wire: &WireValue) -> String {
    match serde_json::to_string(&serde_json::Value::from(wire.clone())) {
        Ok(text) => text,
        Err(_) => "null".to_string(),
    }
}

/// Renders an object key, quoting it when it is not a plain identifier.
fn render_key(key: &str) -> String {
    let mut chars = key.chars();
    let plain = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_' || first == '$')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        None => false,
    };
    if plain {
        key.to_string()
    } else {
        format!("\"{}\"", escape_string(key))
    }
}

/// Escape a string for use in JavaScript/TypeScript.
fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Escape forward slashes for use inside a regex literal.
fn escape_regex(pattern: &str) -> String {
    pattern.replace('/', "\\/")
}

// ============================================================================
// Tests
// ============================================================================


// ============================================================================
// Property-Based Tests
// ============================================================================
