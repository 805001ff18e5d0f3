//! The resolved schema node model
//!
//! A schema is a tree of [`SchemaNode`]s, shared behind [`SchemaRef`]. The
//! set of node kinds is closed: the engines and every downstream generator
//! dispatch over [`SchemaKind`] exhaustively, so a new kind is a compile
//! error everywhere until it is handled. Nodes are immutable once built;
//! every constructor-checked invariant therefore holds for the node's whole
//! lifetime.
//!
//! Each node carries a [`NodeId`] drawn from a process-wide counter at
//! construction. Identity-keyed side tables (resolver memoization, generated
//! artifacts) key off that id instead of structural equality.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::context::Context;
use crate::error::{SchemaError, SchemaResult, Validated};
use crate::value::Value;
use crate::wire::WireValue;

/// Stable per-process identity of a schema node.
pub type NodeId = u64;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

fn next_node_id() -> NodeId {
    NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Shared handle to an immutable schema node.
pub type SchemaRef = Arc<SchemaNode>;

// ============================================================================
// Native primitive types
// ============================================================================

/// The closed set of primitive native types a `Primitive` node can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeType {
    Boolean,
    Number,
    String,
    /// Arbitrary-precision integer, carried as `i128`.
    BigInt,
    /// Calendar timestamp (rule name `Date`).
    Date,
    /// Byte buffer, base64 on the wire.
    Bytes,
    Regex,
    Url,
    /// Absolute epoch-anchored point in time.
    Instant,
    LocalDate,
    LocalTime,
    LocalDateTime,
}

impl NativeType {
    /// Every member of the closed set, in declaration order.
    pub const ALL: [NativeType; 12] = [
        Self::Boolean,
        Self::Number,
        Self::String,
        Self::BigInt,
        Self::Date,
        Self::Bytes,
        Self::Regex,
        Self::Url,
        Self::Instant,
        Self::LocalDate,
        Self::LocalTime,
        Self::LocalDateTime,
    ];

    /// The tag name of this native type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::BigInt => "bigint",
            Self::Date => "date",
            Self::Bytes => "bytes",
            Self::Regex => "regex",
            Self::Url => "url",
            Self::Instant => "instant",
            Self::LocalDate => "localDate",
            Self::LocalTime => "localTime",
            Self::LocalDateTime => "localDateTime",
        }
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NativeType {
    type Err = SchemaError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|native| native.as_str() == tag)
            .copied()
            .ok_or_else(|| SchemaError::UnknownPrimitive(tag.to_string()))
    }
}

// ============================================================================
// Schema type discriminant
// ============================================================================

/// Discriminant-only mirror of [`SchemaKind`], used for dispatch tables and
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaType {
    Any,
    Primitive,
    Enum,
    Optional,
    Nullable,
    List,
    Dictionary,
    Tuple,
    Object,
    Refinement,
    TaggedUnion,
}

impl SchemaType {
    /// The tag name of this schema type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Primitive => "primitive",
            Self::Enum => "enum",
            Self::Optional => "optional",
            Self::Nullable => "nullable",
            Self::List => "list",
            Self::Dictionary => "dictionary",
            Self::Tuple => "tuple",
            Self::Object => "object",
            Self::Refinement => "refinement",
            Self::TaggedUnion => "taggedUnion",
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Thunked child schemas
// ============================================================================

/// A lazily evaluated child schema reference.
///
/// Self-referential types would recurse forever if object fields resolved
/// their children eagerly, so fields hold thunks instead. The closure runs
/// at most once; the produced node is cached for every later traversal.
#[derive(Clone)]
pub struct SchemaThunk {
    init: Arc<dyn Fn() -> SchemaRef + Send + Sync>,
    cell: OnceLock<SchemaRef>,
}

impl SchemaThunk {
    /// A thunk that runs `init` on first use.
    pub fn new(init: impl Fn() -> SchemaRef + Send + Sync + 'static) -> Self {
        Self {
            init: Arc::new(init),
            cell: OnceLock::new(),
        }
    }

    /// A thunk around an already-resolved node.
    pub fn eager(schema: SchemaRef) -> Self {
        Self::new(move || schema.clone())
    }

    /// The resolved node, evaluating the closure on first call.
    pub fn get(&self) -> SchemaRef {
        self.cell.get_or_init(|| (self.init)()).clone()
    }

    /// Whether the thunk has been evaluated yet.
    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl fmt::Debug for SchemaThunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaThunk")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

// ============================================================================
// Object fields
// ============================================================================

/// One declared object field: its key, external wire key, and child schema.
///
/// `key` names the field in decoded output and in error paths; `wire_key` is
/// what decode looks up in wire input and what encode emits. They coincide
/// unless [`FieldSchema::with_wire_key`] renames the external side.
#[derive(Clone)]
pub struct FieldSchema {
    key: String,
    wire_key: String,
    schema: SchemaThunk,
}

impl FieldSchema {
    /// A field with an eagerly resolved child schema.
    pub fn new(key: impl Into<String>, schema: SchemaRef) -> Self {
        let key = key.into();
        Self {
            wire_key: key.clone(),
            key,
            schema: SchemaThunk::eager(schema),
        }
    }

    /// A field whose child schema is produced lazily, for self-referential
    /// and forward-declared types.
    pub fn lazy(
        key: impl Into<String>,
        init: impl Fn() -> SchemaRef + Send + Sync + 'static,
    ) -> Self {
        let key = key.into();
        Self {
            wire_key: key.clone(),
            key,
            schema: SchemaThunk::new(init),
        }
    }

    /// Renames the external wire key.
    pub fn with_wire_key(mut self, wire_key: impl Into<String>) -> Self {
        self.wire_key = wire_key.into();
        self
    }

    /// The declared field key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The external wire key.
    pub fn wire_key(&self) -> &str {
        &self.wire_key
    }

    /// The field's child schema, resolving the thunk on first use.
    pub fn schema(&self) -> SchemaRef {
        self.schema.get()
    }
}

impl fmt::Debug for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSchema")
            .field("key", &self.key)
            .field("wire_key", &self.wire_key)
            .field("schema", &self.schema)
            .finish()
    }
}

// ============================================================================
// Refinements and brands
// ============================================================================

/// Decode transform of a refinement. Runs only after the base schema
/// decoded successfully, and may fail with its own rule names.
pub type RefineDecodeFn = Arc<dyn Fn(&Context, Value) -> Validated<Value> + Send + Sync>;

/// Encode transform of a refinement, mapping the refined value back to the
/// base schema's domain. Total.
pub type RefineEncodeFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// The brand payload of a refinement node.
///
/// The fixed tags form the vocabulary every generator backend understands;
/// `Custom` carries open-ended brands, which backends must reject with a
/// distinct "unhandled refinement" error rather than ignore.
#[derive(Debug, Clone, PartialEq)]
pub enum Brand {
    Email,
    Uri,
    Integer,
    Port,
    Ip,
    Hostname,
    Uuid,
    Min(f64),
    Max(f64),
    MinLength(usize),
    MaxLength(usize),
    MinItems(usize),
    MaxItems(usize),
    UniqueItems,
    Default(WireValue),
    Custom {
        tag: String,
        data: Option<serde_json::Value>,
    },
}

impl Brand {
    /// The brand's tag name.
    pub fn tag(&self) -> &str {
        match self {
            Self::Email => "email",
            Self::Uri => "uri",
            Self::Integer => "integer",
            Self::Port => "port",
            Self::Ip => "ip",
            Self::Hostname => "hostname",
            Self::Uuid => "uuid",
            Self::Min(_) => "min",
            Self::Max(_) => "max",
            Self::MinLength(_) => "minLength",
            Self::MaxLength(_) => "maxLength",
            Self::MinItems(_) => "minItems",
            Self::MaxItems(_) => "maxItems",
            Self::UniqueItems => "uniqueItems",
            Self::Default(_) => "default",
            Self::Custom { tag, .. } => tag,
        }
    }

    /// Whether this brand is outside the fixed vocabulary.
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom { .. })
    }
}

/// Attributes of a refinement node: a base schema, a brand payload, and
/// optional decode/encode transforms (identity when absent).
#[derive(Clone)]
pub struct RefinementSchema {
    base: SchemaRef,
    brand: Brand,
    decode: Option<RefineDecodeFn>,
    encode: Option<RefineEncodeFn>,
}

impl RefinementSchema {
    /// A refinement of `base` carrying `brand`, with identity transforms.
    pub fn new(base: SchemaRef, brand: Brand) -> Self {
        Self {
            base,
            brand,
            decode: None,
            encode: None,
        }
    }

    /// Sets the decode transform.
    pub fn with_decode(
        mut self,
        decode: impl Fn(&Context, Value) -> Validated<Value> + Send + Sync + 'static,
    ) -> Self {
        self.decode = Some(Arc::new(decode));
        self
    }

    /// Sets the encode transform.
    pub fn with_encode(mut self, encode: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.encode = Some(Arc::new(encode));
        self
    }

    /// The refined base schema.
    pub fn base(&self) -> &SchemaRef {
        &self.base
    }

    /// The brand payload.
    pub fn brand(&self) -> &Brand {
        &self.brand
    }

    /// Runs the decode transform on a base-decoded value.
    pub fn apply_decode(&self, ctx: &Context, value: Value) -> Validated<Value> {
        match &self.decode {
            Some(decode) => decode(ctx, value),
            None => Ok(value),
        }
    }

    /// Runs the encode transform, mapping back to the base domain.
    pub fn apply_encode(&self, value: Value) -> Value {
        match &self.encode {
            Some(encode) => encode(value),
            None => value,
        }
    }
}

impl fmt::Debug for RefinementSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefinementSchema")
            .field("brand", &self.brand)
            .field("base", &self.base)
            .finish()
    }
}

// ============================================================================
// Schema nodes
// ============================================================================

/// The closed tagged union of resolved schema kinds.
#[derive(Debug, Clone)]
pub enum SchemaKind {
    /// Accepts and produces any value unchanged.
    Any,
    Primitive(NativeType),
    /// Ordered `(member name, member value)` pairs with distinct values.
    Enum(Vec<(String, Value)>),
    /// Decodes `Undefined` to `Undefined` without invoking the child.
    Optional(SchemaRef),
    /// Decodes `Null` to `Null` without invoking the child.
    Nullable(SchemaRef),
    List(SchemaRef),
    Dictionary(SchemaRef),
    /// Fixed-length ordered element schemas.
    Tuple(Vec<SchemaRef>),
    /// Ordered declared fields.
    Object(Vec<FieldSchema>),
    Refinement(RefinementSchema),
    /// Ordered `(variant tag, schema)` pairs with distinct tags.
    TaggedUnion(Vec<(String, SchemaRef)>),
}

/// A resolved, immutable schema node.
#[derive(Debug)]
pub struct SchemaNode {
    id: NodeId,
    kind: SchemaKind,
}

impl SchemaNode {
    /// Wraps a kind into a fresh node with its own identity.
    pub fn new(kind: SchemaKind) -> SchemaRef {
        Arc::new(Self {
            id: next_node_id(),
            kind,
        })
    }

    /// The node's stable identity.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The node's kind.
    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    /// The node's discriminant.
    pub fn schema_type(&self) -> SchemaType {
        match &self.kind {
            SchemaKind::Any => SchemaType::Any,
            SchemaKind::Primitive(_) => SchemaType::Primitive,
            SchemaKind::Enum(_) => SchemaType::Enum,
            SchemaKind::Optional(_) => SchemaType::Optional,
            SchemaKind::Nullable(_) => SchemaType::Nullable,
            SchemaKind::List(_) => SchemaType::List,
            SchemaKind::Dictionary(_) => SchemaType::Dictionary,
            SchemaKind::Tuple(_) => SchemaType::Tuple,
            SchemaKind::Object(_) => SchemaType::Object,
            SchemaKind::Refinement(_) => SchemaType::Refinement,
            SchemaKind::TaggedUnion(_) => SchemaType::TaggedUnion,
        }
    }

    // ------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------

    /// An `Any` node.
    pub fn any() -> SchemaRef {
        Self::new(SchemaKind::Any)
    }

    /// A primitive node for `native`.
    pub fn primitive(native: NativeType) -> SchemaRef {
        Self::new(SchemaKind::Primitive(native))
    }

    /// `Primitive(Boolean)`.
    pub fn boolean() -> SchemaRef {
        Self::primitive(NativeType::Boolean)
    }

    /// `Primitive(Number)`.
    pub fn number() -> SchemaRef {
        Self::primitive(NativeType::Number)
    }

    /// `Primitive(String)`.
    pub fn string() -> SchemaRef {
        Self::primitive(NativeType::String)
    }

    /// `Primitive(BigInt)`.
    pub fn bigint() -> SchemaRef {
        Self::primitive(NativeType::BigInt)
    }

    /// `Primitive(Date)`.
    pub fn date() -> SchemaRef {
        Self::primitive(NativeType::Date)
    }

    /// `Primitive(Bytes)`.
    pub fn bytes() -> SchemaRef {
        Self::primitive(NativeType::Bytes)
    }

    /// `Primitive(Regex)`.
    pub fn regex() -> SchemaRef {
        Self::primitive(NativeType::Regex)
    }

    /// `Primitive(Url)`.
    pub fn url() -> SchemaRef {
        Self::primitive(NativeType::Url)
    }

    /// `Primitive(Instant)`.
    pub fn instant() -> SchemaRef {
        Self::primitive(NativeType::Instant)
    }

    /// `Primitive(LocalDate)`.
    pub fn local_date() -> SchemaRef {
        Self::primitive(NativeType::LocalDate)
    }

    /// `Primitive(LocalTime)`.
    pub fn local_time() -> SchemaRef {
        Self::primitive(NativeType::LocalTime)
    }

    /// `Primitive(LocalDateTime)`.
    pub fn local_date_time() -> SchemaRef {
        Self::primitive(NativeType::LocalDateTime)
    }

    /// Wraps `child` so that absent input decodes to `Undefined`.
    pub fn optional(child: SchemaRef) -> SchemaRef {
        Self::new(SchemaKind::Optional(child))
    }

    /// Wraps `child` so that explicit null decodes to `Null`.
    pub fn nullable(child: SchemaRef) -> SchemaRef {
        Self::new(SchemaKind::Nullable(child))
    }

    /// A homogeneous sequence of `child`.
    pub fn list(child: SchemaRef) -> SchemaRef {
        Self::new(SchemaKind::List(child))
    }

    /// A string-keyed mapping of `child` values.
    pub fn dictionary(child: SchemaRef) -> SchemaRef {
        Self::new(SchemaKind::Dictionary(child))
    }

    /// A fixed-length heterogeneous sequence.
    pub fn tuple(children: impl IntoIterator<Item = SchemaRef>) -> SchemaRef {
        Self::new(SchemaKind::Tuple(children.into_iter().collect()))
    }

    /// An object node from ordered fields. Duplicate field keys are a
    /// definition error.
    pub fn object(fields: impl IntoIterator<Item = FieldSchema>) -> SchemaResult<SchemaRef> {
        let fields: Vec<FieldSchema> = fields.into_iter().collect();
        for (position, field) in fields.iter().enumerate() {
            if fields[..position].iter().any(|prior| prior.key() == field.key()) {
                return Err(SchemaError::DuplicateField(field.key().to_string()));
            }
        }
        Ok(Self::new(SchemaKind::Object(fields)))
    }

    /// An enum node from ordered `(name, value)` members. Duplicate names or
    /// values are a definition error: decode matches by value, so repeated
    /// values would be ambiguous.
    pub fn enumeration<K, V>(members: impl IntoIterator<Item = (K, V)>) -> SchemaResult<SchemaRef>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let members: Vec<(String, Value)> = members
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        for (position, (name, value)) in members.iter().enumerate() {
            if let Some((original, _)) = members[..position]
                .iter()
                .find(|(prior_name, prior_value)| prior_name == name || prior_value == value)
            {
                return Err(SchemaError::DuplicateEnumValue {
                    original: original.clone(),
                    duplicate: name.clone(),
                });
            }
        }
        Ok(Self::new(SchemaKind::Enum(members)))
    }

    /// A tagged union from ordered `(tag, schema)` variants. Duplicate tags
    /// are a definition error.
    pub fn tagged_union<K>(variants: impl IntoIterator<Item = (K, SchemaRef)>) -> SchemaResult<SchemaRef>
    where
        K: Into<String>,
    {
        let variants: Vec<(String, SchemaRef)> = variants
            .into_iter()
            .map(|(tag, schema)| (tag.into(), schema))
            .collect();
        for (position, (tag, _)) in variants.iter().enumerate() {
            if variants[..position].iter().any(|(prior, _)| prior == tag) {
                return Err(SchemaError::DuplicateUnionTag(tag.clone()));
            }
        }
        Ok(Self::new(SchemaKind::TaggedUnion(variants)))
    }

    /// A refinement node.
    pub fn refinement(refinement: RefinementSchema) -> SchemaRef {
        Self::new(SchemaKind::Refinement(refinement))
    }
}
