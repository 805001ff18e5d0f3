//! Schema resolution
//!
//! [`resolve_schema`] turns a loose schema expression ([`SchemaLike`]) into
//! a resolved [`SchemaRef`]. Each expression form has exactly one rule:
//!
//! 1. `Tag` — a primitive tag name becomes its `Primitive` node.
//! 2. `Type` — a registered marker type becomes an `Object` node built from
//!    its registry record. Field children stay behind their thunks.
//! 3. `Items` — the array shorthand: exactly one element becomes a `List`
//!    of the resolved element, any other length is a definition error.
//! 4. `Node` — an already-resolved node passes through unchanged.
//! 5. `Shape` — an inline key/expression map becomes an `Object` node with
//!    every child resolved eagerly.
//!
//! Resolution memoizes on identity, not structure. A given tag, marker
//! type, or shared `Items`/`Shape` allocation resolves to the same node
//! (pointer-equal) every time, which keeps identity-keyed side tables in
//! the generator backends coherent. Two structurally equal expressions
//! built separately resolve to distinct nodes on purpose.
//!
//! Cache writes are first insert wins and only successful resolutions are
//! stored, so a failed lookup of a not-yet-registered type does not poison
//! later calls.

use std::any::TypeId;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tracing::debug;

use crate::error::{SchemaError, SchemaResult};
use crate::node::{FieldSchema, NativeType, SchemaNode, SchemaRef};
use crate::registry::{TypeHandle, TypeRegistry};

/// A schema expression accepted by [`resolve_schema`].
#[derive(Debug, Clone)]
pub enum SchemaLike {
    /// A primitive tag name such as `"string"` or `"localDate"`.
    Tag(String),
    /// A marker type registered through [`crate::describe`].
    Type(TypeHandle),
    /// An already-resolved node.
    Node(SchemaRef),
    /// The single-element array shorthand for lists.
    Items(Arc<Vec<SchemaLike>>),
    /// An inline object shape.
    Shape(Arc<Vec<(String, SchemaLike)>>),
}

impl SchemaLike {
    /// The array shorthand over `entries`.
    pub fn items<S>(entries: impl IntoIterator<Item = S>) -> Self
    where
        S: Into<SchemaLike>,
    {
        Self::Items(Arc::new(entries.into_iter().map(Into::into).collect()))
    }

    /// An inline shape over `(key, expression)` entries.
    pub fn shape<K, S>(entries: impl IntoIterator<Item = (K, S)>) -> Self
    where
        K: Into<String>,
        S: Into<SchemaLike>,
    {
        Self::Shape(Arc::new(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        ))
    }
}

impl From<&str> for SchemaLike {
    fn from(tag: &str) -> Self {
        Self::Tag(tag.to_string())
    }
}

impl From<String> for SchemaLike {
    fn from(tag: String) -> Self {
        Self::Tag(tag)
    }
}

impl From<NativeType> for SchemaLike {
    fn from(native: NativeType) -> Self {
        Self::Tag(native.as_str().to_string())
    }
}

impl From<TypeHandle> for SchemaLike {
    fn from(handle: TypeHandle) -> Self {
        Self::Type(handle)
    }
}

impl From<SchemaRef> for SchemaLike {
    fn from(node: SchemaRef) -> Self {
        Self::Node(node)
    }
}

/// Resolves a schema expression to its node.
pub fn resolve_schema(like: impl Into<SchemaLike>) -> SchemaResult<SchemaRef> {
    resolve(&like.into())
}

fn resolve(like: &SchemaLike) -> SchemaResult<SchemaRef> {
    match like {
        SchemaLike::Tag(tag) => resolve_tag(tag),
        SchemaLike::Type(handle) => resolve_type(*handle),
        SchemaLike::Node(node) => Ok(node.clone()),
        SchemaLike::Items(items) => resolve_items(items),
        SchemaLike::Shape(shape) => resolve_shape(shape),
    }
}

/// The resolved schema for a registered marker type.
///
/// Convenience for lazy field closures, where a `Result` cannot surface.
///
/// # Panics
///
/// Panics if `T` was never registered or its record cannot form a valid
/// object node. Use [`resolve_schema`] with a [`TypeHandle`] to handle the
/// error instead.
pub fn schema_of<T: 'static>() -> SchemaRef {
    match resolve_schema(TypeHandle::of::<T>()) {
        Ok(node) => node,
        Err(error) => panic!("unresolvable schema for {}: {error}", TypeHandle::of::<T>().name()),
    }
}

// ============================================================================
// Memoized rule implementations
// ============================================================================

/// A memoized resolution keyed by the address of its source allocation.
/// Retaining the source keeps the address from being reused for an
/// unrelated expression.
struct CachedNode<T> {
    _owner: Arc<T>,
    node: SchemaRef,
}

fn primitive_cache() -> &'static DashMap<NativeType, SchemaRef> {
    static CACHE: OnceLock<DashMap<NativeType, SchemaRef>> = OnceLock::new();
    CACHE.get_or_init(DashMap::new)
}

fn type_cache() -> &'static DashMap<TypeId, SchemaRef> {
    static CACHE: OnceLock<DashMap<TypeId, SchemaRef>> = OnceLock::new();
    CACHE.get_or_init(DashMap::new)
}

fn items_cache() -> &'static DashMap<usize, CachedNode<Vec<SchemaLike>>> {
    static CACHE: OnceLock<DashMap<usize, CachedNode<Vec<SchemaLike>>>> = OnceLock::new();
    CACHE.get_or_init(DashMap::new)
}

fn shape_cache() -> &'static DashMap<usize, CachedNode<Vec<(String, SchemaLike)>>> {
    static CACHE: OnceLock<DashMap<usize, CachedNode<Vec<(String, SchemaLike)>>>> = OnceLock::new();
    CACHE.get_or_init(DashMap::new)
}

fn resolve_tag(tag: &str) -> SchemaResult<SchemaRef> {
    let native: NativeType = tag.parse()?;
    Ok(primitive_cache()
        .entry(native)
        .or_insert_with(|| SchemaNode::primitive(native))
        .clone())
}

fn resolve_type(handle: TypeHandle) -> SchemaResult<SchemaRef> {
    if let Some(node) = type_cache().get(&handle.type_id()) {
        return Ok(node.clone());
    }
    let record = TypeRegistry::global().lookup(handle)?;
    let node = SchemaNode::object(record.fields().iter().cloned())?;
    debug!(type_name = %handle.name(), "resolved registered type to object schema");
    Ok(type_cache()
        .entry(handle.type_id())
        .or_insert(node)
        .clone())
}

fn resolve_items(items: &Arc<Vec<SchemaLike>>) -> SchemaResult<SchemaRef> {
    let key = Arc::as_ptr(items) as usize;
    if let Some(cached) = items_cache().get(&key) {
        return Ok(cached.node.clone());
    }
    let node = match items.as_slice() {
        [element] => SchemaNode::list(resolve(element)?),
        other => return Err(SchemaError::ArrayShorthand(other.len())),
    };
    Ok(items_cache()
        .entry(key)
        .or_insert_with(|| CachedNode {
            _owner: items.clone(),
            node,
        })
        .node
        .clone())
}

fn resolve_shape(shape: &Arc<Vec<(String, SchemaLike)>>) -> SchemaResult<SchemaRef> {
    let key = Arc::as_ptr(shape) as usize;
    if let Some(cached) = shape_cache().get(&key) {
        return Ok(cached.node.clone());
    }
    let mut fields = Vec::with_capacity(shape.len());
    for (field_key, child) in shape.iter() {
        fields.push(FieldSchema::new(field_key.clone(), resolve(child)?));
    }
    let node = SchemaNode::object(fields)?;
    Ok(shape_cache()
        .entry(key)
        .or_insert_with(|| CachedNode {
            _owner: shape.clone(),
            node,
        })
        .node
        .clone())
}
