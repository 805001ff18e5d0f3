//! Type metadata registry
//!
//! Rust has no decorator metadata to mine at runtime, so object layouts are
//! declared explicitly: [`describe`] opens a builder for a marker type, each
//! `field` call appends one [`FieldSchema`], and `register` files the
//! finished record in the process-wide registry. The resolver later turns a
//! [`TypeHandle`] into an `Object` node by looking the record up here.
//!
//! Registration is first write wins. A second `register` for the same
//! marker type fails with [`SchemaError::DuplicateType`] instead of
//! replacing the record, so schemas already resolved against the first
//! record stay truthful.

use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::error::{SchemaError, SchemaResult};
use crate::node::{FieldSchema, SchemaRef};

/// Identifies a registered (or registerable) marker type.
///
/// Carries the `TypeId` used as the registry key and the bare type name
/// used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeHandle {
    type_id: TypeId,
    name: &'static str,
}

impl TypeHandle {
    /// The handle for marker type `T`.
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: short_type_name::<T>(),
        }
    }

    /// The bare type name, without module path.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The underlying `TypeId`.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

/// A registered object layout: the type's name and its ordered fields.
#[derive(Debug)]
pub struct TypeRecord {
    name: String,
    fields: Vec<FieldSchema>,
}

impl TypeRecord {
    /// The registered type's bare name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared fields, in declaration order.
    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }
}

/// The process-wide mapping from marker `TypeId`s to their records.
pub struct TypeRegistry {
    types: DashMap<TypeId, Arc<TypeRecord>>,
}

impl TypeRegistry {
    fn new() -> Self {
        Self {
            types: DashMap::new(),
        }
    }

    /// The shared global registry.
    pub fn global() -> &'static TypeRegistry {
        static REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();
        REGISTRY.get_or_init(TypeRegistry::new)
    }

    /// Looks up the record for `handle`.
    pub fn lookup(&self, handle: TypeHandle) -> SchemaResult<Arc<TypeRecord>> {
        self.types
            .get(&handle.type_id)
            .map(|record| record.clone())
            .ok_or_else(|| SchemaError::UnregisteredType(handle.name.to_string()))
    }

    /// Whether `handle` has a record.
    pub fn is_registered(&self, handle: TypeHandle) -> bool {
        self.types.contains_key(&handle.type_id)
    }

    fn insert(&self, handle: TypeHandle, record: TypeRecord) -> SchemaResult<()> {
        match self.types.entry(handle.type_id) {
            Entry::Occupied(_) => Err(SchemaError::DuplicateType(handle.name.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(record));
                Ok(())
            }
        }
    }
}

/// Opens a field builder for marker type `T`.
///
/// ```rust,ignore
/// struct User;
///
/// let user = describe::<User>()
///     .field("id", SchemaNode::string())
///     .field("age", SchemaNode::number())
///     .register()?;
/// ```
pub fn describe<T: 'static>() -> TypeDescriptor<T> {
    TypeDescriptor {
        handle: TypeHandle::of::<T>(),
        fields: Vec::new(),
        _marker: PhantomData,
    }
}

/// Accumulates field declarations for one marker type until `register`.
pub struct TypeDescriptor<T> {
    handle: TypeHandle,
    fields: Vec<FieldSchema>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> TypeDescriptor<T> {
    /// Appends a field with an eagerly resolved schema.
    pub fn field(mut self, key: impl Into<String>, schema: SchemaRef) -> Self {
        self.fields.push(FieldSchema::new(key, schema));
        self
    }

    /// Appends a field whose external wire key differs from its key.
    pub fn field_as(
        mut self,
        key: impl Into<String>,
        wire_key: impl Into<String>,
        schema: SchemaRef,
    ) -> Self {
        self.fields
            .push(FieldSchema::new(key, schema).with_wire_key(wire_key));
        self
    }

    /// Appends a field with a lazily produced schema, for self-referential
    /// and mutually recursive types.
    pub fn lazy_field(
        mut self,
        key: impl Into<String>,
        init: impl Fn() -> SchemaRef + Send + Sync + 'static,
    ) -> Self {
        self.fields.push(FieldSchema::lazy(key, init));
        self
    }

    /// Appends a lazy field with a renamed wire key.
    pub fn lazy_field_as(
        mut self,
        key: impl Into<String>,
        wire_key: impl Into<String>,
        init: impl Fn() -> SchemaRef + Send + Sync + 'static,
    ) -> Self {
        self.fields
            .push(FieldSchema::lazy(key, init).with_wire_key(wire_key));
        self
    }

    /// Files the record in the global registry and returns the handle.
    ///
    /// Fails if no fields were declared, if two fields share a key, or if
    /// `T` already has a record.
    pub fn register(self) -> SchemaResult<TypeHandle> {
        if self.fields.is_empty() {
            return Err(SchemaError::EmptyType(self.handle.name.to_string()));
        }
        for (position, field) in self.fields.iter().enumerate() {
            if self.fields[..position]
                .iter()
                .any(|prior| prior.key() == field.key())
            {
                return Err(SchemaError::DuplicateField(field.key().to_string()));
            }
        }
        let field_count = self.fields.len();
        TypeRegistry::global().insert(
            self.handle,
            TypeRecord {
                name: self.handle.name.to_string(),
                fields: self.fields,
            },
        )?;
        debug!(
            type_name = %self.handle.name,
            fields = field_count,
            "registered type description"
        );
        Ok(self.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::SchemaNode;

    #[test]
    fn registered_records_can_be_looked_up() {
        struct Invoice;
        let handle = describe::<Invoice>()
            .field("id", SchemaNode::string())
            .field("total", SchemaNode::number())
            .register()
            .unwrap();
        assert_eq!(handle.name(), "Invoice");
        let record = TypeRegistry::global().lookup(handle).unwrap();
        assert_eq!(record.name(), "Invoice");
        assert_eq!(record.fields().len(), 2);
        assert_eq!(record.fields()[0].key(), "id");
    }

    #[test]
    fn lookup_of_an_unregistered_type_fails() {
        struct NeverRegistered;
        let handle = TypeHandle::of::<NeverRegistered>();
        assert!(!TypeRegistry::global().is_registered(handle));
        assert_eq!(
            TypeRegistry::global().lookup(handle).unwrap_err(),
            SchemaError::UnregisteredType("NeverRegistered".into())
        );
    }

    #[test]
    fn empty_descriptions_are_rejected() {
        struct Hollow;
        assert_eq!(
            describe::<Hollow>().register().unwrap_err(),
            SchemaError::EmptyType("Hollow".into())
        );
    }

    #[test]
    fn duplicate_field_keys_are_rejected() {
        struct Clash;
        let result = describe::<Clash>()
            .field("name", SchemaNode::string())
            .field("name", SchemaNode::string())
            .register();
        assert_eq!(result.unwrap_err(), SchemaError::DuplicateField("name".into()));
    }

    #[test]
    fn a_second_registration_for_the_same_type_fails() {
        struct Settled;
        describe::<Settled>()
            .field("value", SchemaNode::number())
            .register()
            .unwrap();
        let second = describe::<Settled>()
            .field("value", SchemaNode::string())
            .register();
        assert_eq!(second.unwrap_err(), SchemaError::DuplicateType("Settled".into()));
    }

    #[test]
    fn renamed_wire_keys_are_recorded() {
        struct Renamed;
        let handle = describe::<Renamed>()
            .field_as("createdAt", "created_at", SchemaNode::date())
            .register()
            .unwrap();
        let record = TypeRegistry::global().lookup(handle).unwrap();
        assert_eq!(record.fields()[0].key(), "createdAt");
        assert_eq!(record.fields()[0].wire_key(), "created_at");
    }

    #[test]
    fn lazy_fields_do_not_resolve_at_registration() {
        struct TreeNode;
        let handle = describe::<TreeNode>()
            .field("label", SchemaNode::string())
            .lazy_field("parent", || SchemaNode::optional(SchemaNode::string()))
            .register()
            .unwrap();
        let record = TypeRegistry::global().lookup(handle).unwrap();
        let parent = record.fields()[1].schema();
        assert!(matches!(
            parent.kind(),
            crate::node::SchemaKind::Optional(_)
        ));
    }
}
