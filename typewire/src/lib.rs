//! # typewire
//!
//! Runtime schema descriptors with an accumulating decode/encode engine
//! over a JSON-like wire model.
//!
//! A schema is an immutable tree of [`SchemaNode`]s built from a closed set
//! of kinds: primitives, enums, optionals, nullables, lists, dictionaries,
//! tuples, objects, refinements, and tagged unions. Decoding checks and
//! coerces untyped [`WireValue`] input into a typed [`Value`], reporting
//! every problem in one pass with full paths; encoding is the total mirror
//! that lowers typed values back to canonical wire form.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use typewire::{decode, encode, FieldSchema, SchemaNode, WireValue};
//!
//! let user = SchemaNode::object([
//!     FieldSchema::new("id", typewire::well_known::uuid()),
//!     FieldSchema::new("name", SchemaNode::string()),
//!     FieldSchema::new("signedUpAt", SchemaNode::optional(SchemaNode::date())),
//! ])?;
//!
//! match decode(&user, &wire_input) {
//!     Ok(value) => println!("decoded: {value:?}"),
//!     Err(errors) => {
//!         for error in errors {
//!             eprintln!("{error}");
//!         }
//!     }
//! }
//! ```
//!
//! ## Registered Types
//!
//! Object layouts can be declared once against a marker type and resolved
//! anywhere, including recursively:
//!
//! ```rust,ignore
//! use typewire::{describe, resolve_schema, schema_of, SchemaNode};
//!
//! struct Category;
//!
//! describe::<Category>()
//!     .field("name", SchemaNode::string())
//!     .lazy_field("parent", || SchemaNode::optional(schema_of::<Category>()))
//!     .register()?;
//!
//! let schema = resolve_schema(typewire::TypeHandle::of::<Category>())?;
//! ```
//!
//! ## Middleware
//!
//! A [`Codec`] composes middleware around both engines. The chain is also
//! the recursion path, so a middleware sees every node visit:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use typewire::{Codec, Middleware, WireValue};
//!
//! let codec = Codec::builder()
//!     .middleware(Middleware::named("blank-to-absent").on_decode(|next| {
//!         Arc::new(move |ctx, schema, wire| {
//!             let wire = match wire {
//!                 WireValue::String(s) if s.is_empty() => WireValue::Undefined,
//!                 other => other.clone(),
//!             };
//!             next(ctx, schema, &wire)
//!         })
//!     }))
//!     .build();
//! ```

mod context;
mod decode;
mod encode;
mod error;
mod middleware;
mod node;
mod registry;
mod resolve;
mod value;
pub mod well_known;
mod wire;

#[cfg(test)]
mod tests;

pub use context::{Context, PathSegment};
pub use decode::{decode, decode_plain};
pub use encode::{encode, encode_plain};
pub use error::{SchemaError, SchemaResult, Validated, ValidationError};
pub use middleware::{Codec, CodecBuilder, CodecConfig, DecodeFn, EncodeFn, Middleware};
pub use node::{
    Brand, FieldSchema, NativeType, NodeId, RefineDecodeFn, RefineEncodeFn, RefinementSchema,
    SchemaKind, SchemaNode, SchemaRef, SchemaThunk, SchemaType,
};
pub use registry::{describe, TypeDescriptor, TypeHandle, TypeRecord, TypeRegistry};
pub use resolve::{resolve_schema, schema_of, SchemaLike};
pub use value::Value;
pub use wire::WireValue;

/// Common imports for building and using schemas.
pub mod prelude {
    pub use crate::{
        decode, describe, encode, resolve_schema, schema_of, Codec, Context, FieldSchema,
        Middleware, SchemaKind, SchemaLike, SchemaNode, SchemaRef, TypeHandle, Validated,
        ValidationError, Value, WireValue,
    };
}
