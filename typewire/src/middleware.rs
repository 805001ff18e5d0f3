//! Codec configuration and middleware chaining
//!
//! A [`Codec`] bundles a [`CodecConfig`] with an ordered list of
//! [`Middleware`]. At build time the middleware list is folded right to
//! left over the core engines, so the first-registered middleware is the
//! outermost wrapper and sees every call before the rest of the chain.
//!
//! The composed chain is installed as the engines' recursion callback,
//! which means middleware runs once per visited node, not once per decode
//! call. A middleware that rewrites wire input therefore applies at every
//! depth of the tree.

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use tracing::{debug, trace};

use crate::context::Context;
use crate::decode::{decode_node, decode_plain};
use crate::encode::{encode_node, encode_plain};
use crate::error::Validated;
use crate::node::SchemaRef;
use crate::value::Value;
use crate::wire::WireValue;

/// A composable decode entry point.
pub type DecodeFn = Arc<dyn Fn(&Context, &SchemaRef, &WireValue) -> Validated<Value> + Send + Sync>;

/// A composable encode entry point.
pub type EncodeFn = Arc<dyn Fn(&Context, &SchemaRef, &Value) -> WireValue + Send + Sync>;

type DecodeWrapper = Box<dyn Fn(DecodeFn) -> DecodeFn + Send + Sync>;
type EncodeWrapper = Box<dyn Fn(EncodeFn) -> EncodeFn + Send + Sync>;

/// Engine settings shared by decode and encode.
#[derive(Debug, Clone)]
pub struct CodecConfig {
    discriminant: String,
}

impl CodecConfig {
    /// A configuration with a custom tagged union discriminant field.
    pub fn new(discriminant: impl Into<String>) -> Self {
        Self {
            discriminant: discriminant.into(),
        }
    }

    /// The wire field name that selects a tagged union variant.
    pub fn discriminant(&self) -> &str {
        &self.discriminant
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self::new("type")
    }
}

/// One named middleware, optionally wrapping either engine direction.
pub struct Middleware {
    name: String,
    decode: Option<DecodeWrapper>,
    encode: Option<EncodeWrapper>,
}

impl Middleware {
    /// An inert middleware with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            decode: None,
            encode: None,
        }
    }

    /// The middleware's name, for diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Installs a decode wrapper. It receives the next decode function in
    /// the chain and must return a function of the same shape.
    pub fn on_decode(mut self, wrap: impl Fn(DecodeFn) -> DecodeFn + Send + Sync + 'static) -> Self {
        self.decode = Some(Box::new(wrap));
        self
    }

    /// Installs an encode wrapper.
    pub fn on_encode(mut self, wrap: impl Fn(EncodeFn) -> EncodeFn + Send + Sync + 'static) -> Self {
        self.encode = Some(Box::new(wrap));
        self
    }

    fn wrap_decode(&self, next: DecodeFn) -> DecodeFn {
        match &self.decode {
            Some(wrap) => wrap(next),
            None => next,
        }
    }

    fn wrap_encode(&self, next: EncodeFn) -> EncodeFn {
        match &self.encode {
            Some(wrap) => wrap(next),
            None => next,
        }
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware")
            .field("name", &self.name)
            .field("decode", &self.decode.is_some())
            .field("encode", &self.encode.is_some())
            .finish()
    }
}

struct CodecInner {
    config: CodecConfig,
    decode_chain: OnceLock<DecodeFn>,
    encode_chain: OnceLock<EncodeFn>,
}

impl CodecInner {
    /// Core decode step: handles the current node and recurses through the
    /// installed chain so middleware observes every child visit.
    fn decode_step(&self, ctx: &Context, schema: &SchemaRef, wire: &WireValue) -> Validated<Value> {
        match self.decode_chain.get() {
            Some(chain) => {
                let recurse =
                    |child_ctx: &Context, child: &SchemaRef, value: &WireValue| {
                        chain(child_ctx, child, value)
                    };
                decode_node(&self.config, &recurse, ctx, schema, wire)
            }
            None => decode_plain(&self.config, ctx, schema, wire),
        }
    }

    fn encode_step(&self, ctx: &Context, schema: &SchemaRef, value: &Value) -> WireValue {
        match self.encode_chain.get() {
            Some(chain) => {
                let recurse = |child_ctx: &Context, child: &SchemaRef, item: &Value| {
                    chain(child_ctx, child, item)
                };
                encode_node(&self.config, &recurse, ctx, schema, value)
            }
            None => encode_plain(&self.config, ctx, schema, value),
        }
    }
}

/// A decode/encode pair with a fixed configuration and middleware chain.
#[derive(Clone)]
pub struct Codec {
    inner: Arc<CodecInner>,
}

impl Codec {
    /// A codec with the default configuration and no middleware.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a codec.
    pub fn builder() -> CodecBuilder {
        CodecBuilder::default()
    }

    /// The codec's configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.inner.config
    }

    /// Decodes from the root context.
    pub fn decode(&self, schema: &SchemaRef, wire: &WireValue) -> Validated<Value> {
        self.decode_at(&Context::root(), schema, wire)
    }

    /// Decodes from an explicit context.
    pub fn decode_at(&self, ctx: &Context, schema: &SchemaRef, wire: &WireValue) -> Validated<Value> {
        trace!(path = %ctx, "codec decode");
        match self.inner.decode_chain.get() {
            Some(chain) => chain(ctx, schema, wire),
            None => decode_plain(&self.inner.config, ctx, schema, wire),
        }
    }

    /// Encodes from the root context.
    pub fn encode(&self, schema: &SchemaRef, value: &Value) -> WireValue {
        self.encode_at(&Context::root(), schema, value)
    }

    /// Encodes from an explicit context.
    pub fn encode_at(&self, ctx: &Context, schema: &SchemaRef, value: &Value) -> WireValue {
        trace!(path = %ctx, "codec encode");
        match self.inner.encode_chain.get() {
            Some(chain) => chain(ctx, schema, value),
            None => encode_plain(&self.inner.config, ctx, schema, value),
        }
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Accumulates configuration and middleware for a [`Codec`].
#[derive(Default)]
pub struct CodecBuilder {
    config: CodecConfig,
    middleware: Vec<Middleware>,
}

impl CodecBuilder {
    /// Overrides the tagged union discriminant field name.
    pub fn discriminant(mut self, name: impl Into<String>) -> Self {
        self.config = CodecConfig::new(name);
        self
    }

    /// Appends a middleware. Earlier registrations wrap later ones.
    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Folds the middleware into composed chains and finishes the codec.
    pub fn build(self) -> Codec {
        let inner = Arc::new(CodecInner {
            config: self.config,
            decode_chain: OnceLock::new(),
            encode_chain: OnceLock::new(),
        });

        // The core closures hold a weak handle: the chains live inside
        // the codec they recurse into, so a strong handle would leak the
        // whole cycle.
        let decode_core: DecodeFn = {
            let handle: Weak<CodecInner> = Arc::downgrade(&inner);
            let config = inner.config.clone();
            Arc::new(move |ctx, schema, wire| match handle.upgrade() {
                Some(codec) => codec.decode_step(ctx, schema, wire),
                None => decode_plain(&config, ctx, schema, wire),
            })
        };
        let encode_core: EncodeFn = {
            let handle: Weak<CodecInner> = Arc::downgrade(&inner);
            let config = inner.config.clone();
            Arc::new(move |ctx, schema, value| match handle.upgrade() {
                Some(codec) => codec.encode_step(ctx, schema, value),
                None => encode_plain(&config, ctx, schema, value),
            })
        };

        let decode_chain = self
            .middleware
            .iter()
            .rev()
            .fold(decode_core, |next, middleware| middleware.wrap_decode(next));
        let encode_chain = self
            .middleware
            .iter()
            .rev()
            .fold(encode_core, |next, middleware| middleware.wrap_encode(next));
        let _ = inner.decode_chain.set(decode_chain);
        let _ = inner.encode_chain.set(encode_chain);

        debug!(
            middleware = self.middleware.len(),
            discriminant = %inner.config.discriminant,
            "built codec"
        );
        Codec { inner }
    }
}

impl fmt::Debug for CodecBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecBuilder")
            .field("config", &self.config)
            .field("middleware", &self.middleware)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{FieldSchema, SchemaNode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn tracing_middleware(log: Arc<Mutex<Vec<String>>>, name: &str) -> Middleware {
        let label = name.to_string();
        Middleware::named(name).on_decode(move |next| {
            let log = log.clone();
            let label = label.clone();
            Arc::new(move |ctx, schema, wire| {
                log.lock().unwrap().push(label.clone());
                next(ctx, schema, wire)
            })
        })
    }

    #[test]
    fn first_registered_middleware_runs_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let codec = Codec::builder()
            .middleware(tracing_middleware(log.clone(), "outer"))
            .middleware(tracing_middleware(log.clone(), "inner"))
            .build();
        let schema = SchemaNode::string();
        codec.decode(&schema, &WireValue::from("x")).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["outer".to_string(), "inner".to_string()]);
    }

    #[test]
    fn middleware_observes_every_node_visit() {
        let visits = Arc::new(AtomicUsize::new(0));
        let counter = {
            let visits = visits.clone();
            Middleware::named("count").on_decode(move |next| {
                let visits = visits.clone();
                Arc::new(move |ctx, schema, wire| {
                    visits.fetch_add(1, Ordering::SeqCst);
                    next(ctx, schema, wire)
                })
            })
        };
        let codec = Codec::builder().middleware(counter).build();
        let schema = SchemaNode::object([
            FieldSchema::new("a", SchemaNode::string()),
            FieldSchema::new("b", SchemaNode::number()),
        ])
        .unwrap();
        let wire = WireValue::object([("a", WireValue::from("x")), ("b", WireValue::from(1.0))]);
        codec.decode(&schema, &wire).unwrap();
        // Root object plus its two fields.
        assert_eq!(visits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn rewriting_middleware_applies_at_depth() {
        let blank_to_absent = Middleware::named("blank-to-absent").on_decode(|next| {
            Arc::new(move |ctx, schema, wire| {
                let wire = match wire {
                    WireValue::String(text) if text.is_empty() => WireValue::Undefined,
                    other => other.clone(),
                };
                next(ctx, schema, &wire)
            })
        });
        let codec = Codec::builder().middleware(blank_to_absent).build();
        let schema = SchemaNode::object([FieldSchema::new(
            "note",
            SchemaNode::optional(SchemaNode::string()),
        )])
        .unwrap();
        let wire = WireValue::object([("note", WireValue::from(""))]);
        let decoded = codec.decode(&schema, &wire).unwrap();
        assert_eq!(
            decoded,
            Value::object([("note", Value::Undefined)])
        );
    }

    #[test]
    fn encode_middleware_wraps_the_encode_direction() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let spy = {
            let log = log.clone();
            Middleware::named("spy").on_encode(move |next| {
                let log = log.clone();
                Arc::new(move |ctx: &Context, schema: &SchemaRef, value: &Value| {
                    log.lock().unwrap().push(ctx.to_string());
                    next(ctx, schema, value)
                })
            })
        };
        let codec = Codec::builder().middleware(spy).build();
        let schema = SchemaNode::list(SchemaNode::string());
        let value = Value::Array(vec![Value::String("a".into())]);
        codec.encode(&schema, &value);
        assert_eq!(*log.lock().unwrap(), vec!["$".to_string(), "0".to_string()]);
    }

    #[test]
    fn custom_discriminants_flow_through_both_engines() {
        let codec = Codec::builder().discriminant("kind").build();
        let schema = SchemaNode::tagged_union([
            ("circle", SchemaNode::number()),
            ("label", SchemaNode::string()),
        ])
        .unwrap();
        let wire = WireValue::object([
            ("kind", WireValue::from("circle")),
            ("circle", WireValue::from("3")),
        ]);
        let decoded = codec.decode(&schema, &wire).unwrap();
        assert_eq!(
            decoded,
            Value::object([
                ("kind", Value::String("circle".into())),
                ("circle", Value::Number(3.0)),
            ])
        );
        let round = codec.encode(&schema, &decoded);
        assert_eq!(
            round,
            WireValue::object([
                ("kind", WireValue::from("circle")),
                ("circle", WireValue::from(3.0)),
            ])
        );
    }

    #[test]
    fn a_plain_codec_matches_the_free_functions() {
        let codec = Codec::new();
        let schema = SchemaNode::boolean();
        assert_eq!(
            codec.decode(&schema, &WireValue::from("1")).unwrap(),
            crate::decode::decode(&schema, &WireValue::from("1")).unwrap()
        );
    }
}
