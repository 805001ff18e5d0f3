//! The encode engine
//!
//! Encoding mirrors decoding structurally but is total: it assumes its
//! input already satisfies the schema and never reports failures. Typed
//! values collapse to their canonical wire forms (big integers to decimal
//! strings, timestamps to ISO 8601, byte buffers to base64). A value
//! outside the schema's domain falls back to its structural wire form
//! rather than being rejected.
//!
//! As with decode, every child encode goes through a recursion callback so
//! an installed middleware chain observes the full traversal.

use std::collections::BTreeMap;

use tracing::trace;

use crate::context::Context;
use crate::middleware::CodecConfig;
use crate::node::{FieldSchema, SchemaKind, SchemaNode, SchemaRef};
use crate::value::Value;
use crate::wire::WireValue;

/// Recursion callback used for child encodes.
pub(crate) type EncodeRecurse<'a> = &'a dyn Fn(&Context, &SchemaRef, &Value) -> WireValue;

static UNDEFINED_VALUE: Value = Value::Undefined;

/// Encodes `value` against `schema` from the root context, without
/// middleware and with the default codec configuration.
pub fn encode(schema: &SchemaRef, value: &Value) -> WireValue {
    encode_plain(&CodecConfig::default(), &Context::root(), schema, value)
}

/// Encodes without middleware, from an explicit context and configuration.
pub fn encode_plain(
    config: &CodecConfig,
    ctx: &Context,
    schema: &SchemaRef,
    value: &Value,
) -> WireValue {
    let recurse = |child_ctx: &Context, child: &SchemaRef, item: &Value| {
        encode_plain(config, child_ctx, child, item)
    };
    encode_node(config, &recurse, ctx, schema, value)
}

/// Single encode step for one node.
pub(crate) fn encode_node(
    config: &CodecConfig,
    recurse: EncodeRecurse<'_>,
    ctx: &Context,
    schema: &SchemaNode,
    value: &Value,
) -> WireValue {
    trace!(path = %ctx, schema = %schema.schema_type(), input = %value.kind(), "encode");
    match schema.kind() {
        SchemaKind::Any | SchemaKind::Primitive(_) | SchemaKind::Enum(_) => value.to_wire(),
        SchemaKind::Optional(child) => match value {
            Value::Undefined => WireValue::Undefined,
            other => recurse(ctx, child, other),
        },
        SchemaKind::Nullable(child) => match value {
            Value::Null => WireValue::Null,
            other => recurse(ctx, child, other),
        },
        SchemaKind::List(child) => match value {
            Value::Array(items) => WireValue::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| recurse(&ctx.child(index), child, item))
                    .collect(),
            ),
            other => other.to_wire(),
        },
        SchemaKind::Dictionary(child) => match value {
            Value::Object(entries) => WireValue::Object(
                entries
                    .iter()
                    .map(|(key, item)| {
                        (key.clone(), recurse(&ctx.child(key.as_str()), child, item))
                    })
                    .filter(|(_, encoded)| !encoded.is_undefined())
                    .collect(),
            ),
            other => other.to_wire(),
        },
        SchemaKind::Tuple(children) => match value {
            Value::Array(items) => WireValue::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| match children.get(index) {
                        Some(child) => recurse(&ctx.child(index), child, item),
                        None => item.to_wire(),
                    })
                    .collect(),
            ),
            other => other.to_wire(),
        },
        SchemaKind::Object(fields) => encode_object(recurse, ctx, fields, value),
        SchemaKind::Refinement(refinement) => {
            let base_value = refinement.apply_encode(value.clone());
            recurse(ctx, refinement.base(), &base_value)
        }
        SchemaKind::TaggedUnion(variants) => {
            encode_tagged_union(config, recurse, ctx, variants, value)
        }
    }
}

fn encode_object(
    recurse: EncodeRecurse<'_>,
    ctx: &Context,
    fields: &[FieldSchema],
    value: &Value,
) -> WireValue {
    let Value::Object(entries) = value else {
        return value.to_wire();
    };
    let mut wire = BTreeMap::new();
    for field in fields {
        let item = entries.get(field.key()).unwrap_or(&UNDEFINED_VALUE);
        let encoded = recurse(&ctx.child(field.key()), &field.schema(), item);
        // Fields that encode to undefined are left off the wire entirely.
        if !encoded.is_undefined() {
            wire.insert(field.wire_key().to_string(), encoded);
        }
    }
    WireValue::Object(wire)
}

fn encode_tagged_union(
    config: &CodecConfig,
    recurse: EncodeRecurse<'_>,
    ctx: &Context,
    variants: &[(String, SchemaRef)],
    value: &Value,
) -> WireValue {
    let Value::Object(entries) = value else {
        return value.to_wire();
    };
    let Some(Value::String(tag)) = entries.get(config.discriminant()) else {
        return value.to_wire();
    };
    let Some((_, variant)) = variants.iter().find(|(candidate, _)| candidate == tag) else {
        return value.to_wire();
    };
    let payload = entries.get(tag.as_str()).unwrap_or(&UNDEFINED_VALUE);
    let encoded = recurse(&ctx.child(tag.as_str()), variant, payload);
    let mut wire = BTreeMap::new();
    wire.insert(
        config.discriminant().to_string(),
        WireValue::String(tag.clone()),
    );
    if !encoded.is_undefined() {
        wire.insert(tag.clone(), encoded);
    }
    WireValue::Object(wire)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use crate::node::{Brand, RefinementSchema, SchemaNode};
    use chrono::{DateTime, Utc};

    fn wire_object(entries: &[(&str, WireValue)]) -> WireValue {
        WireValue::object(entries.iter().map(|(key, value)| (*key, value.clone())))
    }

    #[test]
    fn primitives_encode_to_their_canonical_forms() {
        let at = DateTime::<Utc>::from_timestamp_millis(1_577_836_800_123).unwrap();
        assert_eq!(
            encode(&SchemaNode::date(), &Value::Date(at)),
            WireValue::from("2020-01-01T00:00:00.123Z")
        );
        assert_eq!(
            encode(&SchemaNode::bigint(), &Value::BigInt(-42)),
            WireValue::from("-42")
        );
        assert_eq!(
            encode(&SchemaNode::bytes(), &Value::Bytes(b"hello".to_vec())),
            WireValue::from("aGVsbG8=")
        );
        assert_eq!(
            encode(&SchemaNode::number(), &Value::Number(2.5)),
            WireValue::from(2.5)
        );
    }

    #[test]
    fn optional_and_nullable_pass_their_markers_through() {
        let optional = SchemaNode::optional(SchemaNode::string());
        assert_eq!(encode(&optional, &Value::Undefined), WireValue::Undefined);
        assert_eq!(
            encode(&optional, &Value::String("here".into())),
            WireValue::from("here")
        );
        let nullable = SchemaNode::nullable(SchemaNode::string());
        assert_eq!(encode(&nullable, &Value::Null), WireValue::Null);
    }

    #[test]
    fn objects_emit_wire_keys_and_omit_undefined_fields() {
        let schema = SchemaNode::object([
            FieldSchema::new("createdAt", SchemaNode::date()).with_wire_key("created_at"),
            FieldSchema::new("note", SchemaNode::optional(SchemaNode::string())),
        ])
        .unwrap();
        let at = DateTime::<Utc>::from_timestamp_millis(0).unwrap();
        let value = Value::object([
            ("createdAt", Value::Date(at)),
            ("note", Value::Undefined),
        ]);
        let wire = encode(&schema, &value);
        assert_eq!(
            wire,
            wire_object(&[("created_at", WireValue::from("1970-01-01T00:00:00.000Z"))])
        );
    }

    #[test]
    fn tuples_encode_positionally_and_pass_extras_through() {
        let schema = SchemaNode::tuple([SchemaNode::bigint(), SchemaNode::string()]);
        let value = Value::Array(vec![
            Value::BigInt(7),
            Value::String("x".into()),
            Value::Bool(true),
        ]);
        assert_eq!(
            encode(&schema, &value),
            WireValue::Array(vec![
                WireValue::from("7"),
                WireValue::from("x"),
                WireValue::from(true),
            ])
        );
    }

    #[test]
    fn dictionaries_encode_values_and_drop_undefined_entries() {
        let schema = SchemaNode::dictionary(SchemaNode::optional(SchemaNode::bigint()));
        let value = Value::object([("a", Value::BigInt(1)), ("b", Value::Undefined)]);
        assert_eq!(
            encode(&schema, &value),
            wire_object(&[("a", WireValue::from("1"))])
        );
    }

    #[test]
    fn tagged_unions_emit_the_discriminant_and_payload() {
        let schema = SchemaNode::tagged_union([
            ("foo", SchemaNode::string()),
            ("bar", SchemaNode::bigint()),
        ])
        .unwrap();
        let value = Value::object([
            ("type", Value::String("bar".into())),
            ("bar", Value::BigInt(10)),
        ]);
        assert_eq!(
            encode(&schema, &value),
            wire_object(&[
                ("type", WireValue::from("bar")),
                ("bar", WireValue::from("10")),
            ])
        );
    }

    #[test]
    fn refinement_encode_maps_back_to_the_base_domain() {
        let refinement = RefinementSchema::new(
            SchemaNode::string(),
            Brand::Custom {
                tag: "upper".into(),
                data: None,
            },
        )
        .with_encode(|value| match value {
            Value::String(text) => Value::String(text.to_lowercase()),
            other => other,
        });
        let schema = SchemaNode::refinement(refinement);
        assert_eq!(
            encode(&schema, &Value::String("LOUD".into())),
            WireValue::from("loud")
        );
    }

    #[test]
    fn decode_then_encode_is_a_normal_form() {
        let schema = SchemaNode::list(SchemaNode::string());
        let decoded = decode(&schema, &WireValue::from(10.0)).unwrap();
        assert_eq!(
            encode(&schema, &decoded),
            WireValue::Array(vec![WireValue::from("10")])
        );
    }

    #[test]
    fn encode_then_decode_round_trips_typed_objects() {
        let schema = SchemaNode::object([
            FieldSchema::new("id", SchemaNode::bigint()),
            FieldSchema::new("when", SchemaNode::date()),
            FieldSchema::new("tags", SchemaNode::list(SchemaNode::string())),
        ])
        .unwrap();
        let at = DateTime::<Utc>::from_timestamp_millis(1_600_000_000_500).unwrap();
        let value = Value::object([
            ("id", Value::BigInt(314)),
            ("when", Value::Date(at)),
            (
                "tags",
                Value::Array(vec![Value::String("a".into()), Value::String("b".into())]),
            ),
        ]);
        let wire = encode(&schema, &value);
        assert_eq!(decode(&schema, &wire).unwrap(), value);
    }
}
