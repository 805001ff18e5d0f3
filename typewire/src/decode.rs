//! The decode engine
//!
//! Decoding walks a schema and a wire value together and produces either a
//! fully typed [`Value`] or every validation error found along the way.
//! Composite schemas keep decoding siblings after a child fails, so a bad
//! payload reports all of its problems in one pass instead of one per
//! round trip. Failure never yields a partial value.
//!
//! Child decodes go through a recursion callback rather than plain
//! function calls. The callback is the whole middleware chain when one is
//! installed, so middleware observes every node visit, not just the root.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tracing::trace;

use crate::context::Context;
use crate::error::Validated;
use crate::middleware::CodecConfig;
use crate::node::{
    FieldSchema, NativeType, RefinementSchema, SchemaKind, SchemaNode, SchemaRef,
};
use crate::value::Value;
use crate::wire::WireValue;

/// Recursion callback used for child decodes.
pub(crate) type DecodeRecurse<'a> = &'a dyn Fn(&Context, &SchemaRef, &WireValue) -> Validated<Value>;

static UNDEFINED: WireValue = WireValue::Undefined;

/// Decodes `wire` against `schema` from the root context, without
/// middleware and with the default codec configuration.
pub fn decode(schema: &SchemaRef, wire: &WireValue) -> Validated<Value> {
    decode_plain(&CodecConfig::default(), &Context::root(), schema, wire)
}

/// Decodes without middleware, from an explicit context and configuration.
pub fn decode_plain(
    config: &CodecConfig,
    ctx: &Context,
    schema: &SchemaRef,
    wire: &WireValue,
) -> Validated<Value> {
    let recurse = |child_ctx: &Context, child: &SchemaRef, value: &WireValue| {
        decode_plain(config, child_ctx, child, value)
    };
    decode_node(config, &recurse, ctx, schema, wire)
}

/// Single decode step for one node. Children are decoded through
/// `recurse`, which re-enters the full middleware chain when one exists.
pub(crate) fn decode_node(
    config: &CodecConfig,
    recurse: DecodeRecurse<'_>,
    ctx: &Context,
    schema: &SchemaNode,
    wire: &WireValue,
) -> Validated<Value> {
    trace!(path = %ctx, schema = %schema.schema_type(), input = %wire.kind(), "decode");
    match schema.kind() {
        SchemaKind::Any => Ok(Value::from_wire(wire)),
        SchemaKind::Optional(child) => {
            if wire.is_undefined() {
                Ok(Value::Undefined)
            } else {
                recurse(ctx, child, wire)
            }
        }
        SchemaKind::Nullable(child) => {
            if wire.is_null() {
                Ok(Value::Null)
            } else {
                recurse(ctx, child, wire)
            }
        }
        // Refinements delegate absence handling to their base, so a
        // refined Optional still accepts undefined.
        SchemaKind::Refinement(refinement) => decode_refinement(recurse, ctx, refinement, wire),
        _ if wire.is_undefined() || wire.is_null() => {
            ctx.failure("required", "value is required", wire.clone())
        }
        SchemaKind::Primitive(native) => decode_primitive(ctx, *native, wire),
        SchemaKind::Enum(members) => decode_enum(ctx, members, wire),
        SchemaKind::List(child) => decode_list(recurse, ctx, child, wire),
        SchemaKind::Dictionary(child) => decode_dictionary(recurse, ctx, child, wire),
        SchemaKind::Tuple(children) => decode_tuple(recurse, ctx, children, wire),
        SchemaKind::Object(fields) => decode_object(recurse, ctx, fields, wire),
        SchemaKind::TaggedUnion(variants) => {
            decode_tagged_union(config, recurse, ctx, variants, wire)
        }
    }
}

// ============================================================================
// Composite decoders
// ============================================================================

fn decode_refinement(
    recurse: DecodeRecurse<'_>,
    ctx: &Context,
    refinement: &RefinementSchema,
    wire: &WireValue,
) -> Validated<Value> {
    let base = recurse(ctx, refinement.base(), wire)?;
    refinement.apply_decode(ctx, base)
}

fn decode_enum(ctx: &Context, members: &[(String, Value)], wire: &WireValue) -> Validated<Value> {
    let candidate = Value::from_wire(wire);
    if members.iter().any(|(_, member)| member == &candidate) {
        return Ok(candidate);
    }
    let allowed: Vec<serde_json::Value> = members
        .iter()
        .map(|(_, member)| serde_json::Value::from(member.to_wire()))
        .collect();
    let rendered: Vec<String> = allowed.iter().map(|member| member.to_string()).collect();
    let error = ctx
        .error(
            "enum",
            format!("expected one of: {}", rendered.join(", ")),
            wire.clone(),
        )
        .with_data(serde_json::json!({ "allowed": allowed }));
    Err(vec![error])
}

fn decode_list(
    recurse: DecodeRecurse<'_>,
    ctx: &Context,
    child: &SchemaRef,
    wire: &WireValue,
) -> Validated<Value> {
    // A lone scalar is accepted as a one-element list.
    let single;
    let items: &[WireValue] = match wire {
        WireValue::Array(items) => items,
        other => {
            single = [other.clone()];
            &single
        }
    };
    let mut decoded = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for (index, item) in items.iter().enumerate() {
        match recurse(&ctx.child(index), child, item) {
            Ok(value) => decoded.push(value),
            Err(mut item_errors) => errors.append(&mut item_errors),
        }
    }
    if errors.is_empty() {
        Ok(Value::Array(decoded))
    } else {
        Err(errors)
    }
}

fn decode_dictionary(
    recurse: DecodeRecurse<'_>,
    ctx: &Context,
    child: &SchemaRef,
    wire: &WireValue,
) -> Validated<Value> {
    let entries = match wire {
        WireValue::Object(entries) => entries,
        other => {
            return ctx.failure(
                "dictionary",
                format!("expected an object, got {}", other.kind()),
                other.clone(),
            )
        }
    };
    let mut decoded = BTreeMap::new();
    let mut errors = Vec::new();
    for (key, item) in entries {
        match recurse(&ctx.child(key.as_str()), child, item) {
            Ok(value) => {
                decoded.insert(key.clone(), value);
            }
            Err(mut entry_errors) => errors.append(&mut entry_errors),
        }
    }
    if errors.is_empty() {
        Ok(Value::Object(decoded))
    } else {
        Err(errors)
    }
}

fn decode_tuple(
    recurse: DecodeRecurse<'_>,
    ctx: &Context,
    children: &[SchemaRef],
    wire: &WireValue,
) -> Validated<Value> {
    let items = match wire {
        WireValue::Array(items) => items,
        other => {
            return ctx.failure(
                "tuple",
                format!("expected an array, got {}", other.kind()),
                other.clone(),
            )
        }
    };
    if items.len() != children.len() {
        let error = ctx
            .error(
                "tuple.length",
                format!("expected {} elements, got {}", children.len(), items.len()),
                wire.clone(),
            )
            .with_data(serde_json::json!({
                "expected": children.len(),
                "received": items.len(),
            }));
        return Err(vec![error]);
    }
    let mut decoded = Vec::with_capacity(children.len());
    let mut errors = Vec::new();
    for (index, (child, item)) in children.iter().zip(items).enumerate() {
        match recurse(&ctx.child(index), child, item) {
            Ok(value) => decoded.push(value),
            Err(mut item_errors) => errors.append(&mut item_errors),
        }
    }
    if errors.is_empty() {
        Ok(Value::Array(decoded))
    } else {
        Err(errors)
    }
}

fn decode_object(
    recurse: DecodeRecurse<'_>,
    ctx: &Context,
    fields: &[FieldSchema],
    wire: &WireValue,
) -> Validated<Value> {
    let entries = match wire {
        WireValue::Object(entries) => entries,
        other => {
            return ctx.failure(
                "object",
                format!("expected an object, got {}", other.kind()),
                other.clone(),
            )
        }
    };
    let mut decoded = BTreeMap::new();
    let mut errors = Vec::new();
    for field in fields {
        let raw = entries.get(field.wire_key()).unwrap_or(&UNDEFINED);
        match recurse(&ctx.child(field.key()), &field.schema(), raw) {
            Ok(value) => {
                decoded.insert(field.key().to_string(), value);
            }
            Err(mut field_errors) => errors.append(&mut field_errors),
        }
    }
    // Unknown input keys are dropped: the output holds exactly the
    // declared fields.
    if errors.is_empty() {
        Ok(Value::Object(decoded))
    } else {
        Err(errors)
    }
}

fn decode_tagged_union(
    config: &CodecConfig,
    recurse: DecodeRecurse<'_>,
    ctx: &Context,
    variants: &[(String, SchemaRef)],
    wire: &WireValue,
) -> Validated<Value> {
    let entries = match wire {
        WireValue::Object(entries) => entries,
        other => {
            return ctx.failure(
                "taggedUnion",
                format!("expected an object, got {}", other.kind()),
                other.clone(),
            )
        }
    };
    let discriminant = config.discriminant();
    let tag = match entries.get(discriminant) {
        Some(WireValue::String(tag)) => tag.as_str(),
        Some(other) => {
            return ctx.failure(
                "taggedUnion.type",
                format!(
                    "expected a string `{discriminant}` discriminant, got {}",
                    other.kind()
                ),
                other.clone(),
            )
        }
        None => {
            return ctx.failure(
                "taggedUnion.type",
                format!("missing `{discriminant}` discriminant"),
                WireValue::Undefined,
            )
        }
    };
    let Some((_, variant)) = variants.iter().find(|(candidate, _)| candidate == tag) else {
        let allowed: Vec<&str> = variants.iter().map(|(candidate, _)| candidate.as_str()).collect();
        let error = ctx
            .error(
                "taggedUnion.type",
                format!("unknown variant `{tag}`"),
                WireValue::String(tag.to_string()),
            )
            .with_data(serde_json::json!({ "allowed": allowed }));
        return Err(vec![error]);
    };
    let payload = entries.get(tag).unwrap_or(&UNDEFINED);
    let decoded = recurse(&ctx.child(tag), variant, payload)?;
    let mut object = BTreeMap::new();
    object.insert(discriminant.to_string(), Value::String(tag.to_string()));
    object.insert(tag.to_string(), decoded);
    Ok(Value::Object(object))
}

// ============================================================================
// Primitive decoders
// ============================================================================

fn decode_primitive(ctx: &Context, native: NativeType, wire: &WireValue) -> Validated<Value> {
    match native {
        NativeType::Boolean => decode_boolean(ctx, wire),
        NativeType::Number => decode_number(ctx, wire),
        NativeType::String => decode_string(ctx, wire),
        NativeType::BigInt => decode_bigint(ctx, wire),
        NativeType::Date => decode_date(ctx, wire),
        NativeType::Bytes => decode_bytes(ctx, wire),
        NativeType::Regex => decode_regex(ctx, wire),
        NativeType::Url => decode_url(ctx, wire),
        NativeType::Instant => decode_instant(ctx, wire),
        NativeType::LocalDate => decode_local_date(ctx, wire),
        NativeType::LocalTime => decode_local_time(ctx, wire),
        NativeType::LocalDateTime => decode_local_date_time(ctx, wire),
    }
}

fn decode_boolean(ctx: &Context, wire: &WireValue) -> Validated<Value> {
    match wire {
        WireValue::Bool(flag) => Ok(Value::Bool(*flag)),
        WireValue::Number(number) => Ok(Value::Bool(*number != 0.0)),
        WireValue::String(text) => match text.as_str() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => ctx.failure(
                "boolean",
                format!("cannot interpret `{text}` as a boolean"),
                wire.clone(),
            ),
        },
        other => ctx.failure(
            "boolean",
            format!("expected a boolean, got {}", other.kind()),
            other.clone(),
        ),
    }
}

fn decode_number(ctx: &Context, wire: &WireValue) -> Validated<Value> {
    match wire {
        WireValue::Number(number) => Ok(Value::Number(*number)),
        WireValue::Bool(flag) => Ok(Value::Number(if *flag { 1.0 } else { 0.0 })),
        WireValue::String(text) => match text.trim().parse::<f64>() {
            Ok(number) if !number.is_nan() => Ok(Value::Number(number)),
            _ => ctx.failure(
                "number",
                format!("cannot interpret `{text}` as a number"),
                wire.clone(),
            ),
        },
        other => ctx.failure(
            "number",
            format!("expected a number, got {}", other.kind()),
            other.clone(),
        ),
    }
}

fn decode_string(ctx: &Context, wire: &WireValue) -> Validated<Value> {
    match wire {
        WireValue::String(text) => Ok(Value::String(text.clone())),
        WireValue::Bool(flag) => Ok(Value::String(flag.to_string())),
        WireValue::Number(number) => Ok(Value::String(number.to_string())),
        other => ctx.failure(
            "string",
            format!("expected a string, got {}", other.kind()),
            other.clone(),
        ),
    }
}

fn decode_bigint(ctx: &Context, wire: &WireValue) -> Validated<Value> {
    match wire {
        WireValue::Bool(flag) => Ok(Value::BigInt(i128::from(*flag))),
        WireValue::Number(number) => {
            // i128::MAX as f64 rounds up to 2^127, so the upper bound is strict.
            if number.is_finite()
                && number.fract() == 0.0
                && *number >= i128::MIN as f64
                && *number < i128::MAX as f64
            {
                Ok(Value::BigInt(*number as i128))
            } else {
                ctx.failure(
                    "integer",
                    format!("cannot interpret {number} as an integer"),
                    wire.clone(),
                )
            }
        }
        WireValue::String(text) => match text.trim().parse::<i128>() {
            Ok(value) => Ok(Value::BigInt(value)),
            Err(_) => ctx.failure(
                "integer",
                format!("cannot interpret `{text}` as an integer"),
                wire.clone(),
            ),
        },
        other => ctx.failure(
            "integer",
            format!("expected an integer, got {}", other.kind()),
            other.clone(),
        ),
    }
}

fn decode_date(ctx: &Context, wire: &WireValue) -> Validated<Value> {
    match wire {
        WireValue::Number(millis) => match finite_epoch_millis(*millis) {
            Some(at) => Ok(Value::Date(at)),
            None => ctx.failure(
                "Date",
                format!("{millis} is not a valid epoch millisecond timestamp"),
                wire.clone(),
            ),
        },
        WireValue::String(text) => match parse_utc_datetime(text) {
            Some(at) => Ok(Value::Date(at)),
            None => ctx.failure(
                "Date",
                format!("cannot interpret `{text}` as a date"),
                wire.clone(),
            ),
        },
        other => ctx.failure(
            "Date",
            format!("expected a date, got {}", other.kind()),
            other.clone(),
        ),
    }
}

fn decode_bytes(ctx: &Context, wire: &WireValue) -> Validated<Value> {
    match wire {
        WireValue::String(text) => match STANDARD.decode(text) {
            Ok(bytes) => Ok(Value::Bytes(bytes)),
            Err(_) => ctx.failure("bytes", "invalid base64 payload", wire.clone()),
        },
        other => ctx.failure(
            "bytes",
            format!("expected a base64 string, got {}", other.kind()),
            other.clone(),
        ),
    }
}

fn decode_regex(ctx: &Context, wire: &WireValue) -> Validated<Value> {
    match wire {
        WireValue::String(pattern) => match regex::Regex::new(pattern) {
            Ok(compiled) => Ok(Value::Regex(compiled)),
            Err(error) => ctx.failure(
                "regex",
                format!("invalid regular expression: {error}"),
                wire.clone(),
            ),
        },
        other => ctx.failure(
            "regex",
            format!("expected a pattern string, got {}", other.kind()),
            other.clone(),
        ),
    }
}

fn decode_url(ctx: &Context, wire: &WireValue) -> Validated<Value> {
    match wire {
        WireValue::String(text) => match url::Url::parse(text) {
            Ok(parsed) => Ok(Value::Url(parsed)),
            Err(error) => ctx.failure("url", format!("invalid URL: {error}"), wire.clone()),
        },
        other => ctx.failure(
            "url",
            format!("expected a URL string, got {}", other.kind()),
            other.clone(),
        ),
    }
}

fn decode_instant(ctx: &Context, wire: &WireValue) -> Validated<Value> {
    match wire {
        WireValue::Number(millis) => match finite_epoch_millis(*millis) {
            Some(at) => Ok(Value::Instant(at)),
            None => ctx.failure(
                "instant",
                format!("{millis} is not a valid epoch millisecond timestamp"),
                wire.clone(),
            ),
        },
        WireValue::String(text) => match DateTime::parse_from_rfc3339(text) {
            Ok(at) => Ok(Value::Instant(at.with_timezone(&Utc))),
            Err(_) => ctx.failure(
                "instant",
                format!("cannot interpret `{text}` as an instant"),
                wire.clone(),
            ),
        },
        other => ctx.failure(
            "instant",
            format!("expected an instant, got {}", other.kind()),
            other.clone(),
        ),
    }
}

fn decode_local_date(ctx: &Context, wire: &WireValue) -> Validated<Value> {
    match wire {
        WireValue::String(text) => match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            Ok(date) => Ok(Value::LocalDate(date)),
            Err(_) => ctx.failure(
                "localDate",
                format!("cannot interpret `{text}` as a local date"),
                wire.clone(),
            ),
        },
        other => ctx.failure(
            "localDate",
            format!("expected a local date string, got {}", other.kind()),
            other.clone(),
        ),
    }
}

fn decode_local_time(ctx: &Context, wire: &WireValue) -> Validated<Value> {
    match wire {
        WireValue::String(text) => {
            let parsed = NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
                .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"));
            match parsed {
                Ok(time) => Ok(Value::LocalTime(time)),
                Err(_) => ctx.failure(
                    "localTime",
                    format!("cannot interpret `{text}` as a local time"),
                    wire.clone(),
                ),
            }
        }
        other => ctx.failure(
            "localTime",
            format!("expected a local time string, got {}", other.kind()),
            other.clone(),
        ),
    }
}

fn decode_local_date_time(ctx: &Context, wire: &WireValue) -> Validated<Value> {
    match wire {
        WireValue::String(text) => {
            let parsed = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M"));
            match parsed {
                Ok(at) => Ok(Value::LocalDateTime(at)),
                Err(_) => ctx.failure(
                    "localDateTime",
                    format!("cannot interpret `{text}` as a local datetime"),
                    wire.clone(),
                ),
            }
        }
        other => ctx.failure(
            "localDateTime",
            format!("expected a local datetime string, got {}", other.kind()),
            other.clone(),
        ),
    }
}

fn finite_epoch_millis(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

fn parse_utc_datetime(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|at| at.and_utc());
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(at.and_utc());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Brand, FieldSchema, SchemaNode};

    fn wire_object(entries: &[(&str, WireValue)]) -> WireValue {
        WireValue::object(entries.iter().map(|(key, value)| (*key, value.clone())))
    }

    #[test]
    fn root_null_and_undefined_fail_with_required() {
        let schema = SchemaNode::string();
        let errors = decode(&schema, &WireValue::Null).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule, "required");
        assert!(errors[0].paths.is_empty());
        let errors = decode(&schema, &WireValue::Undefined).unwrap_err();
        assert_eq!(errors[0].rule, "required");
    }

    #[test]
    fn any_passes_values_through() {
        let schema = SchemaNode::any();
        assert_eq!(decode(&schema, &WireValue::Null).unwrap(), Value::Null);
        assert_eq!(
            decode(&schema, &WireValue::from(3.5)).unwrap(),
            Value::Number(3.5)
        );
    }

    #[test]
    fn booleans_coerce_from_numbers_and_strings() {
        let schema = SchemaNode::boolean();
        assert_eq!(decode(&schema, &WireValue::from(true)).unwrap(), Value::Bool(true));
        assert_eq!(decode(&schema, &WireValue::from(2.0)).unwrap(), Value::Bool(true));
        assert_eq!(decode(&schema, &WireValue::from(0.0)).unwrap(), Value::Bool(false));
        assert_eq!(decode(&schema, &WireValue::from("1")).unwrap(), Value::Bool(true));
        assert_eq!(decode(&schema, &WireValue::from("false")).unwrap(), Value::Bool(false));
        let errors = decode(&schema, &WireValue::from("yes")).unwrap_err();
        assert_eq!(errors[0].rule, "boolean");
    }

    #[test]
    fn numbers_coerce_from_booleans_and_strings() {
        let schema = SchemaNode::number();
        assert_eq!(decode(&schema, &WireValue::from(1.5)).unwrap(), Value::Number(1.5));
        assert_eq!(decode(&schema, &WireValue::from(true)).unwrap(), Value::Number(1.0));
        assert_eq!(
            decode(&schema, &WireValue::from(" 42 ")).unwrap(),
            Value::Number(42.0)
        );
        assert_eq!(decode(&schema, &WireValue::from("x7")).unwrap_err()[0].rule, "number");
        assert_eq!(decode(&schema, &WireValue::from("NaN")).unwrap_err()[0].rule, "number");
    }

    #[test]
    fn strings_coerce_from_scalars_without_a_trailing_fraction() {
        let schema = SchemaNode::string();
        assert_eq!(
            decode(&schema, &WireValue::from("plain")).unwrap(),
            Value::String("plain".into())
        );
        assert_eq!(
            decode(&schema, &WireValue::from(10.0)).unwrap(),
            Value::String("10".into())
        );
        assert_eq!(
            decode(&schema, &WireValue::from(0.5)).unwrap(),
            Value::String("0.5".into())
        );
        assert_eq!(
            decode(&schema, &WireValue::from(false)).unwrap(),
            Value::String("false".into())
        );
        let errors = decode(&schema, &WireValue::Array(vec![])).unwrap_err();
        assert_eq!(errors[0].rule, "string");
    }

    #[test]
    fn bigints_parse_from_scalars_and_reject_fractions() {
        let schema = SchemaNode::bigint();
        assert_eq!(decode(&schema, &WireValue::from(9.0)).unwrap(), Value::BigInt(9));
        assert_eq!(decode(&schema, &WireValue::from(true)).unwrap(), Value::BigInt(1));
        assert_eq!(
            decode(&schema, &WireValue::from(" -170141183460469231731687303715884105728 ")).unwrap(),
            Value::BigInt(i128::MIN)
        );
        assert_eq!(decode(&schema, &WireValue::from(1.5)).unwrap_err()[0].rule, "integer");
        assert_eq!(
            decode(&schema, &WireValue::from("12.5")).unwrap_err()[0].rule,
            "integer"
        );
    }

    #[test]
    fn bigints_reject_numbers_beyond_the_i128_range() {
        let schema = SchemaNode::bigint();
        assert_eq!(decode(&schema, &WireValue::from(1e300)).unwrap_err()[0].rule, "integer");
        assert_eq!(
            decode(&schema, &WireValue::from(-1e300)).unwrap_err()[0].rule,
            "integer"
        );
        assert_eq!(
            decode(&schema, &WireValue::from(2f64.powi(127))).unwrap_err()[0].rule,
            "integer"
        );
        assert_eq!(
            decode(&schema, &WireValue::from(-(2f64.powi(127)))).unwrap(),
            Value::BigInt(i128::MIN)
        );
    }

    #[test]
    fn dates_parse_from_epoch_millis_and_strings() {
        let schema = SchemaNode::date();
        let from_millis = decode(&schema, &WireValue::from(1_577_836_800_123.0)).unwrap();
        assert_eq!(
            from_millis.to_wire(),
            WireValue::from("2020-01-01T00:00:00.123Z")
        );
        let from_string = decode(&schema, &WireValue::from("2020-01-01T00:00:00Z")).unwrap();
        assert!(matches!(from_string, Value::Date(_)));
        let bare_date = decode(&schema, &WireValue::from("2020-06-15")).unwrap();
        assert_eq!(bare_date.to_wire(), WireValue::from("2020-06-15T00:00:00.000Z"));
        assert_eq!(
            decode(&schema, &WireValue::from("not a date")).unwrap_err()[0].rule,
            "Date"
        );
        assert_eq!(
            decode(&schema, &WireValue::from(f64::NAN)).unwrap_err()[0].rule,
            "Date"
        );
    }

    #[test]
    fn bytes_decode_from_standard_base64_only() {
        let schema = SchemaNode::bytes();
        assert_eq!(
            decode(&schema, &WireValue::from("aGVsbG8=")).unwrap(),
            Value::Bytes(b"hello".to_vec())
        );
        assert_eq!(
            decode(&schema, &WireValue::from("!!!")).unwrap_err()[0].rule,
            "bytes"
        );
        assert_eq!(
            decode(&schema, &WireValue::from(7.0)).unwrap_err()[0].rule,
            "bytes"
        );
    }

    #[test]
    fn regex_and_url_build_from_strings() {
        assert_eq!(
            decode(&SchemaNode::regex(), &WireValue::from("^a+$")).unwrap(),
            Value::Regex(regex::Regex::new("^a+$").unwrap())
        );
        assert_eq!(
            decode(&SchemaNode::regex(), &WireValue::from("(")).unwrap_err()[0].rule,
            "regex"
        );
        assert!(matches!(
            decode(&SchemaNode::url(), &WireValue::from("https://example.com/x")).unwrap(),
            Value::Url(_)
        ));
        assert_eq!(
            decode(&SchemaNode::url(), &WireValue::from("not a url")).unwrap_err()[0].rule,
            "url"
        );
    }

    #[test]
    fn temporal_kinds_parse_their_string_forms() {
        assert!(matches!(
            decode(&SchemaNode::instant(), &WireValue::from(0.0)).unwrap(),
            Value::Instant(_)
        ));
        assert!(matches!(
            decode(&SchemaNode::instant(), &WireValue::from("2021-03-01T10:00:00+02:00")).unwrap(),
            Value::Instant(_)
        ));
        assert_eq!(
            decode(&SchemaNode::instant(), &WireValue::from("2021-03-01")).unwrap_err()[0].rule,
            "instant"
        );
        assert!(matches!(
            decode(&SchemaNode::local_date(), &WireValue::from("2021-03-01")).unwrap(),
            Value::LocalDate(_)
        ));
        assert!(matches!(
            decode(&SchemaNode::local_time(), &WireValue::from("10:30")).unwrap(),
            Value::LocalTime(_)
        ));
        assert!(matches!(
            decode(&SchemaNode::local_time(), &WireValue::from("10:30:15.250")).unwrap(),
            Value::LocalTime(_)
        ));
        assert!(matches!(
            decode(
                &SchemaNode::local_date_time(),
                &WireValue::from("2021-03-01T10:30:15")
            )
            .unwrap(),
            Value::LocalDateTime(_)
        ));
        assert_eq!(
            decode(&SchemaNode::local_date_time(), &WireValue::from("10:30")).unwrap_err()[0].rule,
            "localDateTime"
        );
    }

    #[test]
    fn optional_accepts_absence_but_delegates_null() {
        let schema = SchemaNode::optional(SchemaNode::string());
        assert_eq!(decode(&schema, &WireValue::Undefined).unwrap(), Value::Undefined);
        assert_eq!(
            decode(&schema, &WireValue::from("here")).unwrap(),
            Value::String("here".into())
        );
        let errors = decode(&schema, &WireValue::Null).unwrap_err();
        assert_eq!(errors[0].rule, "required");
    }

    #[test]
    fn nullable_accepts_null_but_delegates_absence() {
        let schema = SchemaNode::nullable(SchemaNode::number());
        assert_eq!(decode(&schema, &WireValue::Null).unwrap(), Value::Null);
        assert_eq!(decode(&schema, &WireValue::from(4.0)).unwrap(), Value::Number(4.0));
        let errors = decode(&schema, &WireValue::Undefined).unwrap_err();
        assert_eq!(errors[0].rule, "required");
    }

    #[test]
    fn enums_match_by_value() {
        let schema = SchemaNode::enumeration([("Red", "red"), ("Green", "green")]).unwrap();
        assert_eq!(
            decode(&schema, &WireValue::from("green")).unwrap(),
            Value::String("green".into())
        );
        let errors = decode(&schema, &WireValue::from("blue")).unwrap_err();
        assert_eq!(errors[0].rule, "enum");
        assert!(errors[0].message.contains("\"red\""));
    }

    #[test]
    fn lists_wrap_a_lone_scalar() {
        let schema = SchemaNode::list(SchemaNode::string());
        let decoded = decode(&schema, &WireValue::from(10.0)).unwrap();
        assert_eq!(decoded, Value::Array(vec![Value::String("10".into())]));
    }

    #[test]
    fn list_failures_accumulate_in_element_order() {
        let schema = SchemaNode::list(SchemaNode::number());
        let wire = WireValue::Array(vec![
            WireValue::from("1"),
            WireValue::from("two"),
            WireValue::from("three"),
        ]);
        let errors = decode(&schema, &wire).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].path_string(), "1");
        assert_eq!(errors[1].path_string(), "2");
    }

    #[test]
    fn dictionaries_decode_entry_values_at_their_keys() {
        let schema = SchemaNode::dictionary(SchemaNode::number());
        let wire = wire_object(&[("a", WireValue::from("3")), ("b", WireValue::from("oops"))]);
        let errors = decode(&schema, &wire).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path_string(), "b");
        let ok = decode(&schema, &wire_object(&[("a", WireValue::from(3.0))])).unwrap();
        assert_eq!(ok, Value::object([("a", Value::Number(3.0))]));
        let errors = decode(&schema, &WireValue::Array(vec![])).unwrap_err();
        assert_eq!(errors[0].rule, "dictionary");
    }

    #[test]
    fn tuple_length_mismatch_is_a_single_error() {
        let schema = SchemaNode::tuple([SchemaNode::string(), SchemaNode::number()]);
        let errors = decode(&schema, &WireValue::Array(vec![WireValue::from("a")])).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule, "tuple.length");
        assert!(errors[0].paths.is_empty());
        let errors = decode(&schema, &WireValue::from("a")).unwrap_err();
        assert_eq!(errors[0].rule, "tuple");
    }

    #[test]
    fn tuples_decode_positionally() {
        let schema = SchemaNode::tuple([SchemaNode::string(), SchemaNode::number()]);
        let wire = WireValue::Array(vec![WireValue::from(1.0), WireValue::from("2")]);
        let decoded = decode(&schema, &wire).unwrap();
        assert_eq!(
            decoded,
            Value::Array(vec![Value::String("1".into()), Value::Number(2.0)])
        );
    }

    #[test]
    fn objects_report_every_bad_field_with_its_path() {
        let schema = SchemaNode::object([
            FieldSchema::new("name", SchemaNode::string()),
            FieldSchema::new("age", SchemaNode::number()),
            FieldSchema::new("tags", SchemaNode::list(SchemaNode::string())),
        ])
        .unwrap();
        let wire = wire_object(&[
            ("age", WireValue::from("old")),
            ("tags", WireValue::Array(vec![WireValue::Null])),
        ]);
        let errors = decode(&schema, &wire).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].path_string(), "name");
        assert_eq!(errors[0].rule, "required");
        assert_eq!(errors[1].path_string(), "age");
        assert_eq!(errors[1].rule, "number");
        assert_eq!(errors[2].path_string(), "tags.0");
        assert_eq!(errors[2].rule, "required");
    }

    #[test]
    fn objects_drop_unknown_keys_and_read_wire_keys() {
        let schema = SchemaNode::object([
            FieldSchema::new("createdAt", SchemaNode::string()).with_wire_key("created_at"),
        ])
        .unwrap();
        let wire = wire_object(&[
            ("created_at", WireValue::from("now")),
            ("noise", WireValue::from(1.0)),
        ]);
        let decoded = decode(&schema, &wire).unwrap();
        assert_eq!(decoded, Value::object([("createdAt", Value::String("now".into()))]));
    }

    #[test]
    fn optional_object_fields_decode_to_undefined() {
        let schema = SchemaNode::object([
            FieldSchema::new("id", SchemaNode::string()),
            FieldSchema::new("note", SchemaNode::optional(SchemaNode::string())),
        ])
        .unwrap();
        let decoded = decode(&schema, &wire_object(&[("id", WireValue::from("a1"))])).unwrap();
        assert_eq!(
            decoded,
            Value::object([
                ("id", Value::String("a1".into())),
                ("note", Value::Undefined),
            ])
        );
    }

    #[test]
    fn tagged_union_decodes_the_matching_variant() {
        let schema = SchemaNode::tagged_union([
            ("foo", SchemaNode::string()),
            ("bar", SchemaNode::number()),
        ])
        .unwrap();
        let wire = wire_object(&[
            ("type", WireValue::from("foo")),
            ("foo", WireValue::from("hello")),
        ]);
        let decoded = decode(&schema, &wire).unwrap();
        assert_eq!(
            decoded,
            Value::object([
                ("type", Value::String("foo".into())),
                ("foo", Value::String("hello".into())),
            ])
        );
    }

    #[test]
    fn tagged_union_payload_errors_carry_the_variant_path() {
        let schema = SchemaNode::tagged_union([
            ("foo", SchemaNode::string()),
            ("bar", SchemaNode::number()),
        ])
        .unwrap();
        let wire = wire_object(&[
            ("type", WireValue::from("bar")),
            ("bar", WireValue::from("ten")),
        ]);
        let errors = decode(&schema, &wire).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule, "number");
        assert_eq!(errors[0].path_string(), "bar");
    }

    #[test]
    fn tagged_union_discriminant_problems_use_their_own_rule() {
        let schema = SchemaNode::tagged_union([("foo", SchemaNode::string())]).unwrap();
        let errors = decode(&schema, &wire_object(&[("foo", WireValue::from("x"))])).unwrap_err();
        assert_eq!(errors[0].rule, "taggedUnion.type");
        let errors = decode(
            &schema,
            &wire_object(&[("type", WireValue::from(1.0))]),
        )
        .unwrap_err();
        assert_eq!(errors[0].rule, "taggedUnion.type");
        let errors = decode(
            &schema,
            &wire_object(&[("type", WireValue::from("nope"))]),
        )
        .unwrap_err();
        assert_eq!(errors[0].rule, "taggedUnion.type");
        let errors = decode(&schema, &WireValue::from(3.0)).unwrap_err();
        assert_eq!(errors[0].rule, "taggedUnion");
    }

    #[test]
    fn refinements_run_only_after_the_base_succeeds() {
        let refinement = RefinementSchema::new(SchemaNode::number(), Brand::Min(10.0))
            .with_decode(|ctx, value| match value {
                Value::Number(number) if number >= 10.0 => Ok(Value::Number(number)),
                other => ctx.failure("min", "must be at least 10", other.to_wire()),
            });
        let schema = SchemaNode::refinement(refinement);
        assert_eq!(decode(&schema, &WireValue::from(12.0)).unwrap(), Value::Number(12.0));
        let errors = decode(&schema, &WireValue::from(3.0)).unwrap_err();
        assert_eq!(errors[0].rule, "min");
        let errors = decode(&schema, &WireValue::from("abc")).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule, "number");
    }

    #[test]
    fn nested_paths_compose_across_composites() {
        let schema = SchemaNode::object([FieldSchema::new(
            "rows",
            SchemaNode::list(
                SchemaNode::object([FieldSchema::new("id", SchemaNode::bigint())]).unwrap(),
            ),
        )])
        .unwrap();
        let wire = wire_object(&[(
            "rows",
            WireValue::Array(vec![wire_object(&[("id", WireValue::from("zero"))])]),
        )]);
        let errors = decode(&schema, &wire).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule, "integer");
        assert_eq!(errors[0].path_string(), "rows.0.id");
    }
}
