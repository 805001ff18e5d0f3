//! Well-known refinement constructors
//!
//! Branded schemas for the formats that come up in almost every API:
//! addresses, identifiers, bounded numbers. Each constructor is a plain
//! [`Refinement`](crate::SchemaKind::Refinement) over a primitive base, so
//! generator backends see an ordinary node tree plus a brand tag from the
//! fixed vocabulary.
//!
//! [`phone`] and [`opaque_id`] deliberately carry `Custom` brands: backends
//! without a rendering for them must refuse with an unhandled refinement
//! error rather than silently emitting the base schema.

use std::net::IpAddr;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use uuid::Uuid;

use crate::middleware::CodecConfig;
use crate::node::{Brand, RefinementSchema, SchemaNode, SchemaRef};
use crate::value::Value;
use crate::wire::WireValue;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
            .expect("email pattern is a valid literal")
    })
}

fn hostname_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)*[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$")
            .expect("hostname pattern is a valid literal")
    })
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\+?[0-9][0-9 ().-]{5,24}$").expect("phone pattern is a valid literal")
    })
}

/// A string holding an RFC 5322 style email address.
pub fn email() -> SchemaRef {
    let refinement = RefinementSchema::new(SchemaNode::string(), Brand::Email).with_decode(
        |ctx, value| match value {
            Value::String(text) if email_pattern().is_match(&text) => Ok(Value::String(text)),
            other => ctx.failure("email", "not a valid email address", other.to_wire()),
        },
    );
    SchemaNode::refinement(refinement)
}

/// A URI, decoded to a parsed [`Value::Url`].
pub fn uri() -> SchemaRef {
    SchemaNode::refinement(RefinementSchema::new(SchemaNode::url(), Brand::Uri))
}

/// A number restricted to whole values.
pub fn integer() -> SchemaRef {
    let refinement = RefinementSchema::new(SchemaNode::number(), Brand::Integer).with_decode(
        |ctx, value| match value {
            Value::Number(number) if number.is_finite() && number.fract() == 0.0 => {
                Ok(Value::Number(number))
            }
            other => ctx.failure("integer", "not a whole number", other.to_wire()),
        },
    );
    SchemaNode::refinement(refinement)
}

/// A TCP/UDP port number: a whole number from 0 through 65535.
pub fn port() -> SchemaRef {
    let refinement = RefinementSchema::new(integer(), Brand::Port).with_decode(|ctx, value| {
        match value {
            Value::Number(number) if (0.0..=65_535.0).contains(&number) => {
                Ok(Value::Number(number))
            }
            other => ctx.failure("port", "not a valid port number", other.to_wire()),
        }
    });
    SchemaNode::refinement(refinement)
}

/// A string holding an IPv4 or IPv6 address.
pub fn ip() -> SchemaRef {
    let refinement = RefinementSchema::new(SchemaNode::string(), Brand::Ip).with_decode(
        |ctx, value| match value {
            Value::String(text) if IpAddr::from_str(&text).is_ok() => Ok(Value::String(text)),
            other => ctx.failure("ip", "not a valid IP address", other.to_wire()),
        },
    );
    SchemaNode::refinement(refinement)
}

/// A string holding an RFC 1123 hostname.
pub fn hostname() -> SchemaRef {
    let refinement = RefinementSchema::new(SchemaNode::string(), Brand::Hostname).with_decode(
        |ctx, value| match value {
            Value::String(text) if text.len() <= 253 && hostname_pattern().is_match(&text) => {
                Ok(Value::String(text))
            }
            other => ctx.failure("hostname", "not a valid hostname", other.to_wire()),
        },
    );
    SchemaNode::refinement(refinement)
}

/// A string holding a UUID, normalized to hyphenated lowercase.
pub fn uuid() -> SchemaRef {
    let refinement = RefinementSchema::new(SchemaNode::string(), Brand::Uuid).with_decode(
        |ctx, value| match value {
            Value::String(text) => match Uuid::parse_str(&text) {
                Ok(parsed) => Ok(Value::String(parsed.to_string())),
                Err(_) => ctx.failure("uuid", "not a valid UUID", WireValue::String(text)),
            },
            other => ctx.failure("uuid", "not a valid UUID", other.to_wire()),
        },
    );
    SchemaNode::refinement(refinement)
}

/// A string holding a phone number in loose international notation.
///
/// Carries a `Custom` brand: generator backends that have no rendering for
/// phone numbers must report it as unhandled.
pub fn phone() -> SchemaRef {
    let refinement = RefinementSchema::new(
        SchemaNode::string(),
        Brand::Custom {
            tag: "phone".into(),
            data: None,
        },
    )
    .with_decode(|ctx, value| match value {
        Value::String(text) if phone_pattern().is_match(&text) => Ok(Value::String(text)),
        other => ctx.failure("phone", "not a valid phone number", other.to_wire()),
    });
    SchemaNode::refinement(refinement)
}

/// An opaque identifier: a plain string branded with a domain-specific tag
/// such as `"userId"`. The brand exists for generators and documentation;
/// decoding adds no checks beyond the base string.
pub fn opaque_id(tag: impl Into<String>) -> SchemaRef {
    SchemaNode::refinement(RefinementSchema::new(
        SchemaNode::string(),
        Brand::Custom {
            tag: tag.into(),
            data: None,
        },
    ))
}

fn int_range(low: f64, high: f64) -> SchemaRef {
    max(min(integer(), low), high)
}

/// A whole number from -128 through 127.
pub fn int8() -> SchemaRef {
    int_range(-128.0, 127.0)
}

/// A whole number from 0 through 255.
pub fn uint8() -> SchemaRef {
    int_range(0.0, 255.0)
}

/// A whole number from -32768 through 32767.
pub fn int16() -> SchemaRef {
    int_range(-32_768.0, 32_767.0)
}

/// A whole number from 0 through 65535.
pub fn uint16() -> SchemaRef {
    int_range(0.0, 65_535.0)
}

/// A whole number from -2^31 through 2^31 - 1.
pub fn int32() -> SchemaRef {
    int_range(-2_147_483_648.0, 2_147_483_647.0)
}

/// A whole number from 0 through 2^32 - 1.
pub fn uint32() -> SchemaRef {
    int_range(0.0, 4_294_967_295.0)
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => Some(*number),
        Value::BigInt(int) => Some(*int as f64),
        _ => None,
    }
}

/// Requires a numeric value of at least `bound`.
pub fn min(schema: SchemaRef, bound: f64) -> SchemaRef {
    let refinement =
        RefinementSchema::new(schema, Brand::Min(bound)).with_decode(move |ctx, value| {
            match numeric(&value) {
                Some(number) if number >= bound => Ok(value),
                _ => ctx.failure("min", format!("must be at least {bound}"), value.to_wire()),
            }
        });
    SchemaNode::refinement(refinement)
}

/// Requires a numeric value of at most `bound`.
pub fn max(schema: SchemaRef, bound: f64) -> SchemaRef {
    let refinement =
        RefinementSchema::new(schema, Brand::Max(bound)).with_decode(move |ctx, value| {
            match numeric(&value) {
                Some(number) if number <= bound => Ok(value),
                _ => ctx.failure("max", format!("must be at most {bound}"), value.to_wire()),
            }
        });
    SchemaNode::refinement(refinement)
}

/// Requires a string of at least `length` characters.
pub fn min_length(schema: SchemaRef, length: usize) -> SchemaRef {
    let refinement = RefinementSchema::new(schema, Brand::MinLength(length)).with_decode(
        move |ctx, value| match &value {
            Value::String(text) if text.chars().count() >= length => Ok(value),
            _ => ctx.failure(
                "minLength",
                format!("must be at least {length} characters"),
                value.to_wire(),
            ),
        },
    );
    SchemaNode::refinement(refinement)
}

/// Requires a string of at most `length` characters.
pub fn max_length(schema: SchemaRef, length: usize) -> SchemaRef {
    let refinement = RefinementSchema::new(schema, Brand::MaxLength(length)).with_decode(
        move |ctx, value| match &value {
            Value::String(text) if text.chars().count() <= length => Ok(value),
            _ => ctx.failure(
                "maxLength",
                format!("must be at most {length} characters"),
                value.to_wire(),
            ),
        },
    );
    SchemaNode::refinement(refinement)
}

/// Requires a sequence of at least `count` elements.
pub fn min_items(schema: SchemaRef, count: usize) -> SchemaRef {
    let refinement = RefinementSchema::new(schema, Brand::MinItems(count)).with_decode(
        move |ctx, value| match &value {
            Value::Array(items) if items.len() >= count => Ok(value),
            _ => ctx.failure(
                "minItems",
                format!("must have at least {count} items"),
                value.to_wire(),
            ),
        },
    );
    SchemaNode::refinement(refinement)
}

/// Requires a sequence of at most `count` elements.
pub fn max_items(schema: SchemaRef, count: usize) -> SchemaRef {
    let refinement = RefinementSchema::new(schema, Brand::MaxItems(count)).with_decode(
        move |ctx, value| match &value {
            Value::Array(items) if items.len() <= count => Ok(value),
            _ => ctx.failure(
                "maxItems",
                format!("must have at most {count} items"),
                value.to_wire(),
            ),
        },
    );
    SchemaNode::refinement(refinement)
}

/// Requires a sequence with no repeated elements.
pub fn unique_items(schema: SchemaRef) -> SchemaRef {
    let refinement = RefinementSchema::new(schema, Brand::UniqueItems).with_decode(
        |ctx, value| match &value {
            Value::Array(items) => {
                let duplicated = items
                    .iter()
                    .enumerate()
                    .any(|(position, item)| items[..position].contains(item));
                if duplicated {
                    ctx.failure("uniqueItems", "items must be unique", value.to_wire())
                } else {
                    Ok(value)
                }
            }
            _ => ctx.failure("uniqueItems", "items must be unique", value.to_wire()),
        },
    );
    SchemaNode::refinement(refinement)
}

/// Substitutes `fallback` when the input is absent.
///
/// The fallback is wire data and goes through the child schema's own
/// decoding, so it is subject to the same coercions and checks as real
/// input. That decoding is self-contained: it runs with the default
/// configuration and without middleware, so a tagged union fallback
/// spells its discriminant as `type` even under a codec that reads a
/// different key.
pub fn default_value(child: SchemaRef, fallback: WireValue) -> SchemaRef {
    let fallback_child = child.clone();
    let fallback_wire = fallback.clone();
    let refinement = RefinementSchema::new(
        SchemaNode::optional(child),
        Brand::Default(fallback),
    )
    .with_decode(move |ctx, value| match value {
        Value::Undefined => crate::decode::decode_plain(
            &CodecConfig::default(),
            ctx,
            &fallback_child,
            &fallback_wire,
        ),
        present => Ok(present),
    });
    SchemaNode::refinement(refinement)
}
