//! Property-based codec tests.
//!
//! Properties tested:
//! - Property 1: Resolution Idempotence
//! - Property 2: Canonical Round Trip
//! - Property 3: Number To String Coercion
//! - Property 4: List Scalar Equivalence
//! - Property 5: Decode Totality
//! - Property 6: Normal Form Stability

use std::sync::Arc;

use proptest::prelude::*;

use crate::prelude::*;
use crate::NativeType;

// =============================================================================
// Generators
// =============================================================================

/// Generate a leaf wire value.
fn arb_wire_leaf() -> impl Strategy<Value = WireValue> {
    prop_oneof![
        Just(WireValue::Undefined),
        Just(WireValue::Null),
        any::<bool>().prop_map(WireValue::Bool),
        (-1.0e9f64..1.0e9).prop_map(WireValue::Number),
        "[a-z]{0,8}".prop_map(WireValue::String),
    ]
}

/// Generate an arbitrary wire tree a few levels deep.
fn arb_wire_value() -> impl Strategy<Value = WireValue> {
    arb_wire_leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(WireValue::Array),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..4).prop_map(WireValue::Object),
        ]
    })
}

/// Generate a non-absent scalar, the inputs the list shorthand wraps.
fn arb_wire_scalar() -> impl Strategy<Value = WireValue> {
    prop_oneof![
        any::<bool>().prop_map(WireValue::Bool),
        (-1.0e9f64..1.0e9).prop_map(WireValue::Number),
        "[a-z]{0,8}".prop_map(WireValue::String),
    ]
}

/// Generate a schema together with wire input already in canonical form,
/// where decoding succeeds and encoding reproduces the input exactly.
fn arb_canonical_case() -> impl Strategy<Value = (SchemaRef, WireValue)> {
    prop_oneof![
        any::<bool>().prop_map(|flag| (SchemaNode::boolean(), WireValue::Bool(flag))),
        (-1.0e9f64..1.0e9).prop_map(|n| (SchemaNode::number(), WireValue::Number(n))),
        "[a-z]{0,8}".prop_map(|text| (SchemaNode::string(), WireValue::String(text))),
        prop::collection::vec("[a-z]{0,8}", 0..4).prop_map(|items| {
            let wire = WireValue::Array(items.into_iter().map(WireValue::String).collect());
            (SchemaNode::list(SchemaNode::string()), wire)
        }),
    ]
}

/// A schema touching every composite kind, for totality checks.
fn mixed_schema() -> SchemaRef {
    SchemaNode::object([
        FieldSchema::new("id", SchemaNode::optional(SchemaNode::bigint())),
        FieldSchema::new("name", SchemaNode::string()),
        FieldSchema::new("scores", SchemaNode::list(SchemaNode::number())),
        FieldSchema::new("flags", SchemaNode::dictionary(SchemaNode::boolean())),
        FieldSchema::new(
            "pair",
            SchemaNode::tuple([SchemaNode::string(), SchemaNode::number()]),
        ),
        FieldSchema::new("active", SchemaNode::nullable(SchemaNode::boolean())),
    ])
    .expect("field keys are distinct")
}

// =============================================================================
// Properties
// =============================================================================

/// Property 1: Resolution Idempotence
/// Resolving the same expression twice yields the same node, pointer-equal,
/// for every primitive tag.
#[test]
fn prop_resolution_is_idempotent() {
    proptest!(|(native in prop::sample::select(NativeType::ALL.to_vec()))| {
        let first = resolve_schema(native).unwrap();
        let second = resolve_schema(native.as_str()).unwrap();
        prop_assert!(Arc::ptr_eq(&first, &second));
    });
}

/// Property 2: Canonical Round Trip
/// Wire input already in canonical form decodes successfully and encodes
/// back to the identical wire value.
#[test]
fn prop_canonical_input_round_trips() {
    proptest!(|((schema, wire) in arb_canonical_case())| {
        let decoded = decode(&schema, &wire);
        prop_assert!(decoded.is_ok());
        prop_assert_eq!(encode(&schema, &decoded.unwrap()), wire);
    });
}

/// Property 3: Number To String Coercion
/// Any finite number decodes under a string schema to its display form.
#[test]
fn prop_numbers_coerce_to_their_display_form() {
    proptest!(|(n in -1.0e9f64..1.0e9)| {
        let decoded = decode(&SchemaNode::string(), &WireValue::Number(n));
        prop_assert_eq!(decoded, Ok(Value::String(n.to_string())));
    });
}

/// Property 4: List Scalar Equivalence
/// Decoding a bare scalar under a list schema behaves exactly like
/// decoding the one-element array holding it, errors included.
#[test]
fn prop_lone_scalars_decode_like_singleton_arrays() {
    proptest!(|(scalar in arb_wire_scalar())| {
        let schema = SchemaNode::list(SchemaNode::number());
        let bare = decode(&schema, &scalar);
        let wrapped = decode(&schema, &WireValue::Array(vec![scalar]));
        prop_assert_eq!(bare, wrapped);
    });
}

/// Property 5: Decode Totality
/// Arbitrary wire input never panics the decoder, and every reported
/// error carries a rule tag and a message.
#[test]
fn prop_decode_is_total_over_arbitrary_wire() {
    proptest!(|(wire in arb_wire_value())| {
        let schema = mixed_schema();
        if let Err(errors) = decode(&schema, &wire) {
            prop_assert!(!errors.is_empty());
            for error in &errors {
                prop_assert!(!error.rule.is_empty());
                prop_assert!(!error.message.is_empty());
            }
        }
    });
}

/// Property 6: Normal Form Stability
/// Whenever arbitrary wire input decodes, re-decoding its encoding yields
/// the same value. Encoding lands on a decode fixed point.
#[test]
fn prop_encoding_is_a_decode_fixed_point() {
    proptest!(|(wire in arb_wire_value())| {
        let schema = mixed_schema();
        if let Ok(first) = decode(&schema, &wire) {
            let encoded = encode(&schema, &first);
            let second = decode(&schema, &encoded);
            prop_assert_eq!(second, Ok(first));
        }
    });
}
