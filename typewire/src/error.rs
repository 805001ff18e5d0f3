//! Error types for schema definition and validation
//!
//! Two disjoint channels. [`SchemaError`] covers schema *definition*
//! mistakes: malformed schema-like input, missing registrations, duplicate
//! tags. Those are programmer errors and surface from resolution and
//! registration. [`ValidationError`] covers ordinary *input* mismatches at
//! decode time; those are accumulated into lists and never abort the walk.
//!
//! # Example
//! ```rust,ignore
//! use typewire::{decode, SchemaNode, WireValue};
//!
//! let schema = SchemaNode::number();
//! let errors = decode(&schema, &WireValue::from("ten")).unwrap_err();
//! assert_eq!(errors[0].rule, "number");
//! ```

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::context::PathSegment;
use crate::value::Value;
use crate::wire::WireValue;

/// Errors raised while defining or resolving schemas.
///
/// These mark development-time mistakes, not bad runtime input, so they are
/// reported through `Result` instead of being folded into validation error
/// lists.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// A primitive tag name outside the closed native set.
    #[error("unknown primitive tag `{0}`")]
    UnknownPrimitive(String),

    /// A type identity used as a schema before being registered.
    #[error("type `{0}` has no registered fields")]
    UnregisteredType(String),

    /// A type registered more than once.
    #[error("type `{0}` is already registered")]
    DuplicateType(String),

    /// A registration that declares no fields. Only explicitly described
    /// types are schema-bearing, so an empty description is a mistake, not
    /// an empty object.
    #[error("type `{0}` declares no fields")]
    EmptyType(String),

    /// Array shorthand used with a length other than one.
    #[error("array shorthand takes exactly one element schema, got {0}")]
    ArrayShorthand(usize),

    /// Enum member values must be distinct for decode to be unambiguous.
    #[error("enum member `{duplicate}` repeats the value of `{original}`")]
    DuplicateEnumValue { original: String, duplicate: String },

    /// Tagged union variant tags must be distinct.
    #[error("tagged union declares tag `{0}` twice")]
    DuplicateUnionTag(String),

    /// Object field keys must be distinct.
    #[error("field `{0}` is declared twice")]
    DuplicateField(String),
}

/// Result type alias for schema definition and resolution.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// A single path-qualified validation failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    /// Human-readable description of the failure.
    pub message: String,
    /// The offending wire value.
    pub value: WireValue,
    /// Path from the decode root to the offending value.
    pub paths: Vec<PathSegment>,
    /// Rule tag identifying the failed check (`required`, `number`,
    /// `tuple.length`, ...).
    pub rule: String,
    /// Optional diagnostic payload (bounds, member lists, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ValidationError {
    /// Creates a new validation error.
    pub fn new(
        rule: impl Into<String>,
        message: impl Into<String>,
        value: WireValue,
        paths: Vec<PathSegment>,
    ) -> Self {
        Self {
            message: message.into(),
            value,
            paths,
            rule: rule.into(),
            data: None,
        }
    }

    /// Attaches a diagnostic payload.
    pub fn with_data(mut self, data: impl Serialize) -> Self {
        self.data = serde_json::to_value(data).ok();
        self
    }

    /// The dotted path string, `$` for the root.
    pub fn path_string(&self) -> String {
        if self.paths.is_empty() {
            return "$".to_string();
        }
        self.paths
            .iter()
            .map(PathSegment::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} at `{}`", self.rule, self.message, self.path_string())
    }
}

/// Outcome of a decode: a typed value, or every failure found in one pass.
pub type Validated<T = Value> = Result<T, Vec<ValidationError>>;
