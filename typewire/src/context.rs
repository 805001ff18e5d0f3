//! Path-tracking context threaded through decode and encode
//!
//! A [`Context`] is created per top-level codec call and handed down the
//! schema tree. It is immutable: [`Context::child`] returns a new context
//! with one more path segment, leaving the parent untouched, so sibling
//! branches never observe each other's paths.

use std::fmt;

use serde::Serialize;
use tracing::trace;

use crate::error::{Validated, ValidationError};
use crate::wire::WireValue;

/// One step of a value path: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{key}"),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl Serialize for PathSegment {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Key(key) => serializer.serialize_str(key),
            Self::Index(index) => serializer.serialize_u64(*index as u64),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Immutable decode/encode context carrying the accumulated value path.
#[derive(Debug, Clone, Default)]
pub struct Context {
    path: Vec<PathSegment>,
}

impl Context {
    /// Context for a top-level call, with an empty path.
    pub fn root() -> Self {
        Self::default()
    }

    /// The accumulated path, outermost segment first.
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// Derives a child context with `segment` appended. The parent context
    /// is unaffected.
    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        let mut path = self.path.clone();
        path.push(segment.into());
        Self { path }
    }

    /// Builds a single validation error at this context's path.
    pub fn error(
        &self,
        rule: impl Into<String>,
        message: impl Into<String>,
        value: WireValue,
    ) -> ValidationError {
        let error = ValidationError::new(rule, message, value, self.path.clone());
        trace!(path = %self, rule = %error.rule, "validation failure");
        error
    }

    /// Builds a one-element failure list at this context's path.
    pub fn failure<T>(
        &self,
        rule: impl Into<String>,
        message: impl Into<String>,
        value: WireValue,
    ) -> Validated<T> {
        Err(vec![self.error(rule, message, value)])
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return write!(f, "$");
        }
        for (position, segment) in self.path.iter().enumerate() {
            if position > 0 {
                write!(f, ".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_contexts_do_not_touch_the_parent() {
        let root = Context::root();
        let child = root.child("user").child(3usize);
        assert!(root.path().is_empty());
        assert_eq!(
            child.path(),
            &[PathSegment::Key("user".into()), PathSegment::Index(3)]
        );
    }

    #[test]
    fn display_renders_a_dotted_path() {
        let ctx = Context::root().child("items").child(0usize).child("id");
        assert_eq!(ctx.to_string(), "items.0.id");
        assert_eq!(Context::root().to_string(), "$");
    }

    #[test]
    fn failure_builds_a_single_error_at_the_context_path() {
        let ctx = Context::root().child("age");
        let result: Validated<()> = ctx.failure("number", "not a number", WireValue::from("x"));
        let errors = result.unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule, "number");
        assert_eq!(errors[0].paths, vec![PathSegment::Key("age".into())]);
        assert_eq!(errors[0].value, WireValue::from("x"));
    }
}
