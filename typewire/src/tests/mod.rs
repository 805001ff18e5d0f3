//! Test module organization
//!
//! Unit tests live beside the modules they cover. The tests here exercise
//! whole-pipeline behavior through the public API: registered types,
//! codecs with middleware, and the serde_json boundary.

#[cfg(test)]
pub mod property_tests;
