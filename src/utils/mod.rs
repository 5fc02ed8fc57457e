//! Utility functions and helpers

pub mod naming;

pub use naming::{is_identifier, to_identifier};
