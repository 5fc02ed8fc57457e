//! # Observability
//!
//! Structured logging for the provisioning flow. Everything is emitted through
//! `tracing`; command output on stdout is kept separate from log output on
//! stderr.

pub mod logging;

pub use logging::init_logging;
