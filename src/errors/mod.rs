//! # Error Handling
//!
//! Error types for provisioning runs, defined with `thiserror`. Remote failures
//! keep the platform's structured field/message/status detail so callers can
//! both classify them (benign duplicates) and report them faithfully.

use std::path::PathBuf;

use crate::platform::RemoteError;

/// Custom result type for provisioning operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for provisioning runs
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The target connected app already exists and replacement was not requested
    #[error("Connected app \"{identifier}\" already exists. Please choose a different name.")]
    Conflict { identifier: String },

    /// The remote platform rejected an operation
    #[error("{operation} failed: {}", format_remote_errors(.errors))]
    Remote { operation: String, errors: Vec<RemoteError> },

    /// Network or protocol level failure talking to the platform
    #[error("Transport error: {0}")]
    Transport(String),

    /// Key pair or certificate generation failed
    #[error("Certificate generation failed: {0}")]
    Certificate(String),

    /// A supplied certificate file could not be used
    #[error("Certificate file {path} is not a valid PEM certificate: {message}")]
    InvalidCertificate { path: PathBuf, message: String },

    /// The permission set was expected to exist but could not be resolved
    #[error("Permission set \"{identifier}\" does not exist")]
    MissingPermissionSet { identifier: String },

    /// The platform reported success but a follow-up read disagrees
    #[error("Internal consistency error: {0}")]
    Internal(String),

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Create a certificate generation error
    pub fn certificate<S: Into<String>>(message: S) -> Self {
        Self::Certificate(message.into())
    }

    /// Create a remote rejection error
    pub fn remote<S: Into<String>>(operation: S, errors: Vec<RemoteError>) -> Self {
        Self::Remote { operation: operation.into(), errors }
    }

    /// Wrap an I/O error with context
    pub fn io<S: Into<String>>(source: std::io::Error, context: S) -> Self {
        Self::Io { source, context: context.into() }
    }

    /// Whether this is a remote rejection carrying any of the given status codes
    pub fn is_duplicate(&self, status_codes: &[&str]) -> bool {
        match self {
            Error::Remote { errors, .. } => {
                errors.iter().any(|e| status_codes.contains(&e.status_code.as_str()))
            }
            _ => false,
        }
    }

    /// Structured remote detail, if any
    pub fn remote_errors(&self) -> &[RemoteError] {
        match self {
            Error::Remote { errors, .. } => errors,
            _ => &[],
        }
    }
}

fn format_remote_errors(errors: &[RemoteError]) -> String {
    if errors.is_empty() {
        return "no error detail returned".to_string();
    }
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.to_string())
    }
}
