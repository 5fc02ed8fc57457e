//! Wire types exchanged with the remote platform.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Error, Result};

/// Kinds of remote resources this crate touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    PermissionSet,
    PermissionSetAssignment,
    ConnectedApp,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::PermissionSet => "PermissionSet",
            ResourceKind::PermissionSetAssignment => "PermissionSetAssignment",
            ResourceKind::ConnectedApp => "ConnectedApp",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value the platform may send either bare or wrapped in a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }

    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value),
            OneOrMany::Many(values) => values,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

/// Structured error detail returned by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteError {
    #[serde(default)]
    pub fields: OneOrMany<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, alias = "errorCode")]
    pub status_code: String,
}

impl RemoteError {
    /// Error detail for a failure that carried no structure beyond a message
    pub fn from_message<S: Into<String>>(message: S) -> Self {
        Self { fields: OneOrMany::default(), message: message.into(), status_code: String::new() }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.fields.as_slice().join(", "), self.message)?;
        if !self.status_code.is_empty() {
            write!(f, " ({})", self.status_code)?;
        }
        Ok(())
    }
}

/// Outcome of a create or delete call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResult {
    pub success: bool,
    #[serde(default, alias = "id", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub errors: OneOrMany<RemoteError>,
}

impl SaveResult {
    pub fn succeeded<S: Into<String>>(full_name: S) -> Self {
        Self { success: true, full_name: Some(full_name.into()), errors: OneOrMany::default() }
    }

    pub fn failed(errors: Vec<RemoteError>) -> Self {
        Self { success: false, full_name: None, errors: OneOrMany::Many(errors) }
    }

    /// Turn an unsuccessful result into `Error::Remote` for `operation`
    pub fn into_result(self, operation: &str) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(Error::remote(operation, self.errors.into_vec()))
        }
    }
}

/// Result of a SOQL query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub total_size: u64,
    #[serde(default = "default_done")]
    pub done: bool,
    #[serde(default)]
    pub records: Vec<Value>,
}

fn default_done() -> bool {
    true
}

impl QueryResult {
    pub fn count(total_size: u64) -> Self {
        Self { total_size, done: true, records: Vec::new() }
    }

    pub fn with_records(records: Vec<Value>) -> Self {
        Self { total_size: records.len() as u64, done: true, records }
    }
}

/// The authenticated operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub username: String,
}
