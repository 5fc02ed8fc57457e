//! # Remote Platform Gateway
//!
//! The provisioning core talks to the platform only through
//! [`RemoteResourceGateway`], so tests can substitute an in-memory fake and the
//! CLI can plug in the REST transport in [`http`].

pub mod http;
pub mod types;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::Result;

pub use http::{HttpGateway, HttpGatewayConfig};
pub use types::{Identity, OneOrMany, QueryResult, RemoteError, ResourceKind, SaveResult};

/// Capability set consumed from the remote platform
///
/// Create and delete calls may report rejection either as `Ok(SaveResult)` with
/// `success == false` or as `Err(Error::Remote)`; callers treat both the same.
#[async_trait]
pub trait RemoteResourceGateway: Send + Sync {
    /// Read a metadata component by full name, `None` when it does not exist
    async fn metadata_read(&self, kind: ResourceKind, identifier: &str) -> Result<Option<Value>>;

    /// Create a metadata component
    async fn metadata_create(&self, kind: ResourceKind, record: Value) -> Result<SaveResult>;

    /// Delete a metadata component by full name
    async fn metadata_delete(&self, kind: ResourceKind, identifier: &str) -> Result<SaveResult>;

    /// Run a SOQL query
    async fn query(&self, soql: &str) -> Result<QueryResult>;

    /// Identity of the authenticated operator
    async fn identity(&self) -> Result<Identity>;

    /// Create a data record
    async fn record_create(&self, kind: ResourceKind, fields: Value) -> Result<SaveResult>;
}
