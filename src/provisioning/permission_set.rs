//! Permission set provisioning
//!
//! Creation and assignment are both idempotent: an existing permission set or
//! assignment is the desired state, not an error.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::errors::{Error, Result};
use crate::platform::{RemoteResourceGateway, ResourceKind};
use crate::utils::to_identifier;

/// Remote status codes that mean a permission set with this name already exists
pub const DUPLICATE_PERMISSION_SET_CODES: &[&str] =
    &["DUPLICATE_VALUE", "DUPLICATE_DEVELOPER_NAME"];

/// Remote status codes that mean the assignment is already in place
pub const DUPLICATE_ASSIGNMENT_CODES: &[&str] = &["DUPLICATE_VALUE"];

/// Metadata payload for a new permission set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSet {
    pub full_name: String,
    pub label: String,
    pub description: String,
}

pub struct PermissionSetProvisioner {
    gateway: Arc<dyn RemoteResourceGateway>,
}

impl PermissionSetProvisioner {
    pub fn new(gateway: Arc<dyn RemoteResourceGateway>) -> Self {
        Self { gateway }
    }

    /// Ensure a permission set exists for `label`.
    ///
    /// Returns `true` when this call created it, `false` when it already
    /// existed, including when the create lost a race to a concurrent creator.
    pub async fn ensure_exists(&self, label: &str, description: &str) -> Result<bool> {
        let identifier = to_identifier(label);

        let count = self
            .gateway
            .query(&format!("SELECT COUNT() FROM PermissionSet WHERE Name = '{}'", identifier))
            .await?;
        if count.total_size > 0 {
            debug!(permission_set = %identifier, "Permission set already exists");
            return Ok(false);
        }

        let permission_set = PermissionSet {
            full_name: identifier.clone(),
            label: label.to_string(),
            description: description.to_string(),
        };
        let record = serde_json::to_value(&permission_set)
            .map_err(|e| Error::internal(format!("Failed to serialize permission set: {}", e)))?;

        let outcome = self
            .gateway
            .metadata_create(ResourceKind::PermissionSet, record)
            .await
            .and_then(|result| result.into_result("Create PermissionSet"));

        match outcome {
            Ok(_) => {
                info!(permission_set = %identifier, "Created permission set");
                Ok(true)
            }
            Err(error) if error.is_duplicate(DUPLICATE_PERMISSION_SET_CODES) => {
                debug!(permission_set = %identifier, "Permission set was created concurrently");
                Ok(false)
            }
            Err(error) => Err(error),
        }
    }

    /// Assign the permission set for `label` to the principal `principal_id`.
    ///
    /// The permission set must already exist.
    pub async fn assign(&self, label: &str, principal_id: &str) -> Result<()> {
        let identifier = to_identifier(label);

        let result = self
            .gateway
            .query(&format!("SELECT Id, Name FROM PermissionSet WHERE Name = '{}'", identifier))
            .await?;
        let permission_set_id = match result.records.as_slice() {
            [] => return Err(Error::MissingPermissionSet { identifier }),
            [record] => record
                .get("Id")
                .and_then(|id| id.as_str())
                .ok_or_else(|| {
                    Error::internal(format!("Permission set {} query returned no Id", identifier))
                })?
                .to_string(),
            records => {
                return Err(Error::internal(format!(
                    "Expected one permission set named {} but found {}",
                    identifier,
                    records.len()
                )))
            }
        };

        let fields = json!({
            "PermissionSetId": permission_set_id,
            "AssigneeId": principal_id,
        });
        let outcome = self
            .gateway
            .record_create(ResourceKind::PermissionSetAssignment, fields)
            .await
            .and_then(|result| result.into_result("Create PermissionSetAssignment"));

        match outcome {
            Ok(_) => {
                info!(
                    permission_set = %identifier,
                    principal = %principal_id,
                    "Assigned permission set"
                );
                Ok(())
            }
            Err(error) if error.is_duplicate(DUPLICATE_ASSIGNMENT_CODES) => {
                debug!(
                    permission_set = %identifier,
                    principal = %principal_id,
                    "Permission set already assigned"
                );
                Ok(())
            }
            Err(error) => Err(error),
        }
    }
}
