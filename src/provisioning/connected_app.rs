//! Connected app provisioning
//!
//! Unlike permission sets, a duplicate connected app is never treated as
//! benign: an existing app must be detected up front and either reported or
//! explicitly replaced.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::{Error, Result};
use crate::platform::{RemoteResourceGateway, ResourceKind};
use crate::utils::to_identifier;

pub const CONNECTED_APP_DESCRIPTION: &str =
    "Connected app used by continuous integration to deploy new versions of metadata";
pub const CALLBACK_URL: &str = "http://localhost:1717/OauthRedirect";
pub const OAUTH_SCOPES: [&str; 3] = ["Api", "Web", "RefreshToken"];
pub const IP_RELAXATION: &str = "BYPASS";
pub const REFRESH_TOKEN_POLICY: &str = "infinite";

/// Metadata payload for a new connected app
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedApp {
    pub full_name: String,
    pub label: String,
    pub description: String,
    pub contact_email: String,
    pub permission_set_name: String,
    pub oauth_config: OAuthConfig,
    pub oauth_policy: OAuthPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthConfig {
    pub callback_url: String,
    pub certificate: String,
    pub is_admin_approved: bool,
    pub is_consumer_secret_optional: bool,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthPolicy {
    pub ip_relaxation: String,
    pub refresh_token_policy: String,
}

impl ConnectedApp {
    /// The fixed CI configuration bound to `certificate_pem` and the permission set
    pub fn for_ci(label: &str, permission_set: &str, certificate_pem: &str, contact: &str) -> Self {
        Self {
            full_name: to_identifier(label),
            label: label.to_string(),
            description: CONNECTED_APP_DESCRIPTION.to_string(),
            contact_email: contact.to_string(),
            permission_set_name: permission_set.to_string(),
            oauth_config: OAuthConfig {
                callback_url: CALLBACK_URL.to_string(),
                certificate: certificate_pem.to_string(),
                is_admin_approved: true,
                is_consumer_secret_optional: true,
                scopes: OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
            },
            oauth_policy: OAuthPolicy {
                ip_relaxation: IP_RELAXATION.to_string(),
                refresh_token_policy: REFRESH_TOKEN_POLICY.to_string(),
            },
        }
    }
}

/// The parts of a read connected app this crate looks at
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectedAppRecord {
    full_name: Option<String>,
    oauth_config: Option<ConsumerConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConsumerConfig {
    consumer_key: Option<String>,
}

pub struct ConnectedAppProvisioner {
    gateway: Arc<dyn RemoteResourceGateway>,
}

impl ConnectedAppProvisioner {
    pub fn new(gateway: Arc<dyn RemoteResourceGateway>) -> Self {
        Self { gateway }
    }

    async fn read(&self, identifier: &str) -> Result<ConnectedAppRecord> {
        match self.gateway.metadata_read(ResourceKind::ConnectedApp, identifier).await? {
            Some(value) => serde_json::from_value(value).map_err(|e| {
                Error::internal(format!("Unexpected ConnectedApp {} record: {}", identifier, e))
            }),
            None => Ok(ConnectedAppRecord::default()),
        }
    }

    /// Whether a connected app for `label` exists
    pub async fn exists(&self, label: &str) -> Result<bool> {
        Ok(self.read(&to_identifier(label)).await?.full_name.is_some())
    }

    /// Create the connected app, deleting an existing one first when
    /// `replace_existing` is set, and return its consumer key.
    pub async fn create_or_replace(
        &self,
        label: &str,
        permission_set_label: &str,
        certificate_pem: &str,
        contact: &str,
        replace_existing: bool,
    ) -> Result<String> {
        let identifier = to_identifier(label);

        if replace_existing {
            self.delete_for_replacement(&identifier).await;
        }

        let app = ConnectedApp::for_ci(
            label,
            &to_identifier(permission_set_label),
            certificate_pem,
            contact,
        );
        let record = serde_json::to_value(&app)
            .map_err(|e| Error::internal(format!("Failed to serialize connected app: {}", e)))?;

        self.gateway
            .metadata_create(ResourceKind::ConnectedApp, record)
            .await?
            .into_result("Create ConnectedApp")?;
        info!(connected_app = %identifier, "Created connected app");

        let created = self.read(&identifier).await?;
        created.oauth_config.and_then(|config| config.consumer_key).ok_or_else(|| {
            Error::internal(format!(
                "Connected app {} was created but no consumer key could be read back",
                identifier
            ))
        })
    }

    /// A failed delete is only reported; if it really did not take effect the
    /// following create fails on its own.
    async fn delete_for_replacement(&self, identifier: &str) {
        let outcome = self
            .gateway
            .metadata_delete(ResourceKind::ConnectedApp, identifier)
            .await
            .and_then(|result| result.into_result("Delete ConnectedApp"));

        match outcome {
            Ok(_) => info!(connected_app = %identifier, "Deleted existing connected app"),
            Err(error) => {
                warn!(
                    connected_app = %identifier,
                    error = %error,
                    "Failed to delete existing connected app"
                )
            }
        }
    }
}
