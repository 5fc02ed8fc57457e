//! # Provisioning Orchestrator
//!
//! Sequences one setup run as an explicit state machine:
//!
//! ```text
//! CheckExisting → AcquireCertificate → ProvisionGrant → AssignGrant → ProvisionRegistration → Done
//!       └→ Conflict (error)
//! ```
//!
//! Every stage awaits the previous one and no stage is revisited. A failure at
//! any stage aborts the run; resources created by earlier stages are left in
//! place.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, Instrument};

use crate::certificates::{self, CertificateGenerator, CertificateMaterial};
use crate::errors::{Error, Result};
use crate::platform::{Identity, RemoteResourceGateway};
use crate::provision_span;
use crate::utils::to_identifier;

use super::artifacts::ArtifactWriter;
use super::connected_app::ConnectedAppProvisioner;
use super::permission_set::PermissionSetProvisioner;

/// Where the certificate for the connected app comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateSource {
    /// Use an existing PEM certificate file; its private key stays with the caller
    Supplied(PathBuf),
    /// Generate a key pair and certificate, writing both into `output_dir`
    Generate { output_dir: PathBuf },
}

impl Default for CertificateSource {
    fn default() -> Self {
        Self::Generate { output_dir: PathBuf::from(".") }
    }
}

/// Input to a provisioning run
#[derive(Debug, Clone)]
pub struct SetupRequest {
    pub connected_app_label: String,
    /// Defaults to the connected app label
    pub permission_set_label: Option<String>,
    /// Replace an existing connected app instead of failing
    pub force: bool,
    pub certificate: CertificateSource,
}

impl SetupRequest {
    pub fn new<S: Into<String>>(connected_app_label: S) -> Self {
        Self {
            connected_app_label: connected_app_label.into(),
            permission_set_label: None,
            force: false,
            certificate: CertificateSource::default(),
        }
    }

    pub fn with_certificate(mut self, certificate: CertificateSource) -> Self {
        self.certificate = certificate;
        self
    }

    pub fn with_permission_set<S: Into<String>>(mut self, label: S) -> Self {
        self.permission_set_label = Some(label.into());
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn permission_set_label(&self) -> &str {
        self.permission_set_label.as_deref().unwrap_or(&self.connected_app_label)
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningResult {
    pub identifier: String,
    pub consumer_key: String,
    pub certificate_pem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key_pem: Option<String>,
    pub username: String,
    pub permission_set_label: String,
    pub permission_set_identifier: String,
    /// Where the generated private key was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<PathBuf>,
    /// Whether an existing connected app was replaced
    pub replaced: bool,
}

/// Certificate material plus where its private key ended up, if anywhere
#[derive(Debug)]
struct AcquiredCertificate {
    material: CertificateMaterial,
    private_key_path: Option<PathBuf>,
}

#[derive(Debug)]
enum Stage {
    CheckExisting,
    AcquireCertificate { replace: bool },
    ProvisionGrant { replace: bool, certificate: AcquiredCertificate },
    AssignGrant { replace: bool, certificate: AcquiredCertificate },
    ProvisionRegistration { replace: bool, certificate: AcquiredCertificate, principal: Identity },
    Done(ProvisioningResult),
}

impl Stage {
    fn name(&self) -> &'static str {
        match self {
            Stage::CheckExisting => "check_existing",
            Stage::AcquireCertificate { .. } => "acquire_certificate",
            Stage::ProvisionGrant { .. } => "provision_grant",
            Stage::AssignGrant { .. } => "assign_grant",
            Stage::ProvisionRegistration { .. } => "provision_registration",
            Stage::Done(_) => "done",
        }
    }
}

/// Runs setup against a [`RemoteResourceGateway`]
pub struct ProvisioningOrchestrator {
    gateway: Arc<dyn RemoteResourceGateway>,
    permission_sets: PermissionSetProvisioner,
    connected_apps: ConnectedAppProvisioner,
    generator: CertificateGenerator,
}

impl ProvisioningOrchestrator {
    pub fn new(gateway: Arc<dyn RemoteResourceGateway>) -> Self {
        Self {
            permission_sets: PermissionSetProvisioner::new(gateway.clone()),
            connected_apps: ConnectedAppProvisioner::new(gateway.clone()),
            generator: CertificateGenerator::new(),
            gateway,
        }
    }

    pub async fn run(&self, request: SetupRequest) -> Result<ProvisioningResult> {
        let identifier = to_identifier(&request.connected_app_label);
        let span = provision_span!(identifier, force = request.force);
        self.drive(&request, &identifier).instrument(span).await
    }

    async fn drive(&self, request: &SetupRequest, identifier: &str) -> Result<ProvisioningResult> {
        let mut stage = Stage::CheckExisting;
        loop {
            debug!(stage = stage.name(), "Entering stage");
            stage = match stage {
                Stage::CheckExisting => {
                    let exists = self.connected_apps.exists(&request.connected_app_label).await?;
                    if exists && !request.force {
                        return Err(Error::Conflict { identifier: identifier.to_string() });
                    }
                    if exists {
                        info!("Connected app exists and will be replaced");
                    }
                    Stage::AcquireCertificate { replace: exists }
                }
                Stage::AcquireCertificate { replace } => {
                    let certificate = self.acquire_certificate(&request.certificate).await?;
                    Stage::ProvisionGrant { replace, certificate }
                }
                Stage::ProvisionGrant { replace, certificate } => {
                    let description = format!(
                        "Permission set for the {} connected app",
                        request.connected_app_label
                    );
                    self.permission_sets
                        .ensure_exists(request.permission_set_label(), &description)
                        .await?;
                    Stage::AssignGrant { replace, certificate }
                }
                Stage::AssignGrant { replace, certificate } => {
                    let principal = self.gateway.identity().await?;
                    self.permission_sets
                        .assign(request.permission_set_label(), &principal.user_id)
                        .await?;
                    Stage::ProvisionRegistration { replace, certificate, principal }
                }
                Stage::ProvisionRegistration { replace, certificate, principal } => {
                    let consumer_key = self
                        .connected_apps
                        .create_or_replace(
                            &request.connected_app_label,
                            request.permission_set_label(),
                            &certificate.material.certificate_pem,
                            &principal.username,
                            replace,
                        )
                        .await?;

                    Stage::Done(ProvisioningResult {
                        identifier: identifier.to_string(),
                        consumer_key,
                        certificate_pem: certificate.material.certificate_pem,
                        private_key_pem: certificate.material.private_key_pem,
                        username: principal.username,
                        permission_set_label: request.permission_set_label().to_string(),
                        permission_set_identifier: to_identifier(request.permission_set_label()),
                        private_key_path: certificate.private_key_path,
                        replaced: replace,
                    })
                }
                Stage::Done(result) => {
                    info!(consumer_key = %result.consumer_key, "Provisioning complete");
                    return Ok(result);
                }
            };
        }
    }

    async fn acquire_certificate(&self, source: &CertificateSource) -> Result<AcquiredCertificate> {
        match source {
            CertificateSource::Supplied(path) => {
                info!(path = %path.display(), "Using supplied certificate");
                let material = certificates::load_certificate_file(path).await?;
                Ok(AcquiredCertificate { material, private_key_path: None })
            }
            CertificateSource::Generate { output_dir } => {
                let mut writer = ArtifactWriter::new(output_dir.clone());
                let material = self.generator.generate(Some(&mut writer)).await?;
                Ok(AcquiredCertificate {
                    material,
                    private_key_path: Some(writer.key_path().to_path_buf()),
                })
            }
        }
    }
}
