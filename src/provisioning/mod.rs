//! # Provisioning
//!
//! Idempotent provisioning of the remote resources a CI pipeline needs:
//! a permission set assigned to the operator and a connected app that trusts
//! the pipeline's certificate.

pub mod artifacts;
pub mod connected_app;
pub mod orchestrator;
pub mod permission_set;

pub use artifacts::ArtifactWriter;
pub use connected_app::{ConnectedApp, ConnectedAppProvisioner, OAuthConfig, OAuthPolicy};
pub use orchestrator::{
    CertificateSource, ProvisioningOrchestrator, ProvisioningResult, SetupRequest,
};
pub use permission_set::{PermissionSet, PermissionSetProvisioner};
