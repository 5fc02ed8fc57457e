//! # ci-provision
//!
//! Provisions machine-to-machine trust material for a CI pipeline: a
//! certificate/private-key pair, a permission set bound to the invoking
//! operator, and a certificate-authenticated connected app.
//!
//! ## Architecture
//!
//! ```text
//! CLI → ProvisioningOrchestrator → PermissionSetProvisioner ─┐
//!              │                 → ConnectedAppProvisioner ──┼→ RemoteResourceGateway → platform
//!              └→ CertificateGenerator (+ ArtifactWriter)    ┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ci_provision::platform::{HttpGateway, HttpGatewayConfig};
//! use ci_provision::provisioning::{CertificateSource, ProvisioningOrchestrator, SetupRequest};
//!
//! # async fn run() -> ci_provision::Result<()> {
//! let gateway = Arc::new(HttpGateway::new(HttpGatewayConfig::new(
//!     "https://example.my.salesforce.com",
//!     "00D...token",
//! ))?);
//! let request = SetupRequest::new("Continuous Integration")
//!     .with_certificate(CertificateSource::Generate { output_dir: ".".into() });
//! let result = ProvisioningOrchestrator::new(gateway).run(request).await?;
//! println!("consumer key: {}", result.consumer_key);
//! # Ok(())
//! # }
//! ```

pub mod certificates;
pub mod cli;
pub mod errors;
pub mod observability;
pub mod platform;
pub mod provisioning;
pub mod utils;

pub use errors::{Error, Result};
pub use utils::to_identifier;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
