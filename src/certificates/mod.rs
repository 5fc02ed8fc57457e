//! # Certificate Material
//!
//! Generates a fresh RSA key pair and a self-signed certificate over it, or
//! imports a caller-supplied certificate. Generation reports progress through
//! optional [`GenerationHooks`] so that persisting the PEM artifacts and
//! rendering progress stay with the caller; this module performs no file
//! writes of its own.

pub mod der;

use std::path::Path;

use async_trait::async_trait;
use rand::Rng;
use rsa::pkcs1::der::pem;
use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding};
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use serde::Serialize;
use sha2::Sha256;
use time::OffsetDateTime;
use tracing::debug;

use crate::errors::{Error, Result};
use der::{DistinguishedName, TbsCertificate};

/// RSA modulus size for generated keys
pub const KEY_BITS: usize = 2048;

/// Lifetime of generated certificates
pub const VALIDITY_DAYS: i64 = 365;

/// Certificate and, when generated here, its private key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateMaterial {
    pub certificate_pem: String,
    /// Absent when the certificate was supplied by the caller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key_pem: Option<String>,
}

impl CertificateMaterial {
    pub fn supplied<S: Into<String>>(certificate_pem: S) -> Self {
        Self { certificate_pem: certificate_pem.into(), private_key_pem: None }
    }
}

/// Progress callbacks, invoked in declaration order and awaited one by one.
///
/// An error returned from a hook aborts generation.
#[async_trait]
pub trait GenerationHooks: Send {
    async fn before_generate_key_pair(&mut self) -> Result<()> {
        Ok(())
    }

    async fn on_generate_key_pair(&mut self, _private_key_pem: &str) -> Result<()> {
        Ok(())
    }

    async fn before_generate_certificate(&mut self) -> Result<()> {
        Ok(())
    }

    async fn on_generate_certificate(&mut self, _certificate_pem: &str) -> Result<()> {
        Ok(())
    }
}

/// Self-signed certificate generator
#[derive(Debug, Clone)]
pub struct CertificateGenerator {
    name: DistinguishedName,
    validity: time::Duration,
}

impl Default for CertificateGenerator {
    fn default() -> Self {
        Self {
            name: DistinguishedName {
                common_name: "ci-provision".to_string(),
                organization: "Continuous Integration".to_string(),
                organizational_unit: "ci-provision setup".to_string(),
            },
            validity: time::Duration::days(VALIDITY_DAYS),
        }
    }
}

impl CertificateGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subject (and issuer) of generated certificates
    pub fn subject(&self) -> &DistinguishedName {
        &self.name
    }

    /// Generate a key pair and a certificate signed by it.
    ///
    /// Failures are returned as-is; key generation is never retried.
    pub async fn generate(
        &self,
        mut hooks: Option<&mut dyn GenerationHooks>,
    ) -> Result<CertificateMaterial> {
        if let Some(hooks) = hooks.as_deref_mut() {
            hooks.before_generate_key_pair().await?;
        }

        let private_key = generate_key_pair().await?;
        let private_key_pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| Error::certificate(format!("failed to encode private key: {}", e)))?
            .as_str()
            .to_owned();
        debug!(bits = KEY_BITS, "Generated RSA key pair");

        if let Some(hooks) = hooks.as_deref_mut() {
            hooks.on_generate_key_pair(&private_key_pem).await?;
            hooks.before_generate_certificate().await?;
        }

        let certificate_pem = self.self_sign(&private_key)?;
        debug!(subject = %self.name.common_name, "Generated self-signed certificate");

        if let Some(hooks) = hooks.as_deref_mut() {
            hooks.on_generate_certificate(&certificate_pem).await?;
        }

        Ok(CertificateMaterial { certificate_pem, private_key_pem: Some(private_key_pem) })
    }

    fn self_sign(&self, private_key: &RsaPrivateKey) -> Result<String> {
        let public_key_der = private_key
            .to_public_key()
            .to_pkcs1_der()
            .map_err(|e| Error::certificate(format!("failed to encode public key: {}", e)))?
            .as_bytes()
            .to_vec();

        let not_before = OffsetDateTime::now_utc();
        let tbs = TbsCertificate {
            serial: rand::thread_rng().gen_range(1..=i64::MAX as u64),
            name: self.name.clone(),
            not_before,
            not_after: not_before + self.validity,
            public_key_der,
        };

        let signing_key = SigningKey::<Sha256>::new(private_key.clone());
        let signature = signing_key
            .try_sign(&tbs.to_der()?)
            .map_err(|e| Error::certificate(format!("failed to sign certificate: {}", e)))?;

        let certificate_der = der::assemble_certificate(&tbs, &signature.to_vec())?;
        pem::encode_string("CERTIFICATE", LineEnding::LF, &certificate_der)
            .map_err(|e| Error::certificate(format!("failed to encode certificate: {}", e)))
    }
}

async fn generate_key_pair() -> Result<RsaPrivateKey> {
    tokio::task::spawn_blocking(|| RsaPrivateKey::new(&mut rand::rngs::OsRng, KEY_BITS))
        .await
        .map_err(|e| Error::certificate(format!("key generation task failed: {}", e)))?
        .map_err(|e| Error::certificate(format!("RSA key generation failed: {}", e)))
}

/// Check that `contents` holds a PEM encoded X.509 certificate.
pub fn validate_certificate_pem(path: &Path, contents: &str) -> Result<()> {
    let invalid = |message: String| Error::InvalidCertificate { path: path.to_path_buf(), message };

    let (_, pem) = x509_parser::pem::parse_x509_pem(contents.as_bytes())
        .map_err(|e| invalid(e.to_string()))?;
    if pem.label != "CERTIFICATE" {
        return Err(invalid(format!("unexpected PEM block '{}'", pem.label)));
    }
    pem.parse_x509().map_err(|e| invalid(e.to_string()))?;
    Ok(())
}

/// Read a caller-supplied certificate file; the contents are used verbatim.
pub async fn load_certificate_file(path: &Path) -> Result<CertificateMaterial> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        Error::io(e, format!("Failed to read certificate file {}", path.display()))
    })?;
    validate_certificate_pem(path, &contents)?;
    Ok(CertificateMaterial::supplied(contents))
}
