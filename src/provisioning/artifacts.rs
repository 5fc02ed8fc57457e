//! Persisting generated key material
//!
//! [`ArtifactWriter`] plugs into certificate generation as a set of hooks and
//! writes each PEM artifact as soon as it is produced.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::certificates::GenerationHooks;
use crate::errors::{Error, Result};

pub const PRIVATE_KEY_FILE: &str = "server.key";
pub const CERTIFICATE_FILE: &str = "server.crt";

/// Writes `server.key` and `server.crt` into an output directory
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
    key_path: PathBuf,
    cert_path: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        Self {
            key_path: output_dir.join(PRIVATE_KEY_FILE),
            cert_path: output_dir.join(CERTIFICATE_FILE),
            output_dir,
        }
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    pub fn cert_path(&self) -> &Path {
        &self.cert_path
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<()> {
        tokio::fs::write(path, contents)
            .await
            .map_err(|e| Error::io(e, format!("Failed to write {}", path.display())))
    }

    /// Write the private key without it ever being readable by other users
    async fn write_private(&self, path: &Path, contents: &str) -> Result<()> {
        let write_error =
            |e: std::io::Error| Error::io(e, format!("Failed to write {}", path.display()));

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(path).await.map_err(write_error)?;
        // A pre-existing file keeps its old mode through open()
        restrict_to_owner(path).await?;
        file.write_all(contents.as_bytes()).await.map_err(write_error)?;
        file.flush().await.map_err(write_error)
    }
}

#[async_trait]
impl GenerationHooks for ArtifactWriter {
    async fn before_generate_key_pair(&mut self) -> Result<()> {
        tokio::fs::create_dir_all(&self.output_dir).await.map_err(|e| {
            Error::io(e, format!("Failed to create directory {}", self.output_dir.display()))
        })?;
        info!("Generating key pair");
        Ok(())
    }

    async fn on_generate_key_pair(&mut self, private_key_pem: &str) -> Result<()> {
        self.write_private(&self.key_path, private_key_pem).await?;
        info!(path = %self.key_path.display(), "Wrote private key");
        Ok(())
    }

    async fn before_generate_certificate(&mut self) -> Result<()> {
        info!("Generating self-signed certificate");
        Ok(())
    }

    async fn on_generate_certificate(&mut self, certificate_pem: &str) -> Result<()> {
        self.write(&self.cert_path, certificate_pem).await?;
        info!(path = %self.cert_path.display(), "Wrote certificate");
        Ok(())
    }
}

#[cfg(unix)]
async fn restrict_to_owner(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .map_err(|e| Error::io(e, format!("Failed to restrict permissions on {}", path.display())))
}

#[cfg(not(unix))]
async fn restrict_to_owner(_path: &Path) -> Result<()> {
    Ok(())
}
