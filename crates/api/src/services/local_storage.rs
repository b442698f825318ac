//! Filesystem artifact storage with HMAC-signed download links.
//!
//! Objects live under `storage.local_dir`. A download link carries an
//! `expires` unix timestamp and a hex HMAC-SHA256 of `"{path}:{expires}"`;
//! the artifacts route checks both before serving the file.

use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use domain::services::{ArtifactStorage, StorageError};
use shared::crypto::{hmac_sha256_hex, verify_hmac_sha256_hex};
use thiserror::Error;

use crate::config::StorageConfig;

/// Why a signed download was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignedUrlError {
    #[error("Invalid artifact path")]
    InvalidPath,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Link has expired")]
    Expired,
}

#[derive(Debug, Clone)]
pub struct LocalArtifactStorage {
    root: PathBuf,
    public_base_url: String,
    signing_secret: String,
}

impl LocalArtifactStorage {
    pub fn new(
        root: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
        signing_secret: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            signing_secret: signing_secret.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(
            &config.local_dir,
            &config.public_base_url,
            &config.signing_secret,
        )
    }

    /// Resolves an object key to a file under the storage root, rejecting
    /// absolute paths and parent-directory segments.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, SignedUrlError> {
        let relative = Path::new(path);
        let mut has_segments = false;
        for component in relative.components() {
            match component {
                Component::Normal(_) => has_segments = true,
                _ => return Err(SignedUrlError::InvalidPath),
            }
        }
        if !has_segments {
            return Err(SignedUrlError::InvalidPath);
        }
        Ok(self.root.join(relative))
    }

    fn signature(&self, path: &str, expires: i64) -> String {
        hmac_sha256_hex(&self.signing_secret, &format!("{}:{}", path, expires))
    }

    /// Builds a download URL for `path` valid until `expires`.
    pub fn sign(&self, path: &str, expires: i64) -> String {
        format!(
            "{}/api/v1/artifacts/{}?expires={}&signature={}",
            self.public_base_url,
            path,
            expires,
            self.signature(path, expires)
        )
    }

    /// Checks a download link and returns the file it refers to.
    pub fn verify(
        &self,
        path: &str,
        expires: i64,
        signature: &str,
        now: i64,
    ) -> Result<PathBuf, SignedUrlError> {
        let file = self.resolve(path)?;
        let message = format!("{}:{}", path, expires);
        if !verify_hmac_sha256_hex(&self.signing_secret, &message, signature) {
            return Err(SignedUrlError::InvalidSignature);
        }
        if expires < now {
            return Err(SignedUrlError::Expired);
        }
        Ok(file)
    }
}

fn io_error(err: std::io::Error) -> StorageError {
    StorageError::Io(err.to_string())
}

#[async_trait::async_trait]
impl ArtifactStorage for LocalArtifactStorage {
    async fn ensure_bucket(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root).await.map_err(io_error)
    }

    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        let file = self
            .resolve(path)
            .map_err(|e| StorageError::Request(format!("{}: {}", e, path)))?;
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        tokio::fs::write(&file, bytes).await.map_err(io_error)?;
        tracing::debug!(path = %file.display(), "Wrote artifact to local storage");
        Ok(())
    }

    async fn signed_url(&self, path: &str, ttl_secs: u64) -> Result<String, StorageError> {
        let file = self
            .resolve(path)
            .map_err(|e| StorageError::Signing(e.to_string()))?;
        if !tokio::fs::try_exists(&file).await.map_err(io_error)? {
            return Err(StorageError::Signing(format!("Object not found: {}", path)));
        }

        let ttl = i64::try_from(ttl_secs)
            .map_err(|_| StorageError::Signing("TTL out of range".to_string()))?;
        Ok(self.sign(path, Utc::now().timestamp() + ttl))
    }
}
