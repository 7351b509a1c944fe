//! Upload, delete and public-URL operations over an [`ObjectBackend`]

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::backend::ObjectBackend;
use super::bunny::BunnyStorageBackend;
use super::config::BackendConfig;
use crate::error::{BunnyError, Result};

/// Default destination directory for uploads
pub const DEFAULT_UPLOAD_DIR: &str = "temp";

/// An uploaded file: the client's original name plus its bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    original_name: String,
    contents: Vec<u8>,
}

impl UploadedFile {
    pub fn new(original_name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            original_name: original_name.into(),
            contents: contents.into(),
        }
    }

    /// Read a local file, using its file name as the original name
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let original_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                BunnyError::InvalidUploadInput(format!("{:?} has no usable file name", path))
            })?;

        let contents = tokio::fs::read(path).await?;
        Ok(Self::new(original_name, contents))
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    /// Text after the last `.` of the original name, if any
    pub fn original_extension(&self) -> Option<&str> {
        self.original_name
            .trim()
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }

    /// Reject names that cannot identify a single uploaded file
    pub fn validate(&self) -> Result<()> {
        let name = self.original_name.trim();

        if name.is_empty() {
            return Err(BunnyError::InvalidUploadInput(
                "original file name is empty".to_string(),
            ));
        }

        if name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(BunnyError::InvalidUploadInput(format!(
                "'{}' is not a file name",
                name
            )));
        }

        Ok(())
    }
}

/// Build the public URL for a stored path.
///
/// With a zone base, exactly one slash separates the base from the path.
pub fn build_public_url(cdn_url: Option<&str>, path: &str, include_zone_base: bool) -> String {
    match cdn_url.filter(|base| include_zone_base && !base.is_empty()) {
        Some(base) => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.strip_prefix('/').unwrap_or(path)
        ),
        None => path.to_string(),
    }
}

/// Object storage facade
#[derive(Clone)]
pub struct ObjectStorage {
    backend: Arc<dyn ObjectBackend>,
    cdn_url: Option<String>,
}

impl ObjectStorage {
    /// Create a facade over an arbitrary backend
    pub fn new(backend: Arc<dyn ObjectBackend>, cdn_url: Option<String>) -> Self {
        Self { backend, cdn_url }
    }

    /// Create a facade over the BunnyCDN Storage API
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let backend = BunnyStorageBackend::new(config)?;
        info!(
            "Storage zone '{}' wired via {} ({})",
            config.storage_zone,
            backend.backend_name(),
            config.storage_host()
        );
        Ok(Self::new(Arc::new(backend), config.cdn_url.clone()))
    }

    /// Get the backend name
    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Upload a file into `path`.
    ///
    /// With `filename`, the stored name is `{filename}.{original extension}`;
    /// otherwise a unique prefix is joined to the original name. Returns the
    /// stored path with a single leading slash.
    pub async fn upload(
        &self,
        file: &UploadedFile,
        path: &str,
        filename: Option<&str>,
    ) -> Result<String> {
        if let Err(e) = file.validate() {
            error!("Invalid file provided to upload: {}", e);
            return Err(e);
        }

        let final_name = match filename.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => match file.original_extension() {
                Some(ext) => format!("{}.{}", name, ext),
                None => name.to_string(),
            },
            None => format!("{}_{}", unique_id(), file.original_name().trim()),
        };

        let full_path = format!("{}/{}", path.trim_end_matches('/'), final_name);
        let key = full_path.trim_start_matches('/');

        if let Err(e) = self.backend.put(key, file.contents()).await {
            error!("Upload to {} failed: {}", key, e);
            return Err(match e {
                BunnyError::BackendWriteFailed { .. } => e,
                other => BunnyError::BackendWriteFailed {
                    path: key.to_string(),
                    reason: other.to_string(),
                },
            });
        }

        info!("Uploaded {} ({} bytes)", key, file.contents().len());
        Ok(format!("/{}", key))
    }

    /// Upload with the default directory and a generated name
    pub async fn upload_temp(&self, file: &UploadedFile) -> Result<String> {
        self.upload(file, DEFAULT_UPLOAD_DIR, None).await
    }

    /// Public URL for a stored path
    pub fn public_url(&self, path: &str, include_zone_base: bool) -> String {
        build_public_url(self.cdn_url.as_deref(), path, include_zone_base)
    }

    /// Check whether a stored path exists; backend errors count as absent
    pub async fn exists(&self, path: &str) -> bool {
        match normalize(path) {
            Some(key) => self.exists_key(key).await,
            None => false,
        }
    }

    async fn exists_key(&self, key: &str) -> bool {
        match self.backend.exists(key).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Existence check for {} failed: {}", key, e);
                false
            }
        }
    }

    /// Delete a stored path.
    ///
    /// `false` when the path is empty, absent, or the backend refused.
    pub async fn delete(&self, path: &str) -> bool {
        let Some(key) = normalize(path) else {
            return false;
        };

        if !self.exists_key(key).await {
            debug!("Nothing to delete at {}", key);
            return false;
        }

        match self.backend.delete(key).await {
            Ok(deleted) => {
                if deleted {
                    info!("Deleted {}", key);
                }
                deleted
            }
            Err(e) => {
                error!("Deleting {} failed: {}", key, e);
                false
            }
        }
    }
}

impl std::fmt::Debug for ObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorage")
            .field("backend", &self.backend.backend_name())
            .field("cdn_url", &self.cdn_url)
            .finish()
    }
}

/// Strip one leading slash; empty paths address nothing
fn normalize(path: &str) -> Option<&str> {
    let key = path.strip_prefix('/').unwrap_or(path);
    (!key.is_empty()).then_some(key)
}

fn unique_id() -> String {
    Uuid::new_v4().simple().to_string()
}
