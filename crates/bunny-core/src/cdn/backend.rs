//! Object backend trait and the in-memory implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;

/// Trait for object storage backends addressed by zone-relative paths.
///
/// Paths never start with a slash.
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Write `contents` to `path`, replacing any existing object
    async fn put(&self, path: &str, contents: &[u8]) -> Result<()>;

    /// Check whether an object exists at `path`
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Delete the object at `path`, `false` when there was nothing to delete
    async fn delete(&self, path: &str) -> Result<bool>;

    /// Read the object at `path`
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Get a human-readable name for this backend
    fn backend_name(&self) -> &'static str;
}

/// In-process object backend
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Stored paths, sorted
    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.read().await.keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl ObjectBackend for MemoryBackend {
    async fn put(&self, path: &str, contents: &[u8]) -> Result<()> {
        self.objects
            .write()
            .await
            .insert(path.to_string(), contents.to_vec());
        debug!("Stored {} bytes at {}", contents.len(), path);
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.objects.read().await.contains_key(path))
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        Ok(self.objects.write().await.remove(path).is_some())
    }

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.objects.read().await.get(path).cloned())
    }

    fn backend_name(&self) -> &'static str {
        "In-Memory Storage"
    }
}
