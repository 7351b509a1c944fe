//! File-backed credential cache
//!
//! The cache file's entire content is the raw resolved key. Writes go through
//! a temp file and a rename so readers never observe a half-written key.

use async_trait::async_trait;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

use super::CredentialCache;
use crate::credential::AccessKey;
use crate::error::{BunnyError, Result};

/// Default file name inside the data directory
const CACHE_FILE_NAME: &str = "bunny_key";

/// File-backed credential cache
#[derive(Debug, Clone)]
pub struct FileKeyCache {
    /// Location of the cache file
    path: PathBuf,
    /// Entries older than this are treated as a miss
    max_age: Option<Duration>,
}

impl FileKeyCache {
    /// Create a cache at the platform data directory
    pub fn new() -> Result<Self> {
        Ok(Self::at(Self::default_path()?))
    }

    /// Create a cache at an explicit file path
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_age: None,
        }
    }

    /// Expire cached entries after `max_age`
    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    /// Get the default cache file location
    pub fn default_path() -> Result<PathBuf> {
        ProjectDirs::from("id", "btekno", "bunny-secret")
            .map(|dirs| dirs.data_dir().join(CACHE_FILE_NAME))
            .ok_or_else(|| BunnyError::Storage("Could not determine data directory".to_string()))
    }

    /// Get the cache file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file at `path` is older than the configured max age
    async fn is_stale(&self) -> Result<bool> {
        let Some(max_age) = self.max_age else {
            return Ok(false);
        };

        let modified = tokio::fs::metadata(&self.path).await?.modified()?;
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);

        Ok(age > max_age)
    }
}

#[async_trait]
impl CredentialCache for FileKeyCache {
    async fn load(&self) -> Result<Option<AccessKey>> {
        if !tokio::fs::try_exists(&self.path).await? {
            debug!("No credential cache file at {:?}", self.path);
            return Ok(None);
        }

        if self.is_stale().await? {
            warn!("Credential cache at {:?} is older than its max age, ignoring it", self.path);
            return Ok(None);
        }

        let contents = tokio::fs::read_to_string(&self.path).await?;
        Ok(AccessKey::from_cached(&contents))
    }

    async fn store(&self, key: &AccessKey) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Write atomically using a temp file
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, key.expose()).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        tokio::fs::rename(&temp_path, &self.path).await?;

        debug!("Wrote credential cache to {:?}", self.path);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!("Removed credential cache {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn backend_name(&self) -> &'static str {
        "File Cache"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_cache(dir: &TempDir) -> FileKeyCache {
        FileKeyCache::at(dir.path().join("nested").join("bunny_key"))
    }

    #[tokio::test]
    async fn test_load_missing() {
        let temp_dir = TempDir::new().unwrap();
        let cache = test_cache(&temp_dir);

        assert!(cache.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let cache = test_cache(&temp_dir);

        cache.store(&AccessKey::new("zone-password")).await.unwrap();

        let loaded = cache.load().await.unwrap().unwrap();
        assert_eq!(loaded.expose(), "zone-password");

        // The file holds the raw key and nothing else
        let raw = std::fs::read_to_string(cache.path()).unwrap();
        assert_eq!(raw, "zone-password");
        assert!(!cache.path().with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_load_trims_trailing_newline() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bunny_key");
        std::fs::write(&path, "hand-written-key\n").unwrap();

        let loaded = FileKeyCache::at(&path).load().await.unwrap().unwrap();
        assert_eq!(loaded.expose(), "hand-written-key");
    }

    #[tokio::test]
    async fn test_empty_file_is_a_miss() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bunny_key");
        std::fs::write(&path, "").unwrap();

        assert!(FileKeyCache::at(&path).load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let temp_dir = TempDir::new().unwrap();
        let cache = test_cache(&temp_dir);

        cache.store(&AccessKey::new("k")).await.unwrap();
        cache.clear().await.unwrap();
        assert!(cache.load().await.unwrap().is_none());

        // Clearing twice is fine
        cache.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_max_age_expires_entry() {
        let temp_dir = TempDir::new().unwrap();
        let cache = test_cache(&temp_dir).with_max_age(Some(Duration::ZERO));

        cache.store(&AccessKey::new("old-key")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(cache.load().await.unwrap().is_none());

        let fresh = test_cache(&temp_dir).with_max_age(Some(Duration::from_secs(3600)));
        assert_eq!(fresh.load().await.unwrap().unwrap().expose(), "old-key");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cache_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let cache = test_cache(&temp_dir);
        cache.store(&AccessKey::new("k")).await.unwrap();

        let mode = std::fs::metadata(cache.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
