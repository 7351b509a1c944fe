//! Storage access key resolution
//!
//! The local cache is authoritative once populated: at most one remote fetch
//! per cold cache. There is no locking, so two callers racing on a cold cache
//! may both fetch and both write the same value.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::types::{AccessKey, Resolution};
use crate::error::Result;
use crate::secret::SecretStore;
use crate::storage::CredentialCache;

/// Credential resolver
pub struct CredentialResolver {
    /// Local cache consulted first
    cache: Arc<dyn CredentialCache>,
    /// Secret service, if one is wired
    secrets: Option<Arc<dyn SecretStore>>,
    /// Name of the secret holding the storage key
    secret_key_name: String,
}

impl CredentialResolver {
    /// Create a new resolver
    pub fn new(
        cache: Arc<dyn CredentialCache>,
        secrets: Option<Arc<dyn SecretStore>>,
        secret_key_name: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            secrets,
            secret_key_name: secret_key_name.into(),
        }
    }

    /// Name of the secret this resolver fetches
    pub fn secret_key_name(&self) -> &str {
        &self.secret_key_name
    }

    /// Resolve the storage backend key.
    ///
    /// Never fails: every error is logged and reported as
    /// [`Resolution::Unavailable`].
    pub async fn resolve_backend_key(&self) -> Resolution {
        match self.try_resolve().await {
            Ok(resolution) => resolution,
            Err(e) => {
                error!(
                    "Error retrieving storage key '{}' from the secret service: {}",
                    self.secret_key_name, e
                );
                Resolution::Unavailable
            }
        }
    }

    async fn try_resolve(&self) -> Result<Resolution> {
        if let Some(key) = self.cache.load().await? {
            debug!("Storage key served from {}", self.cache.backend_name());
            return Ok(Resolution::Cached(key));
        }

        let Some(secrets) = &self.secrets else {
            error!(
                "Secret service is not configured. Cannot retrieve storage key '{}'",
                self.secret_key_name
            );
            return Ok(Resolution::Unavailable);
        };

        let Some(value) = secrets.get(&self.secret_key_name).await? else {
            warn!("Secret '{}' was not found", self.secret_key_name);
            return Ok(Resolution::Unavailable);
        };

        let key = AccessKey::new(value);
        self.cache.store(&key).await?;

        info!(
            "Storage key '{}' fetched and written to {}",
            self.secret_key_name,
            self.cache.backend_name()
        );
        Ok(Resolution::Fetched(key))
    }

    /// Resolve the key for callers that cannot proceed without it
    pub async fn require_backend_key(&self) -> Result<AccessKey> {
        self.resolve_backend_key().await.require()
    }

    /// Drop the cached key so the next resolution goes to the secret service
    pub async fn invalidate(&self) -> Result<()> {
        self.cache.clear().await?;
        info!("Cleared cached storage key '{}'", self.secret_key_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BunnyError;
    use crate::storage::FileKeyCache;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Secret store double that counts remote reads
    struct CountingStore {
        value: Option<String>,
        fail: bool,
        gets: AtomicUsize,
    }

    impl CountingStore {
        fn returning(value: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                value: value.map(str::to_string),
                fail: false,
                gets: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                value: None,
                fail: true,
                gets: AtomicUsize::new(0),
            })
        }

        fn gets(&self) -> usize {
            self.gets.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SecretStore for CountingStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(BunnyError::Storage("connection refused".to_string()));
            }
            Ok(self.value.clone())
        }

        async fn put(&self, _key: &str, _value: &Value) -> Result<Value> {
            Ok(Value::Null)
        }

        async fn delete(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    /// Cache double whose writes always fail
    struct ReadOnlyCache;

    #[async_trait]
    impl CredentialCache for ReadOnlyCache {
        async fn load(&self) -> Result<Option<AccessKey>> {
            Ok(None)
        }

        async fn store(&self, _key: &AccessKey) -> Result<()> {
            Err(BunnyError::Storage("read-only filesystem".to_string()))
        }

        async fn clear(&self) -> Result<()> {
            Ok(())
        }

        fn backend_name(&self) -> &'static str {
            "Read-only Cache"
        }
    }

    fn file_cache(dir: &TempDir) -> Arc<FileKeyCache> {
        Arc::new(FileKeyCache::at(dir.path().join("bunny_key")))
    }

    #[tokio::test]
    async fn test_fetches_and_caches_on_miss() {
        let temp_dir = TempDir::new().unwrap();
        let cache = file_cache(&temp_dir);
        let store = CountingStore::returning(Some("remote-key"));

        let resolver = CredentialResolver::new(cache.clone(), Some(store.clone()), "bunny_key");

        let resolution = resolver.resolve_backend_key().await;
        assert_eq!(resolution, Resolution::Fetched(AccessKey::new("remote-key")));
        assert_eq!(store.gets(), 1);

        let cached = cache.load().await.unwrap().unwrap();
        assert_eq!(cached.expose(), "remote-key");
    }

    #[tokio::test]
    async fn test_populated_cache_never_reaches_secret_service() {
        let temp_dir = TempDir::new().unwrap();
        let store = CountingStore::returning(Some("remote-key"));
        let resolver =
            CredentialResolver::new(file_cache(&temp_dir), Some(store.clone()), "bunny_key");

        resolver.resolve_backend_key().await;
        assert_eq!(store.gets(), 1);

        for _ in 0..5 {
            let resolution = resolver.resolve_backend_key().await;
            assert_eq!(resolution, Resolution::Cached(AccessKey::new("remote-key")));
        }
        assert_eq!(store.gets(), 1);
    }

    #[tokio::test]
    async fn test_preexisting_cache_entry_wins() {
        let temp_dir = TempDir::new().unwrap();
        let cache = file_cache(&temp_dir);
        cache.store(&AccessKey::new("local-key")).await.unwrap();

        let store = CountingStore::returning(Some("remote-key"));
        let resolver = CredentialResolver::new(cache, Some(store.clone()), "bunny_key");

        let resolution = resolver.resolve_backend_key().await;
        assert_eq!(resolution.key().unwrap().expose(), "local-key");
        assert_eq!(store.gets(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let cache = file_cache(&temp_dir);
        let resolver = CredentialResolver::new(cache.clone(), Some(CountingStore::failing()), "bunny_key");

        assert_eq!(resolver.resolve_backend_key().await, Resolution::Unavailable);
        assert!(cache.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_secret_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let store = CountingStore::returning(None);
        let resolver = CredentialResolver::new(file_cache(&temp_dir), Some(store), "bunny_key");

        assert_eq!(resolver.resolve_backend_key().await, Resolution::Unavailable);
    }

    #[tokio::test]
    async fn test_unwired_secret_service_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let resolver = CredentialResolver::new(file_cache(&temp_dir), None, "bunny_key");

        assert_eq!(resolver.resolve_backend_key().await, Resolution::Unavailable);
    }

    #[tokio::test]
    async fn test_cache_write_failure_is_unavailable() {
        let store = CountingStore::returning(Some("remote-key"));
        let resolver = CredentialResolver::new(Arc::new(ReadOnlyCache), Some(store), "bunny_key");

        assert_eq!(resolver.resolve_backend_key().await, Resolution::Unavailable);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let temp_dir = TempDir::new().unwrap();
        let store = CountingStore::returning(Some("rotated-key"));
        let cache = file_cache(&temp_dir);
        cache.store(&AccessKey::new("stale-key")).await.unwrap();

        let resolver = CredentialResolver::new(cache, Some(store.clone()), "bunny_key");
        assert_eq!(
            resolver.resolve_backend_key().await.key().unwrap().expose(),
            "stale-key"
        );

        resolver.invalidate().await.unwrap();

        let resolution = resolver.resolve_backend_key().await;
        assert_eq!(resolution, Resolution::Fetched(AccessKey::new("rotated-key")));
        assert_eq!(store.gets(), 1);
    }

    #[tokio::test]
    async fn test_require_backend_key() {
        let temp_dir = TempDir::new().unwrap();

        let resolver = CredentialResolver::new(
            file_cache(&temp_dir),
            Some(CountingStore::returning(Some("zone-key"))),
            "bunny_key",
        );
        assert_eq!(resolver.require_backend_key().await.unwrap().expose(), "zone-key");

        let empty_dir = TempDir::new().unwrap();
        let resolver = CredentialResolver::new(file_cache(&empty_dir), None, "bunny_key");
        assert!(matches!(
            resolver.require_backend_key().await,
            Err(BunnyError::CredentialUnavailable)
        ));
    }
}
