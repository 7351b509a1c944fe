//! Host-facing orchestration
//!
//! [`CdnManager`] is built once at process start. It resolves the storage key,
//! wires the storage facade when it can, and owns the ImageKit rewriter.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::cdn::{build_public_url, BackendConfig, ObjectStorage, UploadedFile};
use crate::credential::{CredentialResolver, Resolution};
use crate::error::{BunnyError, Result};
use crate::rewrite::ImageKitRewriter;
use crate::secret::{SecretClient, SecretStore};
use crate::settings::{CacheBackend, Settings, BUNNYCDN_DRIVER};
use crate::storage::{CredentialCache, FileKeyCache, KeychainKeyCache};

/// Storage facade state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageState {
    /// Key resolved and backend wired
    Configured,
    /// No usable key or configuration; uploads fail fast
    Unconfigured,
}

/// Main struct that orchestrates credential resolution and storage access
pub struct CdnManager {
    /// Settings loaded at start
    settings: Settings,
    /// Storage key resolver
    resolver: CredentialResolver,
    /// Secret service, if wired
    secrets: Option<Arc<dyn SecretStore>>,
    /// Storage facade, when configured
    storage: Option<ObjectStorage>,
    /// ImageKit rewriter
    rewriter: ImageKitRewriter,
}

impl CdnManager {
    /// Build everything from settings
    pub async fn new(settings: Settings) -> Result<Self> {
        let (resolver, secrets) = Self::resolver_from_settings(&settings)?;
        Ok(Self::with_resolver(settings, resolver, secrets).await)
    }

    /// Build the resolver (and the secret client it reads from) without resolving
    pub fn resolver_from_settings(
        settings: &Settings,
    ) -> Result<(CredentialResolver, Option<Arc<dyn SecretStore>>)> {
        let cache = Self::build_cache(settings)?;
        let secrets = Self::build_secret_client(settings)?;
        let resolver = CredentialResolver::new(cache, secrets.clone(), settings.secret.key_name.clone());
        Ok((resolver, secrets))
    }

    /// Build from settings with an explicit resolver (custom caches, tests)
    pub async fn with_resolver(
        settings: Settings,
        resolver: CredentialResolver,
        secrets: Option<Arc<dyn SecretStore>>,
    ) -> Self {
        let storage = Self::configure_storage(&settings, &resolver).await;
        let rewriter = ImageKitRewriter::from_settings(&settings.image_kit);

        Self {
            settings,
            resolver,
            secrets,
            storage,
            rewriter,
        }
    }

    fn build_cache(settings: &Settings) -> Result<Arc<dyn CredentialCache>> {
        let cache: Arc<dyn CredentialCache> = match settings.secret.cache_backend {
            CacheBackend::Keychain => Arc::new(KeychainKeyCache::new(settings.secret.key_name.clone())),
            CacheBackend::File => {
                let cache = match &settings.secret.cache_file {
                    Some(path) => FileKeyCache::at(path),
                    None => FileKeyCache::new()?,
                };
                Arc::new(cache.with_max_age(settings.secret.cache_max_age))
            }
        };

        debug!("Credential cache: {}", cache.backend_name());
        Ok(cache)
    }

    fn build_secret_client(settings: &Settings) -> Result<Option<Arc<dyn SecretStore>>> {
        match &settings.secret.api_token {
            Some(token) => {
                let client: Arc<dyn SecretStore> =
                    Arc::new(SecretClient::new(&settings.secret.uri, token.expose())?);
                Ok(Some(client))
            }
            None => {
                warn!("SECRET_KEY is not set; the secret service is not wired");
                Ok(None)
            }
        }
    }

    /// Resolve the key and wire the storage facade, or leave it unset
    async fn configure_storage(
        settings: &Settings,
        resolver: &CredentialResolver,
    ) -> Option<ObjectStorage> {
        if settings.disk.driver != BUNNYCDN_DRIVER {
            warn!(
                "Storage driver '{}' is not '{}'; storage is not configured",
                settings.disk.driver, BUNNYCDN_DRIVER
            );
            return None;
        }

        let resolution = resolver.resolve_backend_key().await;
        let Some(key) = resolution.into_key() else {
            warn!("BunnyCDN access key not found. Storage operations will fail until it is available.");
            return None;
        };

        match BackendConfig::new(&settings.disk, key).and_then(|config| ObjectStorage::from_config(&config)) {
            Ok(storage) => Some(storage),
            Err(e) => {
                error!("Storage backend could not be configured: {}", e);
                None
            }
        }
    }

    /// Get the storage facade state
    pub fn state(&self) -> StorageState {
        if self.storage.is_some() {
            StorageState::Configured
        } else {
            StorageState::Unconfigured
        }
    }

    /// Get the settings this manager was built from
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get the storage facade, if configured
    pub fn storage(&self) -> Option<&ObjectStorage> {
        self.storage.as_ref()
    }

    /// Get the secret service, if wired
    pub fn secrets(&self) -> Option<&dyn SecretStore> {
        self.secrets.as_deref()
    }

    /// Get the credential resolver
    pub fn resolver(&self) -> &CredentialResolver {
        &self.resolver
    }

    /// Rewrite an S3 URL into an ImageKit URL
    pub fn image_kit(&self, url: &str, resolution: u32) -> String {
        self.rewriter.rewrite(url, resolution)
    }

    /// Upload a file to the storage zone
    pub async fn upload_cdn(
        &self,
        file: &UploadedFile,
        path: &str,
        filename: Option<&str>,
    ) -> Result<String> {
        match &self.storage {
            Some(storage) => storage.upload(file, path, filename).await,
            None => {
                error!("Upload to '{}' refused: storage backend is not configured", path);
                Err(BunnyError::BackendWriteFailed {
                    path: path.to_string(),
                    reason: "storage backend not configured".to_string(),
                })
            }
        }
    }

    /// Public URL for a stored path; needs no key
    pub fn show_cdn(&self, path: &str, zone: bool) -> String {
        build_public_url(self.settings.disk.cdn_url.as_deref(), path, zone)
    }

    /// Delete a stored path; `false` when unconfigured or nothing was deleted
    pub async fn delete_cdn(&self, path: &str) -> bool {
        match &self.storage {
            Some(storage) => storage.delete(path).await,
            None => {
                warn!("Delete of '{}' skipped: storage backend is not configured", path);
                false
            }
        }
    }

    /// Forget the cached key and resolve again from the secret service
    pub async fn refresh_key(&mut self) -> Result<StorageState> {
        self.resolver.invalidate().await?;
        self.storage = Self::configure_storage(&self.settings, &self.resolver).await;

        info!("Storage key refreshed; storage is {:?}", self.state());
        Ok(self.state())
    }

    /// Resolve the key without touching the wired facade
    pub async fn resolve_key(&self) -> Resolution {
        self.resolver.resolve_backend_key().await
    }
}
