//! Credential cache trait definitions

use crate::credential::AccessKey;
use crate::error::Result;
use async_trait::async_trait;

/// A single named location holding the resolved storage key.
///
/// Presence of an entry short-circuits remote resolution.
#[async_trait]
pub trait CredentialCache: Send + Sync {
    /// Load the cached key, `None` when the entry is absent or stale
    async fn load(&self) -> Result<Option<AccessKey>>;

    /// Persist the key, replacing any previous entry
    async fn store(&self, key: &AccessKey) -> Result<()>;

    /// Remove the entry; removing an absent entry is not an error
    async fn clear(&self) -> Result<()>;

    /// Get a human-readable name for this cache backend
    fn backend_name(&self) -> &'static str;
}
