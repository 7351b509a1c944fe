//! Remote secret service access
//!
//! Secrets are addressed by name only; the service is never enumerated.

mod client;

pub use client::SecretClient;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Trait for secret stores the credential resolver can read from
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch a secret by name. Absence is `Ok(None)`, not an error.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Create or replace a secret, returning the service acknowledgement
    async fn put(&self, key: &str, value: &Value) -> Result<Value>;

    /// Delete a secret by name
    async fn delete(&self, key: &str) -> Result<()>;
}
