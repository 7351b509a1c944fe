//! Credential type definitions

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{BunnyError, Result};

/// Storage backend access key - automatically zeroed when dropped
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AccessKey {
    value: String,
}

impl AccessKey {
    /// Create a new access key
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }

    /// Build a key from raw cache content, ignoring surrounding whitespace.
    /// Blank content is not a key.
    pub fn from_cached(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self::new(trimmed))
        }
    }

    /// Get the key value (use carefully)
    pub fn expose(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessKey")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Outcome of resolving the storage access key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Served from the local credential cache
    Cached(AccessKey),
    /// Fetched from the secret service and written to the cache
    Fetched(AccessKey),
    /// No key could be obtained by any path
    Unavailable,
}

impl Resolution {
    /// Borrow the resolved key, if any
    pub fn key(&self) -> Option<&AccessKey> {
        match self {
            Resolution::Cached(key) | Resolution::Fetched(key) => Some(key),
            Resolution::Unavailable => None,
        }
    }

    /// Consume and return the resolved key, if any
    pub fn into_key(self) -> Option<AccessKey> {
        match self {
            Resolution::Cached(key) | Resolution::Fetched(key) => Some(key),
            Resolution::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, Resolution::Unavailable)
    }

    /// Consume and return the key, or [`BunnyError::CredentialUnavailable`]
    pub fn require(self) -> Result<AccessKey> {
        self.into_key().ok_or(BunnyError::CredentialUnavailable)
    }
}
