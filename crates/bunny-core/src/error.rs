//! Error types for bunny-core

use thiserror::Error;

/// Result type alias for bunny-core operations
pub type Result<T> = std::result::Result<T, BunnyError>;

/// Error types
///
/// No variant ever carries a credential value. Secret-service failures carry
/// the key *name* and the upstream response body only.
#[derive(Error, Debug)]
pub enum BunnyError {
    #[error("Secret service rejected the bearer token")]
    NotAuthenticated,

    #[error("Unable to store secret '{key}': {body}")]
    SecretWriteFailed { key: String, body: String },

    #[error("Unable to delete secret '{key}': {body}")]
    SecretDeleteFailed { key: String, body: String },

    #[error("Storage access key is unavailable")]
    CredentialUnavailable,

    #[error("Invalid upload input: {0}")]
    InvalidUploadInput(String),

    #[error("Backend write failed for '{path}': {reason}")]
    BackendWriteFailed { path: String, reason: String },

    #[error("Unsupported storage driver: {0}")]
    UnsupportedDriver(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Keychain error: {0}")]
    Keychain(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<figment::Error> for BunnyError {
    fn from(err: figment::Error) -> Self {
        BunnyError::Config(err.to_string())
    }
}
