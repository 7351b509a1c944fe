//! # bunny-core
//!
//! BunnyCDN storage access without a plaintext key in configuration:
//! - Storage key resolution: local cache, then a remote secret service
//! - Upload, delete and public-URL helpers over a storage zone
//! - Memoized ImageKit URL rewriting for S3-hosted images

pub mod cdn;
pub mod credential;
pub mod error;
pub mod rewrite;
pub mod secret;
pub mod settings;
pub mod storage;
mod manager;

pub use error::{BunnyError, Result};
pub use manager::{CdnManager, StorageState};
pub use cdn::{BackendConfig, BunnyStorageBackend, MemoryBackend, ObjectBackend, ObjectStorage, UploadedFile};
pub use credential::{AccessKey, CredentialResolver, Resolution};
pub use rewrite::{ImageKitRewriter, DEFAULT_RESOLUTION};
pub use secret::{SecretClient, SecretStore};
pub use settings::{CacheBackend, Settings};
pub use storage::{CredentialCache, FileKeyCache, KeychainKeyCache};
