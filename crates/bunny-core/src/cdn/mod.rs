//! Object storage facade
//!
//! [`ObjectStorage`] runs uploads, deletes and public-URL construction over
//! an [`ObjectBackend`]:
//! 1. BunnyCDN Storage over HTTP (production)
//! 2. In-memory (tests and dry runs)

mod backend;
mod bunny;
mod config;
mod facade;

pub use backend::{MemoryBackend, ObjectBackend};
pub use bunny::BunnyStorageBackend;
pub use config::BackendConfig;
pub use facade::{build_public_url, ObjectStorage, UploadedFile, DEFAULT_UPLOAD_DIR};
