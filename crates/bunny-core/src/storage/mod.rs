//! Local credential cache backends
//!
//! This module provides two places to keep the resolved storage key:
//! 1. A plain file holding the raw key (default)
//! 2. OS Keychain

mod traits;
mod file_cache;
mod keychain_cache;

pub use traits::CredentialCache;
pub use file_cache::FileKeyCache;
pub use keychain_cache::KeychainKeyCache;
