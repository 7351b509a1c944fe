//! OS Keychain credential cache
//!
//! Keeps the resolved key in the system keychain instead of a file:
//! - macOS: Keychain
//! - Windows: Credential Manager (DPAPI)
//! - Linux: Secret Service (GNOME Keyring, KWallet)

use async_trait::async_trait;
use keyring::Entry;
use tracing::debug;

use super::CredentialCache;
use crate::credential::AccessKey;
use crate::error::{BunnyError, Result};

/// Service name used for keychain entries
const SERVICE_NAME: &str = "bunny-secret";

/// OS Keychain credential cache
#[derive(Debug, Clone)]
pub struct KeychainKeyCache {
    /// Keychain account the key is stored under
    account: String,
}

impl KeychainKeyCache {
    /// Create a keychain cache for the given account name
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.account).map_err(|e| BunnyError::Keychain(e.to_string()))
    }
}

#[async_trait]
impl CredentialCache for KeychainKeyCache {
    async fn load(&self) -> Result<Option<AccessKey>> {
        match self.entry()?.get_password() {
            Ok(value) => {
                debug!("Loaded credential from keychain account {}", self.account);
                Ok(AccessKey::from_cached(&value))
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No keychain entry for account {}", self.account);
                Ok(None)
            }
            Err(e) => Err(BunnyError::Keychain(e.to_string())),
        }
    }

    async fn store(&self, key: &AccessKey) -> Result<()> {
        self.entry()?
            .set_password(key.expose())
            .map_err(|e| BunnyError::Keychain(e.to_string()))?;

        debug!("Stored credential in keychain account {}", self.account);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match self.entry()?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(BunnyError::Keychain(e.to_string())),
        }
    }

    fn backend_name(&self) -> &'static str {
        #[cfg(target_os = "macos")]
        return "macOS Keychain";

        #[cfg(target_os = "windows")]
        return "Windows Credential Manager";

        #[cfg(target_os = "linux")]
        return "Linux Secret Service";

        #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
        return "System Keychain";
    }
}
