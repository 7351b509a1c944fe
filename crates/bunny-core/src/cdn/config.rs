//! Storage backend configuration

use crate::credential::AccessKey;
use crate::error::{BunnyError, Result};
use crate::settings::{DiskSettings, BUNNYCDN_DRIVER};

/// Region code served by the un-prefixed storage host
const DEFAULT_REGION: &str = "de";

/// Everything needed to address a storage zone
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub storage_zone: String,
    pub access_key: AccessKey,
    pub region: String,
    pub cdn_url: Option<String>,
    pub driver: String,
}

impl BackendConfig {
    /// Build from disk settings plus the resolved key.
    ///
    /// Rejects any driver other than `bunnycdn` and an empty storage zone.
    pub fn new(disk: &DiskSettings, access_key: AccessKey) -> Result<Self> {
        if disk.driver != BUNNYCDN_DRIVER {
            return Err(BunnyError::UnsupportedDriver(disk.driver.clone()));
        }

        if disk.storage_zone.trim().is_empty() {
            return Err(BunnyError::Config("Storage zone is not set".to_string()));
        }

        Ok(Self {
            storage_zone: disk.storage_zone.trim().to_string(),
            access_key,
            region: disk.region.trim().to_lowercase(),
            cdn_url: disk.cdn_url.clone(),
            driver: disk.driver.clone(),
        })
    }

    /// Storage API host for the configured region
    pub fn storage_host(&self) -> String {
        if self.region.is_empty() || self.region == DEFAULT_REGION {
            "storage.bunnycdn.com".to_string()
        } else {
            format!("{}.storage.bunnycdn.com", self.region)
        }
    }
}
