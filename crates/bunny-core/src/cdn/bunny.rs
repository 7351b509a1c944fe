//! BunnyCDN Storage HTTP backend
//!
//! Objects live at `https://{host}/{zone}/{path}`; every request carries the
//! zone password in the `AccessKey` header. Existence checks list the parent
//! directory (`GET .../{dir}/`), which returns a JSON array of entries.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

use super::backend::ObjectBackend;
use super::config::BackendConfig;
use crate::credential::AccessKey;
use crate::error::{BunnyError, Result};

/// Default request timeout
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Header carrying the storage zone password
const ACCESS_KEY_HEADER: &str = "AccessKey";

/// One entry of a directory listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListedObject {
    object_name: String,
    #[serde(default)]
    is_directory: bool,
}

/// BunnyCDN Storage backend
#[derive(Debug, Clone)]
pub struct BunnyStorageBackend {
    /// `https://{host}/` or a test endpoint
    endpoint: Url,
    /// Storage zone name
    zone: String,
    /// Zone password (redacted in Debug)
    access_key: AccessKey,
    /// HTTP client
    client: Client,
}

impl BunnyStorageBackend {
    /// Create a backend for the configured zone and region
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let endpoint = format!("https://{}/", config.storage_host());
        Self::with_endpoint(&endpoint, &config.storage_zone, config.access_key.clone())
    }

    /// Create a backend against an explicit storage endpoint
    pub fn with_endpoint(endpoint: &str, zone: &str, access_key: AccessKey) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| BunnyError::Config(format!("Invalid storage endpoint '{}': {}", endpoint, e)))?;

        if endpoint.cannot_be_a_base() {
            return Err(BunnyError::Config(format!(
                "Storage endpoint '{}' cannot be used as a base",
                endpoint
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            endpoint,
            zone: zone.to_string(),
            access_key,
            client,
        })
    }

    /// Build `{endpoint}/{zone}/{path}`; a trailing slash is kept for listings
    fn object_url(&self, path: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&self.zone);
            for part in path.split('/').filter(|p| !p.is_empty()) {
                segments.push(part);
            }
            if path.is_empty() || path.ends_with('/') {
                segments.push("");
            }
        }
        url
    }

    /// Split `dir/name` into (`dir/`, `name`)
    fn split_parent(path: &str) -> (String, &str) {
        match path.rsplit_once('/') {
            Some((dir, name)) => (format!("{}/", dir), name),
            None => (String::new(), path),
        }
    }
}

#[async_trait]
impl ObjectBackend for BunnyStorageBackend {
    async fn put(&self, path: &str, contents: &[u8]) -> Result<()> {
        let response = self
            .client
            .put(self.object_url(path))
            .header(ACCESS_KEY_HEADER, self.access_key.expose())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(contents.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Storage write to {} failed with status {}", path, status);
            return Err(BunnyError::BackendWriteFailed {
                path: path.to_string(),
                reason: format!("HTTP {} - {}", status, body),
            });
        }

        debug!("Uploaded {} bytes to {}/{}", contents.len(), self.zone, path);
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let (dir, name) = Self::split_parent(path);
        if name.is_empty() {
            return Ok(false);
        }

        let response = self
            .client
            .get(self.object_url(&dir))
            .header(ACCESS_KEY_HEADER, self.access_key.expose())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            return Err(BunnyError::Storage(format!(
                "Listing {} failed with status {}",
                dir, status
            )));
        }

        let entries: Vec<ListedObject> = response.json().await?;
        Ok(entries
            .iter()
            .any(|entry| !entry.is_directory && entry.object_name == name))
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        let response = self
            .client
            .delete(self.object_url(path))
            .header(ACCESS_KEY_HEADER, self.access_key.expose())
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                debug!("Deleted {}/{}", self.zone, path);
                Ok(true)
            }
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(BunnyError::Storage(format!(
                "Deleting {} failed with status {}",
                path, status
            ))),
        }
    }

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .get(self.object_url(path))
            .header(ACCESS_KEY_HEADER, self.access_key.expose())
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(Some(response.bytes().await?.to_vec())),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(BunnyError::Storage(format!(
                "Reading {} failed with status {}",
                path, status
            ))),
        }
    }

    fn backend_name(&self) -> &'static str {
        "BunnyCDN Storage"
    }
}
