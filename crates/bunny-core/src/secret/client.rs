//! HTTP client for the secret service API
//!
//! - `GET    {base}/api/secrets/{key}` -> `{ "data": value }`
//! - `POST   {base}/api/secrets`       with `{ "key", "value" }`
//! - `DELETE {base}/api/secrets/{key}`
//!
//! Every request carries `Authorization: Bearer {api_token}`.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

use super::SecretStore;
use crate::credential::AccessKey;
use crate::error::{BunnyError, Result};

/// Default request timeout
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Secret service client
#[derive(Debug, Clone)]
pub struct SecretClient {
    /// Base URI of the secret service
    base: Url,
    /// Bearer token for the service (redacted in Debug)
    api_token: AccessKey,
    /// HTTP client
    client: Client,
}

impl SecretClient {
    /// Create a new client with the default timeout
    pub fn new(base_uri: &str, api_token: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_uri, api_token, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a new client with an explicit request timeout
    pub fn with_timeout(
        base_uri: &str,
        api_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base = Url::parse(base_uri)
            .map_err(|e| BunnyError::Config(format!("Invalid secret service URI '{}': {}", base_uri, e)))?;

        if base.cannot_be_a_base() {
            return Err(BunnyError::Config(format!(
                "Secret service URI '{}' cannot be used as a base",
                base_uri
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base,
            api_token: AccessKey::new(api_token),
            client,
        })
    }

    /// Build `{base}/api/secrets[/{key}]`, encoding `key` as one path segment
    fn endpoint(&self, key: Option<&str>) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["api", "secrets"]);
            if let Some(key) = key {
                segments.push(key);
            }
        }
        url
    }

    /// Map 401/403 to `NotAuthenticated`
    fn check_auth(response: &Response, key: &str) -> Result<()> {
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!("Secret service rejected the bearer token (secret '{}')", key);
                Err(BunnyError::NotAuthenticated)
            }
            _ => Ok(()),
        }
    }
}

/// Extract the secret value from the `data` field of a response body
fn extract_data(body: Value) -> Option<String> {
    match body.get("data") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

#[async_trait]
impl SecretStore for SecretClient {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(self.endpoint(Some(key)))
            .bearer_auth(self.api_token.expose())
            .send()
            .await?;

        Self::check_auth(&response, key)?;

        let status = response.status();
        if !status.is_success() {
            warn!("Secret service returned {} for secret '{}'", status, key);
            return Ok(None);
        }

        let text = response.text().await?;
        let body: Value = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(e) => {
                warn!("Secret service sent a non-JSON body for secret '{}': {}", key, e);
                return Ok(None);
            }
        };
        let value = extract_data(body);

        if value.is_none() {
            debug!("Secret '{}' has no data", key);
        }

        Ok(value)
    }

    async fn put(&self, key: &str, value: &Value) -> Result<Value> {
        let response = self
            .client
            .post(self.endpoint(None))
            .bearer_auth(self.api_token.expose())
            .json(&json!({ "key": key, "value": value }))
            .send()
            .await?;

        Self::check_auth(&response, key)?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!("Storing secret '{}' failed with status {}", key, status);
            return Err(BunnyError::SecretWriteFailed {
                key: key.to_string(),
                body: text,
            });
        }

        debug!("Stored secret '{}'", key);

        // Acknowledge with the service's JSON body; an empty body is still a success
        if text.trim().is_empty() {
            Ok(Value::Null)
        } else {
            Ok(serde_json::from_str(&text)?)
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.endpoint(Some(key)))
            .bearer_auth(self.api_token.expose())
            .send()
            .await?;

        Self::check_auth(&response, key)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            error!("Deleting secret '{}' failed with status {}", key, status);
            return Err(BunnyError::SecretDeleteFailed {
                key: key.to_string(),
                body: text,
            });
        }

        debug!("Deleted secret '{}'", key);
        Ok(())
    }
}
