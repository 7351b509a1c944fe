//! Application settings
//!
//! Settings are read once at process start from, in increasing precedence:
//! 1. Built-in defaults
//! 2. An optional JSON settings file
//! 3. Environment variables (`BUNNYCDN_*`, `SECRET_*`, `BUNNY_SECRET_*`,
//!    `AWS_*`, `IMAGEKIT_*`)
//!
//! The resulting [`Settings`] value is passed explicitly to whatever needs it.

use figment::providers::{Env, Format, Json, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::credential::AccessKey;
use crate::error::Result;

/// The only storage driver this crate wires
pub const BUNNYCDN_DRIVER: &str = "bunnycdn";

/// Environment variables consulted by [`Settings::load`]
const ENV_KEYS: &[&str] = &[
    "BUNNYCDN_DRIVER",
    "BUNNYCDN_STORAGE_ZONE",
    "BUNNYCDN_REGION",
    "BUNNYCDN_CDN_URL",
    "SECRET_URI",
    "SECRET_KEY",
    "BUNNY_SECRET_FILE",
    "BUNNY_SECRET_KEY",
    "BUNNY_SECRET_MAX_AGE_SECS",
    "BUNNY_SECRET_CACHE",
    "AWS_BUCKET",
    "AWS_DEFAULT_REGION",
    "IMAGEKIT_HOST",
    "IMAGEKIT_ACCOUNT",
];

/// Storage zone settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskSettings {
    /// Driver identifier, must be `bunnycdn`
    pub driver: String,
    /// Storage zone name
    pub storage_zone: String,
    /// Storage region code (e.g. `sg`, `de`, `ny`)
    pub region: String,
    /// Public pull-zone base URL
    pub cdn_url: Option<String>,
}

/// Where the resolved key is cached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Plain file holding the raw key
    #[default]
    File,
    /// OS keychain entry
    Keychain,
}

/// Secret service and credential cache settings
#[derive(Debug, Clone)]
pub struct SecretSettings {
    /// Secret service base URI
    pub uri: String,
    /// Bearer token; without it the secret service is not wired
    pub api_token: Option<AccessKey>,
    /// Name of the secret holding the storage key
    pub key_name: String,
    /// Cache file override (platform data dir when unset)
    pub cache_file: Option<PathBuf>,
    /// Optional cache max age (file cache only)
    pub cache_max_age: Option<Duration>,
    /// Cache backend
    pub cache_backend: CacheBackend,
}

/// ImageKit rewrite settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageKitSettings {
    /// Source S3 bucket name
    pub aws_bucket: Option<String>,
    /// Source S3 bucket region
    pub aws_region: Option<String>,
    /// Rewrite CDN host
    pub host: String,
    /// Rewrite CDN account path segment
    pub account: String,
}

impl ImageKitSettings {
    /// `https://{bucket}.s3.{region}.amazonaws.com/`, when both parts are set
    pub fn bucket_base_url(&self) -> Option<String> {
        match (&self.aws_bucket, &self.aws_region) {
            (Some(bucket), Some(region)) => {
                Some(format!("https://{}.s3.{}.amazonaws.com/", bucket, region))
            }
            _ => None,
        }
    }
}

/// Application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub disk: DiskSettings,
    pub secret: SecretSettings,
    pub image_kit: ImageKitSettings,
}

/// Flat key/value shape shared by the environment and the JSON file
#[derive(Serialize, Deserialize)]
struct RawSettings {
    bunnycdn_driver: String,
    bunnycdn_storage_zone: String,
    bunnycdn_region: String,
    bunnycdn_cdn_url: Option<String>,
    secret_uri: String,
    secret_key: Option<String>,
    bunny_secret_file: Option<String>,
    bunny_secret_key: String,
    bunny_secret_max_age_secs: Option<u64>,
    bunny_secret_cache: CacheBackend,
    aws_bucket: Option<String>,
    aws_default_region: Option<String>,
    imagekit_host: String,
    imagekit_account: String,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            bunnycdn_driver: BUNNYCDN_DRIVER.to_string(),
            bunnycdn_storage_zone: String::new(),
            bunnycdn_region: "sg".to_string(),
            bunnycdn_cdn_url: Some("https://btekno.b-cdn.net".to_string()),
            secret_uri: "https://btekno.id".to_string(),
            secret_key: None,
            bunny_secret_file: None,
            bunny_secret_key: "bunny_key".to_string(),
            bunny_secret_max_age_secs: None,
            bunny_secret_cache: CacheBackend::File,
            aws_bucket: None,
            aws_default_region: None,
            imagekit_host: "ik.imagekit.io".to_string(),
            imagekit_account: "enterwind".to_string(),
        }
    }
}

/// Blank strings count as unset
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl From<RawSettings> for Settings {
    fn from(raw: RawSettings) -> Self {
        Self {
            disk: DiskSettings {
                driver: raw.bunnycdn_driver,
                storage_zone: raw.bunnycdn_storage_zone,
                region: raw.bunnycdn_region,
                cdn_url: non_empty(raw.bunnycdn_cdn_url),
            },
            secret: SecretSettings {
                uri: raw.secret_uri,
                api_token: non_empty(raw.secret_key).map(AccessKey::new),
                key_name: raw.bunny_secret_key,
                cache_file: non_empty(raw.bunny_secret_file).map(PathBuf::from),
                cache_max_age: raw.bunny_secret_max_age_secs.map(Duration::from_secs),
                cache_backend: raw.bunny_secret_cache,
            },
            image_kit: ImageKitSettings {
                aws_bucket: non_empty(raw.aws_bucket),
                aws_region: non_empty(raw.aws_default_region),
                host: raw.imagekit_host,
                account: raw.imagekit_account,
            },
        }
    }
}

impl Settings {
    /// Load settings from defaults and the environment
    pub fn load() -> Result<Self> {
        Self::from_figment(Self::base_figment().merge(Self::env()))
    }

    /// Load settings from a JSON file, with the environment taking precedence
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading settings from {:?}", path);

        Self::from_figment(
            Self::base_figment()
                .merge(Json::file(path))
                .merge(Self::env()),
        )
    }

    /// Extract settings from an arbitrary figment
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let raw: RawSettings = figment.extract()?;
        Ok(raw.into())
    }

    fn base_figment() -> Figment {
        Figment::new().merge(Serialized::defaults(RawSettings::default()))
    }

    fn env() -> Env {
        Env::raw().only(ENV_KEYS)
    }
}
