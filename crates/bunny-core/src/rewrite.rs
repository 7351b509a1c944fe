//! ImageKit URL rewriting
//!
//! Turns S3 object URLs into ImageKit transformation URLs of the form
//! `https://{host}/{account}/tr:h-{resolution}/{path}`. Results are memoized
//! for a minute, keyed by a hash of `(url, resolution)`.

use md5::{Digest, Md5};
use moka::sync::Cache;
use std::time::Duration;

use crate::settings::ImageKitSettings;

/// Default image height in pixels
pub const DEFAULT_RESOLUTION: u32 = 500;

/// Default cache capacity (number of entries).
const DEFAULT_CACHE_CAPACITY: u64 = 1_000;

/// Default time-to-live for cache entries (1 minute).
const DEFAULT_TTL_SECS: u64 = 60;

/// Memoizing ImageKit URL rewriter
#[derive(Clone)]
pub struct ImageKitRewriter {
    /// Prefix stripped from source URLs
    bucket_base_url: Option<String>,
    host: String,
    account: String,
    cache: Cache<String, String>,
}

impl ImageKitRewriter {
    /// Creates a rewriter with the default cache settings.
    pub fn new(
        bucket_base_url: Option<String>,
        host: impl Into<String>,
        account: impl Into<String>,
    ) -> Self {
        Self::with_cache(
            bucket_base_url,
            host,
            account,
            DEFAULT_CACHE_CAPACITY,
            Duration::from_secs(DEFAULT_TTL_SECS),
        )
    }

    /// Creates a rewriter with a custom cache size and time-to-live.
    pub fn with_cache(
        bucket_base_url: Option<String>,
        host: impl Into<String>,
        account: impl Into<String>,
        max_capacity: u64,
        ttl: Duration,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();

        Self {
            bucket_base_url,
            host: host.into(),
            account: account.into(),
            cache,
        }
    }

    pub fn from_settings(settings: &ImageKitSettings) -> Self {
        Self::new(
            settings.bucket_base_url(),
            settings.host.clone(),
            settings.account.clone(),
        )
    }

    /// Rewrite `url`, returning a memoized result when one is live.
    pub fn rewrite(&self, url: &str, resolution: u32) -> String {
        self.cache
            .get_with(cache_key(url, resolution), || self.compute(url, resolution))
    }

    /// Uncached rewrite.
    pub fn compute(&self, url: &str, resolution: u32) -> String {
        let relative = self
            .bucket_base_url
            .as_deref()
            .and_then(|base| url.strip_prefix(base))
            .unwrap_or(url);

        format!(
            "https://{}/{}/tr:h-{}/{}",
            self.host, self.account, resolution, relative
        )
    }

    /// Number of live memoized entries.
    pub fn cached_entries(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

/// `imagekit_` + md5 hex of the url and the resolution, newline-separated
fn cache_key(url: &str, resolution: u32) -> String {
    let digest = Md5::digest(format!("{}\n{}", url, resolution).as_bytes());
    format!("imagekit_{}", hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUCKET: &str = "https://bucket.s3.region.amazonaws.com/";

    fn rewriter() -> ImageKitRewriter {
        ImageKitRewriter::new(Some(BUCKET.to_string()), "ik.example", "account")
    }

    #[test]
    fn test_rewrite_strips_bucket_prefix() {
        assert_eq!(
            rewriter().rewrite("https://bucket.s3.region.amazonaws.com/img/a.jpg", 800),
            "https://ik.example/account/tr:h-800/img/a.jpg"
        );
    }

    #[test]
    fn test_foreign_url_is_kept_whole() {
        assert_eq!(
            rewriter().rewrite("img/b.jpg", DEFAULT_RESOLUTION),
            "https://ik.example/account/tr:h-500/img/b.jpg"
        );
    }

    #[test]
    fn test_rewrite_is_memoized() {
        let rewriter = rewriter();
        let url = "https://bucket.s3.region.amazonaws.com/img/a.jpg";

        let first = rewriter.rewrite(url, 800);
        let second = rewriter.rewrite(url, 800);
        assert_eq!(first, second);
        assert_eq!(rewriter.cached_entries(), 1);

        let smaller = rewriter.rewrite(url, 200);
        assert_eq!(smaller, "https://ik.example/account/tr:h-200/img/a.jpg");
        assert_ne!(first, smaller);
        assert_eq!(rewriter.cached_entries(), 2);
    }

    #[test]
    fn test_url_digits_do_not_merge_with_resolution() {
        let rewriter = rewriter();

        assert_eq!(
            rewriter.rewrite("https://bucket.s3.region.amazonaws.com/img/photo1", 200),
            "https://ik.example/account/tr:h-200/img/photo1"
        );
        assert_eq!(
            rewriter.rewrite("https://bucket.s3.region.amazonaws.com/img/photo", 1200),
            "https://ik.example/account/tr:h-1200/img/photo"
        );
        assert_eq!(rewriter.cached_entries(), 2);
    }

    #[test]
    fn test_entries_expire() {
        let rewriter = ImageKitRewriter::with_cache(
            Some(BUCKET.to_string()),
            "ik.example",
            "account",
            10,
            Duration::from_millis(50),
        );

        rewriter.rewrite("https://bucket.s3.region.amazonaws.com/img/a.jpg", 800);
        assert_eq!(rewriter.cached_entries(), 1);

        std::thread::sleep(Duration::from_millis(150));
        assert_eq!(rewriter.cached_entries(), 0);
    }

    #[test]
    fn test_cache_key() {
        let key = cache_key("https://x/a.jpg", 500);
        assert!(key.starts_with("imagekit_"));
        assert_eq!(key.len(), "imagekit_".len() + 32);
        assert_ne!(key, cache_key("https://x/a.jpg", 800));
        assert_ne!(cache_key("https://x/a1", 200), cache_key("https://x/a", 1200));
    }

    #[test]
    fn test_from_settings() {
        let settings = ImageKitSettings {
            aws_bucket: Some("photos".to_string()),
            aws_region: Some("ap-southeast-1".to_string()),
            host: "ik.imagekit.io".to_string(),
            account: "enterwind".to_string(),
        };

        assert_eq!(
            ImageKitRewriter::from_settings(&settings)
                .compute("https://photos.s3.ap-southeast-1.amazonaws.com/u/1.png", 500),
            "https://ik.imagekit.io/enterwind/tr:h-500/u/1.png"
        );
    }
}
