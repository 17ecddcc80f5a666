//! Shared storage-key → public-URL resolution for post thumbnails.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

use lru::LruCache;
use metrics::counter;
use tracing::warn;

const SOURCE: &str = "application::thumbnails";

pub const THUMBNAIL_CACHE_HIT: &str = "quillpress_thumbnail_cache_hit_total";
pub const THUMBNAIL_CACHE_MISS: &str = "quillpress_thumbnail_cache_miss_total";

/// Resolves stored thumbnail keys to public URLs through a bounded LRU.
pub struct ThumbnailResolver {
    public_base_url: String,
    bucket: String,
    cache: Mutex<LruCache<String, String>>,
}

impl ThumbnailResolver {
    pub fn new(public_base_url: &str, bucket: &str, capacity: NonZeroUsize) -> Self {
        Self {
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            bucket: bucket.trim_matches('/').to_string(),
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Returns the public URL for `key`, or `None` when the key is absent or unusable.
    pub fn resolve(&self, key: Option<&str>) -> Option<String> {
        let key = normalize_key(key?)?;

        if let Some(url) = lock(&self.cache, "resolve.get").get(key) {
            counter!(THUMBNAIL_CACHE_HIT).increment(1);
            return Some(url.clone());
        }

        counter!(THUMBNAIL_CACHE_MISS).increment(1);
        let url = format!("{}/{}/{}", self.public_base_url, self.bucket, key);
        lock(&self.cache, "resolve.put").put(key.to_string(), url.clone());
        Some(url)
    }

    pub fn forget(&self, key: &str) {
        lock(&self.cache, "forget").pop(key);
    }

    pub fn cached_len(&self) -> usize {
        lock(&self.cache, "cached_len").len()
    }
}

/// Accepts relative keys made of non-empty segments without `.`/`..` or backslashes.
pub fn normalize_key(key: &str) -> Option<&str> {
    let key = key.trim();
    if key.is_empty() || key.starts_with('/') || key.contains('\\') {
        return None;
    }
    let valid = key
        .split('/')
        .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
    valid.then_some(key)
}

fn lock<'a>(
    cache: &'a Mutex<LruCache<String, String>>,
    op: &'static str,
) -> MutexGuard<'a, LruCache<String, String>> {
    match cache.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                target_module = SOURCE,
                lock_kind = "mutex.lock",
                result = "poisoned_recovered",
                "Recovered from poisoned thumbnail cache lock"
            );
            poisoned.into_inner()
        }
    }
}
