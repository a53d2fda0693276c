//! On-disk cache of fetched share pages.
//!
//! Entries never expire: a share link is a snapshot, so a cached page is
//! reused until the cache directory is cleared. Pass `--no-cache` (or set
//! `CHAT_IMPORT_NO_CACHE=true`) to bypass it for a run.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::debug;

/// Fetched share-page HTML, keyed by a hash of the page URL.
pub struct ShareCache {
    cache_dir: PathBuf,
}

impl ShareCache {
    pub async fn new() -> Result<Self> {
        Self::at(get_cache_directory()?).await
    }

    pub async fn at(cache_dir: PathBuf) -> Result<Self> {
        tokio::fs::create_dir_all(&cache_dir)
            .await
            .context("Failed to create cache directory")?;

        Ok(Self { cache_dir })
    }

    pub async fn get(&self, url: &str) -> Option<String> {
        match cacache::read(&self.cache_dir, compute_url_hash(url)).await {
            Ok(data) => String::from_utf8(data).ok(),
            Err(_) => None,
        }
    }

    pub async fn insert(&self, url: &str, html: &str) {
        if let Err(err) = cacache::write(&self.cache_dir, compute_url_hash(url), html).await {
            debug!(%err, "failed to cache share page");
        }
    }
}

fn get_cache_directory() -> Result<PathBuf> {
    let cache_base = dirs::cache_dir().context("Failed to determine cache directory")?;
    Ok(cache_base.join(env!("CARGO_CRATE_NAME")))
}

pub fn compute_url_hash(url: &str) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(url.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_html_by_url() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ShareCache::at(dir.path().join("pages")).await.unwrap();

        let url = "https://chatgpt.com/share/abc";
        assert_eq!(cache.get(url).await, None);
        cache.insert(url, "<html>cached</html>").await;
        assert_eq!(cache.get(url).await.as_deref(), Some("<html>cached</html>"));
        assert_eq!(cache.get("https://chatgpt.com/share/other").await, None);
    }

    #[test]
    fn hash_ignores_surrounding_whitespace() {
        assert_eq!(
            compute_url_hash(" https://chatgpt.com/share/abc\n"),
            compute_url_hash("https://chatgpt.com/share/abc")
        );
        assert_eq!(compute_url_hash("x").len(), 64);
    }
}
