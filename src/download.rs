//! Model weight fetching and caching
//!
//! Backends resolve their weights through a shared [`ModelFetcher`]: files
//! already in the cache directory are used as-is, anything missing is
//! downloaded over HTTPS on first use and moved into place atomically.
//! Setting `BGREMOVE_OFFLINE` disables downloads so availability probing
//! reduces to a cache lookup.

use crate::error::{RemovalError, Result};
use futures_util::TryStreamExt;
use reqwest::Client;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Environment variable overriding the weight cache directory
pub const CACHE_DIR_ENV: &str = "BGREMOVE_CACHE_DIR";
/// Environment variable disabling weight downloads
pub const OFFLINE_ENV: &str = "BGREMOVE_OFFLINE";

/// A named, downloadable weight file.
#[derive(Debug, Clone, Copy)]
pub struct ModelWeights {
    /// File name inside the cache directory
    pub file_name: &'static str,
    /// Upstream download URL
    pub url: &'static str,
}

/// Shared weight fetcher with a local cache.
#[derive(Debug)]
pub struct ModelFetcher {
    client: Client,
    cache_dir: PathBuf,
    offline: bool,
    // Serializes downloads so concurrent first requests fetch a file once
    fetch_lock: tokio::sync::Mutex<()>,
}

impl ModelFetcher {
    /// Create a fetcher using the default cache directory and environment
    /// configuration.
    ///
    /// # Errors
    /// - `Network` if the HTTP client cannot be constructed
    /// - `Io` if the cache directory cannot be created
    pub fn new() -> Result<Self> {
        let cache_dir = std::env::var_os(CACHE_DIR_ENV).map_or_else(
            || {
                dirs::cache_dir()
                    .unwrap_or_else(std::env::temp_dir)
                    .join("bgremove")
                    .join("models")
            },
            PathBuf::from,
        );
        let offline = std::env::var_os(OFFLINE_ENV).is_some();
        Self::with_cache_dir(cache_dir, offline)
    }

    /// Create a fetcher rooted at an explicit cache directory.
    ///
    /// # Errors
    /// - `Network` if the HTTP client cannot be constructed
    /// - `Io` if the cache directory cannot be created
    pub fn with_cache_dir(cache_dir: PathBuf, offline: bool) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)?;
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| RemovalError::network(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            cache_dir,
            offline,
            fetch_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Cache path a weight file resolves to.
    #[must_use]
    pub fn cached_path(&self, weights: &ModelWeights) -> PathBuf {
        self.cache_dir.join(weights.file_name)
    }

    /// Whether the weight file is already on disk.
    #[must_use]
    pub fn is_cached(&self, weights: &ModelWeights) -> bool {
        self.cached_path(weights).is_file()
    }

    /// Whether the weight file can be produced at all: cached, or
    /// downloadable because offline mode is off.
    #[must_use]
    pub fn is_obtainable(&self, weights: &ModelWeights) -> bool {
        self.is_cached(weights) || !self.offline
    }

    /// Return the local path for a weight file, downloading it first if
    /// necessary.
    ///
    /// # Errors
    /// - `BackendUnavailable` if the file is missing and downloads are off
    /// - `Network` on download failures
    pub async fn ensure(&self, weights: &ModelWeights) -> Result<PathBuf> {
        let path = self.cached_path(weights);
        if path.is_file() {
            return Ok(path);
        }
        if self.offline {
            return Err(RemovalError::unavailable(format!(
                "{} not cached and downloads are disabled",
                weights.file_name
            )));
        }

        let _guard = self.fetch_lock.lock().await;
        // Another request may have completed the download while we waited
        if path.is_file() {
            return Ok(path);
        }
        self.download(weights, &path).await?;
        Ok(path)
    }

    async fn download(&self, weights: &ModelWeights, path: &std::path::Path) -> Result<()> {
        info!(model = weights.file_name, url = weights.url, "downloading model weights");

        let response = self
            .client
            .get(weights.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| RemovalError::network(format!("fetch {}: {e}", weights.url)))?;

        // Stream into a sibling temp file, then rename into place so a
        // partial download never looks like a cached model.
        let partial = path.with_extension("part");
        let mut file = tokio::fs::File::create(&partial).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream
            .try_next()
            .await
            .map_err(|e| RemovalError::network(format!("read {}: {e}", weights.url)))?
        {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&partial, path).await?;
        info!(model = weights.file_name, path = %path.display(), "model weights cached");
        Ok(())
    }
}
