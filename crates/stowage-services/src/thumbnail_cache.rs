//! On-disk cache of derived thumbnails
//!
//! Entries are files named `{key}.{ext}` where `key` is the SHA-256 of
//! `"{source_path}:{width}:{height}"`. The file's modification time is its
//! creation time; entries older than the TTL are stale. Eviction is lazy
//! (stale entries are removed when a lookup finds them) or explicit through
//! the sweep methods. There is no background timer.
//!
//! The cache is purely derived data: any entry can be deleted at any time.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use stowage_core::{format_bytes, CacheConfig};
use stowage_processing::OutputFormat;
use tokio::fs;
use uuid::Uuid;

/// Extensions tried on lookup, in priority order
const EXTENSIONS: [&str; 4] = ["jpg", "png", "webp", "avif"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of cache files
    pub total: usize,
    /// Combined size in bytes
    pub size: u64,
    pub size_human: String,
    /// Files already past the TTL
    pub expired: usize,
    /// TTL in seconds
    pub ttl: u64,
    pub path: String,
}

pub struct ThumbnailCache {
    path: PathBuf,
    ttl: Duration,
}

impl ThumbnailCache {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.path.clone(), Duration::from_secs(config.ttl_seconds))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Deterministic key for a thumbnail of `source_path` at `width`x`height`
    pub fn cache_key(source_path: &str, width: u32, height: u32) -> String {
        let digest = Sha256::digest(format!("{}:{}:{}", source_path, width, height).as_bytes());
        hex::encode(digest)
    }

    /// Cached thumbnail bytes, if a fresh entry exists
    pub async fn get(&self, source_path: &str, width: u32, height: u32) -> Option<Vec<u8>> {
        self.get_by_key(&Self::cache_key(source_path, width, height))
            .await
    }

    /// Tries every extension; stale entries found on the way are deleted
    pub async fn get_by_key(&self, key: &str) -> Option<Vec<u8>> {
        for ext in EXTENSIONS {
            let file = self.entry_path(key, ext);
            let modified = match fs::metadata(&file).await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(_) => continue,
            };

            if self.is_stale(modified) {
                tracing::debug!(key = %key, ext = ext, "Removing stale thumbnail");
                if let Err(e) = fs::remove_file(&file).await {
                    tracing::warn!(error = %e, path = %file.display(), "Failed to remove stale thumbnail");
                }
                continue;
            }

            match fs::read(&file).await {
                Ok(data) => {
                    tracing::debug!(key = %key, ext = ext, size_bytes = data.len(), "Thumbnail cache hit");
                    return Some(data);
                }
                Err(e) => {
                    tracing::warn!(error = %e, path = %file.display(), "Failed to read cached thumbnail");
                }
            }
        }

        None
    }

    /// Store `data` under `key`, named after its detected format
    ///
    /// Failures are logged and reported as `false`; callers carry on without the cache.
    pub async fn put(&self, key: &str, data: &[u8]) -> bool {
        let Some(ext) = OutputFormat::detect(data)
            .map(OutputFormat::extension)
            .filter(|ext| EXTENSIONS.contains(ext))
        else {
            tracing::warn!(key = %key, size_bytes = data.len(), "Not caching thumbnail of unknown format");
            return false;
        };

        match self.write_atomic(key, ext, data).await {
            Ok(()) => {
                // Keep a single variant per key
                for other in EXTENSIONS.iter().filter(|other| **other != ext) {
                    let _ = fs::remove_file(self.entry_path(key, other)).await;
                }
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Failed to write thumbnail cache");
                false
            }
        }
    }

    async fn write_atomic(&self, key: &str, ext: &str, data: &[u8]) -> std::io::Result<()> {
        fs::create_dir_all(&self.path).await?;

        let tmp = self.path.join(format!("{}.{}.tmp", key, Uuid::new_v4().simple()));
        if let Err(e) = fs::write(&tmp, data).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }
        if let Err(e) = fs::rename(&tmp, self.entry_path(key, ext)).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(())
    }

    /// Delete every stale file; returns how many were removed
    pub async fn clear_expired(&self) -> usize {
        let removed = self.sweep(true).await;
        tracing::info!(removed = removed, path = %self.path.display(), "Cleared expired thumbnails");
        removed
    }

    /// Delete every file; returns how many were removed
    pub async fn clear_all(&self) -> usize {
        let removed = self.sweep(false).await;
        tracing::info!(removed = removed, path = %self.path.display(), "Cleared thumbnail cache");
        removed
    }

    pub async fn stats(&self) -> CacheStats {
        let mut total = 0;
        let mut size = 0;
        let mut expired = 0;

        for (_, metadata) in self.files().await {
            total += 1;
            size += metadata.len();
            if metadata.modified().is_ok_and(|m| self.is_stale(m)) {
                expired += 1;
            }
        }

        CacheStats {
            total,
            size,
            size_human: format_bytes(size),
            expired,
            ttl: self.ttl.as_secs(),
            path: self.path.display().to_string(),
        }
    }

    async fn sweep(&self, only_stale: bool) -> usize {
        let mut removed = 0;
        for (path, metadata) in self.files().await {
            if only_stale && !metadata.modified().is_ok_and(|m| self.is_stale(m)) {
                continue;
            }
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(error = %e, path = %path.display(), "Failed to remove cached thumbnail");
                }
            }
        }
        removed
    }

    /// Regular files directly under the cache directory; empty if it does not exist
    async fn files(&self) -> Vec<(PathBuf, std::fs::Metadata)> {
        let mut files = Vec::new();
        let mut entries = match fs::read_dir(&self.path).await {
            Ok(entries) => entries,
            Err(_) => return files,
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Ok(metadata) = entry.metadata().await {
                if metadata.is_file() {
                    files.push((entry.path(), metadata));
                }
            }
        }
        files
    }

    fn entry_path(&self, key: &str, ext: &str) -> PathBuf {
        self.path.join(format!("{}.{}", key, ext))
    }

    fn is_stale(&self, modified: SystemTime) -> bool {
        SystemTime::now()
            .duration_since(modified)
            .map(|age| age > self.ttl)
            .unwrap_or(false)
    }
}
