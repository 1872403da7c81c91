//! File-backed key/value cache with a fixed time-to-live.
//!
//! One JSON file per entry, named by the SHA-256 of the key. Entry age comes
//! from the file's modification time; stale entries are removed by the read
//! that finds them. There is no locking: concurrent writers to the same key
//! race and the last rename wins.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{RugpullError, Result};

const ENTRY_EXTENSION: &str = "json";

// Suffix for temp files so concurrent writers of one key never share a path.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct ExpiringCache {
    dir: PathBuf,
    ttl: Duration,
}

fn key_preview(key: &str) -> String {
    key.chars().take(20).collect()
}

impl ExpiringCache {
    pub fn new(dir: impl Into<PathBuf>, ttl_hours: u64) -> Result<Self> {
        Self::with_ttl(dir, Duration::from_secs(ttl_hours.saturating_mul(3600)))
    }

    pub fn with_ttl(dir: impl Into<PathBuf>, ttl: Duration) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            RugpullError::Runtime(format!(
                "failed to create cache dir {}: {e}",
                dir.to_string_lossy()
            ))
        })?;
        info!(
            cache_dir = %dir.to_string_lossy(),
            ttl_secs = ttl.as_secs(),
            "Cache initialized"
        );
        Ok(Self { dir, ttl })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{digest:x}.{ENTRY_EXTENSION}"))
    }

    /// Never fails: unreadable, corrupt and expired entries are all misses.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.entry_path(key);
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(_) => return None,
        };

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .unwrap_or_default();
        if age > self.ttl {
            info!(key = %key_preview(key), age_secs = age.as_secs(), "Cache entry expired");
            if let Err(err) = tokio::fs::remove_file(&path).await {
                warn!(key = %key_preview(key), "Failed to prune expired cache entry: {}", err);
            }
            return None;
        }

        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key = %key_preview(key), "Cache read error: {}", err);
                return None;
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(value) => {
                debug!(key = %key_preview(key), age_secs = age.as_secs(), "Cache hit");
                Some(value)
            }
            Err(err) => {
                warn!(key = %key_preview(key), "Cache entry is corrupt: {}", err);
                None
            }
        }
    }

    /// Returns `false` instead of an error when the entry cannot be written.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match self.write_entry(key, value).await {
            Ok(()) => {
                debug!(key = %key_preview(key), "Cached entry");
                true
            }
            Err(err) => {
                warn!(key = %key_preview(key), "Cache write error: {}", err);
                false
            }
        }
    }

    async fn write_entry<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let body = serde_json::to_vec_pretty(value)?;
        let path = self.entry_path(key);
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("{}.{seq}.tmp", std::process::id()));
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| RugpullError::Runtime(e.to_string()))?;
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| RugpullError::Runtime(e.to_string()))?;
        if let Err(err) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(RugpullError::Runtime(err.to_string()));
        }
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> bool {
        match tokio::fs::remove_file(self.entry_path(key)).await {
            Ok(()) => {
                info!(key = %key_preview(key), "Cache entry deleted");
                true
            }
            Err(_) => false,
        }
    }

    pub async fn clear_all(&self) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Failed to list cache dir: {}", err);
                return 0;
            }
        };

        let mut removed = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            if tokio::fs::remove_file(&path).await.is_ok() {
                removed += 1;
            }
        }
        info!(removed, "Cleared cache entries");
        removed
    }
}
