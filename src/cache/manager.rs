//! Response cache for persisting provider results to disk
//!
//! Provides a `ResponseCache` that answers existence checks, loads and stores
//! raw artifacts, and wraps a producer future with a time-based expiry check.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::query::CachePath;

/// Mode for directories created on demand (unix only)
const DIR_MODE: u32 = 0o755;

/// Errors that can occur when reading or writing cached artifacts
#[derive(Debug, Error)]
pub enum CacheError {
    /// A filesystem operation failed
    #[error("Cache I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The artifact could not be encoded or decoded
    #[error("Cache artifact is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

impl CacheError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Reads and writes cached artifacts
///
/// There is no locking: two callers racing on the same path may both miss and
/// both fetch, and the last writer wins on disk.
#[derive(Debug, Clone, Default)]
pub struct ResponseCache;

impl ResponseCache {
    pub fn new() -> Self {
        Self
    }

    /// Whether an artifact exists. The content is not validated.
    pub fn has(&self, path: &CachePath) -> bool {
        path.full_path().is_file()
    }

    /// Reads the raw artifact bytes
    pub fn load(&self, path: &CachePath) -> Result<Vec<u8>, CacheError> {
        let full = path.full_path();
        fs::read(&full).map_err(|e| CacheError::io(&full, e))
    }

    /// Reads and decodes an artifact
    pub fn load_json<T: DeserializeOwned>(&self, path: &CachePath) -> Result<T, CacheError> {
        let bytes = self.load(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Writes an artifact, replacing any existing file
    ///
    /// Creates the directory chain if it is missing, then deletes the old file
    /// before writing the new content.
    pub fn store(&self, path: &CachePath, bytes: &[u8]) -> Result<(), CacheError> {
        ensure_dir(path.dir())?;

        let full = path.full_path();
        match fs::remove_file(&full) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(CacheError::io(&full, e)),
        }
        fs::write(&full, bytes).map_err(|e| CacheError::io(&full, e))
    }

    /// Best-effort JSON store that hands the value back for immediate use
    ///
    /// A failed write is logged and otherwise ignored.
    pub fn write_through<T: Serialize>(&self, path: &CachePath, value: T) -> T {
        let outcome = serde_json::to_vec(&value)
            .map_err(CacheError::from)
            .and_then(|bytes| self.store(path, &bytes));

        match outcome {
            Ok(()) => tracing::debug!(path = %path.full_path().display(), "cached response"),
            Err(e) => tracing::warn!(error = %e, "failed to cache response"),
        }
        value
    }

    /// Age of the artifact, judged by its modification time
    pub fn age(&self, path: &CachePath) -> Option<Duration> {
        let modified = fs::metadata(path.full_path()).and_then(|m| m.modified()).ok()?;
        let modified: DateTime<Utc> = modified.into();
        // A clock that moved backwards makes the artifact brand new
        Some((Utc::now() - modified).to_std().unwrap_or_default())
    }

    /// Whether an artifact exists and is no older than `ttl`
    pub fn is_fresh(&self, path: &CachePath, ttl: Duration) -> bool {
        self.age(path).is_some_and(|age| age <= ttl)
    }

    /// Returns the cached value if it is fresh, otherwise runs `producer` once
    ///
    /// A successful producer result is stored best-effort before it is
    /// returned. A failed one is propagated and never cached. An artifact that
    /// cannot be decoded counts as a miss.
    pub async fn with_expiry<T, E, F, Fut>(
        &self,
        path: &CachePath,
        producer: F,
        ttl: Duration,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if self.is_fresh(path, ttl) {
            match self.load_json::<T>(path) {
                Ok(value) => {
                    tracing::debug!(key = path.key(), "fresh cache hit");
                    return Ok(value);
                }
                Err(e) => tracing::warn!(error = %e, "ignoring unreadable cache artifact"),
            }
        } else {
            tracing::debug!(key = path.key(), "cache miss or stale");
        }

        let value = producer().await?;
        Ok(self.write_through(path, value))
    }
}

fn ensure_dir(dir: &Path) -> Result<(), CacheError> {
    if dir.is_dir() {
        return Ok(());
    }
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder.create(dir).map_err(|e| CacheError::io(dir, e))
}
