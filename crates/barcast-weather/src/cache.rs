//! File-backed cache artifacts with an expiry policy.
//!
//! Each key maps to `<dir>/<key>.json` holding `{"stored_at": ..., "value": ...}`.
//! Reads fail soft: a missing, unreadable or malformed artifact is a miss.
//! Writes are best-effort and go through a temporary file plus rename, so a
//! concurrent reader sees either the old artifact or the new one.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A cached value together with the moment it was stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub stored_at: DateTime<Utc>,
    pub value: T,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T) -> Self {
        Self::with_timestamp(value, Utc::now())
    }

    pub fn with_timestamp(value: T, stored_at: DateTime<Utc>) -> Self {
        Self { stored_at, value }
    }

    /// Age relative to `now`. Timestamps in the future count as age zero.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.stored_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// One named cache artifact.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
    duration: Duration,
}

impl CacheStore {
    pub fn new(dir: &Path, key: &str, duration: Duration) -> Self {
        Self {
            path: dir.join(format!("{}.json", key)),
            duration,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_fresh(&self, age: Duration) -> bool {
        age <= self.duration
    }

    /// Read the stored entry, if any.
    pub fn read_entry<T: DeserializeOwned>(&self) -> Option<CacheEntry<T>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("Cache miss: {} does not exist", self.path.display());
                return None;
            }
            Err(e) => {
                tracing::debug!("Cache read failed for {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("Ignoring corrupt cache {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Read the value and its age.
    pub fn read<T: DeserializeOwned>(&self) -> Option<(T, Duration)> {
        let entry = self.read_entry::<T>()?;
        let age = entry.age_at(Utc::now());
        Some((entry.value, age))
    }

    /// Read the value only if it is still fresh.
    pub fn read_fresh<T: DeserializeOwned>(&self) -> Option<T> {
        match self.read::<T>()? {
            (value, age) if self.is_fresh(age) => Some(value),
            (_, age) => {
                tracing::debug!(
                    "Cache {} expired ({}s old)",
                    self.path.display(),
                    age.as_secs()
                );
                None
            }
        }
    }

    /// Read the value regardless of age.
    pub fn read_any<T: DeserializeOwned>(&self) -> Option<T> {
        self.read::<T>().map(|(value, _)| value)
    }

    /// Store `value` stamped with the current time. Failures are logged and swallowed.
    pub fn write<T: Serialize>(&self, value: &T) {
        self.write_entry(&CacheEntry::new(value));
    }

    /// Store an explicit entry. Failures are logged and swallowed.
    pub fn write_entry<T: Serialize>(&self, entry: &CacheEntry<T>) {
        if let Err(e) = self.try_write(entry) {
            tracing::warn!("Failed to write cache {}: {}", self.path.display(), e);
        }
    }

    fn try_write<T: Serialize>(&self, entry: &CacheEntry<T>) -> io::Result<()> {
        let json = serde_json::to_vec(entry).map_err(io::Error::other)?;

        let tmp = self.path.with_extension(format!(
            "json.{}.{}.tmp",
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(e) = std::fs::write(&tmp, &json) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
        std::fs::rename(&tmp, &self.path).inspect_err(|_| {
            let _ = std::fs::remove_file(&tmp);
        })
    }
}

/// Create the cache directory and its parents if missing.
pub fn ensure_cache_dir(dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dir)
}
