//! Cross-process single-flight lock.
//!
//! A caller that wants to refresh a cache key takes an exclusive advisory
//! lock on `<dir>/<key>.lock` without blocking. Losers get [`TryAcquire::Busy`]
//! straight away. The OS drops the lock if the holder dies, so a crashed
//! invocation never wedges later ones.

use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Outcome of a non-blocking acquisition attempt.
#[derive(Debug)]
pub enum TryAcquire {
    /// The caller holds the lock until the guard is dropped.
    Acquired(LockGuard),
    /// Another handle holds the lock.
    Busy,
}

/// Exclusive hold on a lock file.
///
/// Dropping the guard removes the lock file and releases the lock.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Unlink while still holding the lock, then release.
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove lock file {}: {}", self.path.display(), e);
            }
        }
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Failed to unlock {}: {}", self.path.display(), e);
        }
    }
}

/// Path of the lock file guarding `key`.
pub fn lock_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{}.lock", key))
}

/// Try to take the lock for `key` without blocking.
///
/// # Errors
///
/// Returns an error when the lock file cannot be created or locking itself
/// fails for a reason other than contention.
pub fn try_acquire(dir: &Path, key: &str) -> io::Result<TryAcquire> {
    let path = lock_path(dir, key);
    let file = open_lock_file(&path)?;
    lock_opened(file, path)
}

fn open_lock_file(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
}

/// Lock an already opened handle and check it still names `path`.
///
/// The previous holder unlinks the file on release. A handle opened before
/// that unlink locks an orphaned inode, so it counts as busy.
fn lock_opened(file: File, path: PathBuf) -> io::Result<TryAcquire> {
    if !FileExt::try_lock_exclusive(&file)? {
        tracing::debug!("Lock {} is held elsewhere", path.display());
        return Ok(TryAcquire::Busy);
    }

    if !still_linked(&file, &path)? {
        tracing::debug!("Lock {} was released and replaced", path.display());
        let _ = FileExt::unlock(&file);
        return Ok(TryAcquire::Busy);
    }

    tracing::debug!("Acquired lock {}", path.display());
    Ok(TryAcquire::Acquired(LockGuard { file, path }))
}

#[cfg(unix)]
fn still_linked(file: &File, path: &Path) -> io::Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let held = file.metadata()?;
    match std::fs::metadata(path) {
        Ok(current) => Ok(held.dev() == current.dev() && held.ino() == current.ino()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(not(unix))]
fn still_linked(_file: &File, path: &Path) -> io::Result<bool> {
    Ok(path.exists())
}
