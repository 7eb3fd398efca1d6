// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Named cross-process advisory lock with RAII release. Process-safe but
// not thread-safe within one process: threads sharing a FileLock must
// serialise externally.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::platform::RawFileLock;

const LOCK_POLL_INTERVAL: Duration = Duration::from_micros(100);

/// An exclusive advisory lock on a filesystem path.
///
/// The lock file is created on open and left behind on drop; only the
/// lock itself is released. Acquisition returns a [`FileLockGuard`] that
/// releases on scope exit, including unwinds.
pub struct FileLock {
    raw: RawFileLock,
    path: PathBuf,
}

impl FileLock {
    /// Open (creating if needed) the lock file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let raw = RawFileLock::open(&path)
            .map_err(|e| Error::conn(&format!("opening lock file {}", path.display()), e))?;
        Ok(Self { raw, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire, blocking indefinitely.
    pub fn lock(&self) -> Result<FileLockGuard<'_>> {
        self.raw
            .lock()
            .map_err(|e| Error::conn(&format!("locking {}", self.path.display()), e))?;
        Ok(FileLockGuard { lock: self })
    }

    /// Acquire without blocking. Returns `None` if the lock is held
    /// elsewhere.
    pub fn try_lock(&self) -> Result<Option<FileLockGuard<'_>>> {
        let acquired = self
            .raw
            .try_lock()
            .map_err(|e| Error::conn(&format!("locking {}", self.path.display()), e))?;
        Ok(acquired.then_some(FileLockGuard { lock: self }))
    }

    /// Acquire, waiting up to `timeout`. Returns `None` on timeout.
    pub fn lock_timeout(&self, timeout: Duration) -> Result<Option<FileLockGuard<'_>>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(guard) = self.try_lock()? {
                return Ok(Some(guard));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            std::thread::sleep(LOCK_POLL_INTERVAL);
        }
    }
}

/// Holds the lock; releases it on drop.
pub struct FileLockGuard<'a> {
    lock: &'a FileLock,
}

impl Drop for FileLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.raw.unlock();
    }
}
