// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// POSIX implementation of shared memory segments (shm_open + mmap) and
// advisory file locks (flock). Segment mappings are plain MAP_SHARED
// regions; dropping a mapping never unlinks the backing object; segment
// lifecycle is owned by the creating side at a higher layer.

use std::ffi::CString;
use std::io;
use std::path::Path;
use std::ptr;

/// A mapped named shared memory region.
#[derive(Debug)]
pub(crate) struct RawSegment {
    mem: *mut u8,
    size: usize,
}

// The mapped region is process-shared by design.
unsafe impl Send for RawSegment {}
unsafe impl Sync for RawSegment {}

fn posix_name(name: &str) -> io::Result<CString> {
    CString::new(format!("/{name}"))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

impl RawSegment {
    /// Create a segment of exactly `size` bytes. Fails if one already
    /// exists under this name (callers unlink stale segments first).
    pub(crate) fn create(name: &str, size: usize) -> io::Result<Self> {
        let c_name = posix_name(name)?;
        let perms: libc::mode_t = 0o666;

        let fd = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_RDWR | libc::O_CREAT | libc::O_EXCL,
                perms as libc::c_uint,
            )
        };
        if fd == -1 {
            return Err(io::Error::last_os_error());
        }
        unsafe { libc::fchmod(fd, perms) };

        if unsafe { libc::ftruncate(fd, size as libc::off_t) } != 0 {
            let err = io::Error::last_os_error();
            unsafe {
                libc::close(fd);
                libc::shm_unlink(c_name.as_ptr());
            }
            return Err(err);
        }

        Self::map(fd, size)
    }

    /// Map an existing segment at its current on-disk size.
    pub(crate) fn open(name: &str) -> io::Result<Self> {
        let c_name = posix_name(name)?;

        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0o666 as libc::c_uint) };
        if fd == -1 {
            return Err(io::Error::last_os_error());
        }

        let mut st: libc::stat = unsafe { std::mem::zeroed() };
        if unsafe { libc::fstat(fd, &mut st) } != 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(err);
        }

        Self::map(fd, st.st_size as usize)
    }

    fn map(fd: libc::c_int, size: usize) -> io::Result<Self> {
        if size == 0 {
            unsafe { libc::close(fd) };
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "segment has zero size",
            ));
        }
        let mem = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        unsafe { libc::close(fd) };
        if mem == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        Ok(Self {
            mem: mem as *mut u8,
            size,
        })
    }

    pub(crate) fn ptr(&self) -> *mut u8 {
        self.mem
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    /// Remove the backing object. Returns whether one existed. Existing
    /// mappings stay valid until their holders unmap.
    pub(crate) fn unlink_by_name(name: &str) -> bool {
        match posix_name(name) {
            Ok(c_name) => unsafe { libc::shm_unlink(c_name.as_ptr()) == 0 },
            Err(_) => false,
        }
    }
}

impl Drop for RawSegment {
    fn drop(&mut self) {
        unsafe { libc::munmap(self.mem as *mut libc::c_void, self.size) };
    }
}

/// Enumerate segments whose names start with `prefix`.
///
/// Linux exposes POSIX shm objects as files under /dev/shm; other Unixes
/// have no portable enumeration and return an empty list.
pub(crate) fn list_segments(prefix: &str) -> Vec<String> {
    #[cfg(target_os = "linux")]
    {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir("/dev/shm") {
            for entry in entries.flatten() {
                if let Ok(name) = entry.file_name().into_string() {
                    if name.starts_with(prefix) {
                        names.push(name);
                    }
                }
            }
        }
        names.sort();
        names
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = prefix;
        Vec::new()
    }
}

/// An open lock file. Locking is per open-file-description (flock), so two
/// `RawFileLock`s on the same path exclude each other even within one
/// process.
pub(crate) struct RawFileLock {
    fd: libc::c_int,
}

impl RawFileLock {
    pub(crate) fn open(path: &Path) -> io::Result<Self> {
        use std::os::unix::ffi::OsStrExt;
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let fd = unsafe {
            libc::open(
                c_path.as_ptr(),
                libc::O_RDWR | libc::O_CREAT | libc::O_CLOEXEC,
                0o666 as libc::c_uint,
            )
        };
        if fd == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { fd })
    }

    pub(crate) fn lock(&self) -> io::Result<()> {
        loop {
            if unsafe { libc::flock(self.fd, libc::LOCK_EX) } == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::EINTR) {
                return Err(err);
            }
        }
    }

    pub(crate) fn try_lock(&self) -> io::Result<bool> {
        if unsafe { libc::flock(self.fd, libc::LOCK_EX | libc::LOCK_NB) } == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EWOULDBLOCK) | Some(libc::EINTR) => Ok(false),
            _ => Err(err),
        }
    }

    pub(crate) fn unlock(&self) {
        unsafe { libc::flock(self.fd, libc::LOCK_UN) };
    }
}

impl Drop for RawFileLock {
    fn drop(&mut self) {
        unsafe { libc::close(self.fd) };
    }
}
