// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Windows implementation of shared memory segments (file mappings backed
// by the page file) and advisory file locks (LockFileEx). Named mappings
// vanish with their last handle, so "unlink" is a no-op here and stale
// segments cannot outlive a crashed producer.

use std::io;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;
use std::ptr;

use windows_sys::Win32::Foundation::{
    CloseHandle, GetLastError, ERROR_ALREADY_EXISTS, ERROR_LOCK_VIOLATION, FALSE, HANDLE,
    INVALID_HANDLE_VALUE,
};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, LockFileEx, UnlockFileEx, FILE_ATTRIBUTE_NORMAL, FILE_SHARE_READ,
    FILE_SHARE_WRITE, LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, OPEN_ALWAYS,
};
use windows_sys::Win32::System::Memory::{
    CreateFileMappingW, MapViewOfFile, OpenFileMappingW, UnmapViewOfFile, VirtualQuery,
    FILE_MAP_ALL_ACCESS, MEMORY_BASIC_INFORMATION, PAGE_READWRITE, SEC_COMMIT,
};
use windows_sys::Win32::System::IO::OVERLAPPED;

const GENERIC_READ: u32 = 0x8000_0000;
const GENERIC_WRITE: u32 = 0x4000_0000;

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

#[derive(Debug)]
pub(crate) struct RawSegment {
    handle: HANDLE,
    mem: *mut u8,
    size: usize,
}

unsafe impl Send for RawSegment {}
unsafe impl Sync for RawSegment {}

impl RawSegment {
    pub(crate) fn create(name: &str, size: usize) -> io::Result<Self> {
        let wide = to_wide(name);
        let handle = unsafe {
            CreateFileMappingW(
                INVALID_HANDLE_VALUE,
                ptr::null(),
                PAGE_READWRITE | SEC_COMMIT,
                0,
                size as u32,
                wide.as_ptr(),
            )
        };
        let err = unsafe { GetLastError() };
        if handle.is_null() {
            return Err(io::Error::last_os_error());
        }
        if err == ERROR_ALREADY_EXISTS {
            unsafe { CloseHandle(handle) };
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "segment already exists",
            ));
        }
        Self::map(handle, size)
    }

    pub(crate) fn open(name: &str) -> io::Result<Self> {
        let wide = to_wide(name);
        let handle = unsafe { OpenFileMappingW(FILE_MAP_ALL_ACCESS, FALSE, wide.as_ptr()) };
        if handle.is_null() {
            return Err(io::Error::last_os_error());
        }
        // Discover the mapped size from the view itself.
        Self::map(handle, 0)
    }

    fn map(handle: HANDLE, size: usize) -> io::Result<Self> {
        let mem = unsafe { MapViewOfFile(handle, FILE_MAP_ALL_ACCESS, 0, 0, 0) };
        if mem.is_null() {
            let err = io::Error::last_os_error();
            unsafe { CloseHandle(handle) };
            return Err(err);
        }

        let size = if size != 0 {
            size
        } else {
            let mut info: MEMORY_BASIC_INFORMATION = unsafe { std::mem::zeroed() };
            let ret = unsafe {
                VirtualQuery(mem, &mut info, std::mem::size_of::<MEMORY_BASIC_INFORMATION>())
            };
            if ret == 0 {
                let err = io::Error::last_os_error();
                unsafe {
                    UnmapViewOfFile(mem);
                    CloseHandle(handle);
                }
                return Err(err);
            }
            info.RegionSize
        };

        Ok(Self {
            handle,
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

    /// Named mappings have kernel lifetime tied to their handles; there is
    /// nothing to unlink.
    pub(crate) fn unlink_by_name(_name: &str) -> bool {
        false
    }
}

impl Drop for RawSegment {
    fn drop(&mut self) {
        unsafe {
            UnmapViewOfFile(self.mem as *mut _);
            CloseHandle(self.handle);
        }
    }
}

/// No enumeration API for named file mappings.
pub(crate) fn list_segments(_prefix: &str) -> Vec<String> {
    Vec::new()
}

pub(crate) struct RawFileLock {
    handle: HANDLE,
}

impl RawFileLock {
    pub(crate) fn open(path: &Path) -> io::Result<Self> {
        let wide: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();
        let handle = unsafe {
            CreateFileW(
                wide.as_ptr(),
                GENERIC_READ | GENERIC_WRITE,
                FILE_SHARE_READ | FILE_SHARE_WRITE,
                ptr::null(),
                OPEN_ALWAYS,
                FILE_ATTRIBUTE_NORMAL,
                ptr::null_mut(),
            )
        };
        if handle == INVALID_HANDLE_VALUE {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { handle })
    }

    fn lock_flags(&self, flags: u32) -> io::Result<bool> {
        let mut overlapped: OVERLAPPED = unsafe { std::mem::zeroed() };
        let ok = unsafe {
            LockFileEx(self.handle, flags, 0, u32::MAX, u32::MAX, &mut overlapped)
        };
        if ok != 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(ERROR_LOCK_VIOLATION as i32) {
            return Ok(false);
        }
        Err(err)
    }

    pub(crate) fn lock(&self) -> io::Result<()> {
        self.lock_flags(LOCKFILE_EXCLUSIVE_LOCK).map(|_| ())
    }

    pub(crate) fn try_lock(&self) -> io::Result<bool> {
        self.lock_flags(LOCKFILE_EXCLUSIVE_LOCK | LOCKFILE_FAIL_IMMEDIATELY)
    }

    pub(crate) fn unlock(&self) {
        let mut overlapped: OVERLAPPED = unsafe { std::mem::zeroed() };
        unsafe { UnlockFileEx(self.handle, 0, u32::MAX, u32::MAX, &mut overlapped) };
    }
}

impl Drop for RawFileLock {
    fn drop(&mut self) {
        unsafe { CloseHandle(self.handle) };
    }
}
