// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Platform dispatch for shared memory and advisory file locks.

#[cfg(unix)]
pub(crate) mod posix;
#[cfg(unix)]
pub(crate) use posix::{list_segments, RawFileLock, RawSegment};

#[cfg(windows)]
pub(crate) mod windows;
#[cfg(windows)]
pub(crate) use windows::{list_segments, RawFileLock, RawSegment};
