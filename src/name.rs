// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Segment naming convention. Every segment is named
// `shmcomm_<role>_<channel>` where the role prefix encodes which side owns
// the segment lifecycle. Request/reply binds two segments (req + rep) to
// one logical channel name.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Prefix shared by every segment this library creates.
pub const SEGMENT_PREFIX: &str = "shmcomm_";

/// Maximum segment name length accepted by the platform.
///
/// On macOS `PSHMNAMLEN` is 31 including the leading '/'. On Linux shm
/// objects live in `/dev/shm` and are bounded by `NAME_MAX`.
#[cfg(target_os = "macos")]
pub const SHM_NAME_MAX: usize = 30;

#[cfg(not(target_os = "macos"))]
pub const SHM_NAME_MAX: usize = 255;

/// Which side of a channel a segment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Broadcast publisher.
    Pub,
    /// Request direction of a request/reply pair (client → server).
    Req,
    /// Reply direction of a request/reply pair (server → client).
    Rep,
    /// Work-queue pusher.
    Push,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Pub => "pub",
            Role::Req => "req",
            Role::Rep => "rep",
            Role::Push => "push",
        }
    }
}

/// Build the segment name for `channel` in the given role.
///
/// Channel names must be non-empty UTF-8 without path separators; names
/// whose prefixed form exceeds the platform shm name limit are rejected.
pub fn segment_name(role: Role, channel: &str) -> Result<String> {
    if channel.is_empty() {
        return Err(Error::Connection("channel name is empty".into()));
    }
    if channel.contains(['/', '\\']) {
        return Err(Error::Connection(format!(
            "channel name {channel:?} contains a path separator"
        )));
    }
    let name = format!("{SEGMENT_PREFIX}{}_{channel}", role.as_str());
    if name.len() > SHM_NAME_MAX {
        return Err(Error::Connection(format!(
            "segment name {name:?} exceeds the platform limit of {SHM_NAME_MAX} bytes"
        )));
    }
    Ok(name)
}

/// Path of the claim-lock file for a work-queue segment.
pub fn lock_path(segment: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{segment}.lock"))
}
