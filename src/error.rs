// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Error taxonomy for the crate. Every fallible operation returns one of
// these kinds; drops (lapping in broadcast) are counted, never raised.

use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by segment, ring, and pattern operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Segment creation failed, attach timed out, or the segment header
    /// did not validate (magic/version mismatch, undersized mapping).
    #[error("connection failed: {0}")]
    Connection(String),

    /// A blocking operation exceeded its deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Non-blocking send on a full work-queue ring.
    #[error("ring is full")]
    BufferFull,

    /// Payload does not fit in one slot (slots are never fragmented).
    #[error("payload of {len} bytes exceeds slot capacity of {capacity} bytes")]
    PayloadTooLarge { len: usize, capacity: usize },

    /// Codec failed to encode or decode a value.
    #[error("codec failure: {0}")]
    Serialization(String),

    /// Request/reply state-machine violation. Indicates a caller bug.
    #[error("protocol state violation: {0}")]
    State(&'static str),
}

impl Error {
    pub(crate) fn conn(context: &str, err: std::io::Error) -> Self {
        Error::Connection(format!("{context}: {err}"))
    }
}
