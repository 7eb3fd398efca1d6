// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Same-machine IPC over named shared-memory segments.
//
// Three messaging patterns share one segment format (a fixed 128-byte
// header plus a ring of length-prefixed slots):
//
// - broadcast:     `Publisher` / `Subscriber`: one writer, independent
//                  readers, overwrite on full, slow readers get lapped.
// - request-reply: `Requester` / `Replier`: two paired rings with
//                  correlation ids.
// - work-queue:    `Pusher` / `Puller`: competing consumers claim each
//                  message exactly once under a cross-process file lock.
//
// Producers create and own segments; consumers attach and never unlink.
// All blocking operations sleep-poll and are cancellable only via their
// timeout.

pub mod codec;
pub mod error;
pub mod layout;
pub mod lock;
pub mod name;
pub mod pattern;
pub mod segment;

mod platform;
mod ring;

pub use codec::{BincodeCodec, Codec, RawCodec};
pub use error::{Error, Result};
pub use lock::{FileLock, FileLockGuard};
pub use pattern::{
    AttachConfig, Publisher, PublisherStats, Puller, Pusher, QueueStats, Replier, Requester,
    RingConfig, Subscriber, SubscriberStats,
};
pub use segment::Segment;

/// Remove a segment by its full OS-level name (prefix included), without
/// an endpoint. Returns whether a segment existed. Escape hatch for
/// cleaning up after crashed producers.
pub fn force_unlink(name: &str) -> bool {
    Segment::unlink(name)
}

/// Enumerate library-prefixed segments. Empty on platforms without
/// segment enumeration.
pub fn list_segments() -> Vec<String> {
    Segment::list()
}
