// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Bit-exact segment layout: a fixed 128-byte header of 64-bit
// little-endian fields followed by NUM_SLOTS slots of SLOT_SIZE bytes.
// This is the durable contract between processes: every participant maps
// the same bytes and agrees on these offsets.

use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies a segment as ours; attach fails on mismatch.
pub const MAGIC: u64 = 0x53484D434F4D4D31;

/// Header format version; attach fails on mismatch.
pub const VERSION: u64 = 1;

/// Fixed header size in bytes.
pub const HEADER_SIZE: usize = 128;

/// Each slot starts with a 4-byte little-endian payload length.
pub const LEN_PREFIX: usize = 4;

/// Smallest admissible slot: length prefix plus minimum payload.
pub const MIN_SLOT_SIZE: usize = 8;

/// Segment header, mapped at offset 0 of every segment.
///
/// `head` and `tail` carry the ring protocol and use acquire/release
/// ordering; the counters are best-effort and relaxed. `magic`, `version`,
/// `num_slots`, and `slot_size` are written once at creation (`magic` last,
/// so a fully-stored magic implies the geometry fields are visible).
#[repr(C)]
pub struct SegmentHeader {
    magic: AtomicU64,
    version: AtomicU64,
    head: AtomicU64,
    tail: AtomicU64,
    msg_count: AtomicU64,
    drop_count: AtomicU64,
    num_slots: AtomicU64,
    slot_size: AtomicU64,
    _reserved: [u8; 64],
}

const _: () = assert!(std::mem::size_of::<SegmentHeader>() == HEADER_SIZE);
const _: () = assert!(std::mem::align_of::<SegmentHeader>() == 8);

impl SegmentHeader {
    /// Initialise a freshly created (zero-filled) header.
    pub(crate) fn init(&self, num_slots: u64, slot_size: u64) {
        self.version.store(VERSION, Ordering::Relaxed);
        self.head.store(0, Ordering::Relaxed);
        self.tail.store(0, Ordering::Relaxed);
        self.msg_count.store(0, Ordering::Relaxed);
        self.drop_count.store(0, Ordering::Relaxed);
        self.num_slots.store(num_slots, Ordering::Relaxed);
        self.slot_size.store(slot_size, Ordering::Relaxed);
        // Magic last: a reader that observes it also observes the geometry.
        self.magic.store(MAGIC, Ordering::Release);
    }

    /// Zero the magic so attached consumers fail their next read instead of
    /// waiting forever on a segment whose producer has gone away.
    pub(crate) fn poison(&self) {
        self.magic.store(0, Ordering::Release);
    }

    pub fn magic(&self) -> u64 {
        self.magic.load(Ordering::Acquire)
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Relaxed)
    }

    pub fn head(&self) -> u64 {
        self.head.load(Ordering::Acquire)
    }

    /// Publish a new head. Release pairs with the acquire in [`head`]:
    /// slot bytes written before this store are visible to any reader that
    /// observes the new head.
    pub(crate) fn publish_head(&self, next: u64) {
        self.head.store(next, Ordering::Release);
    }

    pub fn tail(&self) -> u64 {
        self.tail.load(Ordering::Acquire)
    }

    /// Advance the shared tail. Callers must hold the segment's claim lock.
    pub(crate) fn store_tail(&self, next: u64) {
        self.tail.store(next, Ordering::Release);
    }

    pub fn msg_count(&self) -> u64 {
        self.msg_count.load(Ordering::Relaxed)
    }

    pub(crate) fn bump_msg_count(&self) {
        self.msg_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn drop_count(&self) -> u64 {
        self.drop_count.load(Ordering::Relaxed)
    }

    pub(crate) fn bump_drop_count(&self) {
        self.drop_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn num_slots(&self) -> u64 {
        self.num_slots.load(Ordering::Relaxed)
    }

    pub fn slot_size(&self) -> u64 {
        self.slot_size.load(Ordering::Relaxed)
    }
}

/// Total byte size of a segment with the given geometry.
pub const fn segment_size(num_slots: usize, slot_size: usize) -> usize {
    HEADER_SIZE + num_slots * slot_size
}

/// Byte offset of the slot holding message index `index`.
pub(crate) fn slot_offset(index: u64, num_slots: u64, slot_size: u64) -> usize {
    HEADER_SIZE + ((index % num_slots) * slot_size) as usize
}
