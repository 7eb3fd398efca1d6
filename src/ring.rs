// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Ring protocols over a segment's header and slots.
//
// Broadcast: one writer, many independent readers. The writer always
// succeeds, overwriting the oldest slot when the ring is full; each reader
// carries a private monotonic cursor and detects lapping itself. Torn
// reads are caught without locks by re-checking HEAD after copying the
// slot: the writer fully writes [len][payload] before publishing HEAD, so
// a slot can only be torn if HEAD has since advanced a full ring past the
// reader's cursor.
//
// Claim: one writer, competing readers sharing the TAIL index. The tail
// is only advanced under the segment's claim lock, giving exactly-once
// delivery among pullers. The producer blocks (sleep-polling) or fails
// when HEAD - TAIL reaches the ring depth.

use std::ptr;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::layout::LEN_PREFIX;
use crate::segment::Segment;

/// A broadcast reader's private position: the next message index to read,
/// plus a running count of messages lost to lapping.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BroadcastCursor {
    pub position: u64,
    pub lapped: u64,
}

impl BroadcastCursor {
    /// Start at the current head: a fresh subscriber observes only future
    /// messages.
    pub(crate) fn at_head(segment: &Segment) -> Self {
        Self {
            position: segment.header().head(),
            lapped: 0,
        }
    }
}

/// Copy `[len][payload]` into the slot for message index `index`.
///
/// Safety: caller must be the segment's single writer and `payload` must
/// fit the slot (checked by callers via `payload_capacity`).
unsafe fn write_slot(segment: &Segment, index: u64, payload: &[u8]) {
    let slot = segment.slot_ptr(index);
    let len = (payload.len() as u32).to_le_bytes();
    ptr::copy_nonoverlapping(len.as_ptr(), slot, LEN_PREFIX);
    ptr::copy_nonoverlapping(payload.as_ptr(), slot.add(LEN_PREFIX), payload.len());
}

/// Copy the slot for message index `index` out. Returns `None` when the
/// length prefix is out of range (torn or corrupt slot).
unsafe fn read_slot(segment: &Segment, index: u64) -> Option<Vec<u8>> {
    let slot = segment.slot_ptr(index);
    let mut len_bytes = [0u8; LEN_PREFIX];
    ptr::copy_nonoverlapping(slot, len_bytes.as_mut_ptr(), LEN_PREFIX);
    let len = u32::from_le_bytes(len_bytes) as usize;
    if len > segment.payload_capacity() {
        return None;
    }
    let mut payload = vec![0u8; len];
    ptr::copy_nonoverlapping(slot.add(LEN_PREFIX), payload.as_mut_ptr(), len);
    Some(payload)
}

/// Broadcast write: always succeeds, overwriting the oldest slot on a full
/// ring. The drop counter is optimistic: the writer cannot see reader
/// cursors, so it counts every overwrite of a previously written slot.
pub(crate) fn publish(segment: &Segment, payload: &[u8]) -> Result<()> {
    let capacity = segment.payload_capacity();
    if payload.len() > capacity {
        return Err(Error::PayloadTooLarge {
            len: payload.len(),
            capacity,
        });
    }
    let header = segment.header();
    let head = header.head();
    if head >= segment.num_slots() {
        header.bump_drop_count();
    }
    unsafe { write_slot(segment, head, payload) };
    header.publish_head(head + 1);
    header.bump_msg_count();
    Ok(())
}

/// Broadcast read at the cursor. Returns `Ok(None)` when no new message
/// is available. Lapped cursors skip forward to the oldest still-valid
/// slot, counting the skipped messages.
pub(crate) fn fetch(segment: &Segment, cursor: &mut BroadcastCursor) -> Result<Option<Vec<u8>>> {
    let header = segment.header();
    let num_slots = segment.num_slots();
    loop {
        if !segment.alive() {
            return Err(Error::Connection(format!(
                "segment {} was closed by its producer",
                segment.name()
            )));
        }
        let head = header.head();
        if head == cursor.position {
            return Ok(None);
        }
        if head - cursor.position > num_slots {
            let resume = head - num_slots + 1;
            cursor.lapped += resume - cursor.position;
            cursor.position = resume;
        }

        let index = cursor.position;
        let payload = unsafe { read_slot(segment, index) };

        // Re-check the head: if the writer advanced a full ring past the
        // slot while we were copying, the bytes may be torn. Skip to the
        // oldest still-valid slot and try again.
        let head_after = header.head();
        if head_after - index >= num_slots {
            let resume = head_after - num_slots + 1;
            cursor.lapped += resume - cursor.position;
            cursor.position = resume;
            continue;
        }

        return match payload {
            Some(payload) => {
                cursor.position += 1;
                Ok(Some(payload))
            }
            None => Err(Error::Connection(format!(
                "segment {}: corrupt slot length at index {index}",
                segment.name()
            ))),
        };
    }
}

/// Work-queue write. Fails with `BufferFull` (non-blocking) or `Timeout`
/// (blocking with deadline) when the ring stays full; blocks by
/// sleep-polling otherwise.
pub(crate) fn push(
    segment: &Segment,
    payload: &[u8],
    block: bool,
    timeout: Option<Duration>,
    poll_interval: Duration,
) -> Result<()> {
    let capacity = segment.payload_capacity();
    if payload.len() > capacity {
        return Err(Error::PayloadTooLarge {
            len: payload.len(),
            capacity,
        });
    }
    let header = segment.header();
    let deadline = timeout.map(|t| Instant::now() + t);
    loop {
        let head = header.head();
        let tail = header.tail();
        if head - tail < segment.num_slots() {
            unsafe { write_slot(segment, head, payload) };
            header.publish_head(head + 1);
            header.bump_msg_count();
            return Ok(());
        }
        if !block {
            header.bump_drop_count();
            return Err(Error::BufferFull);
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                header.bump_drop_count();
                return Err(Error::Timeout(timeout.unwrap_or_default()));
            }
        }
        std::thread::sleep(poll_interval);
    }
}

/// Work-queue read: take the message at the shared tail, if any.
///
/// Caller must hold the segment's claim lock; the tail store is what the
/// lock serialises.
pub(crate) fn claim_next(segment: &Segment) -> Result<Option<Vec<u8>>> {
    if !segment.alive() {
        return Err(Error::Connection(format!(
            "segment {} was closed by its producer",
            segment.name()
        )));
    }
    let header = segment.header();
    let head = header.head();
    let tail = header.tail();
    if head == tail {
        return Ok(None);
    }
    let payload = unsafe { read_slot(segment, tail) }.ok_or_else(|| {
        Error::Connection(format!(
            "segment {}: corrupt slot length at index {tail}",
            segment.name()
        ))
    })?;
    header.store_tail(tail + 1);
    Ok(Some(payload))
}
