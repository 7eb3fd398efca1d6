// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Segment manager: create / attach / unlink / list for named shared-memory
// segments carrying the fixed header + slot-ring layout. Only producers
// create; consumers attach with a deadline and never unlink on detach.

use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::layout::{self, SegmentHeader, HEADER_SIZE, LEN_PREFIX, MAGIC, MIN_SLOT_SIZE, VERSION};
use crate::name::SEGMENT_PREFIX;
use crate::platform::{self, RawSegment};

/// How often [`Segment::attach`] re-checks for the segment to appear.
const ATTACH_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// A mapped segment: the 128-byte header plus `num_slots` slots of
/// `slot_size` bytes. Geometry is cached at map time; it is write-once in
/// the header and cannot change underneath us.
#[derive(Debug)]
pub struct Segment {
    raw: RawSegment,
    name: String,
    num_slots: u64,
    slot_size: u64,
}

impl Segment {
    /// Create (producer side). Any stale segment under this name is
    /// unlinked first, so a crashed producer does not block its successor.
    pub fn create(name: &str, num_slots: usize, slot_size: usize) -> Result<Self> {
        if num_slots == 0 {
            return Err(Error::Connection("num_slots must be at least 1".into()));
        }
        if slot_size < MIN_SLOT_SIZE {
            return Err(Error::Connection(format!(
                "slot_size must be at least {MIN_SLOT_SIZE} bytes"
            )));
        }

        if RawSegment::unlink_by_name(name) {
            debug!("unlinked stale segment {name}");
        }

        let size = layout::segment_size(num_slots, slot_size);
        let raw = RawSegment::create(name, size)
            .map_err(|e| Error::conn(&format!("creating segment {name}"), e))?;

        let segment = Self {
            raw,
            name: name.to_string(),
            num_slots: num_slots as u64,
            slot_size: slot_size as u64,
        };
        // Fresh shm is zero-filled by the OS; only the header needs stores.
        segment.header().init(num_slots as u64, slot_size as u64);
        debug!("created segment {name}: {num_slots} slots x {slot_size} bytes");
        Ok(segment)
    }

    /// Attach (consumer side). Polls until the segment appears and its
    /// header validates, or `timeout` elapses.
    pub fn attach(name: &str, timeout: Duration) -> Result<Self> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(raw) = RawSegment::open(name) {
                if raw.size() >= HEADER_SIZE {
                    let header = unsafe { &*(raw.ptr() as *const SegmentHeader) };
                    let magic = header.magic();
                    if magic == MAGIC {
                        return Self::validate(raw, name);
                    }
                    if magic != 0 {
                        return Err(Error::Connection(format!(
                            "segment {name}: bad magic {magic:#018x}"
                        )));
                    }
                    // Magic still zero: the creator has the segment sized
                    // but not yet initialised. Keep polling.
                }
            }
            if Instant::now() >= deadline {
                return Err(Error::Connection(format!(
                    "segment {name}: not available within {timeout:?}"
                )));
            }
            std::thread::sleep(ATTACH_POLL_INTERVAL);
        }
    }

    fn validate(raw: RawSegment, name: &str) -> Result<Self> {
        let header = unsafe { &*(raw.ptr() as *const SegmentHeader) };
        if header.version() != VERSION {
            return Err(Error::Connection(format!(
                "segment {name}: format version {} (expected {VERSION})",
                header.version()
            )));
        }
        let num_slots = header.num_slots();
        let slot_size = header.slot_size();
        let expected = layout::segment_size(num_slots as usize, slot_size as usize);
        if raw.size() < expected {
            return Err(Error::Connection(format!(
                "segment {name}: mapped {} bytes but header describes {expected}",
                raw.size()
            )));
        }
        trace!("attached segment {name}: {num_slots} slots x {slot_size} bytes");
        Ok(Self {
            raw,
            name: name.to_string(),
            num_slots,
            slot_size,
        })
    }

    /// Best-effort unlink by full segment name. Returns whether a segment
    /// existed.
    pub fn unlink(name: &str) -> bool {
        let existed = RawSegment::unlink_by_name(name);
        if existed {
            debug!("unlinked segment {name}");
        }
        existed
    }

    /// Enumerate library-prefixed segments, where the platform supports it.
    pub fn list() -> Vec<String> {
        platform::list_segments(SEGMENT_PREFIX)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_slots(&self) -> u64 {
        self.num_slots
    }

    pub fn slot_size(&self) -> u64 {
        self.slot_size
    }

    /// Largest payload one slot can carry.
    pub fn payload_capacity(&self) -> usize {
        self.slot_size as usize - LEN_PREFIX
    }

    pub fn header(&self) -> &SegmentHeader {
        unsafe { &*(self.raw.ptr() as *const SegmentHeader) }
    }

    /// Whether the header still carries our magic. A producer poisons it
    /// on graceful close, failing consumers fast instead of by timeout.
    pub(crate) fn alive(&self) -> bool {
        self.header().magic() == MAGIC
    }

    pub(crate) fn poison(&self) {
        self.header().poison();
    }

    pub(crate) fn slot_ptr(&self, index: u64) -> *mut u8 {
        let offset = layout::slot_offset(index, self.num_slots, self.slot_size);
        unsafe { self.raw.ptr().add(offset) }
    }
}
