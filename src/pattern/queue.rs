// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Work-queue pattern: one Pusher per channel, competing Pullers. Each
// message is delivered to exactly one puller; pullers serialise tail
// advancement through a file lock derived from the segment name. Unlike
// broadcast, the producer blocks by default when the ring is full.

use std::time::{Duration, Instant};

use log::debug;

use crate::codec::{Codec, RawCodec};
use crate::error::{Error, Result};
use crate::lock::FileLock;
use crate::name::{self, Role};
use crate::pattern::{AttachConfig, RingConfig, DEFAULT_POLL_INTERVAL};
use crate::ring;
use crate::segment::Segment;

/// Queue counters snapshot.
#[derive(Debug, Clone, Copy)]
pub struct QueueStats {
    pub msg_count: u64,
    pub drop_count: u64,
    pub num_slots: u64,
    pub slot_size: u64,
    pub head: u64,
    pub tail: u64,
    /// Messages pushed but not yet claimed.
    pub backlog: u64,
}

/// Owns the queue segment `shmcomm_push_<channel>` and feeds it. There is
/// exactly one pusher per channel; creation is exclusive.
pub struct Pusher<C: Codec = RawCodec> {
    segment: Option<Segment>,
    poll_interval: Duration,
    codec: C,
}

impl<C: Codec> Pusher<C> {
    /// Create with the default geometry (128 slots x 4096 bytes).
    pub fn create(channel: &str) -> Result<Self> {
        Self::with_config(channel, RingConfig::WORK_QUEUE)
    }

    pub fn with_config(channel: &str, config: RingConfig) -> Result<Self> {
        let name = name::segment_name(Role::Push, channel)?;
        let segment = Segment::create(&name, config.num_slots, config.slot_size)?;
        Ok(Self {
            segment: Some(segment),
            poll_interval: DEFAULT_POLL_INTERVAL,
            codec: C::default(),
        })
    }

    /// Encode and enqueue, blocking while the ring is full.
    pub fn push(&mut self, value: &C::Item) -> Result<()> {
        let payload = self.codec.encode(value)?;
        self.push_bytes(&payload)
    }

    /// Enqueue pre-encoded bytes, blocking while the ring is full.
    pub fn push_bytes(&mut self, payload: &[u8]) -> Result<()> {
        ring::push(self.segment()?, payload, true, None, self.poll_interval)
    }

    /// Encode and enqueue, blocking up to `timeout`.
    pub fn push_timeout(&mut self, value: &C::Item, timeout: Duration) -> Result<()> {
        let payload = self.codec.encode(value)?;
        ring::push(
            self.segment()?,
            &payload,
            true,
            Some(timeout),
            self.poll_interval,
        )
    }

    /// Encode and enqueue without blocking; `BufferFull` when the ring has
    /// no space.
    pub fn try_push(&mut self, value: &C::Item) -> Result<()> {
        let payload = self.codec.encode(value)?;
        ring::push(self.segment()?, &payload, false, None, self.poll_interval)
    }

    pub fn stats(&self) -> Result<QueueStats> {
        let segment = self.segment()?;
        let header = segment.header();
        let head = header.head();
        let tail = header.tail();
        Ok(QueueStats {
            msg_count: header.msg_count(),
            drop_count: header.drop_count(),
            num_slots: segment.num_slots(),
            slot_size: segment.slot_size(),
            head,
            tail,
            backlog: head - tail,
        })
    }

    /// Poison the header and unlink the segment. Idempotent; also runs on
    /// drop.
    pub fn close(&mut self) {
        if let Some(segment) = self.segment.take() {
            segment.poison();
            let name = segment.name().to_string();
            drop(segment);
            Segment::unlink(&name);
            debug!("closed pusher on {name}");
        }
    }

    fn segment(&self) -> Result<&Segment> {
        self.segment.as_ref().ok_or(Error::State("pusher is closed"))
    }
}

impl<C: Codec> Drop for Pusher<C> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Attaches to `shmcomm_push_<channel>` and competes for messages under
/// the channel's claim lock.
pub struct Puller<C: Codec = RawCodec> {
    segment: Option<Segment>,
    claim_lock: FileLock,
    poll_interval: Duration,
    codec: C,
}

impl<C: Codec> Puller<C> {
    /// Attach with the default connect timeout (5 s).
    pub fn attach(channel: &str) -> Result<Self> {
        Self::with_config(channel, AttachConfig::default())
    }

    pub fn with_config(channel: &str, config: AttachConfig) -> Result<Self> {
        let name = name::segment_name(Role::Push, channel)?;
        let segment = Segment::attach(&name, config.timeout_connect)?;
        let claim_lock = FileLock::open(name::lock_path(&name))?;
        Ok(Self {
            segment: Some(segment),
            claim_lock,
            poll_interval: config.poll_interval,
            codec: C::default(),
        })
    }

    /// Claim and decode the next message, polling up to `timeout`.
    /// Returns `None` when the queue stayed empty.
    pub fn pull(&mut self, timeout: Duration) -> Result<Option<C::Item>> {
        match self.pull_bytes(timeout)? {
            Some(bytes) => Ok(Some(self.codec.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Claim the next message as raw bytes.
    pub fn pull_bytes(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        let deadline = Instant::now() + timeout;
        loop {
            let segment = self
                .segment
                .as_ref()
                .ok_or(Error::State("puller is closed"))?;
            // Hold the claim lock only across the tail advance, never
            // across a sleep.
            let claimed = {
                let _guard = self.claim_lock.lock()?;
                ring::claim_next(segment)?
            };
            if let Some(payload) = claimed {
                return Ok(Some(payload));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            std::thread::sleep(self.poll_interval);
        }
    }

    /// Detach. Never unlinks the segment or removes the lock file.
    /// Idempotent; also runs on drop.
    pub fn close(&mut self) {
        self.segment = None;
    }
}

impl<C: Codec> Drop for Puller<C> {
    fn drop(&mut self) {
        self.close();
    }
}
