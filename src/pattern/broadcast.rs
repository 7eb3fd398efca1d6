// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Broadcast pattern: one Publisher per channel, any number of independent
// Subscribers. Sends never block; slow subscribers are lapped and detect
// it themselves. Subscribers start at the current head and see only
// messages published after they attach.

use std::time::{Duration, Instant};

use log::debug;

use crate::codec::{Codec, RawCodec};
use crate::error::{Error, Result};
use crate::name::{self, Role};
use crate::pattern::{AttachConfig, RingConfig};
use crate::ring::{self, BroadcastCursor};
use crate::segment::Segment;

/// Publisher-side counters snapshot.
#[derive(Debug, Clone, Copy)]
pub struct PublisherStats {
    pub msg_count: u64,
    pub drop_count: u64,
    pub num_slots: u64,
    pub slot_size: u64,
    pub head: u64,
}

/// Subscriber-side position snapshot.
#[derive(Debug, Clone, Copy)]
pub struct SubscriberStats {
    pub local_tail: u64,
    pub head: u64,
    pub lapped_count: u64,
}

/// Owns the broadcast segment `shmcomm_pub_<channel>` and writes to it.
pub struct Publisher<C: Codec = RawCodec> {
    segment: Option<Segment>,
    codec: C,
}

impl<C: Codec> Publisher<C> {
    /// Create with the default geometry (64 slots x 4096 bytes).
    pub fn create(channel: &str) -> Result<Self> {
        Self::with_config(channel, RingConfig::BROADCAST)
    }

    pub fn with_config(channel: &str, config: RingConfig) -> Result<Self> {
        let name = name::segment_name(Role::Pub, channel)?;
        let segment = Segment::create(&name, config.num_slots, config.slot_size)?;
        Ok(Self {
            segment: Some(segment),
            codec: C::default(),
        })
    }

    /// Encode and publish. Never blocks; overwrites the oldest slot when
    /// the ring is full.
    pub fn send(&mut self, value: &C::Item) -> Result<()> {
        let payload = self.codec.encode(value)?;
        self.send_bytes(&payload)
    }

    /// Publish pre-encoded bytes.
    pub fn send_bytes(&mut self, payload: &[u8]) -> Result<()> {
        ring::publish(self.segment()?, payload)
    }

    pub fn stats(&self) -> Result<PublisherStats> {
        let segment = self.segment()?;
        let header = segment.header();
        Ok(PublisherStats {
            msg_count: header.msg_count(),
            drop_count: header.drop_count(),
            num_slots: segment.num_slots(),
            slot_size: segment.slot_size(),
            head: header.head(),
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
            debug!("closed publisher on {name}");
        }
    }

    fn segment(&self) -> Result<&Segment> {
        self.segment.as_ref().ok_or(Error::State("publisher is closed"))
    }
}

impl<C: Codec> Drop for Publisher<C> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Attaches to `shmcomm_pub_<channel>` with a private read cursor.
pub struct Subscriber<C: Codec = RawCodec> {
    segment: Option<Segment>,
    cursor: BroadcastCursor,
    poll_interval: Duration,
    codec: C,
}

impl<C: Codec> Subscriber<C> {
    /// Attach with the default connect timeout (5 s).
    pub fn attach(channel: &str) -> Result<Self> {
        Self::with_config(channel, AttachConfig::default())
    }

    pub fn with_config(channel: &str, config: AttachConfig) -> Result<Self> {
        let name = name::segment_name(Role::Pub, channel)?;
        let segment = Segment::attach(&name, config.timeout_connect)?;
        let cursor = BroadcastCursor::at_head(&segment);
        Ok(Self {
            segment: Some(segment),
            cursor,
            poll_interval: config.poll_interval,
            codec: C::default(),
        })
    }

    /// Receive and decode the next message, polling up to `timeout`.
    /// Returns `None` when no message arrived in time.
    pub fn recv(&mut self, timeout: Duration) -> Result<Option<C::Item>> {
        match self.recv_bytes(timeout)? {
            Some(bytes) => Ok(Some(self.codec.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Receive the next message as raw bytes.
    pub fn recv_bytes(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        let deadline = Instant::now() + timeout;
        loop {
            let segment = self
                .segment
                .as_ref()
                .ok_or(Error::State("subscriber is closed"))?;
            if let Some(payload) = ring::fetch(segment, &mut self.cursor)? {
                return Ok(Some(payload));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            std::thread::sleep(self.poll_interval);
        }
    }

    pub fn stats(&self) -> Result<SubscriberStats> {
        let segment = self
            .segment
            .as_ref()
            .ok_or(Error::State("subscriber is closed"))?;
        Ok(SubscriberStats {
            local_tail: self.cursor.position,
            head: segment.header().head(),
            lapped_count: self.cursor.lapped,
        })
    }

    /// Detach from the segment. Never unlinks; the publisher owns the
    /// segment lifecycle. Idempotent; also runs on drop.
    pub fn close(&mut self) {
        self.segment = None;
    }
}

impl<C: Codec> Drop for Subscriber<C> {
    fn drop(&mut self) {
        self.close();
    }
}
