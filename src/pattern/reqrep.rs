// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Request-reply pattern over two paired broadcast rings: the replier
// creates `shmcomm_req_<service>` (client → server) and
// `shmcomm_rep_<service>` (server → client) together and owns both.
//
// Every request carries an 8-byte correlation id that the replier echoes
// in its reply. A requester only accepts the reply matching its
// outstanding id and skips anything stale, so a slow or abandoned client
// cannot consume another client's reply.

use std::time::{Duration, Instant};

use log::debug;

use crate::codec::{Codec, RawCodec};
use crate::error::{Error, Result};
use crate::name::{self, Role};
use crate::pattern::{AttachConfig, RingConfig, DEFAULT_POLL_INTERVAL};
use crate::ring::{self, BroadcastCursor};
use crate::segment::Segment;

const CORRELATION_PREFIX: usize = 8;

fn frame(id: u64, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(CORRELATION_PREFIX + payload.len());
    buf.extend_from_slice(&id.to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

fn unframe(bytes: &[u8]) -> Result<(u64, &[u8])> {
    if bytes.len() < CORRELATION_PREFIX {
        return Err(Error::Connection(
            "request/reply frame shorter than its correlation id".into(),
        ));
    }
    let mut id = [0u8; CORRELATION_PREFIX];
    id.copy_from_slice(&bytes[..CORRELATION_PREFIX]);
    Ok((u64::from_le_bytes(id), &bytes[CORRELATION_PREFIX..]))
}

/// Server side: receives requests, sends exactly one reply per request.
///
/// `recv` and `send` must alternate; calling them out of order is a
/// `State` error.
pub struct Replier<C: Codec = RawCodec> {
    request_ring: Option<Segment>,
    reply_ring: Option<Segment>,
    cursor: BroadcastCursor,
    /// Correlation id of the request being served; `None` means idle.
    pending: Option<u64>,
    poll_interval: Duration,
    codec: C,
}

impl<C: Codec> Replier<C> {
    /// Create both rings with the default geometry (16 slots x 8192
    /// bytes).
    pub fn create(service: &str) -> Result<Self> {
        Self::with_config(service, RingConfig::REQUEST_REPLY)
    }

    pub fn with_config(service: &str, config: RingConfig) -> Result<Self> {
        let req_name = name::segment_name(Role::Req, service)?;
        let rep_name = name::segment_name(Role::Rep, service)?;
        let request_ring = Segment::create(&req_name, config.num_slots, config.slot_size)?;
        let reply_ring = match Segment::create(&rep_name, config.num_slots, config.slot_size) {
            Ok(segment) => segment,
            Err(e) => {
                // Unwind the half-created pair.
                request_ring.poison();
                drop(request_ring);
                Segment::unlink(&req_name);
                return Err(e);
            }
        };
        Ok(Self {
            request_ring: Some(request_ring),
            reply_ring: Some(reply_ring),
            cursor: BroadcastCursor {
                position: 0,
                lapped: 0,
            },
            pending: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            codec: C::default(),
        })
    }

    /// Receive the next request, polling up to `timeout`. Returns `None`
    /// when no request arrived in time; on success the replier owes a
    /// reply before the next `recv`.
    pub fn recv(&mut self, timeout: Duration) -> Result<Option<C::Item>> {
        if self.pending.is_some() {
            return Err(Error::State("recv while a reply is outstanding"));
        }
        let deadline = Instant::now() + timeout;
        loop {
            let segment = self
                .request_ring
                .as_ref()
                .ok_or(Error::State("replier is closed"))?;
            if let Some(bytes) = ring::fetch(segment, &mut self.cursor)? {
                let (id, payload) = unframe(&bytes)?;
                let value = self.codec.decode(payload)?;
                self.pending = Some(id);
                return Ok(Some(value));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            std::thread::sleep(self.poll_interval);
        }
    }

    /// Reply to the request received last. Echoes its correlation id.
    pub fn send(&mut self, value: &C::Item) -> Result<()> {
        let id = self
            .pending
            .ok_or(Error::State("send without a pending request"))?;
        let payload = self.codec.encode(value)?;
        let segment = self
            .reply_ring
            .as_ref()
            .ok_or(Error::State("replier is closed"))?;
        ring::publish(segment, &frame(id, &payload))?;
        self.pending = None;
        Ok(())
    }

    /// Poison and unlink both rings. Idempotent; also runs on drop.
    pub fn close(&mut self) {
        for segment in [self.request_ring.take(), self.reply_ring.take()]
            .into_iter()
            .flatten()
        {
            segment.poison();
            let name = segment.name().to_string();
            drop(segment);
            Segment::unlink(&name);
            debug!("closed replier ring {name}");
        }
    }
}

impl<C: Codec> Drop for Replier<C> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Client side: sends one request at a time and waits for its reply.
#[derive(Debug)]
pub struct Requester<C: Codec = RawCodec> {
    request_ring: Option<Segment>,
    reply_ring: Option<Segment>,
    cursor: BroadcastCursor,
    /// Correlation id awaiting a reply; `None` means idle.
    outstanding: Option<u64>,
    next_id: u64,
    poll_interval: Duration,
    codec: C,
}

impl<C: Codec> Requester<C> {
    /// Attach to both rings with the default connect timeout (5 s).
    pub fn connect(service: &str) -> Result<Self> {
        Self::with_config(service, AttachConfig::default())
    }

    pub fn with_config(service: &str, config: AttachConfig) -> Result<Self> {
        let req_name = name::segment_name(Role::Req, service)?;
        let rep_name = name::segment_name(Role::Rep, service)?;
        let request_ring = Segment::attach(&req_name, config.timeout_connect)?;
        let reply_ring = Segment::attach(&rep_name, config.timeout_connect)?;
        let cursor = BroadcastCursor::at_head(&reply_ring);
        Ok(Self {
            request_ring: Some(request_ring),
            reply_ring: Some(reply_ring),
            cursor,
            outstanding: None,
            next_id: 1,
            poll_interval: config.poll_interval,
            codec: C::default(),
        })
    }

    /// Send a request. A reply must be received (or time out) before the
    /// next send.
    pub fn send(&mut self, value: &C::Item) -> Result<()> {
        if self.outstanding.is_some() {
            return Err(Error::State("send while awaiting a reply"));
        }
        let payload = self.codec.encode(value)?;
        let id = self.next_id;
        let segment = self
            .request_ring
            .as_ref()
            .ok_or(Error::State("requester is closed"))?;
        ring::publish(segment, &frame(id, &payload))?;
        self.next_id += 1;
        self.outstanding = Some(id);
        Ok(())
    }

    /// Wait for the reply to the outstanding request. Replies carrying a
    /// different correlation id are stale and skipped. `Timeout` after
    /// `timeout`; either way the requester returns to idle.
    pub fn recv(&mut self, timeout: Duration) -> Result<C::Item> {
        let id = self
            .outstanding
            .ok_or(Error::State("recv without an outstanding request"))?;
        let deadline = Instant::now() + timeout;
        loop {
            let segment = self
                .reply_ring
                .as_ref()
                .ok_or(Error::State("requester is closed"))?;
            while let Some(bytes) = ring::fetch(segment, &mut self.cursor)? {
                let (reply_id, payload) = unframe(&bytes)?;
                if reply_id == id {
                    self.outstanding = None;
                    return self.codec.decode(payload);
                }
            }
            if Instant::now() >= deadline {
                self.outstanding = None;
                return Err(Error::Timeout(timeout));
            }
            std::thread::sleep(self.poll_interval);
        }
    }

    /// Send and wait for the matching reply.
    pub fn request(&mut self, value: &C::Item, timeout: Duration) -> Result<C::Item> {
        self.send(value)?;
        self.recv(timeout)
    }

    /// Detach from both rings. Idempotent; also runs on drop.
    pub fn close(&mut self) {
        self.request_ring = None;
        self.reply_ring = None;
    }
}

impl<C: Codec> Drop for Requester<C> {
    fn drop(&mut self) {
        self.close();
    }
}
