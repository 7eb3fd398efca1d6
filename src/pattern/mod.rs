// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Messaging patterns layered on the ring protocols: broadcast
// (Publisher/Subscriber), request-reply (Requester/Replier), and
// work-queue (Pusher/Puller). Producers own their segments and unlink
// them on close; consumers only ever detach.

use std::time::Duration;

pub mod broadcast;
pub mod queue;
pub mod reqrep;

pub use broadcast::{Publisher, PublisherStats, Subscriber, SubscriberStats};
pub use queue::{Puller, Pusher, QueueStats};
pub use reqrep::{Replier, Requester};

/// Interval consumers (and blocked producers) sleep between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_micros(100);

/// Ring geometry fixed at channel creation.
#[derive(Debug, Clone, Copy)]
pub struct RingConfig {
    pub num_slots: usize,
    pub slot_size: usize,
}

impl RingConfig {
    /// Broadcast default: shallow ring, page-sized slots.
    pub const BROADCAST: Self = Self {
        num_slots: 64,
        slot_size: 4096,
    };

    /// Request-reply default: small ring, roomier slots.
    pub const REQUEST_REPLY: Self = Self {
        num_slots: 16,
        slot_size: 8192,
    };

    /// Work-queue default: deeper ring to absorb bursts.
    pub const WORK_QUEUE: Self = Self {
        num_slots: 128,
        slot_size: 4096,
    };
}

/// Consumer-side attachment options.
#[derive(Debug, Clone, Copy)]
pub struct AttachConfig {
    /// How long to wait for the producer's segment to appear.
    pub timeout_connect: Duration,
    /// Sleep between receive polls.
    pub poll_interval: Duration,
}

impl Default for AttachConfig {
    fn default() -> Self {
        Self {
            timeout_connect: Duration::from_secs(5),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}
