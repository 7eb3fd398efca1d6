// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Broadcast pattern tests: publish/subscribe, lapping, overwrite
// accounting, close semantics.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use shmcomm::{Error, Publisher, RawCodec, RingConfig, Subscriber};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn unique_channel(prefix: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{}_{n}", std::process::id())
}

const SMALL: RingConfig = RingConfig {
    num_slots: 4,
    slot_size: 64,
};

#[test]
fn basic_send_recv() {
    let channel = unique_channel("bc_basic");
    let mut publisher = Publisher::<RawCodec>::with_config(&channel, SMALL).expect("create");
    let mut subscriber = Subscriber::<RawCodec>::attach(&channel).expect("attach");

    for payload in [b"a", b"b", b"c"] {
        publisher.send_bytes(payload).expect("send");
    }
    for expected in [b"a", b"b", b"c"] {
        let got = subscriber
            .recv_bytes(Duration::from_secs(1))
            .expect("recv")
            .expect("message");
        assert_eq!(got, expected);
    }

    let stats = publisher.stats().expect("stats");
    assert_eq!(stats.msg_count, 3);
    assert_eq!(stats.drop_count, 0);
    assert_eq!(stats.head, 3);
    assert_eq!(stats.num_slots, 4);
    assert_eq!(stats.slot_size, 64);

    let sub_stats = subscriber.stats().expect("stats");
    assert_eq!(sub_stats.local_tail, 3);
    assert_eq!(sub_stats.head, 3);
    assert_eq!(sub_stats.lapped_count, 0);
}

#[test]
fn subscriber_sees_only_future_messages() {
    let channel = unique_channel("bc_future");
    let mut publisher = Publisher::<RawCodec>::with_config(&channel, SMALL).expect("create");

    publisher.send_bytes(b"early").expect("send");
    let mut subscriber = Subscriber::<RawCodec>::attach(&channel).expect("attach");

    assert!(subscriber
        .recv_bytes(Duration::ZERO)
        .expect("recv")
        .is_none());

    publisher.send_bytes(b"late").expect("send");
    let got = subscriber
        .recv_bytes(Duration::from_secs(1))
        .expect("recv")
        .expect("message");
    assert_eq!(got, b"late");
}

#[test]
fn lapped_subscriber_skips_to_oldest_valid() {
    let channel = unique_channel("bc_lap");
    let mut publisher = Publisher::<RawCodec>::with_config(&channel, SMALL).expect("create");
    let mut subscriber = Subscriber::<RawCodec>::attach(&channel).expect("attach");

    // Ten sends into four slots with no reads in between.
    for i in 0..10u32 {
        publisher.send_bytes(format!("{i}").as_bytes()).expect("send");
    }

    // Oldest still-valid message is head - num_slots + 1 = 7.
    let got = subscriber
        .recv_bytes(Duration::from_secs(1))
        .expect("recv")
        .expect("message");
    assert_eq!(got, b"7");
    assert_eq!(subscriber.stats().expect("stats").lapped_count, 7);

    for expected in [b"8", b"9"] {
        let got = subscriber
            .recv_bytes(Duration::from_secs(1))
            .expect("recv")
            .expect("message");
        assert_eq!(got, expected);
    }
    assert!(subscriber
        .recv_bytes(Duration::ZERO)
        .expect("recv")
        .is_none());

    let stats = publisher.stats().expect("stats");
    assert_eq!(stats.msg_count, 10);
    // Sends 4..9 overwrote previously written slots.
    assert_eq!(stats.drop_count, 6);
}

#[test]
fn payload_must_fit_one_slot() {
    let channel = unique_channel("bc_too_large");
    let config = RingConfig {
        num_slots: 4,
        slot_size: 16,
    };
    let mut publisher = Publisher::<RawCodec>::with_config(&channel, config).expect("create");

    let err = publisher.send_bytes(&[b'x'; 13]).unwrap_err();
    assert!(matches!(
        err,
        Error::PayloadTooLarge {
            len: 13,
            capacity: 12
        }
    ));

    publisher.send_bytes(&[b'x'; 12]).expect("send at capacity");
}

#[test]
fn recv_timeout_returns_none() {
    let channel = unique_channel("bc_timeout");
    let _publisher = Publisher::<RawCodec>::with_config(&channel, SMALL).expect("create");
    let mut subscriber = Subscriber::<RawCodec>::attach(&channel).expect("attach");

    let start = Instant::now();
    let got = subscriber
        .recv_bytes(Duration::from_millis(50))
        .expect("recv");
    assert!(got.is_none());
    assert!(start.elapsed() >= Duration::from_millis(50));
}

#[test]
fn closed_publisher_fails_subscriber() {
    let channel = unique_channel("bc_closed");
    let mut publisher = Publisher::<RawCodec>::with_config(&channel, SMALL).expect("create");
    let mut subscriber = Subscriber::<RawCodec>::attach(&channel).expect("attach");

    publisher.close();
    let err = subscriber.recv_bytes(Duration::from_millis(50)).unwrap_err();
    assert!(matches!(err, Error::Connection(_)));
}

#[test]
fn close_is_idempotent() {
    let channel = unique_channel("bc_close_twice");
    let mut publisher = Publisher::<RawCodec>::with_config(&channel, SMALL).expect("create");
    publisher.close();
    publisher.close();
    assert!(matches!(
        publisher.send_bytes(b"x"),
        Err(Error::State(_))
    ));
}

#[test]
fn crashed_publisher_is_replaced() {
    let channel = unique_channel("bc_crash");
    let publisher = Publisher::<RawCodec>::with_config(&channel, SMALL).expect("create");
    let mut old_subscriber = Subscriber::<RawCodec>::attach(&channel).expect("attach");

    // Crash: the process dies without close(), leaving the segment behind.
    std::mem::forget(publisher);

    // A new producer under the same channel succeeds via stale unlink.
    let mut publisher = Publisher::<RawCodec>::with_config(&channel, SMALL).expect("recreate");
    publisher.send_bytes(b"fresh").expect("send");

    // The old subscriber still reads its orphaned mapping: no error, no
    // messages. Re-attach is required to see the new segment.
    assert!(old_subscriber
        .recv_bytes(Duration::ZERO)
        .expect("recv")
        .is_none());

    let mut subscriber = Subscriber::<RawCodec>::attach(&channel).expect("re-attach");
    publisher.send_bytes(b"fresh2").expect("send");
    let got = subscriber
        .recv_bytes(Duration::from_secs(1))
        .expect("recv")
        .expect("message");
    assert_eq!(got, b"fresh2");
}

#[test]
fn independent_subscribers_each_get_everything() {
    let channel = unique_channel("bc_two_subs");
    let mut publisher = Publisher::<RawCodec>::with_config(&channel, SMALL).expect("create");
    let mut sub_a = Subscriber::<RawCodec>::attach(&channel).expect("attach a");
    let mut sub_b = Subscriber::<RawCodec>::attach(&channel).expect("attach b");

    for payload in [b"x", b"y", b"z"] {
        publisher.send_bytes(payload).expect("send");
    }
    for sub in [&mut sub_a, &mut sub_b] {
        for expected in [b"x", b"y", b"z"] {
            let got = sub
                .recv_bytes(Duration::from_secs(1))
                .expect("recv")
                .expect("message");
            assert_eq!(got, expected);
        }
    }
}

#[test]
fn keeping_up_preserves_order_and_content() {
    let channel = unique_channel("bc_order");
    let config = RingConfig {
        num_slots: 128,
        slot_size: 64,
    };
    let mut publisher = Publisher::<RawCodec>::with_config(&channel, config).expect("create");
    let mut subscriber = Subscriber::<RawCodec>::attach(&channel).expect("attach");

    for i in 0..100u32 {
        publisher.send_bytes(format!("{i}").as_bytes()).expect("send");
    }
    for i in 0..100u32 {
        let got = subscriber
            .recv_bytes(Duration::from_secs(1))
            .expect("recv")
            .expect("message");
        assert_eq!(got, format!("{i}").as_bytes());
    }
    assert_eq!(subscriber.stats().expect("stats").lapped_count, 0);
}
