// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Work-queue pattern tests: exactly-once fan-out, backpressure, blocking
// and non-blocking producers.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use shmcomm::{Error, Puller, Pusher, RawCodec, RingConfig};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn unique_channel(prefix: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{}_{n}", std::process::id())
}

const TINY: RingConfig = RingConfig {
    num_slots: 2,
    slot_size: 16,
};

#[test]
fn fan_out_is_exactly_once() {
    let channel = unique_channel("wq_fanout");
    let mut pusher = Pusher::<RawCodec>::create(&channel).expect("create");

    for i in 0..100u32 {
        pusher.push_bytes(format!("{i:03}").as_bytes()).expect("push");
    }

    let mut workers = Vec::new();
    for _ in 0..2 {
        let channel = channel.clone();
        workers.push(std::thread::spawn(move || {
            let mut puller = Puller::<RawCodec>::attach(&channel).expect("attach");
            let mut claimed = Vec::new();
            while let Some(payload) = puller
                .pull_bytes(Duration::from_millis(200))
                .expect("pull")
            {
                claimed.push(payload);
            }
            claimed
        }));
    }

    let mut all: Vec<Vec<u8>> = Vec::new();
    let mut per_worker: Vec<HashSet<Vec<u8>>> = Vec::new();
    for worker in workers {
        let claimed = worker.join().expect("worker thread");
        per_worker.push(claimed.iter().cloned().collect());
        all.extend(claimed);
    }

    // Union equals everything sent, intersection is empty.
    assert_eq!(all.len(), 100);
    let union: HashSet<&Vec<u8>> = all.iter().collect();
    assert_eq!(union.len(), 100);
    assert!(per_worker[0].is_disjoint(&per_worker[1]));
    for i in 0..100u32 {
        assert!(union.contains(&format!("{i:03}").into_bytes()));
    }
}

#[test]
fn single_puller_preserves_order() {
    let channel = unique_channel("wq_order");
    let mut pusher = Pusher::<RawCodec>::create(&channel).expect("create");
    let mut puller = Puller::<RawCodec>::attach(&channel).expect("attach");

    for i in 0..10u32 {
        pusher.push_bytes(format!("{i}").as_bytes()).expect("push");
    }
    for i in 0..10u32 {
        let got = puller
            .pull_bytes(Duration::from_secs(1))
            .expect("pull")
            .expect("job");
        assert_eq!(got, format!("{i}").into_bytes());
    }
    assert!(puller.pull_bytes(Duration::ZERO).expect("pull").is_none());
}

#[test]
fn try_push_fails_when_full() {
    let channel = unique_channel("wq_full");
    let mut pusher = Pusher::<RawCodec>::with_config(&channel, TINY).expect("create");

    pusher.try_push(&b"a".to_vec()).expect("first");
    pusher.try_push(&b"b".to_vec()).expect("second");
    assert!(matches!(
        pusher.try_push(&b"c".to_vec()),
        Err(Error::BufferFull)
    ));

    let stats = pusher.stats().expect("stats");
    assert_eq!(stats.msg_count, 2);
    assert_eq!(stats.drop_count, 1);
    assert_eq!(stats.head, 2);
    assert_eq!(stats.tail, 0);
    assert_eq!(stats.backlog, 2);
    assert!(stats.head - stats.tail <= stats.num_slots);
}

#[test]
fn blocking_push_times_out_on_full_ring() {
    let channel = unique_channel("wq_push_timeout");
    let mut pusher = Pusher::<RawCodec>::with_config(&channel, TINY).expect("create");

    pusher.push(&b"a".to_vec()).expect("first");
    pusher.push(&b"b".to_vec()).expect("second");

    let start = Instant::now();
    let err = pusher
        .push_timeout(&b"c".to_vec(), Duration::from_millis(50))
        .unwrap_err();
    assert!(start.elapsed() >= Duration::from_millis(50));
    assert!(matches!(err, Error::Timeout(_)));
}

#[test]
fn blocked_push_resumes_when_a_slot_frees() {
    let channel = unique_channel("wq_unblock");
    let mut pusher = Pusher::<RawCodec>::with_config(&channel, TINY).expect("create");
    let mut puller = Puller::<RawCodec>::attach(&channel).expect("attach");

    pusher.push(&b"a".to_vec()).expect("first");
    pusher.push(&b"b".to_vec()).expect("second");

    let drainer = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        let got = puller
            .pull_bytes(Duration::from_secs(1))
            .expect("pull")
            .expect("job");
        assert_eq!(got, b"a");
        puller
    });

    pusher
        .push_timeout(&b"c".to_vec(), Duration::from_secs(2))
        .expect("push resumes");

    let mut puller = drainer.join().expect("drainer thread");
    for expected in [b"b", b"c"] {
        let got = puller
            .pull_bytes(Duration::from_secs(1))
            .expect("pull")
            .expect("job");
        assert_eq!(got, expected);
    }
}

#[test]
fn duplicate_payloads_survive_as_a_multiset() {
    let channel = unique_channel("wq_multiset");
    let mut pusher = Pusher::<RawCodec>::create(&channel).expect("create");
    let mut puller = Puller::<RawCodec>::attach(&channel).expect("attach");

    for _ in 0..3 {
        pusher.push_bytes(b"same").expect("push");
    }
    let mut count = 0;
    while let Some(payload) = puller.pull_bytes(Duration::from_millis(50)).expect("pull") {
        assert_eq!(payload, b"same");
        count += 1;
    }
    assert_eq!(count, 3);
}

#[test]
fn pull_empty_returns_none() {
    let channel = unique_channel("wq_empty");
    let _pusher = Pusher::<RawCodec>::create(&channel).expect("create");
    let mut puller = Puller::<RawCodec>::attach(&channel).expect("attach");

    assert!(puller.pull_bytes(Duration::ZERO).expect("pull").is_none());
}

#[test]
fn closed_pusher_fails_puller() {
    let channel = unique_channel("wq_closed");
    let mut pusher = Pusher::<RawCodec>::create(&channel).expect("create");
    let mut puller = Puller::<RawCodec>::attach(&channel).expect("attach");

    pusher.close();
    let err = puller.pull_bytes(Duration::from_millis(50)).unwrap_err();
    assert!(matches!(err, Error::Connection(_)));
}
