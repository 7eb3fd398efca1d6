// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Broadcast hot-path throughput: one publish immediately consumed by one
// subscriber, per iteration.

use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use shmcomm::{Publisher, RawCodec, RingConfig, Subscriber};

fn bench_broadcast(c: &mut Criterion) {
    let channel = format!("bench_ring_{}", std::process::id());
    let config = RingConfig {
        num_slots: 1024,
        slot_size: 256,
    };
    let mut publisher =
        Publisher::<RawCodec>::with_config(&channel, config).expect("create publisher");
    let mut subscriber = Subscriber::<RawCodec>::attach(&channel).expect("attach subscriber");

    let payload = [0x5au8; 64];

    let mut group = c.benchmark_group("broadcast");
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("publish_then_fetch_64b", |b| {
        b.iter(|| {
            publisher.send_bytes(&payload).expect("send");
            subscriber
                .recv_bytes(Duration::from_millis(10))
                .expect("recv")
                .expect("message")
        })
    });
    group.finish();
}

criterion_group!(benches, bench_broadcast);
criterion_main!(benches);
