// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Two-process broadcast walkthrough.
//
// Usage:
//   demo_pubsub pub <count> <interval_ms>
//   demo_pubsub sub <timeout_ms>
//
// The publisher sends `count` numbered messages on the channel "demo",
// one every <interval_ms>. The subscriber prints what it receives until
// <timeout_ms> passes without a message.

use std::time::Duration;

use shmcomm::{Publisher, RawCodec, Subscriber};

fn do_pub(count: u64, interval_ms: u64) {
    let mut publisher = Publisher::<RawCodec>::create("demo").expect("create publisher");
    for i in 0..count {
        let msg = format!("message {i}");
        publisher.send_bytes(msg.as_bytes()).expect("send");
        println!("pub: {msg}");
        std::thread::sleep(Duration::from_millis(interval_ms));
    }
    let stats = publisher.stats().expect("stats");
    println!("pub: done, {} sent, {} overwritten", stats.msg_count, stats.drop_count);
}

fn do_sub(timeout_ms: u64) {
    let mut subscriber = Subscriber::<RawCodec>::attach("demo").expect("attach subscriber");
    println!("sub: attached, waiting...");
    loop {
        match subscriber.recv_bytes(Duration::from_millis(timeout_ms)) {
            Ok(Some(payload)) => {
                println!("sub: {}", String::from_utf8_lossy(&payload));
            }
            Ok(None) => {
                let stats = subscriber.stats().expect("stats");
                println!("sub: idle for {timeout_ms} ms, {} lapped, stopping", stats.lapped_count);
                return;
            }
            Err(e) => {
                println!("sub: {e}");
                return;
            }
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("pub") if args.len() == 4 => {
            let count: u64 = args[2].parse().expect("count");
            let interval: u64 = args[3].parse().expect("interval_ms");
            do_pub(count, interval);
        }
        Some("sub") if args.len() == 3 => {
            let timeout: u64 = args[2].parse().expect("timeout_ms");
            do_sub(timeout);
        }
        _ => {
            eprintln!("usage: demo_pubsub pub <count> <interval_ms>");
            eprintln!("       demo_pubsub sub <timeout_ms>");
            std::process::exit(1);
        }
    }
}
