// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Two-process work-queue walkthrough.
//
// Usage:
//   demo_work_queue push <count>
//   demo_work_queue pull <timeout_ms>
//
// Run one pusher and any number of pullers; each job lands on exactly one
// puller.

use std::time::Duration;

use shmcomm::{Puller, Pusher, RawCodec};

fn do_push(count: u64) {
    let mut pusher = Pusher::<RawCodec>::create("demo_jobs").expect("create pusher");
    for i in 0..count {
        let job = format!("job {i}");
        pusher.push_bytes(job.as_bytes()).expect("push");
        println!("push: {job}");
    }
    let stats = pusher.stats().expect("stats");
    println!("push: done, backlog {}", stats.backlog);
    // Give pullers a moment to drain before the segment is unlinked.
    std::thread::sleep(Duration::from_secs(2));
}

fn do_pull(timeout_ms: u64) {
    let mut puller = Puller::<RawCodec>::attach("demo_jobs").expect("attach puller");
    let mut claimed = 0u64;
    println!("pull: attached (pid {})", std::process::id());
    loop {
        match puller.pull_bytes(Duration::from_millis(timeout_ms)) {
            Ok(Some(payload)) => {
                claimed += 1;
                println!("pull: {}", String::from_utf8_lossy(&payload));
            }
            Ok(None) => {
                println!("pull: idle for {timeout_ms} ms, claimed {claimed}, stopping");
                return;
            }
            Err(e) => {
                println!("pull: {e} (claimed {claimed})");
                return;
            }
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("push") if args.len() == 3 => {
            let count: u64 = args[2].parse().expect("count");
            do_push(count);
        }
        Some("pull") if args.len() == 3 => {
            let timeout: u64 = args[2].parse().expect("timeout_ms");
            do_pull(timeout);
        }
        _ => {
            eprintln!("usage: demo_work_queue push <count>");
            eprintln!("       demo_work_queue pull <timeout_ms>");
            std::process::exit(1);
        }
    }
}
