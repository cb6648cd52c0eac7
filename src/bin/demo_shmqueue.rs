// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Usage:
//   demo_shmqueue p    (producer — measures throughput)
//   demo_shmqueue c    (consumer — measures throughput)
//
// Publishes/consumes random-sized byte messages (128 B - 16 KB) as fast as
// possible and prints throughput every second.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use shmq::{QueueConfig, QueueError, ShmQueue};

const QUEUE_NAME: &str = "shmq-demo-queue";
const MIN_SZ: usize = 128;
const MAX_SZ: usize = 1024 * 16;

fn str_of_size(sz: usize) -> String {
    if sz > 1024 * 1024 {
        format!("{} MB", sz / (1024 * 1024))
    } else if sz > 1024 {
        format!("{} KB", sz / 1024)
    } else {
        format!("{sz} bytes")
    }
}

fn speed_of(sz: usize) -> String {
    format!("{}/s", str_of_size(sz))
}

fn counting_thread(quit: Arc<AtomicBool>, counter: Arc<AtomicUsize>) {
    let mut i = 1usize;
    while !quit.load(Ordering::Acquire) {
        thread::sleep(Duration::from_millis(100));
        i += 1;
        if i % 10 != 0 {
            continue;
        }
        i = 0;
        let bytes = counter.swap(0, Ordering::Relaxed);
        println!("{}", speed_of(bytes));
    }
}

fn open_queue() -> ShmQueue<Vec<u8>> {
    let config = QueueConfig::new(MAX_SZ, 8);
    ShmQueue::new(QUEUE_NAME, config).expect("open queue")
}

fn do_produce(quit: Arc<AtomicBool>) {
    println!(
        "do_produce: start [{} - {}]...",
        str_of_size(MIN_SZ),
        str_of_size(MAX_SZ)
    );

    let que = open_queue();
    let counter = Arc::new(AtomicUsize::new(0));

    let q2 = Arc::clone(&quit);
    let c2 = Arc::clone(&counter);
    let counting = thread::spawn(move || counting_thread(q2, c2));

    // Simple LCG for fast pseudo-random sizes without external deps.
    let mut rng_state: u64 = 0xdeadbeef_cafebabe;

    while !quit.load(Ordering::Acquire) {
        rng_state = rng_state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let sz = MIN_SZ + (rng_state >> 32) as usize % (MAX_SZ - MIN_SZ + 1);
        let msg = vec![0xABu8; sz];

        match que.publish(&msg, true, Some(Duration::from_millis(500))) {
            Ok(()) => counter.fetch_add(sz, Ordering::Relaxed),
            Err(QueueError::Full) => {
                eprintln!("do_produce: queue stayed full — giving up this message");
                continue;
            }
            Err(e) => {
                eprintln!("do_produce: publish failed: {e}");
                quit.store(true, Ordering::Release);
                break;
            }
        };
        thread::yield_now();
    }

    counting.join().unwrap();
    que.close();
    println!("do_produce: quit...");
}

fn do_consume(quit: Arc<AtomicBool>) {
    println!(
        "do_consume: start [{} - {}]...",
        str_of_size(MIN_SZ),
        str_of_size(MAX_SZ)
    );

    let que = open_queue();
    let counter = Arc::new(AtomicUsize::new(0));

    let q2 = Arc::clone(&quit);
    let c2 = Arc::clone(&counter);
    let counting = thread::spawn(move || counting_thread(q2, c2));

    while !quit.load(Ordering::Acquire) {
        match que.consume(true, Some(Duration::from_millis(200))) {
            Ok(msg) => counter.fetch_add(msg.len(), Ordering::Relaxed),
            Err(QueueError::Empty) => continue,
            Err(e) => {
                eprintln!("do_consume: consume failed: {e}");
                quit.store(true, Ordering::Release);
                break;
            }
        };
    }

    counting.join().unwrap();
    println!("do_consume: quit...");
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("usage: demo_shmqueue p|c");
        std::process::exit(1);
    }

    let quit = Arc::new(AtomicBool::new(false));

    {
        let q = Arc::clone(&quit);
        ctrlc_or_sigterm(move || q.store(true, Ordering::Release));
    }

    match args[1].as_str() {
        "p" => do_produce(quit),
        "c" => do_consume(quit),
        other => {
            eprintln!("unknown mode: {other}  (use 'p' or 'c')");
            std::process::exit(1);
        }
    }
}

fn ctrlc_or_sigterm(f: impl Fn() + Send + 'static) {
    #[cfg(unix)]
    {
        use std::sync::Mutex;
        static CB: std::sync::OnceLock<Mutex<Box<dyn Fn() + Send>>> = std::sync::OnceLock::new();
        CB.get_or_init(|| Mutex::new(Box::new(f)));
        extern "C" fn handler(_: libc::c_int) {
            if let Some(cb) = CB.get() {
                if let Ok(g) = cb.lock() {
                    g();
                }
            }
        }
        unsafe {
            libc::signal(libc::SIGINT, handler as *const () as libc::sighandler_t);
            libc::signal(libc::SIGTERM, handler as *const () as libc::sighandler_t);
            libc::signal(libc::SIGHUP, handler as *const () as libc::sighandler_t);
        }
    }
    #[cfg(not(unix))]
    {
        let _ = f;
    }
}

#[cfg(unix)]
extern crate libc;
