//! Taskloom demo
//!
//! Walks through each queue discipline against a small worker pool, then
//! chains a few callback-based steps with `taskloom-chain`.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskloom::{BoundedQueue, Callback, Service, SplittingQueue, Threading, TwoLevelQueue, UnboundedQueue};
use taskloom_chain::AsyncChain;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Unbounded queue, 4 workers ===\n");
    unbounded_demo();

    println!("\n=== Bounded queue, backpressure ===\n");
    bounded_demo();

    println!("\n=== TwoLevel queue, internal priority ===\n");
    two_level_demo();

    println!("\n=== Splitting queue, bucket exclusion ===\n");
    splitting_demo();

    println!("\n=== AsyncChain pipeline ===\n");
    chain_demo();

    println!("\n=== Demo complete ===");
}

fn unbounded_demo() {
    let queue: UnboundedQueue<u32> = UnboundedQueue::new();
    let sink = queue.sink();
    let completed = Arc::new(AtomicUsize::new(0));

    for i in 0..20u32 {
        let c = Arc::clone(&completed);
        sink.offer(
            move || Ok(i * i),
            Callback::of(
                Some(Box::new(move |v| {
                    println!("  task {i} -> {v}");
                    c.fetch_add(1, Ordering::SeqCst);
                })),
                None,
                None,
            ),
        );
    }

    let threading = Threading::new(NonZeroUsize::new(4).unwrap());
    let service = Service::new(queue.handle(), threading, Some(Duration::from_secs(2))).unwrap();
    while completed.load(Ordering::SeqCst) < 20 {
        std::thread::sleep(Duration::from_millis(10));
    }
    service.close().unwrap();
}

fn bounded_demo() {
    let queue: BoundedQueue<u32> = BoundedQueue::new(2).unwrap(); // capacity 4
    let sink = queue.sink();

    for i in 0..4u32 {
        let accepted = sink.offer(move || Ok(i), Callback::noop());
        println!("  offer {i}: accepted={accepted}");
    }
    let rejected = sink.offer(|| Ok(99), Callback::noop());
    println!("  offer 99 into a full queue: accepted={rejected}");

    let threading = Threading::new(NonZeroUsize::new(1).unwrap());
    let service = Service::new(queue.handle(), threading, Some(Duration::from_secs(2))).unwrap();
    std::thread::sleep(Duration::from_millis(100));
    service.close().unwrap();
}

fn two_level_demo() {
    let queue: TwoLevelQueue<&'static str> = TwoLevelQueue::new(4).unwrap();
    let external = queue.external_sink();
    let internal = queue.internal_sink();
    let order = Arc::new(Mutex::new(Vec::new()));

    let o = Arc::clone(&order);
    external.offer(|| Ok("external-task"), Callback::from_success(move |v| o.lock().unwrap().push(v)));
    let o = Arc::clone(&order);
    internal.offer(|| Ok("internal-task"), Callback::from_success(move |v| o.lock().unwrap().push(v)));

    let threading = Threading::new(NonZeroUsize::new(1).unwrap());
    let service = Service::new(queue.handle(), threading, Some(Duration::from_secs(2))).unwrap();
    std::thread::sleep(Duration::from_millis(100));
    service.close().unwrap();
    println!("  completion order: {:?}", order.lock().unwrap());
}

fn splitting_demo() {
    let queue: SplittingQueue<()> = SplittingQueue::new();
    let running_in_bucket = Arc::new(AtomicUsize::new(0));
    let max_concurrency_seen = Arc::new(AtomicUsize::new(0));

    for i in 0..6 {
        let running = Arc::clone(&running_in_bucket);
        let max_seen = Arc::clone(&max_concurrency_seen);
        queue.offer(
            Some(1), // every task in the same bucket
            move || {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(20));
                println!("  bucket-1 task {i} ran alone");
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            },
            Callback::noop(),
        );
    }

    let threading = Threading::new(NonZeroUsize::new(4).unwrap());
    let service = Service::new(queue.handle(), threading, Some(Duration::from_secs(3))).unwrap();
    std::thread::sleep(Duration::from_millis(300));
    service.close().unwrap();
    println!(
        "  max concurrent tasks observed in bucket 1: {} (must be 1)",
        max_concurrency_seen.load(Ordering::SeqCst)
    );
}

fn chain_demo() {
    AsyncChain::with_defaults(
        |e| println!("  chain failed: {e}"),
        || println!("  chain terminated"),
    )
    .call(|_: (), cb: Callback<u32>| cb.success(1))
    .call(|v: u32, cb: Callback<u32>| cb.success(v + 1))
    .call(|v: u32, cb: Callback<u32>| cb.success(v * 10))
    .execute(|v| println!("  chain result: {v}"));
}
