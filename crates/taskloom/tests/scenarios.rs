//! End-to-end scenario tests (see SPEC_FULL.md §8).

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskloom::{BoundedQueue, Callback, Service, SplittingQueue, TaskError, Threading, TwoLevelQueue};

/// S5 — submit 100 slow tasks, close with a timeout short enough that most
/// never run; every one of them must still receive exactly one terminal
/// signal (success/failure for the ones that ran, `terminated` for the rest).
#[test]
fn s5_close_with_orphan_tasks_terminates_every_orphan_exactly_once() {
    let queue: BoundedQueue<u32> = BoundedQueue::new(10).unwrap(); // capacity 1024, plenty of room
    let sink = queue.sink();

    let successes = Arc::new(AtomicUsize::new(0));
    let terminations = Arc::new(AtomicUsize::new(0));

    for i in 0..100u32 {
        let s = Arc::clone(&successes);
        let t = Arc::clone(&terminations);
        sink.offer(
            move || {
                std::thread::sleep(Duration::from_secs(1));
                Ok(i)
            },
            Callback::of(
                Some(Box::new(move |_v| {
                    s.fetch_add(1, Ordering::SeqCst);
                })),
                None,
                Some(Box::new(move || {
                    t.fetch_add(1, Ordering::SeqCst);
                })),
            ),
        );
    }

    let threading = Threading::new(NonZeroUsize::new(4).unwrap());
    let service = Service::new(queue.handle(), threading, Some(Duration::from_millis(50))).unwrap();

    let err = service.close().unwrap_err();
    assert!(matches!(err, TaskError::CloseTimedOut { .. }));

    // 4 workers each picked up exactly one task before the grace period
    // expired (all sleep far longer than the timeout); the other 96 were
    // still queued and must all have been terminated.
    assert_eq!(successes.load(Ordering::SeqCst) + terminations.load(Ordering::SeqCst), 100);
    assert_eq!(terminations.load(Ordering::SeqCst), 96);
}

/// S6 — every task maps to the same bucket; with more workers than buckets,
/// at most one of them ever runs concurrently.
#[test]
fn s6_splitting_single_bucket_serializes_execution() {
    let queue: SplittingQueue<()> = SplittingQueue::new();
    let concurrent = Arc::new(AtomicUsize::new(0));
    let max_concurrent = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(AtomicUsize::new(0));

    for _ in 0..12 {
        let c = Arc::clone(&concurrent);
        let m = Arc::clone(&max_concurrent);
        let done = Arc::clone(&completed);
        queue.offer(
            Some(7),
            move || {
                let now = c.fetch_add(1, Ordering::SeqCst) + 1;
                m.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(15));
                c.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            },
            Callback::of(
                Some(Box::new(move |_| {
                    done.fetch_add(1, Ordering::SeqCst);
                })),
                None,
                None,
            ),
        );
    }

    let threading = Threading::new(NonZeroUsize::new(4).unwrap());
    let service = Service::new(queue.handle(), threading, Some(Duration::from_secs(2))).unwrap();

    for _ in 0..200 {
        if completed.load(Ordering::SeqCst) == 12 {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    service.close().unwrap();

    assert_eq!(completed.load(Ordering::SeqCst), 12);
    assert_eq!(max_concurrent.load(Ordering::SeqCst), 1);
}

/// S7 — fill `external` to capacity, block several `put`s on it, then show
/// a task submitted to `internal` is handled before any blocked external
/// task even gets a chance to enqueue.
#[test]
fn s7_two_level_internal_preempts_blocked_external_puts() {
    let queue: TwoLevelQueue<&'static str> = TwoLevelQueue::with_poll_interval(0, Duration::from_millis(5)).unwrap(); // external capacity 1
    let external = queue.external_sink();
    let internal = queue.internal_sink();
    let handle = queue.handle();

    // Fill external to capacity with a task that stays queued until the
    // manual drain loop below, then spawn blocked `put`s behind it.
    assert!(external.offer(|| Ok("filler"), Callback::noop()));

    let order = Arc::new(Mutex::new(Vec::new()));
    let mut putters = Vec::new();
    for n in 0..3 {
        let external = queue.external_sink();
        let order = Arc::clone(&order);
        putters.push(std::thread::spawn(move || {
            external.put(
                move || Ok("external-blocked"),
                Callback::from_success(move |v| order.lock().unwrap().push((n, v))),
            );
        }));
    }
    std::thread::sleep(Duration::from_millis(50));

    let o = Arc::clone(&order);
    internal.offer(
        || Ok("internal"),
        Callback::from_success(move |v| o.lock().unwrap().push((99, v))),
    );

    // Drain by hand (no Service/pool here) so the ordering is deterministic:
    // internal first, then the filler, then the three unblocked external puts.
    for _ in 0..5 {
        let (task, token) = handle.take_if_not_terminated().unwrap();
        task.run();
        handle.after_callback(token);
        std::thread::sleep(Duration::from_millis(10));
    }

    for p in putters {
        p.join().unwrap();
    }

    let order = order.lock().unwrap();
    assert_eq!(order.first().map(|(n, _)| *n), Some(99), "internal task must be observed first: {order:?}");
}
