//! Cross-thread integration tests for the message queue.
//!
//! These exercise the concurrent surface: thread-local accumulation scopes
//! and their merge hand-off, producers racing a flushing consumer, and the
//! fatal/misuse paths that only exist off the owner thread.

use courier::prelude::*;
use courier::testing::{DispatchEvent, DropProbe, RecordingReceiver};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;

fn new_queue(capacity: usize) -> (Arc<MemoryRegistry>, MessageQueue) {
    let registry = Arc::new(MemoryRegistry::new());
    let queue = MessageQueue::new(
        registry.clone(),
        QueueConfig::default().with_capacity(capacity),
    )
    .unwrap();
    (registry, queue)
}

#[test]
fn test_thread_accumulation_merges_in_order() {
    let (registry, queue) = new_queue(8192);
    let target = Arc::new(RecordingReceiver::new());
    let id = registry.register(target.clone());

    let (to_main, from_worker) = mpsc::channel();
    let (to_worker, from_main) = mpsc::channel();

    let queue_ref = &queue;
    thread::scope(|s| {
        s.spawn(move || {
            queue_ref.set_thread_accumulation_enabled(true);
            for i in 0..5 {
                queue_ref
                    .push_call(
                        id,
                        "append",
                        vec![Value::string(format!("item_{i}"))],
                        false,
                    )
                    .unwrap();
            }
            to_main.send(()).unwrap();
            from_main.recv().unwrap();

            queue_ref.set_thread_accumulation_enabled(false);
            // The scope is closed, so this goes straight to the shared buffer.
            queue_ref.push_notification(id, 99).unwrap();
            to_main.send(()).unwrap();
        });

        from_worker.recv().unwrap();
        // While the scope is open the batch is private to the worker.
        assert_eq!(queue.statistics().message_count, 0);
        to_worker.send(()).unwrap();

        from_worker.recv().unwrap();
        assert_eq!(queue.statistics().message_count, 6);
    });

    queue.flush();

    let events = target.events();
    assert_eq!(events.len(), 6);
    for (i, event) in events.iter().take(5).enumerate() {
        assert_eq!(
            *event,
            DispatchEvent::Invoke {
                method: "append".to_string(),
                args: vec![Value::string(format!("item_{i}"))],
            }
        );
    }
    assert_eq!(events[5], DispatchEvent::Notify { code: 99 });
}

#[test]
fn test_accumulation_scopes_nest() {
    let (registry, queue) = new_queue(8192);
    let target = Arc::new(RecordingReceiver::new());
    let id = registry.register(target.clone());

    let (to_main, from_worker) = mpsc::channel();
    let (to_worker, from_main) = mpsc::channel();

    let queue_ref = &queue;
    thread::scope(|s| {
        s.spawn(move || {
            queue_ref.set_thread_accumulation_enabled(true);
            queue_ref.set_thread_accumulation_enabled(true);
            for _ in 0..3 {
                queue_ref.push_notification(id, 4).unwrap();
            }
            // Closing the inner scope keeps the batch private.
            queue_ref.set_thread_accumulation_enabled(false);
            to_main.send(()).unwrap();
            from_main.recv().unwrap();

            queue_ref.set_thread_accumulation_enabled(false);
            to_main.send(()).unwrap();
        });

        from_worker.recv().unwrap();
        assert_eq!(queue.statistics().message_count, 0);
        to_worker.send(()).unwrap();

        from_worker.recv().unwrap();
        assert_eq!(queue.statistics().message_count, 3);
    });

    queue.flush();
    assert_eq!(target.len(), 3);
}

#[test]
fn test_worker_without_accumulation_writes_through() {
    let (registry, queue) = new_queue(1024);
    let target = Arc::new(RecordingReceiver::new());
    let id = registry.register(target.clone());

    let queue_ref = &queue;
    thread::scope(|s| {
        s.spawn(move || {
            queue_ref.push_notification(id, 11).unwrap();
        });
    });

    assert_eq!(queue.statistics().message_count, 1);
    queue.flush();
    assert_eq!(target.events(), vec![DispatchEvent::Notify { code: 11 }]);
}

#[test]
fn test_merge_transfers_value_ownership() {
    let (registry, queue) = new_queue(8192);
    let target = Arc::new(RecordingReceiver::new());
    let id = registry.register(target.clone());

    let probe = DropProbe::new();
    let queue_ref = &queue;
    let probe_ref = &probe;
    thread::scope(|s| {
        s.spawn(move || {
            queue_ref.set_thread_accumulation_enabled(true);
            queue_ref
                .push_call(id, "hold", vec![probe_ref.value()], false)
                .unwrap();
            queue_ref.set_thread_accumulation_enabled(false);
        });
    });

    // Merged but not yet dispatched: the value is alive in the shared buffer.
    assert_eq!(probe.outstanding(), 1);

    queue.flush();
    assert_eq!(probe.outstanding(), 0);
    assert_eq!(target.len(), 1);
}

#[test]
fn test_concurrent_producers_all_delivered() {
    let (registry, queue) = new_queue(64 * 1024);
    let target = Arc::new(RecordingReceiver::new());
    let id = registry.register(target.clone());

    let queue_ref = &queue;
    thread::scope(|s| {
        for code in 0..4i64 {
            s.spawn(move || {
                for _ in 0..25 {
                    queue_ref.push_notification(id, code).unwrap();
                }
            });
        }
    });

    assert_eq!(queue.statistics().message_count, 100);
    queue.flush();

    let events = target.events();
    assert_eq!(events.len(), 100);
    for code in 0..4i64 {
        let count = events
            .iter()
            .filter(|event| **event == DispatchEvent::Notify { code })
            .count();
        assert_eq!(count, 25);
    }
}

#[test]
fn test_producers_during_flush_are_not_lost() {
    let (registry, queue) = new_queue(64 * 1024);
    let target = Arc::new(RecordingReceiver::new());
    let id = registry.register(target.clone());

    let done = AtomicBool::new(false);
    let queue_ref = &queue;
    let done_ref = &done;
    thread::scope(|s| {
        s.spawn(move || {
            for _ in 0..100 {
                queue_ref.push_notification(id, 1).unwrap();
            }
            done_ref.store(true, Ordering::SeqCst);
        });

        // Keep draining while the producer races us.
        while !(done.load(Ordering::SeqCst) && queue.statistics().message_count == 0) {
            queue.flush();
            thread::yield_now();
        }
    });

    assert_eq!(target.len(), 100);
}

#[test]
fn test_merge_overflow_is_fatal_for_the_worker() {
    let (registry, queue) = new_queue(256);
    let target = Arc::new(RecordingReceiver::new());
    let id = registry.register(target.clone());

    let queue_ref = &queue;
    thread::scope(|s| {
        let handle = s.spawn(move || {
            queue_ref.set_thread_accumulation_enabled(true);
            // Accumulation itself never fails, however large the batch gets.
            for _ in 0..32 {
                queue_ref.push_notification(id, 1).unwrap();
            }
            // The batch cannot fit the shared buffer: closing the scope dies.
            queue_ref.set_thread_accumulation_enabled(false);
        });
        assert!(handle.join().is_err());
    });

    // The queue itself survives the worker's panic.
    queue.push_notification(id, 2).unwrap();
    queue.flush();
    assert_eq!(target.events(), vec![DispatchEvent::Notify { code: 2 }]);
}

#[cfg(debug_assertions)]
#[test]
fn test_unbalanced_disable_halts_the_worker() {
    let (_registry, queue) = new_queue(1024);

    let queue_ref = &queue;
    thread::scope(|s| {
        let handle = s.spawn(move || queue_ref.set_thread_accumulation_enabled(false));
        assert!(handle.join().is_err());
    });
}

#[test]
fn test_owner_thread_accumulation_is_a_noop() {
    let (registry, queue) = new_queue(1024);
    let target = Arc::new(RecordingReceiver::new());
    let id = registry.register(target.clone());

    queue.set_thread_accumulation_enabled(true);
    queue.push_notification(id, 5).unwrap();
    // The owner writes through; nothing was staged privately.
    assert_eq!(queue.statistics().message_count, 1);
    queue.set_thread_accumulation_enabled(false);

    queue.flush();
    assert_eq!(target.events(), vec![DispatchEvent::Notify { code: 5 }]);
}
