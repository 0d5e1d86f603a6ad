//! Threaded dispatcher specs
//!
//! Verify that a saturated pool degrades to the caller's thread.

use crate::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread::{self, ThreadId};
use tidings_core::{EventDispatcher, ThreadedDispatcher};

#[test]
fn saturated_pool_runs_on_the_caller() {
    let dispatcher = ThreadedDispatcher::new(1);
    let (entered_tx, entered_rx) = mpsc::channel::<ThreadId>();
    let gate = Arc::new(Mutex::new(()));
    let held = gate.lock().unwrap();

    // Only the first delivery blocks, keeping the single worker busy
    let calls = Arc::new(AtomicUsize::new(0));
    let probe_gate = Arc::clone(&gate);
    let probe: Arc<dyn EventListener> = Arc::new(
        Listener::builder("probe")
            .on("world.tick", move |_| {
                entered_tx.send(thread::current().id()).unwrap();
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    let _wait = probe_gate.lock().unwrap();
                }
                Ok(EventResult::Handled)
            })
            .build(),
    );
    let listeners = vec![probe];

    assert_eq!(dispatcher.dispatch(&event("world.tick"), &listeners), EventResult::Continue);
    let worker = entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_ne!(worker, thread::current().id());
    assert_eq!(dispatcher.in_flight(), 1);

    let result = dispatcher.dispatch(&event("world.tick"), &listeners);
    let caller = entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(caller, thread::current().id());
    assert_eq!(result, EventResult::Handled);
    assert_eq!(dispatcher.stats().sync_fallbacks, 1);

    drop(held);
    assert!(dispatcher.wait_idle(Duration::from_secs(5)));
}
