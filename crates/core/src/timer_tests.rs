// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::{FakeClock, SystemClock};
use std::sync::mpsc;

fn fake_timers() -> (FakeClock, Timers) {
    let clock = FakeClock::new();
    let timers = Timers::new(Arc::new(clock.clone()));
    (clock, timers)
}

fn log() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn FnOnce() + Send>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let record = move |name: &'static str| -> Box<dyn FnOnce() + Send> {
        let sink = Arc::clone(&sink);
        Box::new(move || sink.lock().unwrap().push(name))
    };
    (log, record)
}

#[test]
fn timers_fire_in_deadline_order() {
    let (clock, timers) = fake_timers();
    let (fired, record) = log();

    timers.arm(Duration::from_secs(10), record("slow"));
    timers.arm(Duration::from_secs(5), record("fast"));
    timers.arm(Duration::from_secs(5), record("fast-second"));

    assert_eq!(timers.fire_due(), 0);

    clock.advance(Duration::from_secs(5));
    assert_eq!(timers.fire_due(), 2);
    assert_eq!(*fired.lock().unwrap(), vec!["fast", "fast-second"]);

    clock.advance(Duration::from_secs(5));
    assert_eq!(timers.fire_due(), 1);
    assert_eq!(*fired.lock().unwrap(), vec!["fast", "fast-second", "slow"]);
    assert_eq!(timers.pending(), 0);
}

#[test]
fn cancel_prevents_firing() {
    let (clock, timers) = fake_timers();
    let (fired, record) = log();

    let id = timers.arm(Duration::from_secs(10), record("cancelled"));
    assert!(timers.cancel(id));
    assert!(!timers.cancel(id));

    clock.advance(Duration::from_secs(15));
    assert_eq!(timers.fire_due(), 0);
    assert!(fired.lock().unwrap().is_empty());
}

#[test]
fn fired_timer_cannot_be_cancelled() {
    let (clock, timers) = fake_timers();
    let id = timers.arm(Duration::ZERO, || {});
    clock.advance(Duration::from_millis(1));
    assert_eq!(timers.fire_due(), 1);
    assert!(!timers.cancel(id));
}

#[test]
fn next_deadline_skips_cancelled_timers() {
    let (clock, timers) = fake_timers();
    let start = clock.now();
    assert_eq!(timers.next_deadline(), None);

    let early = timers.arm(Duration::from_secs(1), || {});
    timers.arm(Duration::from_secs(3), || {});
    assert_eq!(timers.next_deadline(), Some(start + Duration::from_secs(1)));

    timers.cancel(early);
    assert_eq!(timers.next_deadline(), Some(start + Duration::from_secs(3)));
}

#[test]
fn callbacks_can_rearm_for_a_later_pump() {
    let (clock, timers) = fake_timers();
    let count = Arc::new(Mutex::new(0));

    fn tick(timers: Timers, count: Arc<Mutex<u32>>) {
        let again = timers.clone();
        timers.arm(Duration::from_secs(1), move || {
            *count.lock().unwrap() += 1;
            tick(again, count);
        });
    }
    tick(timers.clone(), Arc::clone(&count));

    for _ in 0..3 {
        clock.advance(Duration::from_secs(1));
        assert_eq!(timers.fire_due(), 1);
    }
    assert_eq!(*count.lock().unwrap(), 3);
    assert_eq!(timers.pending(), 1);
}

#[test]
fn panicking_callback_does_not_stop_others() {
    let (clock, timers) = fake_timers();
    let (fired, record) = log();

    timers.arm(Duration::from_secs(1), || panic!("timer blew up"));
    timers.arm(Duration::from_secs(1), record("survivor"));

    clock.advance(Duration::from_secs(1));
    assert_eq!(timers.fire_due(), 2);
    assert_eq!(*fired.lock().unwrap(), vec!["survivor"]);
}

#[test]
fn driver_fires_against_real_time() {
    let timers = Timers::new(Arc::new(SystemClock));
    let mut driver = TimerDriver::spawn(timers.clone(), Duration::from_millis(5)).unwrap();

    let (tx, rx) = mpsc::channel();
    driver.timers().arm(Duration::from_millis(10), move || {
        let _ = tx.send("fired");
    });

    assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok("fired"));
    driver.stop();
    assert_eq!(timers.pending(), 0);
}

#[test]
fn stopped_driver_leaves_timers_armed() {
    let timers = Timers::new(Arc::new(SystemClock));
    let driver = TimerDriver::spawn(timers.clone(), Duration::from_millis(5)).unwrap();
    drop(driver);

    timers.arm(Duration::ZERO, || {});
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(timers.pending(), 1);
    assert_eq!(timers.fire_due(), 1);
}
