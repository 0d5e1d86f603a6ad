// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event patterns: stateful behaviors built from events and other patterns
//!
//! Every pattern moves `Pending -> Active -> {Completed, Cancelled, Failed}`.
//! Kinds:
//! - chain: dispatch a fixed list of events in order
//! - conditional: poll a condition, dispatch once it holds
//! - delayed: dispatch after a delay
//! - recurring: dispatch a fresh copy every interval
//! - sequence: run child patterns one after another
//! - group: run child patterns together
//!
//! Steps (start, timer fires, child notifications, cancel) are serialized
//! by a per-pattern reentrant guard and re-check `Active` on entry, so no
//! step begins once `cancel` has returned. Terminal callbacks and parent
//! notifications are delivered after the guard is released.

mod chain;
mod composite;
mod timed;

use crate::bus::EventBus;
use crate::error::{panic_message, BusError};
use crate::event::Event;
use crate::id::mint_pattern_id;
use crate::timer::{TimerId, Timers};
use chrono::{DateTime, Utc};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};

/// Lifecycle state of a pattern
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternState {
    Pending,
    Active,
    Completed,
    Cancelled,
    Failed,
}

impl PatternState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PatternState::Completed | PatternState::Cancelled | PatternState::Failed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PatternState::Pending => "pending",
            PatternState::Active => "active",
            PatternState::Completed => "completed",
            PatternState::Cancelled => "cancelled",
            PatternState::Failed => "failed",
        }
    }
}

impl fmt::Display for PatternState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Chain,
    Conditional,
    Delayed,
    Recurring,
    Sequence,
    Group,
}

impl PatternKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PatternKind::Chain => "chain",
            PatternKind::Conditional => "conditional",
            PatternKind::Delayed => "delayed",
            PatternKind::Recurring => "recurring",
            PatternKind::Sequence => "sequence",
            PatternKind::Group => "group",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Callback = Arc<dyn Fn(&EventPattern) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&EventPattern, &BusError) + Send + Sync>;
type Condition = Arc<dyn Fn() -> bool + Send + Sync>;

/// What a pattern was built to do; fixed at construction
enum Plan {
    Chain {
        bus: EventBus,
        events: Vec<Arc<Event>>,
        stop_on_error: bool,
    },
    Conditional {
        bus: EventBus,
        timers: Timers,
        event: Arc<Event>,
        condition: Condition,
        check_interval: Duration,
        timeout: Option<Duration>,
    },
    Delayed {
        bus: EventBus,
        timers: Timers,
        event: Arc<Event>,
        delay: Duration,
    },
    Recurring {
        bus: EventBus,
        timers: Timers,
        event: Arc<Event>,
        interval: Duration,
        max_occurrences: Option<u32>,
    },
    Sequence {
        children: Vec<EventPattern>,
        stop_on_error: bool,
    },
    Group {
        children: Vec<EventPattern>,
        wait_for_all: bool,
    },
}

impl Plan {
    fn kind(&self) -> PatternKind {
        match self {
            Plan::Chain { .. } => PatternKind::Chain,
            Plan::Conditional { .. } => PatternKind::Conditional,
            Plan::Delayed { .. } => PatternKind::Delayed,
            Plan::Recurring { .. } => PatternKind::Recurring,
            Plan::Sequence { .. } => PatternKind::Sequence,
            Plan::Group { .. } => PatternKind::Group,
        }
    }

    fn timers(&self) -> Option<&Timers> {
        match self {
            Plan::Conditional { timers, .. }
            | Plan::Delayed { timers, .. }
            | Plan::Recurring { timers, .. } => Some(timers),
            _ => None,
        }
    }

    fn children(&self) -> &[EventPattern] {
        match self {
            Plan::Sequence { children, .. } | Plan::Group { children, .. } => children,
            _ => &[],
        }
    }
}

/// A terminal transition awaiting delivery
enum Notice {
    Completed,
    Failed(BusError),
    Cancelled,
}

/// Parent to tell when this pattern settles
struct Watcher {
    parent: Weak<Inner>,
    index: usize,
}

#[derive(Default)]
struct Callbacks {
    on_start: Vec<Callback>,
    on_complete: Vec<Callback>,
    on_error: Vec<ErrorCallback>,
    on_cancel: Vec<Callback>,
}

struct Core {
    state: PatternState,
    error: Option<BusError>,
    metadata: BTreeMap<String, Value>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    started: Option<Instant>,
    finished: Option<Instant>,
    /// Timer clock reading at start, for timeouts
    clock_start: Option<Instant>,
    current_index: usize,
    occurrence_count: u32,
    timer: Option<TimerId>,
    callbacks: Callbacks,
    watchers: Vec<Watcher>,
    notices: Vec<Notice>,
    announced: bool,
}

struct Inner {
    id: String,
    plan: Plan,
    /// Step guard; the cell counts this thread's nesting depth
    steps: ReentrantMutex<Cell<usize>>,
    core: Mutex<Core>,
    settled: Condvar,
}

/// Entered step; leaving decrements the nesting depth
struct Step<'a> {
    guard: ReentrantMutexGuard<'a, Cell<usize>>,
}

impl<'a> Step<'a> {
    fn enter(steps: &'a ReentrantMutex<Cell<usize>>) -> Self {
        let guard = steps.lock();
        guard.set(guard.get() + 1);
        Self { guard }
    }

    fn is_outermost(&self) -> bool {
        self.guard.get() == 1
    }
}

impl Drop for Step<'_> {
    fn drop(&mut self) {
        self.guard.set(self.guard.get().saturating_sub(1));
    }
}

/// Handle to a pattern; clones share state
#[derive(Clone)]
pub struct EventPattern {
    inner: Arc<Inner>,
}

impl EventPattern {
    fn from_plan(plan: Plan) -> Self {
        let kind = plan.kind();
        let inner = Arc::new(Inner {
            id: mint_pattern_id(kind.as_str()),
            plan,
            steps: ReentrantMutex::new(Cell::new(0)),
            core: Mutex::new(Core {
                state: PatternState::Pending,
                error: None,
                metadata: BTreeMap::new(),
                started_at: None,
                finished_at: None,
                started: None,
                finished: None,
                clock_start: None,
                current_index: 0,
                occurrence_count: 0,
                timer: None,
                callbacks: Callbacks::default(),
                watchers: Vec::new(),
                notices: Vec::new(),
                announced: false,
            }),
            settled: Condvar::new(),
        });
        for (index, child) in inner.plan.children().iter().enumerate() {
            child.core().watchers.push(Watcher {
                parent: Arc::downgrade(&inner),
                index,
            });
        }
        Self { inner }
    }

    fn core(&self) -> MutexGuard<'_, Core> {
        self.inner.core.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` under the step guard, then deliver any terminal notices
    fn step<R>(&self, f: impl FnOnce() -> R) -> R {
        let (result, outermost) = {
            let step = Step::enter(&self.inner.steps);
            let outermost = step.is_outermost();
            (f(), outermost)
        };
        if outermost {
            self.flush();
        }
        result
    }

    /// True when the current step runs inside another step of this pattern
    /// on the same thread
    fn in_nested_step(&self) -> bool {
        self.inner.steps.lock().get() > 1
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> PatternKind {
        self.inner.plan.kind()
    }

    pub fn state(&self) -> PatternState {
        self.core().state
    }

    pub fn is_active(&self) -> bool {
        self.state() == PatternState::Active
    }

    pub fn is_completed(&self) -> bool {
        self.state() == PatternState::Completed
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    pub fn error(&self) -> Option<BusError> {
        self.core().error.clone()
    }

    pub fn metadata(&self) -> BTreeMap<String, Value> {
        self.core().metadata.clone()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.core().started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.core().finished_at
    }

    /// Time spent active so far, or in total once terminal
    pub fn duration(&self) -> Option<Duration> {
        let core = self.core();
        let started = core.started?;
        Some(match core.finished {
            Some(finished) => finished.saturating_duration_since(started),
            None => started.elapsed(),
        })
    }

    /// Index of the chain element or sequence child in progress
    pub fn current_index(&self) -> usize {
        self.core().current_index
    }

    pub fn occurrence_count(&self) -> u32 {
        self.core().occurrence_count
    }

    /// Child patterns of a sequence or group
    pub fn children(&self) -> &[EventPattern] {
        self.inner.plan.children()
    }

    /// Fraction of work done, in `0.0..=1.0`
    pub fn progress(&self) -> f64 {
        fn ratio(done: usize, total: usize) -> f64 {
            if total == 0 {
                1.0
            } else {
                (done as f64 / total as f64).min(1.0)
            }
        }

        let finished_children = self
            .children()
            .iter()
            .filter(|child| child.is_terminal())
            .count();
        let core = self.core();
        let done_once = if core.state == PatternState::Completed {
            1.0
        } else {
            0.0
        };
        match &self.inner.plan {
            Plan::Chain { events, .. } => ratio(core.current_index, events.len()),
            Plan::Sequence { children, .. } => ratio(core.current_index, children.len()),
            Plan::Group { children, .. } => ratio(finished_children, children.len()),
            Plan::Recurring {
                max_occurrences: Some(max),
                ..
            } => ratio(core.occurrence_count as usize, *max as usize),
            Plan::Recurring { .. } | Plan::Conditional { .. } | Plan::Delayed { .. } => done_once,
        }
    }

    pub fn on_start(&self, callback: impl Fn(&EventPattern) + Send + Sync + 'static) -> &Self {
        self.core().callbacks.on_start.push(Arc::new(callback));
        self
    }

    pub fn on_complete(&self, callback: impl Fn(&EventPattern) + Send + Sync + 'static) -> &Self {
        self.core().callbacks.on_complete.push(Arc::new(callback));
        self
    }

    pub fn on_error(
        &self,
        callback: impl Fn(&EventPattern, &BusError) + Send + Sync + 'static,
    ) -> &Self {
        self.core().callbacks.on_error.push(Arc::new(callback));
        self
    }

    pub fn on_cancel(&self, callback: impl Fn(&EventPattern) + Send + Sync + 'static) -> &Self {
        self.core().callbacks.on_cancel.push(Arc::new(callback));
        self
    }

    /// Start the pattern. Only a pending pattern starts.
    pub fn start(&self) -> bool {
        self.step(|| {
            {
                let mut core = self.core();
                if core.state != PatternState::Pending {
                    return false;
                }
                core.state = PatternState::Active;
                core.started_at = Some(Utc::now());
                core.started = Some(Instant::now());
                core.clock_start = self.inner.plan.timers().map(Timers::now);
            }
            tracing::debug!(pattern_id = %self.id(), kind = %self.kind(), "pattern started");

            let on_start = self.core().callbacks.on_start.clone();
            for callback in &on_start {
                self.guarded("on_start", || callback(self));
            }

            if self.is_active() {
                match panic::catch_unwind(AssertUnwindSafe(|| self.execute())) {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        self.fail(err);
                    }
                    Err(payload) => {
                        self.fail(BusError::Pattern {
                            pattern_id: self.id().to_string(),
                            message: panic_message(payload.as_ref()),
                        });
                    }
                }
            }
            true
        })
    }

    fn execute(&self) -> Result<(), BusError> {
        match &self.inner.plan {
            Plan::Chain {
                bus,
                events,
                stop_on_error,
            } => self.run_chain(bus, events, *stop_on_error),
            Plan::Conditional { check_interval, .. } => {
                if check_interval.is_zero() {
                    return Err(self.misconfigured("check_interval must be positive"));
                }
                self.poll_condition();
                Ok(())
            }
            Plan::Delayed { timers, delay, .. } => {
                self.arm(timers, *delay, Self::fire_delayed);
                Ok(())
            }
            Plan::Recurring {
                timers,
                interval,
                max_occurrences,
                ..
            } => {
                if interval.is_zero() {
                    return Err(self.misconfigured("interval must be positive"));
                }
                if *max_occurrences == Some(0) {
                    self.finish_recurring();
                } else {
                    self.arm(timers, *interval, Self::fire_recurring);
                }
                Ok(())
            }
            Plan::Sequence { .. } => {
                self.advance_sequence(0);
                Ok(())
            }
            Plan::Group { .. } => {
                self.start_group();
                Ok(())
            }
        }
    }

    fn misconfigured(&self, message: &str) -> BusError {
        BusError::Pattern {
            pattern_id: self.id().to_string(),
            message: message.to_string(),
        }
    }

    /// Mark an active pattern completed
    pub fn complete(&self) -> bool {
        self.step(|| self.settle(PatternState::Completed, Notice::Completed))
    }

    /// Mark an active pattern failed
    pub fn fail(&self, error: BusError) -> bool {
        self.step(|| {
            tracing::warn!(pattern_id = %self.id(), kind = %self.kind(), %error, "pattern failed");
            self.settle(PatternState::Failed, Notice::Failed(error))
        })
    }

    /// Cancel an active pattern
    ///
    /// Pending timers are disarmed and active children cancelled. Once this
    /// returns no further step of this pattern runs.
    pub fn cancel(&self) -> bool {
        self.step(|| self.cancel_with(None))
    }

    fn cancel_with(&self, flag: Option<&str>) -> bool {
        if let Some(key) = flag {
            if self.is_active() {
                self.core().metadata.insert(key.to_string(), Value::Bool(true));
            }
        }
        if matches!(self.inner.plan, Plan::Recurring { .. }) {
            let mut core = self.core();
            if core.state == PatternState::Active {
                let total = core.occurrence_count;
                core.metadata
                    .insert("total_occurrences".to_string(), Value::from(total));
            }
        }
        if !self.settle(PatternState::Cancelled, Notice::Cancelled) {
            return false;
        }
        for child in self.children() {
            if child.is_active() {
                child.cancel();
            }
        }
        true
    }

    /// Enter a terminal state; false unless currently active
    fn settle(&self, to: PatternState, notice: Notice) -> bool {
        let timer = {
            let mut core = self.core();
            if core.state != PatternState::Active {
                return false;
            }
            core.state = to;
            core.finished_at = Some(Utc::now());
            core.finished = Some(Instant::now());
            if let Notice::Failed(error) = &notice {
                core.error = Some(error.clone());
            }
            core.notices.push(notice);
            core.timer.take()
        };
        if let (Some(id), Some(timers)) = (timer, self.inner.plan.timers()) {
            timers.cancel(id);
        }
        tracing::debug!(pattern_id = %self.id(), kind = %self.kind(), state = %to, "pattern settled");
        true
    }

    /// Deliver queued terminal notices
    fn flush(&self) {
        let notices = std::mem::take(&mut self.core().notices);
        for notice in notices {
            self.announce(notice);
        }
    }

    fn announce(&self, notice: Notice) {
        let (on_complete, on_error, on_cancel, watchers) = {
            let core = self.core();
            let watchers: Vec<(Weak<Inner>, usize)> = core
                .watchers
                .iter()
                .map(|w| (Weak::clone(&w.parent), w.index))
                .collect();
            (
                core.callbacks.on_complete.clone(),
                core.callbacks.on_error.clone(),
                core.callbacks.on_cancel.clone(),
                watchers,
            )
        };

        match &notice {
            Notice::Completed => {
                for callback in &on_complete {
                    self.guarded("on_complete", || callback(self));
                }
            }
            Notice::Failed(error) => {
                for callback in &on_error {
                    self.guarded("on_error", || callback(self, error));
                }
            }
            Notice::Cancelled => {
                for callback in &on_cancel {
                    self.guarded("on_cancel", || callback(self));
                }
            }
        }

        let state = self.state();
        for (parent, index) in watchers {
            if let Some(inner) = parent.upgrade() {
                EventPattern { inner }.child_settled(index, state);
            }
        }

        self.core().announced = true;
        self.inner.settled.notify_all();
    }

    fn child_settled(&self, index: usize, state: PatternState) {
        self.step(|| {
            if !self.is_active() {
                return;
            }
            tracing::debug!(pattern_id = %self.id(), child = index, %state, "child settled");
            match &self.inner.plan {
                Plan::Sequence { .. } => self.sequence_child_settled(index, state),
                Plan::Group { .. } => self.group_child_settled(),
                _ => {}
            }
        });
    }

    /// Run a callback, logging instead of propagating a panic
    fn guarded(&self, hook: &str, f: impl FnOnce()) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
            tracing::warn!(
                pattern_id = %self.id(),
                hook,
                message = %panic_message(payload.as_ref()),
                "pattern callback panicked"
            );
        }
    }

    /// Arm a timer whose callback runs `fire` as a step of this pattern
    fn arm(&self, timers: &Timers, delay: Duration, fire: fn(&EventPattern)) {
        let pattern = self.clone();
        let id = timers.arm(delay, move || fire(&pattern));
        self.core().timer = Some(id);
    }

    /// Block until the pattern settles and its notices are delivered
    pub fn wait(&self, timeout: Duration) -> Result<PatternState, BusError> {
        let core = self.core();
        let (core, _) = self
            .inner
            .settled
            .wait_timeout_while(core, timeout, |core| !core.announced)
            .unwrap_or_else(|e| e.into_inner());
        if core.announced {
            Ok(core.state)
        } else {
            Err(BusError::Timeout {
                what: format!("pattern {}", self.id()),
                after: timeout,
            })
        }
    }
}

impl fmt::Debug for EventPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPattern")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .field("state", &self.state())
            .finish()
    }
}
