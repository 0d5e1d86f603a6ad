// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Patterns composed of child patterns

use super::{EventPattern, PatternState, Plan};
use crate::error::BusError;

impl EventPattern {
    /// Run `patterns` one after another
    ///
    /// A cancelled child is skipped. A failed child fails the sequence when
    /// `stop_on_error` is set and is skipped otherwise.
    pub fn sequence(patterns: Vec<EventPattern>, stop_on_error: bool) -> Self {
        Self::from_plan(Plan::Sequence {
            children: patterns,
            stop_on_error,
        })
    }

    /// Run `patterns` together
    ///
    /// With `wait_for_all` the group settles once every child has, failing
    /// if any child failed. Otherwise the first child to complete completes
    /// the group, and the group fails only if no child completes.
    pub fn group(patterns: Vec<EventPattern>, wait_for_all: bool) -> Self {
        Self::from_plan(Plan::Group {
            children: patterns,
            wait_for_all,
        })
    }

    /// Start children from `index` until one is still running
    pub(super) fn advance_sequence(&self, mut index: usize) {
        let Plan::Sequence {
            children,
            stop_on_error,
        } = &self.inner.plan
        else {
            return;
        };

        loop {
            if !self.is_active() {
                return;
            }
            if index >= children.len() {
                self.core().current_index = children.len();
                self.complete();
                return;
            }
            self.core().current_index = index;

            let child = &children[index];
            child.start();
            match child.state() {
                PatternState::Pending | PatternState::Active => return,
                PatternState::Failed if *stop_on_error => {
                    self.fail(self.child_failure(child));
                    return;
                }
                PatternState::Completed | PatternState::Cancelled | PatternState::Failed => {
                    index += 1;
                }
            }
        }
    }

    pub(super) fn sequence_child_settled(&self, index: usize, state: PatternState) {
        let Plan::Sequence {
            children,
            stop_on_error,
        } = &self.inner.plan
        else {
            return;
        };
        // A child settling inside our own advance loop is picked up there
        if index != self.current_index() || self.in_nested_step() {
            return;
        }
        if state == PatternState::Failed && *stop_on_error {
            if let Some(child) = children.get(index) {
                self.fail(self.child_failure(child));
            }
            return;
        }
        self.advance_sequence(index + 1);
    }

    pub(super) fn start_group(&self) {
        let children = self.children();
        if children.is_empty() {
            self.complete();
            return;
        }
        for child in children {
            // Completion by an early child leaves the rest running
            if matches!(
                self.state(),
                PatternState::Cancelled | PatternState::Failed
            ) {
                return;
            }
            child.start();
        }
        self.group_child_settled();
    }

    pub(super) fn group_child_settled(&self) {
        let Plan::Group {
            children,
            wait_for_all,
        } = &self.inner.plan
        else {
            return;
        };
        if !self.is_active() {
            return;
        }

        let all_settled = children.iter().all(EventPattern::is_terminal);
        let failed = children
            .iter()
            .find(|child| child.state() == PatternState::Failed);

        if *wait_for_all {
            if !all_settled {
                return;
            }
            match failed {
                Some(child) => {
                    self.fail(self.child_failure(child));
                }
                None => {
                    self.complete();
                }
            }
        } else if children.iter().any(EventPattern::is_completed) {
            self.complete();
        } else if all_settled {
            self.fail(BusError::Pattern {
                pattern_id: self.id().to_string(),
                message: "no child pattern completed".to_string(),
            });
        }
    }

    fn child_failure(&self, child: &EventPattern) -> BusError {
        let cause = child
            .error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        BusError::Pattern {
            pattern_id: self.id().to_string(),
            message: format!("child {} failed: {}", child.id(), cause),
        }
    }
}
