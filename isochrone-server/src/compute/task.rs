//! Per-sample task states.
//!
//! Every sample of a computation moves through
//! `Pending → InFlight → Retrying* → Resolved | Failed`. A cache hit goes
//! straight from `Pending` to `Resolved`, and a sample whose plan cannot be
//! built fails from `Pending`. Tasks report their transitions as
//! [`TaskEvent`]s on a channel; a [`TaskLog`] folds them into a summary.

use std::collections::HashMap;

use tracing::warn;

use crate::domain::FailureReason;

/// State of one sample's resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    Pending,
    InFlight,
    /// Backing off after the `attempt`-th rate-limited response.
    Retrying { attempt: u32 },
    Resolved,
    Failed(FailureReason),
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Resolved | TaskState::Failed(_))
    }

    /// Whether a task may move from `self` to `next`.
    pub fn can_transition_to(&self, next: &TaskState) -> bool {
        use TaskState::*;
        match (self, next) {
            (Pending, InFlight | Resolved | Failed(_)) => true,
            (InFlight, Retrying { attempt: 1 }) => true,
            (Retrying { attempt: a }, Retrying { attempt: b }) => *b == a + 1,
            (InFlight | Retrying { .. }, Resolved | Failed(_)) => true,
            _ => false,
        }
    }
}

/// A state change of the task with index `task`.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskEvent {
    pub task: usize,
    pub state: TaskState,
}

/// Outcome counts over all tasks of a computation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSummary {
    pub resolved: usize,
    pub failed: usize,
    pub rate_limited: usize,
    pub retries: usize,
    /// Tasks that never reached a terminal state.
    pub unfinished: usize,
}

/// Tracks the latest state of each task.
#[derive(Debug, Default)]
pub struct TaskLog {
    states: HashMap<usize, TaskState>,
    retries: usize,
    invalid: usize,
}

impl TaskLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an event. Invalid transitions are logged and counted, and the
    /// task keeps its previous state.
    pub fn record(&mut self, event: TaskEvent) -> bool {
        let valid = match self.states.get(&event.task) {
            None => event.state == TaskState::Pending,
            Some(current) => current.can_transition_to(&event.state),
        };
        if !valid {
            warn!(task = event.task, state = ?event.state, "invalid task transition");
            self.invalid += 1;
            return false;
        }
        if matches!(event.state, TaskState::Retrying { .. }) {
            self.retries += 1;
        }
        self.states.insert(event.task, event.state);
        true
    }

    pub fn state(&self, task: usize) -> Option<&TaskState> {
        self.states.get(&task)
    }

    /// Number of rejected transitions.
    pub fn invalid(&self) -> usize {
        self.invalid
    }

    pub fn summary(&self) -> TaskSummary {
        let mut summary = TaskSummary {
            retries: self.retries,
            ..TaskSummary::default()
        };
        for state in self.states.values() {
            match state {
                TaskState::Resolved => summary.resolved += 1,
                TaskState::Failed(reason) => {
                    summary.failed += 1;
                    if *reason == FailureReason::RateLimited {
                        summary.rate_limited += 1;
                    }
                }
                _ => summary.unfinished += 1,
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(task: usize, state: TaskState) -> TaskEvent {
        TaskEvent { task, state }
    }

    #[test]
    fn transitions() {
        use TaskState::*;
        assert!(Pending.can_transition_to(&InFlight));
        assert!(Pending.can_transition_to(&Resolved));
        assert!(InFlight.can_transition_to(&Retrying { attempt: 1 }));
        assert!(Retrying { attempt: 1 }.can_transition_to(&Retrying { attempt: 2 }));
        assert!(Retrying { attempt: 3 }.can_transition_to(&Failed(FailureReason::RateLimited)));

        assert!(!InFlight.can_transition_to(&Retrying { attempt: 2 }));
        assert!(!Resolved.can_transition_to(&InFlight));
        assert!(!Failed(FailureReason::NoTrip).can_transition_to(&Resolved));
        assert!(!Pending.can_transition_to(&Retrying { attempt: 1 }));
    }

    #[test]
    fn log_summarises_tasks() {
        let mut log = TaskLog::new();
        for task in 0..4 {
            assert!(log.record(event(task, TaskState::Pending)));
        }
        log.record(event(0, TaskState::Resolved));
        log.record(event(1, TaskState::InFlight));
        log.record(event(1, TaskState::Retrying { attempt: 1 }));
        log.record(event(1, TaskState::Resolved));
        log.record(event(2, TaskState::InFlight));
        log.record(event(2, TaskState::Retrying { attempt: 1 }));
        log.record(event(2, TaskState::Failed(FailureReason::RateLimited)));

        assert_eq!(
            log.summary(),
            TaskSummary {
                resolved: 2,
                failed: 1,
                rate_limited: 1,
                retries: 2,
                unfinished: 1,
            }
        );
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let mut log = TaskLog::new();
        assert!(!log.record(event(0, TaskState::InFlight)));
        log.record(event(0, TaskState::Pending));
        log.record(event(0, TaskState::Resolved));
        assert!(!log.record(event(0, TaskState::InFlight)));
        assert_eq!(log.state(0), Some(&TaskState::Resolved));
        assert_eq!(log.invalid(), 2);
    }
}
