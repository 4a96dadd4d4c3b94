//! Validation errors for a scheduling run.
//!
//! These are fatal: when one is returned no schedule was produced. Anything
//! the engine can still plan around is reported as a
//! [`SchedulingConflict`](crate::conflicts::SchedulingConflict) instead.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("cycle detected in task graph at '{task}'")]
    Cycle { task: String },

    #[error("task graph deeper than {limit} levels at '{task}'")]
    DepthExceeded { task: String, limit: usize },

    #[error("duplicate task id: {task}")]
    DuplicateTask { task: String },

    #[error("task '{task}' references unknown task '{reference}'")]
    UnknownReference { task: String, reference: String },

    #[error("task '{task}' belongs to goal '{task_goal}', not '{goal}'")]
    GoalMismatch {
        task: String,
        task_goal: String,
        goal: String,
    },

    #[error("task '{task}' has non-positive estimated duration ({minutes} min)")]
    NonPositiveDuration { task: String, minutes: i64 },

    #[error("goal '{goal}' has no deadline")]
    MissingDeadline { goal: String },

    #[error("invalid availability pattern: {0}")]
    InvalidAvailability(String),
}

impl ScheduleError {
    /// True for graph-shape failures (a real cycle or the depth guard tripping).
    pub fn is_cycle_like(&self) -> bool {
        matches!(self, Self::Cycle { .. } | Self::DepthExceeded { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
