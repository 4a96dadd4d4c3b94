//! Re-planning an existing task set.
//!
//! Anchored tasks (completed, cancelled, pinned) keep their dates and only
//! constrain the rest. Everything else is recomputed from scratch, so any
//! previously computed fields on the input are ignored and running this twice
//! with the same `now` gives the same schedule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::{Schedule, Scheduler};
use crate::error::Result;
use crate::goals::Goal;
use crate::task::Task;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueDateChange {
    pub task_id: String,
    pub previous: Option<DateTime<Utc>>,
    pub current: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rescheduled {
    pub schedule: Schedule,
    /// Tasks whose due date differs from the one they came in with.
    pub changes: Vec<DueDateChange>,
}

pub fn reschedule(scheduler: &Scheduler, goal: &Goal, existing: &[Task], now: DateTime<Utc>) -> Result<Rescheduled> {
    let schedule = scheduler.schedule(goal, existing, now)?;

    let changes: Vec<DueDateChange> = existing
        .iter()
        .zip(&schedule.tasks)
        .filter_map(|(before, after)| {
            let current = after.due_date?;
            (before.due_date != Some(current)).then(|| DueDateChange {
                task_id: after.id.clone(),
                previous: before.due_date,
                current,
            })
        })
        .collect();

    let anchored = existing.iter().filter(|t| t.is_anchor()).count();
    info!(
        goal = %goal.id,
        moved = changes.len(),
        anchored,
        conflicts = schedule.conflicts.len(),
        "rescheduled goal"
    );

    Ok(Rescheduled { schedule, changes })
}
