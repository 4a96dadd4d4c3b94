//! Scheduling pipeline: validate -> graph -> score -> allocate -> scan.
//!
//! `Scheduler` holds only read-only configuration, so one instance can serve
//! any number of goals concurrently. Writes per goal must be serialized by
//! the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::allocator::allocate;
use crate::calendar::{AvailabilityPattern, BoundaryPolicy};
use crate::conflicts::{scan, SchedulingConflict};
use crate::error::Result;
use crate::goals::Goal;
use crate::graph::{DependencyGraph, DEFAULT_MAX_DEPTH};
use crate::reschedule::{reschedule, Rescheduled};
use crate::scoring::score_all;
use crate::task::Task;
use crate::validation::validate_tasks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Longest allowed path through the task graph, in edges.
    pub max_depth: usize,
    pub boundary_policy: BoundaryPolicy,
    /// Also pack day-level start/end slots.
    pub assign_slots: bool,
    /// Daily workload limit; `None` disables the overload check.
    pub max_daily_minutes: Option<i64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            boundary_policy: BoundaryPolicy::Coarse,
            assign_slots: true,
            max_daily_minutes: Some(480),
        }
    }
}

/// Result of one run. Tasks keep their input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub goal_id: String,
    pub generated_at: DateTime<Utc>,
    pub working_days_available: i64,
    pub tasks: Vec<Task>,
    pub conflicts: Vec<SchedulingConflict>,
}

impl Schedule {
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn due_date(&self, id: &str) -> Option<DateTime<Utc>> {
        self.task(id).and_then(|t| t.due_date)
    }

    pub fn conflicts_for<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a SchedulingConflict> + 'a {
        self.conflicts.iter().filter(move |c| c.task_id == id)
    }

    pub fn is_feasible(&self) -> bool {
        self.conflicts.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    pattern: AvailabilityPattern,
    config: EngineConfig,
}

impl Scheduler {
    pub fn new(pattern: AvailabilityPattern, config: EngineConfig) -> Result<Self> {
        pattern.validate()?;
        Ok(Self { pattern, config })
    }

    pub fn pattern(&self) -> &AvailabilityPattern {
        &self.pattern
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the full pipeline.
    ///
    /// Errors are validation failures and nothing was scheduled. An infeasible
    /// plan is still `Ok`, with its problems listed in `conflicts`.
    pub fn schedule(&self, goal: &Goal, tasks: &[Task], now: DateTime<Utc>) -> Result<Schedule> {
        validate_tasks(goal, tasks)?;
        let deadline = goal.require_deadline()?;

        let graph = DependencyGraph::build(tasks)?;
        let topo = graph.validate(self.config.max_depth)?;
        let scores = score_all(&graph, tasks, goal);
        debug!(goal = %goal.id, tasks = tasks.len(), depth = topo.max_depth(), "scheduling goal");

        let allocation = allocate(deadline, tasks, &graph, &scores, &self.pattern, now, &self.config);
        let conflicts = scan(
            deadline,
            &allocation.tasks,
            allocation.working_days_available,
            &self.pattern,
            now,
            &self.config,
        );

        if !conflicts.is_empty() {
            warn!(goal = %goal.id, conflicts = conflicts.len(), "schedule has conflicts");
        }

        Ok(Schedule {
            goal_id: goal.id.clone(),
            generated_at: now,
            working_days_available: allocation.working_days_available,
            tasks: allocation.tasks,
            conflicts,
        })
    }

    /// Re-plan an existing task set, keeping completed/cancelled/pinned tasks
    /// where they are.
    pub fn reschedule(&self, goal: &Goal, existing: &[Task], now: DateTime<Utc>) -> Result<Rescheduled> {
        reschedule(self, goal, existing, now)
    }
}
