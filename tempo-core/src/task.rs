//! Task model consumed and annotated by the scheduling engine.
//!
//! The engine only writes the scheduling fields (`due_date` onwards). Everything
//! else is owned by whoever generated the task list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Missed,
    Cancelled,
}

impl TaskStatus {
    /// Completed and cancelled tasks are history; the engine never moves them.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }
}

/// Declared priority, shared by tasks and goals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSlotType {
    Flexible,
    /// Pinned by the user; a fixed task with a due date is never moved.
    Fixed,
    DeadlineDriven,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub goal_id: String,
    #[serde(default)]
    pub title: String,

    /// Subtask hierarchy (a forest).
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Explicit ordering edges, distinct from the hierarchy.
    #[serde(default)]
    pub depends_on: BTreeSet<String>,

    #[serde(default)]
    pub priority: Priority,
    /// Minutes, must be > 0.
    pub estimated_minutes: i64,
    /// Caller tie-break hint.
    #[serde(default)]
    pub order_index: i32,
    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// 0-100.
    #[serde(default)]
    pub scheduling_priority: Option<u8>,
    #[serde(default)]
    pub time_slot_type: Option<TimeSlotType>,
    #[serde(default)]
    pub buffer_minutes: Option<i64>,
    #[serde(default)]
    pub scheduled_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scheduled_end: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(id: impl Into<String>, goal_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            goal_id: goal_id.into(),
            title: String::new(),
            parent_id: None,
            depends_on: BTreeSet::new(),
            priority: Priority::Medium,
            estimated_minutes: 60,
            order_index: 0,
            status: TaskStatus::Pending,
            due_date: None,
            scheduling_priority: None,
            time_slot_type: None,
            buffer_minutes: None,
            scheduled_start: None,
            scheduled_end: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn depending_on(mut self, id: impl Into<String>) -> Self {
        self.depends_on.insert(id.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_duration(mut self, minutes: i64) -> Self {
        self.estimated_minutes = minutes;
        self
    }

    pub fn with_order(mut self, order_index: i32) -> Self {
        self.order_index = order_index;
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }

    /// Pin the task at `due`; the engine will treat it as an anchor.
    pub fn pinned_at(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self.time_slot_type = Some(TimeSlotType::Fixed);
        self
    }

    /// Anchors keep their due date through every run.
    pub fn is_anchor(&self) -> bool {
        self.status.is_terminal()
            || (self.time_slot_type == Some(TimeSlotType::Fixed) && self.due_date.is_some())
    }

    /// Drop everything the engine computed, keeping caller-owned fields.
    pub fn clear_scheduling(&mut self) {
        self.due_date = None;
        self.scheduling_priority = None;
        self.time_slot_type = None;
        self.buffer_minutes = None;
        self.scheduled_start = None;
        self.scheduled_end = None;
    }

    pub fn slot(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((self.scheduled_start?, self.scheduled_end?))
    }
}
