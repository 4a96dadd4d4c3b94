//! Goal descriptor: the deadline and priority every task is scheduled against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::task::Priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    Active,
    Completed,
    Paused,
    Archived,
}

/// A user objective. Read-only for the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Records coming from storage may lack one; scheduling then fails.
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: GoalStatus,
}

impl Goal {
    pub fn new(id: impl Into<String>, deadline: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            deadline: Some(deadline),
            priority: Priority::Medium,
            status: GoalStatus::Active,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn require_deadline(&self) -> Result<DateTime<Utc>> {
        self.deadline.ok_or_else(|| ScheduleError::MissingDeadline {
            goal: self.id.clone(),
        })
    }
}
