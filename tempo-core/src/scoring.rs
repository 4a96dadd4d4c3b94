//! Scheduling-priority heuristic (0-100).
//!
//! Additive, capped at 100:
//! - task priority: high 80, medium 50, low 20
//! - +10 per task blocked through `depends_on`, at most +30
//! - +15 if the estimate is over 2h, else +10 if over 1h
//! - goal priority: high +20, medium +10
//!
//! Same inputs, same score. No clock, no randomness.

use std::collections::HashMap;

use crate::goals::Goal;
use crate::graph::DependencyGraph;
use crate::task::{Priority, Task};

const MAX_SCORE: u32 = 100;
const FAN_OUT_STEP: u32 = 10;
const FAN_OUT_CAP: u32 = 30;

fn base(priority: Priority) -> u32 {
    match priority {
        Priority::High => 80,
        Priority::Medium => 50,
        Priority::Low => 20,
    }
}

fn duration_bonus(minutes: i64) -> u32 {
    match minutes {
        m if m > 120 => 15,
        m if m > 60 => 10,
        _ => 0,
    }
}

fn goal_bonus(priority: Priority) -> u32 {
    match priority {
        Priority::High => 20,
        Priority::Medium => 10,
        Priority::Low => 0,
    }
}

/// Score one task given how many tasks depend on it.
pub fn score(task: &Task, goal: &Goal, fan_out: usize) -> u8 {
    let fan_out = (fan_out as u32).saturating_mul(FAN_OUT_STEP).min(FAN_OUT_CAP);
    let total = base(task.priority)
        + fan_out
        + duration_bonus(task.estimated_minutes)
        + goal_bonus(goal.priority);
    total.min(MAX_SCORE) as u8
}

/// Score every task in the graph.
pub fn score_all(graph: &DependencyGraph, tasks: &[Task], goal: &Goal) -> HashMap<String, u8> {
    tasks
        .iter()
        .map(|t| (t.id.clone(), score(t, goal, graph.fan_out(&t.id))))
        .collect()
}
