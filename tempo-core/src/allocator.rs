//! Due-date allocation.
//!
//! Closed-form spread, not a solver:
//! 1. `available` = working days between now and the deadline. When there are
//!    none, every task is due at the deadline.
//! 2. Tasks are walked in topological order, ready ties broken by descending
//!    scheduling priority, then `order_index`, then id.
//! 3. Task `i` of `n` sits `buffer + (1 - i/n) * max(1, available - buffer)`
//!    working days before the deadline, `buffer = 2 + min(3, |depends_on|)`.
//! 4. Results are clamped to `[now + 1 day, deadline]` and floored by the
//!    running maximum and by anchored dependencies, so dates never go backwards
//!    along the order.
//! 5. Optionally, each task gets a work slot that ends by its due date.
//!
//! Inputs must already be validated. Impossible plans still get concrete due
//! dates; the conflict detector reports what went wrong.

use chrono::{DateTime, Duration, Utc};
use std::cmp::Reverse;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::calendar::{step_back_working_days, working_units, AvailabilityPattern};
use crate::engine::EngineConfig;
use crate::graph::DependencyGraph;
use crate::task::{Task, TimeSlotType};

const BASE_BUFFER_DAYS: i64 = 2;
const MAX_DEPENDENCY_BUFFER_DAYS: i64 = 3;
const FALLBACK_DAY_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub working_days_available: i64,
    /// Ids of the tasks that were (re)allocated, in allocation order.
    pub order: Vec<String>,
    /// Every input task, input order, with scheduling fields filled.
    pub tasks: Vec<Task>,
}

pub fn buffer_days(task: &Task) -> i64 {
    BASE_BUFFER_DAYS + (task.depends_on.len() as i64).min(MAX_DEPENDENCY_BUFFER_DAYS)
}

fn clamp_due(raw: DateTime<Utc>, now: DateTime<Utc>, deadline: DateTime<Utc>) -> DateTime<Utc> {
    let mut due = raw;
    if due < now + Duration::hours(1) {
        due = now + Duration::days(1);
    }
    if due > deadline {
        let earlier = deadline - Duration::days(1);
        due = if earlier < now { deadline } else { earlier };
    }
    due
}

/// Assign a due date to every non-anchor task.
///
/// Anchors (completed, cancelled, pinned) keep their due date; an anchor
/// without one is stamped `min(now, deadline)` as fixed history.
pub fn allocate(
    deadline: DateTime<Utc>,
    tasks: &[Task],
    graph: &DependencyGraph,
    scores: &HashMap<String, u8>,
    pattern: &AvailabilityPattern,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Allocation {
    let available = working_units(now, deadline, pattern, config.boundary_policy);
    let by_id: HashMap<&str, usize> = tasks.iter().enumerate().map(|(i, t)| (t.id.as_str(), i)).collect();

    let mut out: Vec<Task> = tasks.to_vec();
    for t in out.iter_mut() {
        if t.is_anchor() {
            if t.due_date.is_none() {
                t.due_date = Some(now.min(deadline));
                t.time_slot_type = Some(TimeSlotType::Fixed);
            }
        } else {
            t.clear_scheduling();
        }
    }

    let order: Vec<String> = graph
        .order_by(|id| {
            let t = &tasks[by_id[id]];
            (
                Reverse(scores.get(id).copied().unwrap_or(0)),
                t.order_index,
                id.to_string(),
            )
        })
        .into_iter()
        .filter(|id| !tasks[by_id[id.as_str()]].is_anchor())
        .collect();

    let n = order.len();
    debug!(tasks = n, available, %deadline, "allocating due dates");
    if available <= 0 && n > 0 {
        warn!(tasks = n, %deadline, "no working time before deadline; all tasks due at deadline");
    }

    let day_minutes = pattern.typical_day_minutes().unwrap_or(FALLBACK_DAY_MINUTES);
    let floor_date = now.date_naive();
    let mut running: Option<DateTime<Utc>> = None;

    for (pos, id) in order.iter().enumerate() {
        let idx = by_id[id.as_str()];
        let buffer = buffer_days(&out[idx]);

        let mut due = if available <= 0 {
            deadline
        } else {
            let ratio = ((pos + 1) as f64 / n as f64).clamp(0.0, 1.0);
            let span = (available - buffer).max(1) as f64;
            let offset = (buffer as f64 + (1.0 - ratio) * span).round() as i64;
            let raw = step_back_working_days(deadline, offset, pattern, floor_date);
            clamp_due(raw, now, deadline)
        };

        let dependency_floor = out[idx]
            .depends_on
            .iter()
            .filter_map(|d| by_id.get(d.as_str()).and_then(|&j| out[j].due_date))
            .max();
        if let Some(prev) = running {
            due = due.max(prev);
        }
        if let Some(floor) = dependency_floor {
            due = due.max(floor);
        }
        due = due.min(deadline);
        running = Some(due);

        let t = &mut out[idx];
        t.due_date = Some(due);
        t.scheduling_priority = Some(scores.get(id).copied().unwrap_or(0));
        t.time_slot_type = Some(TimeSlotType::DeadlineDriven);
        t.buffer_minutes = Some(buffer * day_minutes);
    }

    if config.assign_slots {
        assign_slots(&mut out, &order, &by_id, pattern, now);
    }

    Allocation {
        working_days_available: available,
        order,
        tasks: out,
    }
}

/// Place each slot as late as possible so it ends by its due date, inside a
/// working window and not before `now`.
///
/// Tasks are walked backward along the allocation order and every slot ends
/// at or before the start of the one placed after it, so slots keep the
/// allocation order and never overlap. A slot that does not fit on its due
/// day moves to an earlier working day. A task with no room before its due
/// date is left without a slot; the conflict scan reports it.
fn assign_slots(
    out: &mut [Task],
    order: &[String],
    by_id: &HashMap<&str, usize>,
    pattern: &AvailabilityPattern,
    now: DateTime<Utc>,
) {
    let mut ceiling: Option<DateTime<Utc>> = None;

    for id in order.iter().rev() {
        let t = &mut out[by_id[id.as_str()]];
        let Some(due) = t.due_date else { continue };
        let limit = ceiling.map_or(due, |c| c.min(due));

        match latest_slot(pattern, limit, Duration::minutes(t.estimated_minutes), now) {
            Some((start, end)) => {
                t.scheduled_start = Some(start);
                t.scheduled_end = Some(end);
                ceiling = Some(start);
            }
            None => debug!(task = %id, %due, "no working time before due date; left unslotted"),
        }
    }
}

/// The latest `length`-long slot that ends by `limit`, starts no earlier than
/// `now`, and sits inside one day's window.
fn latest_slot(
    pattern: &AvailabilityPattern,
    limit: DateTime<Utc>,
    length: Duration,
    now: DateTime<Utc>,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let floor_date = now.date_naive();
    let mut day = Some(limit.date_naive()).filter(|d| *d >= floor_date);

    while let Some(d) = day {
        if let Some((window_start, window_end)) = pattern.window_bounds(d) {
            let end = window_end.min(limit);
            let start = end - length;
            if start >= window_start.max(now) {
                return Some((start, end));
            }
        }
        day = pattern.previous_working_day(d, floor_date);
    }
    None
}
