//! Conflict detection over an allocated schedule.
//!
//! Every check runs; none short-circuits the others. Only tasks the engine
//! may move are reported on; anchors still count as dependencies. The
//! detector never edits the schedule, and suggestions are advisory.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::calendar::{step_forward_working_days, AvailabilityPattern};
use crate::engine::EngineConfig;
use crate::task::Task;

const FIT_HORIZON_DAYS: usize = 2 * 366;

/// Declaration order is report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    DeadlineImpossible,
    DependencyViolation,
    TimeOverlap,
    AvailabilityConflict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SuggestedResolution {
    ShiftDueDate { to: DateTime<Utc> },
    ExtendDeadline { to: DateTime<Utc> },
    BreakDependency { depends_on: String },
    MoveSlot { start: DateTime<Utc>, end: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingConflict {
    pub task_id: String,
    pub kind: ConflictKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_resolution: Option<SuggestedResolution>,
}

impl SchedulingConflict {
    fn new(task_id: &str, kind: ConflictKind, description: String) -> Self {
        Self {
            task_id: task_id.to_string(),
            kind,
            description,
            suggested_resolution: None,
        }
    }

    fn suggest(mut self, resolution: Option<SuggestedResolution>) -> Self {
        self.suggested_resolution = resolution;
        self
    }
}

/// Scan a schedule. `available` is the working-day count the allocator used.
pub fn scan(
    deadline: DateTime<Utc>,
    tasks: &[Task],
    available: i64,
    pattern: &AvailabilityPattern,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Vec<SchedulingConflict> {
    let movable: Vec<&Task> = tasks.iter().filter(|t| !t.is_anchor()).collect();

    let mut out = Vec::new();
    out.extend(deadline_impossible(deadline, &movable, available, pattern, now));
    out.extend(dependency_violations(deadline, tasks, &movable));
    out.extend(time_overlaps(&movable));
    out.extend(availability_conflicts(&movable, pattern));
    out.extend(late_slots(deadline, &movable));
    if config.assign_slots {
        out.extend(unslotted(deadline, &movable, pattern, now));
    }
    if let Some(cap) = config.max_daily_minutes {
        out.extend(day_overloads(deadline, &movable, pattern, cap));
    }

    out.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.task_id.cmp(&b.task_id)));
    debug!(conflicts = out.len(), "conflict scan finished");
    out
}

fn deadline_impossible(
    deadline: DateTime<Utc>,
    movable: &[&Task],
    available: i64,
    pattern: &AvailabilityPattern,
    now: DateTime<Utc>,
) -> Vec<SchedulingConflict> {
    if available > 0 {
        return Vec::new();
    }

    // Enough room for one working day per open task.
    let extended = step_forward_working_days(now, movable.len().max(1) as i64, pattern)
        .map(|to| SuggestedResolution::ExtendDeadline { to });

    movable
        .iter()
        .filter(|t| t.due_date == Some(deadline))
        .map(|t| {
            SchedulingConflict::new(
                &t.id,
                ConflictKind::DeadlineImpossible,
                format!("no working time left before the deadline ({deadline}) for '{}'", t.id),
            )
            .suggest(extended.clone())
        })
        .collect()
}

fn dependency_violations(deadline: DateTime<Utc>, tasks: &[Task], movable: &[&Task]) -> Vec<SchedulingConflict> {
    let due_by_id: HashMap<&str, DateTime<Utc>> = tasks
        .iter()
        .filter_map(|t| t.due_date.map(|d| (t.id.as_str(), d)))
        .collect();

    let mut out = Vec::new();
    for t in movable {
        let Some(due) = t.due_date else { continue };
        for dep in &t.depends_on {
            let Some(&dep_due) = due_by_id.get(dep.as_str()) else { continue };
            if due >= dep_due {
                continue;
            }
            let resolution = if dep_due <= deadline {
                SuggestedResolution::ShiftDueDate { to: dep_due }
            } else {
                SuggestedResolution::BreakDependency {
                    depends_on: dep.clone(),
                }
            };
            out.push(
                SchedulingConflict::new(
                    &t.id,
                    ConflictKind::DependencyViolation,
                    format!("'{}' is due {due}, before its dependency '{dep}' ({dep_due})", t.id),
                )
                .suggest(Some(resolution)),
            );
        }
    }
    out
}

fn time_overlaps(movable: &[&Task]) -> Vec<SchedulingConflict> {
    let mut slotted: Vec<(&Task, DateTime<Utc>, DateTime<Utc>)> = movable
        .iter()
        .filter_map(|t| t.slot().map(|(s, e)| (*t, s, e)))
        .collect();
    slotted.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.id.cmp(&b.0.id)));

    let mut out = Vec::new();
    for (i, (first, _, first_end)) in slotted.iter().enumerate() {
        for (second, start, end) in slotted.iter().skip(i + 1) {
            if start >= first_end {
                break;
            }
            let moved_end = *first_end + (*end - *start);
            out.push(
                SchedulingConflict::new(
                    &second.id,
                    ConflictKind::TimeOverlap,
                    format!("slot of '{}' overlaps '{}' ({start} < {first_end})", second.id, first.id),
                )
                .suggest(Some(SuggestedResolution::MoveSlot {
                    start: *first_end,
                    end: moved_end,
                })),
            );
        }
    }
    out
}

fn next_window_slot(
    pattern: &AvailabilityPattern,
    after: NaiveDate,
    length: Duration,
) -> Option<SuggestedResolution> {
    let day = pattern.next_working_day(after)?;
    let (start, _) = pattern.window_bounds(day)?;
    Some(SuggestedResolution::MoveSlot {
        start,
        end: start + length,
    })
}

fn availability_conflicts(movable: &[&Task], pattern: &AvailabilityPattern) -> Vec<SchedulingConflict> {
    let mut out = Vec::new();
    for t in movable {
        let Some((start, end)) = t.slot() else { continue };
        let day = start.date_naive();

        let description = match pattern.window_bounds(day) {
            None => format!("slot of '{}' falls on {day}, which has no available hours", t.id),
            Some((ws, we)) if start < ws || end > we => format!(
                "slot of '{}' ({start} - {end}) is outside the {day} window ({ws} - {we})",
                t.id
            ),
            Some(_) => continue,
        };

        out.push(
            SchedulingConflict::new(&t.id, ConflictKind::AvailabilityConflict, description)
                .suggest(next_window_slot(pattern, day, end - start)),
        );
    }
    out
}

/// A slot must finish by its task's due date and by the goal deadline.
fn late_slots(deadline: DateTime<Utc>, movable: &[&Task]) -> Vec<SchedulingConflict> {
    let mut out = Vec::new();
    for t in movable {
        let (Some((start, end)), Some(due)) = (t.slot(), t.due_date) else { continue };
        let limit = due.min(deadline);
        if end <= limit {
            continue;
        }
        out.push(
            SchedulingConflict::new(
                &t.id,
                ConflictKind::AvailabilityConflict,
                format!("slot of '{}' ends {end}, after its due date ({limit})", t.id),
            )
            .suggest(Some(SuggestedResolution::MoveSlot {
                start: limit - (end - start),
                end: limit,
            })),
        );
    }
    out
}

/// Tasks the allocator could not fit into any window before their due date.
fn unslotted(
    deadline: DateTime<Utc>,
    movable: &[&Task],
    pattern: &AvailabilityPattern,
    now: DateTime<Utc>,
) -> Vec<SchedulingConflict> {
    let mut out = Vec::new();
    for t in movable {
        let Some(due) = t.due_date else { continue };
        if t.slot().is_some() {
            continue;
        }
        let shifted = earliest_finish(pattern, now, Duration::minutes(t.estimated_minutes))
            .filter(|to| *to <= deadline)
            .map(|to| SuggestedResolution::ShiftDueDate { to });
        out.push(
            SchedulingConflict::new(
                &t.id,
                ConflictKind::AvailabilityConflict,
                format!(
                    "no working window fits {} min of '{}' before its due date ({due})",
                    t.estimated_minutes, t.id
                ),
            )
            .suggest(shifted),
        );
    }
    out
}

/// End of the first window slot of `length` that starts at or after `now`.
fn earliest_finish(pattern: &AvailabilityPattern, now: DateTime<Utc>, length: Duration) -> Option<DateTime<Utc>> {
    let mut day = Some(now.date_naive());
    for _ in 0..FIT_HORIZON_DAYS {
        let d = day?;
        if let Some((ws, we)) = pattern.window_bounds(d) {
            let start = ws.max(now);
            if start + length <= we {
                return Some(start + length);
            }
        }
        day = pattern.next_working_day(d);
    }
    None
}

/// Reported as availability conflicts: the work due on one day does not fit
/// the daily workload limit.
fn day_overloads(
    deadline: DateTime<Utc>,
    movable: &[&Task],
    pattern: &AvailabilityPattern,
    cap: i64,
) -> Vec<SchedulingConflict> {
    let mut by_day: BTreeMap<NaiveDate, Vec<&Task>> = BTreeMap::new();
    for t in movable {
        if let Some(due) = t.due_date {
            by_day.entry(due.date_naive()).or_default().push(*t);
        }
    }

    let mut out = Vec::new();
    for (day, mut day_tasks) in by_day {
        day_tasks.sort_by(|a, b| {
            (a.scheduled_start, a.due_date, &a.id).cmp(&(b.scheduled_start, b.due_date, &b.id))
        });

        let total: i64 = day_tasks.iter().map(|t| t.estimated_minutes).sum();
        let mut load = 0;
        for t in day_tasks {
            load += t.estimated_minutes;
            if load <= cap {
                continue;
            }
            let shifted = pattern
                .next_working_day(day)
                .zip(t.due_date)
                .map(|(next, due)| next.and_time(due.time()).and_utc())
                .filter(|to| *to <= deadline)
                .map(|to| SuggestedResolution::ShiftDueDate { to });
            out.push(
                SchedulingConflict::new(
                    &t.id,
                    ConflictKind::AvailabilityConflict,
                    format!("{total} min of work due on {day} exceeds the daily limit of {cap} min"),
                )
                .suggest(shifted),
            );
        }
    }
    out
}
