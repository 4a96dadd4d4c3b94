//! Boundary checks for task lists arriving from an untrusted generator.
//!
//! Graph-shape problems (duplicates, dangling references, cycles) are caught
//! by [`DependencyGraph`](crate::graph::DependencyGraph); this covers the rest.

use crate::error::{Result, ScheduleError};
use crate::goals::Goal;
use crate::task::Task;

/// Reject a goal without a deadline, tasks owned by another goal, and
/// non-positive durations. Stops at the first problem.
pub fn validate_tasks(goal: &Goal, tasks: &[Task]) -> Result<()> {
    goal.require_deadline()?;

    for t in tasks {
        if t.goal_id != goal.id {
            return Err(ScheduleError::GoalMismatch {
                task: t.id.clone(),
                task_goal: t.goal_id.clone(),
                goal: goal.id.clone(),
            });
        }
        if t.estimated_minutes <= 0 {
            return Err(ScheduleError::NonPositiveDuration {
                task: t.id.clone(),
                minutes: t.estimated_minutes,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn goal() -> Goal {
        Goal::new("g1", Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap())
    }

    #[test]
    fn accepts_well_formed_tasks() {
        let tasks = vec![Task::new("a", "g1"), Task::new("b", "g1").with_duration(5)];
        assert!(validate_tasks(&goal(), &tasks).is_ok());
    }

    #[test]
    fn rejects_zero_and_negative_durations() {
        let err = validate_tasks(&goal(), &[Task::new("a", "g1").with_duration(0)]).unwrap_err();
        assert_eq!(err, ScheduleError::NonPositiveDuration { task: "a".into(), minutes: 0 });

        let err = validate_tasks(&goal(), &[Task::new("a", "g1").with_duration(-30)]).unwrap_err();
        assert!(matches!(err, ScheduleError::NonPositiveDuration { minutes: -30, .. }));
    }

    #[test]
    fn rejects_tasks_of_another_goal() {
        let err = validate_tasks(&goal(), &[Task::new("a", "g2")]).unwrap_err();
        assert!(matches!(err, ScheduleError::GoalMismatch { .. }));
    }

    #[test]
    fn rejects_goal_without_deadline() {
        let mut g = goal();
        g.deadline = None;
        assert!(matches!(validate_tasks(&g, &[]), Err(ScheduleError::MissingDeadline { .. })));
    }
}
