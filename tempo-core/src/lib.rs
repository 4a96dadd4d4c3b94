//! tempo-core: turns a goal and its task list into a dated plan.
//!
//! Pipeline: validate -> dependency graph -> score -> allocate -> detect
//! conflicts. Pure and deterministic: no I/O, and "now" is always passed in.

pub mod allocator;
pub mod calendar;
pub mod conflicts;
pub mod engine;
pub mod error;
pub mod goals;
pub mod graph;
pub mod reschedule;
pub mod scoring;
pub mod task;
pub mod time;
pub mod validation;

pub use calendar::{
    working_minutes, working_units, AvailabilityPattern, BoundaryPolicy, DateException, ExceptionKind,
    WeeklyWindow,
};
pub use conflicts::{ConflictKind, SchedulingConflict, SuggestedResolution};
pub use engine::{EngineConfig, Schedule, Scheduler};
pub use error::{Result, ScheduleError};
pub use goals::{Goal, GoalStatus};
pub use graph::{task_hierarchy, DependencyGraph, HierarchyEntry, TopoOrder, DEFAULT_MAX_DEPTH};
pub use reschedule::{DueDateChange, Rescheduled};
pub use task::{Priority, Task, TaskStatus, TimeSlotType};
