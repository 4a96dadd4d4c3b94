use chrono::{DateTime, Duration, TimeZone, Utc};
use tempo_core::{
    task_hierarchy, AvailabilityPattern, BoundaryPolicy, ConflictKind, EngineConfig, ExceptionKind, Goal,
    Priority, ScheduleError, Scheduler, Task, TaskStatus, TimeSlotType, DEFAULT_MAX_DEPTH,
};

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

// Monday.
fn monday_morning() -> DateTime<Utc> {
    at(2026, 2, 16, 9)
}

#[test]
fn two_week_goal_spreads_five_tasks() {
    let now = monday_morning();
    let goal = Goal::new("launch", at(2026, 3, 2, 9)).with_title("Ship the beta");
    let tasks: Vec<Task> = (1..=5)
        .map(|i| Task::new(format!("t{i}"), "launch").with_order(i).with_duration(60))
        .collect();

    let schedule = Scheduler::default().schedule(&goal, &tasks, now).unwrap();

    assert_eq!(schedule.working_days_available, 10);
    assert!(schedule.is_feasible(), "unexpected conflicts: {:?}", schedule.conflicts);

    let dues: Vec<DateTime<Utc>> = schedule.tasks.iter().map(|t| t.due_date.unwrap()).collect();
    assert_eq!(
        dues,
        vec![at(2026, 2, 18, 9), at(2026, 2, 19, 9), at(2026, 2, 23, 9), at(2026, 2, 24, 9), at(2026, 2, 26, 9)]
    );
    assert!(dues.windows(2).all(|w| w[0] < w[1]));
    assert!(dues.iter().all(|d| *d <= goal.deadline.unwrap()));
    assert!(schedule.tasks.iter().all(|t| t.scheduling_priority == Some(60)));
}

#[test]
fn immediate_deadline_is_impossible_for_every_task() {
    let now = monday_morning();
    let deadline = now + Duration::hours(1);
    let goal = Goal::new("g", deadline);
    let tasks = vec![Task::new("a", "g"), Task::new("b", "g"), Task::new("c", "g")];

    let schedule = Scheduler::default().schedule(&goal, &tasks, now).unwrap();

    assert!(schedule.working_days_available <= 0);
    assert!(schedule.tasks.iter().all(|t| t.due_date == Some(deadline)));
    let found: Vec<(ConflictKind, &str)> =
        schedule.conflicts.iter().map(|c| (c.kind, c.task_id.as_str())).collect();
    // One hour of window before the deadline holds one of the three tasks.
    assert_eq!(
        found,
        vec![
            (ConflictKind::DeadlineImpossible, "a"),
            (ConflictKind::DeadlineImpossible, "b"),
            (ConflictKind::DeadlineImpossible, "c"),
            (ConflictKind::AvailabilityConflict, "a"),
            (ConflictKind::AvailabilityConflict, "b"),
        ]
    );
    assert_eq!(schedule.task("c").unwrap().slot(), Some((now, deadline)));
}

#[test]
fn work_slots_finish_by_due_date_and_deadline() {
    let tasks: Vec<Task> = (1..=5).map(|i| Task::new(format!("t{i}"), "g").with_order(i)).collect();
    let midnight = at(2026, 3, 2, 0);

    let schedule = Scheduler::default()
        .schedule(&Goal::new("g", midnight), &tasks, monday_morning())
        .unwrap();
    assert!(schedule.is_feasible(), "{:?}", schedule.conflicts);
    assert_eq!(schedule.due_date("t1"), Some(at(2026, 2, 18, 0)));
    assert_eq!(schedule.task("t1").unwrap().slot(), Some((at(2026, 2, 17, 16), at(2026, 2, 17, 17))));
    for t in &schedule.tasks {
        let (_, end) = t.slot().unwrap();
        assert!(end <= t.due_date.unwrap() && t.due_date.unwrap() <= midnight, "{}", t.id);
    }

    // Monday evening, deadline half an hour into Tuesday: no hour fits.
    let early = at(2026, 2, 17, 9) + Duration::minutes(30);
    let schedule = Scheduler::default()
        .schedule(&Goal::new("g", early), &[Task::new("t", "g")], at(2026, 2, 16, 20))
        .unwrap();
    assert_eq!(schedule.due_date("t"), Some(early));
    assert_eq!(schedule.task("t").unwrap().slot(), None);
    assert_eq!(schedule.conflicts.len(), 1);
    assert_eq!(schedule.conflicts[0].kind, ConflictKind::AvailabilityConflict);
}

#[test]
fn dependency_wins_over_order_index() {
    let goal = Goal::new("g", at(2026, 3, 2, 9));
    let tasks = vec![
        Task::new("b", "g").with_order(0).depending_on("a"),
        Task::new("a", "g").with_order(1),
    ];

    let schedule = Scheduler::default().schedule(&goal, &tasks, monday_morning()).unwrap();

    assert!(schedule.due_date("a").unwrap() <= schedule.due_date("b").unwrap());
    assert!(schedule
        .conflicts
        .iter()
        .all(|c| c.kind != ConflictKind::DependencyViolation));
    // Output keeps the caller's order.
    assert_eq!(schedule.tasks[0].id, "b");
}

#[test]
fn validation_failures_produce_no_schedule() {
    let goal = Goal::new("g", at(2026, 3, 2, 9));
    let scheduler = Scheduler::default();
    let now = monday_morning();

    let dangling = vec![Task::new("a", "g").depending_on("ghost")];
    assert_eq!(
        scheduler.schedule(&goal, &dangling, now).unwrap_err(),
        ScheduleError::UnknownReference { task: "a".into(), reference: "ghost".into() }
    );

    let dup = vec![Task::new("a", "g"), Task::new("a", "g")];
    assert!(matches!(
        scheduler.schedule(&goal, &dup, now),
        Err(ScheduleError::DuplicateTask { .. })
    ));

    let parent_loop = vec![Task::new("a", "g").with_parent("b"), Task::new("b", "g").with_parent("a")];
    assert!(scheduler.schedule(&goal, &parent_loop, now).unwrap_err().is_cycle_like());
}

#[test]
fn depth_limit_is_configurable() {
    let goal = Goal::new("g", at(2026, 6, 1, 9));
    let chain: Vec<Task> = (0..15)
        .map(|i| {
            let t = Task::new(format!("s{i:02}"), "g");
            if i == 0 { t } else { t.depending_on(format!("s{:02}", i - 1)) }
        })
        .collect();

    let err = Scheduler::default().schedule(&goal, &chain, monday_morning()).unwrap_err();
    assert!(matches!(err, ScheduleError::DepthExceeded { limit: DEFAULT_MAX_DEPTH, .. }));

    let deep = Scheduler::new(
        AvailabilityPattern::default(),
        EngineConfig { max_depth: 20, ..EngineConfig::default() },
    )
    .unwrap();
    let schedule = deep.schedule(&goal, &chain, monday_morning()).unwrap();
    let dues: Vec<_> = schedule.tasks.iter().map(|t| t.due_date.unwrap()).collect();
    assert!(dues.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn holidays_and_custom_hours_shape_the_plan() {
    // Wednesday off, Thursday afternoons only.
    let pattern = AvailabilityPattern::default()
        .with_exception(at(2026, 2, 18, 0).date_naive(), ExceptionKind::Unavailable)
        .with_exception(
            at(2026, 2, 19, 0).date_naive(),
            ExceptionKind::CustomHours {
                start: chrono::NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
                end: chrono::NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            },
        );
    let scheduler = Scheduler::new(pattern, EngineConfig::default()).unwrap();
    let goal = Goal::new("g", at(2026, 3, 2, 9));
    let tasks: Vec<Task> = (1..=5).map(|i| Task::new(format!("t{i}"), "g").with_order(i)).collect();

    let schedule = scheduler.schedule(&goal, &tasks, monday_morning()).unwrap();
    assert_eq!(schedule.working_days_available, 9);
    for t in &schedule.tasks {
        let (start, end) = t.slot().unwrap();
        assert_ne!(start.date_naive(), at(2026, 2, 18, 0).date_naive(), "{} lands on the holiday", t.id);
        if start.date_naive() == at(2026, 2, 19, 0).date_naive() {
            assert!(start >= at(2026, 2, 19, 13) && end <= at(2026, 2, 19, 17));
        }
    }
    assert!(schedule.is_feasible(), "{:?}", schedule.conflicts);
}

#[test]
fn strict_policy_drops_the_partial_first_day() {
    let goal = Goal::new("g", at(2026, 3, 2, 9));
    let strict = Scheduler::new(
        AvailabilityPattern::default(),
        EngineConfig { boundary_policy: BoundaryPolicy::Strict, ..EngineConfig::default() },
    )
    .unwrap();
    // 10:00 on Monday: Monday's window already started.
    let schedule = strict.schedule(&goal, &[], at(2026, 2, 16, 10)).unwrap();
    assert_eq!(schedule.working_days_available, 9);
}

#[test]
fn pinned_and_completed_tasks_stay_put() {
    let goal = Goal::new("g", at(2026, 3, 2, 9));
    let pin = at(2026, 2, 25, 14);
    let tasks = vec![
        Task::new("kickoff", "g").with_status(TaskStatus::Completed).with_due_date(at(2026, 2, 13, 9)),
        Task::new("review", "g").pinned_at(pin),
        Task::new("draft", "g").depending_on("kickoff"),
        Task::new("polish", "g").depending_on("review").with_priority(Priority::High),
    ];

    let schedule = Scheduler::default().schedule(&goal, &tasks, monday_morning()).unwrap();

    assert_eq!(schedule.due_date("kickoff"), Some(at(2026, 2, 13, 9)));
    assert_eq!(schedule.due_date("review"), Some(pin));
    assert_eq!(schedule.task("review").unwrap().time_slot_type, Some(TimeSlotType::Fixed));
    assert!(schedule.due_date("polish").unwrap() >= pin);
    assert!(schedule.due_date("draft").unwrap() > monday_morning());
}

#[test]
fn reschedule_after_deadline_moves_earlier() {
    let scheduler = Scheduler::default();
    let tasks: Vec<Task> = (1..=4).map(|i| Task::new(format!("t{i}"), "g").with_order(i)).collect();
    let now = monday_morning();

    let original = scheduler.schedule(&Goal::new("g", at(2026, 3, 2, 9)), &tasks, now).unwrap();
    let tighter = Goal::new("g", at(2026, 2, 23, 9));
    let moved = scheduler.reschedule(&tighter, &original.tasks, now).unwrap();

    assert!(!moved.changes.is_empty());
    for t in &moved.schedule.tasks {
        assert!(t.due_date.unwrap() <= at(2026, 2, 23, 9));
    }
    let again = scheduler.reschedule(&tighter, &moved.schedule.tasks, now).unwrap();
    assert_eq!(again.schedule, moved.schedule);
}

#[test]
fn schedule_serializes_to_json() {
    let goal = Goal::new("g", at(2026, 3, 2, 9));
    let schedule = Scheduler::default()
        .schedule(&goal, &[Task::new("a", "g").with_title("Write outline")], monday_morning())
        .unwrap();

    let json = serde_json::to_value(&schedule).unwrap();
    assert_eq!(json["goal_id"], "g");
    assert_eq!(json["tasks"][0]["time_slot_type"], "deadline_driven");
    assert!(json["tasks"][0]["due_date"].is_string());
}

#[test]
fn hierarchy_lists_children_under_parents() {
    let tasks = vec![
        Task::new("root", "g").with_title("Thesis").with_order(0),
        Task::new("ch2", "g").with_parent("root").with_order(2),
        Task::new("ch1", "g").with_parent("root").with_order(1),
        Task::new("ch1a", "g").with_parent("ch1"),
    ];
    let entries = task_hierarchy(&tasks, DEFAULT_MAX_DEPTH);
    let ids: Vec<(&str, usize)> = entries.iter().map(|e| (e.task_id.as_str(), e.level)).collect();
    assert_eq!(ids, vec![("root", 0), ("ch1", 1), ("ch1a", 2), ("ch2", 1)]);
}
