use chrono::{DateTime, Duration, Utc};
use tempo_core::{Schedule, Task};

pub struct CalendarEvent {
    pub uid: String,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub summary: String,
    pub description: String,
}

/// Turn a schedule into calendar events.
///
/// Uses the packed slot when there is one, otherwise the estimate ending at the
/// due date. Completed and cancelled tasks are left out.
pub fn schedule_to_events(schedule: &Schedule, prefix: &str) -> Vec<CalendarEvent> {
    schedule
        .tasks
        .iter()
        .filter(|t| !t.status.is_terminal())
        .filter_map(|t| {
            let (start, end) = t
                .slot()
                .or_else(|| t.due_date.map(|due| (due - Duration::minutes(t.estimated_minutes), due)))?;
            Some(CalendarEvent {
                uid: format!("tempo-{}-{}@tempo", schedule.goal_id, t.id),
                start_utc: start,
                end_utc: end,
                summary: format!("{}{}", prefix, display_title(t)),
                description: describe(t),
            })
        })
        .collect()
}

fn display_title(t: &Task) -> &str {
    if t.title.trim().is_empty() { &t.id } else { &t.title }
}

fn describe(t: &Task) -> String {
    let mut s = format!("TaskId: {}\nPriority: {:?}\n", t.id, t.priority);
    if let Some(due) = t.due_date {
        s.push_str(&format!("Due: {}\n", due.to_rfc3339()));
    }
    if let Some(score) = t.scheduling_priority {
        s.push_str(&format!("Score: {score}\n"));
    }
    if !t.depends_on.is_empty() {
        let deps: Vec<&str> = t.depends_on.iter().map(String::as_str).collect();
        s.push_str(&format!("After: {}\n", deps.join(", ")));
    }
    s
}

/// Emit a minimal ICS calendar containing VEVENT blocks.
///
/// DTSTART/DTEND are UTC. UIDs are stable per goal and task, so re-importing
/// an updated schedule replaces the old events.
pub fn events_to_ics(events: &[CalendarEvent], stamp: DateTime<Utc>) -> String {
    let mut s = String::new();
    s.push_str("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Tempo//EN\r\n");

    let dtstamp = stamp.format("%Y%m%dT%H%M%SZ");
    for e in events {
        let dtstart = e.start_utc.format("%Y%m%dT%H%M%SZ");
        let dtend = e.end_utc.format("%Y%m%dT%H%M%SZ");

        s.push_str("BEGIN:VEVENT\r\n");
        s.push_str(&format!("UID:{}\r\n", e.uid));
        s.push_str(&format!("DTSTAMP:{}\r\n", dtstamp));
        s.push_str(&format!("DTSTART:{}\r\n", dtstart));
        s.push_str(&format!("DTEND:{}\r\n", dtend));
        s.push_str(&format!("SUMMARY:{}\r\n", escape_ics(&e.summary)));
        s.push_str(&format!("DESCRIPTION:{}\r\n", escape_ics(&e.description)));
        s.push_str("END:VEVENT\r\n");
    }

    s.push_str("END:VCALENDAR\r\n");
    s
}

fn escape_ics(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace(',', "\\,")
        .replace(';', "\\;")
}
