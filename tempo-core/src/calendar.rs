//! Working-time calendar: counts eligible working time under an availability
//! pattern.
//!
//! Day counting is a plain day-by-day loop. Window times are read in the same
//! frame as the timestamps handed in (UTC); there is no timezone arithmetic
//! here.
//!
//! Boundary days:
//! - `Coarse` (default): every date in `[start.date, end.date)` with a non-empty
//!   window counts as one day, however little of it the range covers.
//! - `Strict`: a date counts only if its whole window lies inside `[start, end)`.

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};

/// Upper bound for forward scans, so a pattern without working days terminates.
const MAX_SCAN_DAYS: i64 = 2 * 366;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    #[default]
    Coarse,
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyWindow {
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExceptionKind {
    Unavailable,
    CustomHours { start: NaiveTime, end: NaiveTime },
}

/// Overrides the weekly pattern for one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateException {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub kind: ExceptionKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityPattern {
    #[serde(default)]
    pub weekly: Vec<WeeklyWindow>,
    #[serde(default)]
    pub exceptions: Vec<DateException>,
}

impl Default for AvailabilityPattern {
    /// Monday to Friday, 09:00-17:00.
    fn default() -> Self {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN);
        let five = NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN);
        let weekly = [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri]
            .into_iter()
            .map(|weekday| WeeklyWindow {
                weekday,
                start: nine,
                end: five,
            })
            .collect();
        Self {
            weekly,
            exceptions: Vec::new(),
        }
    }
}

impl AvailabilityPattern {
    /// A pattern with no working time at all.
    pub fn empty() -> Self {
        Self {
            weekly: Vec::new(),
            exceptions: Vec::new(),
        }
    }

    /// Set (or replace) the window for a weekday.
    pub fn with_window(mut self, weekday: Weekday, start: NaiveTime, end: NaiveTime) -> Self {
        self.weekly.retain(|w| w.weekday != weekday);
        self.weekly.push(WeeklyWindow { weekday, start, end });
        self
    }

    pub fn with_exception(mut self, date: NaiveDate, kind: ExceptionKind) -> Self {
        self.exceptions.push(DateException { date, kind });
        self
    }

    /// Parse compact rules such as `"mon-fri 09:00-17:00"` or `"sat,sun 10:00-12:00"`.
    ///
    /// Later rules replace earlier ones for the same weekday.
    pub fn from_rules<S: AsRef<str>>(rules: &[S]) -> anyhow::Result<Self> {
        let re = Regex::new(
            r"^(?P<days>[a-z]+(?:-[a-z]+)?(?:,[a-z]+(?:-[a-z]+)?)*)\s+(?P<start>\d{1,2}:\d{2})-(?P<end>\d{1,2}:\d{2})$",
        )?;

        let mut pattern = Self::empty();
        for raw in rules {
            let rule = raw.as_ref().trim().to_lowercase();
            let caps = re
                .captures(&rule)
                .ok_or_else(|| anyhow!("invalid availability rule '{rule}' (expected e.g. 'mon-fri 09:00-17:00')"))?;

            let start = NaiveTime::parse_from_str(&caps["start"], "%H:%M")
                .with_context(|| format!("invalid start time in '{rule}'"))?;
            let end = NaiveTime::parse_from_str(&caps["end"], "%H:%M")
                .with_context(|| format!("invalid end time in '{rule}'"))?;

            for weekday in parse_weekdays(&caps["days"])? {
                pattern = pattern.with_window(weekday, start, end);
            }
        }

        pattern.validate()?;
        Ok(pattern)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = Vec::new();
        for w in &self.weekly {
            if seen.contains(&w.weekday) {
                return Err(ScheduleError::InvalidAvailability(format!(
                    "weekday {} listed twice",
                    w.weekday
                )));
            }
            seen.push(w.weekday);
            if w.end <= w.start {
                return Err(ScheduleError::InvalidAvailability(format!(
                    "{} window ends before it starts ({}-{})",
                    w.weekday, w.start, w.end
                )));
            }
        }
        for ex in &self.exceptions {
            if let ExceptionKind::CustomHours { start, end } = ex.kind {
                if end < start {
                    return Err(ScheduleError::InvalidAvailability(format!(
                        "exception on {} ends before it starts ({start}-{end})",
                        ex.date
                    )));
                }
            }
        }
        Ok(())
    }

    /// The window for a date, if that date has any working time.
    pub fn window_on(&self, date: NaiveDate) -> Option<(NaiveTime, NaiveTime)> {
        if let Some(ex) = self.exceptions.iter().rev().find(|e| e.date == date) {
            return match ex.kind {
                ExceptionKind::Unavailable => None,
                ExceptionKind::CustomHours { start, end } if end > start => Some((start, end)),
                ExceptionKind::CustomHours { .. } => None,
            };
        }

        self.weekly
            .iter()
            .find(|w| w.weekday == date.weekday())
            .filter(|w| w.end > w.start)
            .map(|w| (w.start, w.end))
    }

    /// The window for a date as absolute instants.
    pub fn window_bounds(&self, date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.window_on(date)
            .map(|(start, end)| (date.and_time(start).and_utc(), date.and_time(end).and_utc()))
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.window_on(date).is_some()
    }

    /// Average window length over the working weekdays.
    pub fn typical_day_minutes(&self) -> Option<i64> {
        let lengths: Vec<i64> = self
            .weekly
            .iter()
            .filter(|w| w.end > w.start)
            .map(|w| (w.end - w.start).num_minutes())
            .collect();
        if lengths.is_empty() {
            return None;
        }
        Some(lengths.iter().sum::<i64>() / lengths.len() as i64)
    }

    /// First working day strictly after `date`, within the scan horizon.
    pub fn next_working_day(&self, date: NaiveDate) -> Option<NaiveDate> {
        date.iter_days()
            .skip(1)
            .take(MAX_SCAN_DAYS as usize)
            .find(|d| self.is_working_day(*d))
    }

    /// Last working day strictly before `date` and not before `floor`.
    pub fn previous_working_day(&self, date: NaiveDate, floor: NaiveDate) -> Option<NaiveDate> {
        let mut d = date.pred_opt()?;
        while d >= floor {
            if self.is_working_day(d) {
                return Some(d);
            }
            d = d.pred_opt()?;
        }
        None
    }
}

fn parse_weekdays(days: &str) -> anyhow::Result<Vec<Weekday>> {
    let mut out = Vec::new();
    for part in days.split(',') {
        match part.split_once('-') {
            Some((from, to)) => {
                let from: Weekday = from.parse().map_err(|_| anyhow!("unknown weekday '{from}'"))?;
                let to: Weekday = to.parse().map_err(|_| anyhow!("unknown weekday '{to}'"))?;
                let mut day = from;
                loop {
                    out.push(day);
                    if day == to {
                        break;
                    }
                    day = day.succ();
                }
            }
            None => {
                let day: Weekday = part.parse().map_err(|_| anyhow!("unknown weekday '{part}'"))?;
                out.push(day);
            }
        }
    }
    if out.is_empty() {
        bail!("no weekdays in '{days}'");
    }
    Ok(out)
}

/// Count working days between two instants under `policy`.
///
/// Returns 0 when `start >= end` or when the pattern has no eligible day in
/// range; callers must treat 0 as "no working time" rather than a default.
pub fn working_units(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    pattern: &AvailabilityPattern,
    policy: BoundaryPolicy,
) -> i64 {
    if start >= end {
        return 0;
    }

    let first = start.date_naive();
    let last = end.date_naive();

    match policy {
        BoundaryPolicy::Coarse => first
            .iter_days()
            .take_while(|d| *d < last)
            .filter(|d| pattern.is_working_day(*d))
            .count() as i64,
        BoundaryPolicy::Strict => first
            .iter_days()
            .take_while(|d| *d <= last)
            .filter(|d| {
                pattern
                    .window_bounds(*d)
                    .is_some_and(|(ws, we)| ws >= start && we <= end)
            })
            .count() as i64,
    }
}

/// Working minutes inside `[start, end)`: the minute-granularity refinement of
/// [`working_units`].
pub fn working_minutes(start: DateTime<Utc>, end: DateTime<Utc>, pattern: &AvailabilityPattern) -> i64 {
    if start >= end {
        return 0;
    }

    let last = end.date_naive();
    start
        .date_naive()
        .iter_days()
        .take_while(|d| *d <= last)
        .filter_map(|d| pattern.window_bounds(d))
        .map(|(ws, we)| {
            let lo = ws.max(start);
            let hi = we.min(end);
            if hi > lo { (hi - lo).num_minutes() } else { 0 }
        })
        .sum()
}

/// Move back `n` working days from `from`, keeping the time of day.
///
/// Stops once the cursor falls before `floor`, which callers use as "no
/// earlier than now" so the walk always terminates.
pub fn step_back_working_days(
    from: DateTime<Utc>,
    n: i64,
    pattern: &AvailabilityPattern,
    floor: NaiveDate,
) -> DateTime<Utc> {
    let mut cursor = from;
    let mut remaining = n;
    while remaining > 0 {
        cursor -= Duration::days(1);
        if cursor.date_naive() < floor {
            break;
        }
        if pattern.is_working_day(cursor.date_naive()) {
            remaining -= 1;
        }
    }
    cursor
}

/// Move forward `n` working days from `from`, keeping the time of day.
///
/// `None` when the pattern does not provide `n` working days within the scan
/// horizon.
pub fn step_forward_working_days(
    from: DateTime<Utc>,
    n: i64,
    pattern: &AvailabilityPattern,
) -> Option<DateTime<Utc>> {
    let mut cursor = from;
    let mut remaining = n;
    let mut scanned = 0;
    while remaining > 0 {
        if scanned >= MAX_SCAN_DAYS {
            return None;
        }
        cursor += Duration::days(1);
        scanned += 1;
        if pattern.is_working_day(cursor.date_naive()) {
            remaining -= 1;
        }
    }
    Some(cursor)
}
