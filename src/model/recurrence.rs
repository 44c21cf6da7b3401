use crate::model::error::task::TaskError;
use chrono::{
    DateTime, Datelike, Days, FixedOffset, Local, NaiveTime, Offset, TimeZone, Timelike, Utc,
    Weekday,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// Two weeks covers a weekday whose wall-clock time falls into a DST gap once.
const SEARCH_HORIZON_DAYS: u64 = 14;

/// Zone in which wall-clock trigger times are interpreted.
///
/// `Local` follows the engine process, not the end user. Operators who run the
/// engine in a different zone than their users should pin a fixed offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ScheduleZone {
    Local,
    Fixed(FixedOffset),
}

impl FromStr for ScheduleZone {
    type Err = TaskError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "local" | "Local" => Ok(ScheduleZone::Local),
            "utc" | "UTC" | "Z" => Ok(ScheduleZone::Fixed(Utc.fix())),
            other => parse_offset(other).map(ScheduleZone::Fixed).ok_or_else(|| {
                TaskError::InvalidRecurrence(format!("time zone {other:?} is not local or +HH:MM"))
            }),
        }
    }
}

fn parse_offset(value: &str) -> Option<FixedOffset> {
    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours = hours.parse::<i32>().ok()?;
    let minutes = minutes.parse::<i32>().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

impl ScheduleZone {
    /// RFC 3339 rendering of `at` as seen in this zone.
    pub fn render(&self, at: DateTime<Utc>) -> String {
        match self {
            ScheduleZone::Local => at.with_timezone(&Local).to_rfc3339(),
            ScheduleZone::Fixed(offset) => at.with_timezone(offset).to_rfc3339(),
        }
    }
}

impl TryFrom<String> for ScheduleZone {
    type Error = TaskError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ScheduleZone> for String {
    fn from(zone: ScheduleZone) -> Self {
        zone.to_string()
    }
}

impl fmt::Display for ScheduleZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleZone::Local => write!(f, "local"),
            ScheduleZone::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

/// Weekly trigger: a wall-clock time on a set of weekdays (0 = Sunday).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    weekdays: BTreeSet<u8>,
    time: NaiveTime,
}

impl RecurrenceRule {
    pub fn new(days_of_week: &[u8], time_of_day: &str) -> Result<Self, TaskError> {
        let mut weekdays = BTreeSet::new();
        for day in days_of_week {
            if *day > 6 {
                return Err(TaskError::InvalidRecurrence(format!(
                    "weekday {day} is outside 0..=6"
                )));
            }
            weekdays.insert(*day);
        }
        let time = NaiveTime::parse_from_str(time_of_day.trim(), "%H:%M").map_err(|err| {
            TaskError::InvalidRecurrence(format!("time of day {time_of_day:?}: {err}"))
        })?;
        Ok(Self { weekdays, time })
    }

    pub fn fires_on(&self, weekday: Weekday) -> bool {
        self.weekdays
            .contains(&(weekday.num_days_from_sunday() as u8))
    }

    /// First trigger instant strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>, zone: &ScheduleZone) -> Option<DateTime<Utc>> {
        match zone {
            ScheduleZone::Local => self.next_in(after, &Local),
            ScheduleZone::Fixed(offset) => self.next_in(after, offset),
        }
    }

    pub fn upcoming(
        &self,
        after: DateTime<Utc>,
        zone: &ScheduleZone,
        count: usize,
    ) -> Vec<DateTime<Utc>> {
        let mut instants = Vec::with_capacity(count);
        let mut cursor = after;
        while instants.len() < count {
            match self.next_after(cursor, zone) {
                Some(next) => {
                    instants.push(next);
                    cursor = next;
                }
                None => break,
            }
        }
        instants
    }

    fn next_in<Tz: TimeZone>(&self, after: DateTime<Utc>, zone: &Tz) -> Option<DateTime<Utc>> {
        if self.weekdays.is_empty() {
            return None;
        }
        let start = after.with_timezone(zone).date_naive();
        (0..=SEARCH_HORIZON_DAYS)
            .filter_map(|offset| start.checked_add_days(Days::new(offset)))
            .filter(|date| self.fires_on(date.weekday()))
            .filter_map(|date| zone.from_local_datetime(&date.and_time(self.time)).earliest())
            .map(|candidate| candidate.with_timezone(&Utc))
            .find(|candidate| *candidate > after)
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days = self
            .weekdays
            .iter()
            .map(|day| day.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let days = if days.is_empty() { "-".to_string() } else { days };
        write!(
            f,
            "{} {} * * {}",
            self.time.minute(),
            self.time.hour(),
            days
        )
    }
}
