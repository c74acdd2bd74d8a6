//! Row parsing: raw schedule cells to class events.
use chrono::{NaiveDateTime, TimeDelta};
use regex::Regex;
use std::sync::LazyLock;

use super::config::LookupTables;
use super::error::{ChronosError, Result};
use super::types::{ClassEvent, RawRow};

/// Format of the date and time cells joined by a space, e.g. `01/09/2024 08h00`.
const START_FORMAT: &str = "%d/%m/%Y %Hh%M";

static HOURS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)h(?:(\d+)min)?$").unwrap());
static MINUTES_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)min$").unwrap());

/// Turns raw rows into class events, resolving codes through lookup tables.
#[derive(Debug, Clone, Default)]
pub struct RowParser {
    lookups: LookupTables,
}

impl RowParser {
    pub fn new(lookups: LookupTables) -> Self {
        Self { lookups }
    }

    /// Parses one row.
    ///
    /// # Returns
    /// * `Ok(ClassEvent)` - The event, `end` strictly after `start`
    /// * `Err` - If the start or the duration can't be parsed
    pub fn parse(&self, row: &RawRow) -> Result<ClassEvent> {
        let start = parse_start(&row.start_date, &row.start_time)?;
        let duration = parse_duration(&row.duration)?;
        let end = start
            .checked_add_signed(duration)
            .ok_or_else(|| ChronosError::UnhandledDuration {
                raw: row.duration.clone(),
            })?;

        Ok(ClassEvent {
            start,
            end,
            groups: row.groups.split_whitespace().map(str::to_string).collect(),
            professor: row.professor.clone(),
            name: self.lookups.class(&row.class_code).to_string(),
            room: self.lookups.room(&row.room).to_string(),
        })
    }

    /// Parses every row, failing on the first bad one.
    ///
    /// A malformed row means the page no longer looks the way we expect, so
    /// it is never skipped.
    pub fn parse_all(&self, rows: &[RawRow]) -> Result<Vec<ClassEvent>> {
        rows.iter().map(|row| self.parse(row)).collect()
    }
}

/// Parses the start instant from the date and time cells.
pub fn parse_start(date: &str, time: &str) -> Result<NaiveDateTime> {
    let joined = format!("{} {}", date.trim(), time.trim());
    NaiveDateTime::parse_from_str(&joined, START_FORMAT).map_err(|e| ChronosError::Parse {
        message: format!("invalid start {joined:?}: {e}"),
    })
}

/// Parses a duration written `<h>h`, `<h>h<m>min` or `<m>min`.
pub fn parse_duration(raw: &str) -> Result<TimeDelta> {
    let unhandled = || ChronosError::UnhandledDuration {
        raw: raw.to_string(),
    };
    let text = raw.trim();

    let delta = if let Some(caps) = HOURS_REGEX.captures(text) {
        let hours = TimeDelta::try_hours(count(caps.get(1), raw)?).ok_or_else(unhandled)?;
        let minutes = TimeDelta::try_minutes(count(caps.get(2), raw)?).ok_or_else(unhandled)?;
        hours.checked_add(&minutes).ok_or_else(unhandled)?
    } else if let Some(caps) = MINUTES_REGEX.captures(text) {
        TimeDelta::try_minutes(count(caps.get(1), raw)?).ok_or_else(unhandled)?
    } else {
        return Err(unhandled());
    };

    if delta <= TimeDelta::zero() {
        return Err(unhandled());
    }
    Ok(delta)
}

fn count(m: Option<regex::Match<'_>>, raw: &str) -> Result<i64> {
    m.map_or(Ok(0), |m| {
        m.as_str()
            .parse::<i64>()
            .map_err(|_| ChronosError::UnhandledDuration {
                raw: raw.to_string(),
            })
    })
}
