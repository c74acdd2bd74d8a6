//! Calendar assembly: class events to calendar entries.

mod ics;

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::{Europe::Paris, Tz};
use regex::Regex;
use std::sync::LazyLock;

use crate::ade::ClassEvent;

/// Product identifier written in every calendar.
pub const PRODUCT_ID: &str = "-//chronos//timetable export//EN";

/// Civil timezone the remote application's wall-clock times are in.
pub const TIMEZONE: Tz = Paris;

static NON_WORD_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W").unwrap());
static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s").unwrap());

/// One calendar entry, ready to serialize.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    /// Stable across runs for the same class occurrence
    pub uid: String,
    pub summary: String,
    pub description: String,
    pub location: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

/// An assembled calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct Calendar {
    pub product_id: String,
    /// Creation time written as the DTSTAMP of every entry
    pub stamp: DateTime<Utc>,
    pub events: Vec<CalendarEvent>,
}

impl Calendar {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Builds a calendar with one entry per event, in input order.
pub fn assemble(promotion: &str, events: &[ClassEvent]) -> Calendar {
    assemble_at(promotion, events, Utc::now())
}

/// Same as [`assemble`] with an explicit creation time.
pub fn assemble_at(promotion: &str, events: &[ClassEvent], stamp: DateTime<Utc>) -> Calendar {
    Calendar {
        product_id: PRODUCT_ID.to_string(),
        stamp,
        events: events.iter().map(|e| to_entry(promotion, e)).collect(),
    }
}

fn to_entry(promotion: &str, event: &ClassEvent) -> CalendarEvent {
    CalendarEvent {
        uid: event_uid(promotion, event),
        summary: summary(event),
        description: description(event),
        location: event.room.clone(),
        start: localize(&event.start),
        end: localize(&event.end),
    }
}

/// `<name>[ - <professor>] (<room>)`
pub fn summary(event: &ClassEvent) -> String {
    let mut summary = event.name.clone();
    if event.has_professor() {
        summary.push_str(" - ");
        summary.push_str(&event.professor);
    }
    summary.push_str(&format!(" ({})", event.room));
    summary
}

fn description(event: &ClassEvent) -> String {
    let groups: Vec<&str> = event.groups.iter().map(String::as_str).collect();
    format!(
        "Cours: {}\nProf: {}\nSalle: {}\nGroupes: {}",
        event.name,
        event.professor,
        event.room,
        groups.join("-")
    )
}

/// `chronos-<promotion>-<start>-<name_professor>`, whitespace as underscores.
pub fn event_uid(promotion: &str, event: &ClassEvent) -> String {
    let condensed = format!("{}-{}", event.name, event.professor);
    let condensed = NON_WORD_REGEX.replace_all(&condensed, "_");
    let uid = format!(
        "chronos-{}-{}-{}",
        promotion,
        event.start.format("%Y-%m-%d %H:%M:%S"),
        condensed
    );
    WHITESPACE_REGEX.replace_all(&uid, "_").into_owned()
}

/// Places a wall-clock time in the timetable's timezone.
///
/// Ambiguous times take the earlier instant; times skipped by the spring
/// change are moved forward by the gap.
pub fn localize(naive: &NaiveDateTime) -> DateTime<Tz> {
    match TIMEZONE.from_local_datetime(naive) {
        LocalResult::Single(t) => t,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => TIMEZONE
            .from_local_datetime(&(*naive + TimeDelta::hours(1)))
            .earliest()
            .unwrap_or_else(|| TIMEZONE.from_utc_datetime(naive)),
    }
}
