//! iCalendar (RFC 5545) serialization.

use chrono::DateTime;
use chrono_tz::Tz;

use super::{Calendar, CalendarEvent, TIMEZONE};

/// Content lines longer than this many octets are folded.
const FOLD_OCTETS: usize = 75;

const PARIS_VTIMEZONE: &[&str] = &[
    "BEGIN:VTIMEZONE",
    "TZID:Europe/Paris",
    "BEGIN:DAYLIGHT",
    "TZOFFSETFROM:+0100",
    "TZOFFSETTO:+0200",
    "TZNAME:CEST",
    "DTSTART:19700329T020000",
    "RRULE:FREQ=YEARLY;BYMONTH=3;BYDAY=-1SU",
    "END:DAYLIGHT",
    "BEGIN:STANDARD",
    "TZOFFSETFROM:+0200",
    "TZOFFSETTO:+0100",
    "TZNAME:CET",
    "DTSTART:19701025T030000",
    "RRULE:FREQ=YEARLY;BYMONTH=10;BYDAY=-1SU",
    "END:STANDARD",
    "END:VTIMEZONE",
];

impl Calendar {
    /// Serializes the calendar with CRLF line endings.
    pub fn to_ics(&self) -> String {
        let mut lines: Vec<String> = vec![
            "BEGIN:VCALENDAR".to_string(),
            "VERSION:2.0".to_string(),
            format!("PRODID:{}", escape_text(&self.product_id)),
            "CALSCALE:GREGORIAN".to_string(),
        ];
        lines.extend(PARIS_VTIMEZONE.iter().map(|l| l.to_string()));

        let stamp = self.stamp.format("%Y%m%dT%H%M%SZ").to_string();
        for event in &self.events {
            write_event(&mut lines, event, &stamp);
        }
        lines.push("END:VCALENDAR".to_string());

        let mut out = String::new();
        for line in &lines {
            out.push_str(&fold_line(line));
            out.push_str("\r\n");
        }
        out
    }
}

fn write_event(lines: &mut Vec<String>, event: &CalendarEvent, stamp: &str) {
    lines.push("BEGIN:VEVENT".to_string());
    lines.push(format!("UID:{}", escape_text(&event.uid)));
    lines.push(format!("DTSTAMP:{stamp}"));
    lines.push(format!("SUMMARY:{}", escape_text(&event.summary)));
    lines.push(format!("DESCRIPTION:{}", escape_text(&event.description)));
    lines.push(format!(
        "DTSTART;TZID={}:{}",
        TIMEZONE.name(),
        local_time(&event.start)
    ));
    lines.push(format!(
        "DTEND;TZID={}:{}",
        TIMEZONE.name(),
        local_time(&event.end)
    ));
    lines.push(format!("LOCATION:{}", escape_text(&event.location)));
    lines.push("END:VEVENT".to_string());
}

fn local_time(instant: &DateTime<Tz>) -> String {
    instant.format("%Y%m%dT%H%M%S").to_string()
}

/// Escapes a TEXT value: backslash, semicolon, comma and newlines.
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Folds a content line into chunks of at most 75 octets, never splitting a
/// UTF-8 sequence. Continuation lines start with a single space.
pub fn fold_line(line: &str) -> String {
    if line.len() <= FOLD_OCTETS {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len() + line.len() / FOLD_OCTETS * 3);
    let mut budget = FOLD_OCTETS;
    let mut used = 0;
    for c in line.chars() {
        let width = c.len_utf8();
        if used + width > budget {
            out.push_str("\r\n ");
            // The leading space counts against the continuation line.
            budget = FOLD_OCTETS - 1;
            used = 0;
        }
        out.push(c);
        used += width;
    }
    out
}
