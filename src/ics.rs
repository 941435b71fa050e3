use crate::clock::{Clock, SystemClock};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

pub const ICS_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

const PRODID: &str = "-//Classroom Planner//Lesson Calendar//EN";
const UID_DOMAIN: &str = "classroom-planner";
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";
// RFC 5545 section 3.1: content lines SHOULD NOT exceed 75 octets.
const MAX_LINE_OCTETS: usize = 75;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl CalendarEvent {
    pub fn new(title: impl Into<String>, start_time: DateTime<Utc>, duration_minutes: u32) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            start_time,
            duration_minutes,
            location: None,
        }
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + Duration::minutes(i64::from(self.duration_minutes))
    }
}

/// Produces the unique identifier written as each event's `UID`.
pub trait UidGenerator: Send + Sync {
    fn next_uid(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl UidGenerator for UuidGenerator {
    fn next_uid(&self) -> String {
        format!("{}@{}", uuid::Uuid::new_v4(), UID_DOMAIN)
    }
}

/// Deterministic `event-1@...`, `event-2@...` identifiers.
#[derive(Debug, Default)]
pub struct SequentialUids {
    counter: AtomicU64,
}

impl UidGenerator for SequentialUids {
    fn next_uid(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("event-{n}@{UID_DOMAIN}")
    }
}

pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}

/// Escape a TEXT property value: backslash, semicolon, comma and newlines.
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\\n");
            }
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out
}

/// Split a content line into CRLF-terminated physical lines of at most 75
/// octets, continuation lines starting with a single space. Splits never land
/// inside a multi-byte character.
fn push_folded(out: &mut String, line: &str) {
    let mut budget = MAX_LINE_OCTETS;
    let mut used = 0;
    for ch in line.chars() {
        let width = ch.len_utf8();
        if used + width > budget {
            out.push_str("\r\n ");
            // the leading space counts toward the next line's limit
            budget = MAX_LINE_OCTETS - 1;
            used = 0;
        }
        out.push(ch);
        used += width;
    }
    out.push_str("\r\n");
}

pub fn generate_ics(
    events: &[CalendarEvent],
    clock: &dyn Clock,
    uids: &dyn UidGenerator,
) -> String {
    let stamp = format_timestamp(clock.now());
    let mut out = String::new();

    push_folded(&mut out, "BEGIN:VCALENDAR");
    push_folded(&mut out, "VERSION:2.0");
    push_folded(&mut out, &format!("PRODID:{PRODID}"));
    push_folded(&mut out, "CALSCALE:GREGORIAN");
    push_folded(&mut out, "METHOD:PUBLISH");

    for event in events {
        push_folded(&mut out, "BEGIN:VEVENT");
        push_folded(&mut out, &format!("UID:{}", uids.next_uid()));
        push_folded(&mut out, &format!("DTSTAMP:{stamp}"));
        let start = format_timestamp(event.start_time);
        let end = format_timestamp(event.end_time());
        push_folded(&mut out, &format!("DTSTART:{start}"));
        push_folded(&mut out, &format!("DTEND:{end}"));
        push_folded(&mut out, &format!("SUMMARY:{}", escape_text(&event.title)));
        let description = escape_text(&event.description);
        push_folded(&mut out, &format!("DESCRIPTION:{description}"));
        let location = event.location.as_deref().unwrap_or_default();
        push_folded(&mut out, &format!("LOCATION:{}", escape_text(location)));
        push_folded(&mut out, "END:VEVENT");
    }

    push_folded(&mut out, "END:VCALENDAR");
    out
}

/// `generate_ics` against the wall clock and random v4 identifiers.
pub fn generate_ics_now(events: &[CalendarEvent]) -> String {
    generate_ics(events, &SystemClock, &UuidGenerator)
}

/// Download name for an exported calendar, e.g. `algebra-term-1.ics`.
pub fn ics_file_name(stem: &str) -> String {
    let slug: String = stem
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let slug = slug
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "calendar.ics".to_string()
    } else {
        format!("{slug}.ics")
    }
}
