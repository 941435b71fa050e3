use crate::ics::CalendarEvent;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Teaching days are grouped into "weeks" of this many lessons by position,
/// independent of where calendar weeks begin.
pub const LESSONS_PER_WEEK: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyllabusEntry {
    pub date: NaiveDate,
    pub title: String,
    pub week_number: u32,
}

impl SyllabusEntry {
    /// Calendar event for this lesson; `lesson_start` is taken as UTC.
    pub fn to_event(
        &self,
        lesson_start: NaiveTime,
        duration_minutes: u32,
        location: Option<&str>,
    ) -> CalendarEvent {
        let start_time = self.date.and_time(lesson_start).and_utc();
        let mut event = CalendarEvent::new(self.title.clone(), start_time, duration_minutes);
        event.description = format!("Week {}", self.week_number);
        event.location = location.map(str::to_string);
        event
    }
}

fn week_number_for(index: usize) -> u32 {
    (index / LESSONS_PER_WEEK + 1) as u32
}

/// Pair each teaching day with a content title, reusing `contents` cyclically
/// when it is shorter than the day list. With no contents every day gets a
/// `Lesson N` placeholder.
pub fn distribute_syllabus<S: AsRef<str>>(
    contents: &[S],
    teaching_days: &[NaiveDate],
) -> Vec<SyllabusEntry> {
    teaching_days
        .iter()
        .enumerate()
        .map(|(index, date)| {
            let title = if contents.is_empty() {
                format!("Lesson {}", index + 1)
            } else {
                contents[index % contents.len()].as_ref().to_string()
            };
            SyllabusEntry {
                date: *date,
                title,
                week_number: week_number_for(index),
            }
        })
        .collect()
}

pub fn syllabus_to_events(
    entries: &[SyllabusEntry],
    lesson_start: NaiveTime,
    duration_minutes: u32,
    location: Option<&str>,
) -> Vec<CalendarEvent> {
    entries
        .iter()
        .map(|entry| entry.to_event(lesson_start, duration_minutes, location))
        .collect()
}
