use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Recurring weekly teaching pattern over an inclusive date range.
///
/// On the wire `weekly_schedule` is a list of day indices where 0 is Sunday
/// and 6 is Saturday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarConfig {
    start_date: NaiveDate,
    end_date: NaiveDate,
    #[serde(with = "weekday_indices")]
    weekly_schedule: Vec<Weekday>,
    #[serde(default)]
    holidays: Vec<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    StartAfterEnd { start: NaiveDate, end: NaiveDate },
    InvalidWeekdayIndex(u32),
}

impl fmt::Display for CalendarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalendarError::StartAfterEnd { start, end } => {
                write!(f, "start date {start} is after end date {end}")
            }
            CalendarError::InvalidWeekdayIndex(idx) => {
                write!(f, "weekday index {idx} out of range (expected 0-6, 0 = Sunday)")
            }
        }
    }
}

impl std::error::Error for CalendarError {}

/// Maps a Sunday-based day index (0 = Sunday) to a weekday.
pub fn weekday_from_index(index: u32) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

impl CalendarConfig {
    pub fn new<I, J>(
        start_date: NaiveDate,
        end_date: NaiveDate,
        weekly_schedule: I,
        holidays: J,
    ) -> Self
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = NaiveDate>,
    {
        let mut weekdays: Vec<Weekday> = weekly_schedule.into_iter().collect();
        weekdays.sort_by_key(|wd| wd.num_days_from_sunday());
        weekdays.dedup();

        let mut holidays: Vec<NaiveDate> = holidays.into_iter().collect();
        holidays.sort();
        holidays.dedup();

        Self {
            start_date,
            end_date,
            weekly_schedule: weekdays,
            holidays,
        }
    }

    pub fn from_day_indices<I, J>(
        start_date: NaiveDate,
        end_date: NaiveDate,
        day_indices: I,
        holidays: J,
    ) -> Result<Self, CalendarError>
    where
        I: IntoIterator<Item = u32>,
        J: IntoIterator<Item = NaiveDate>,
    {
        let weekdays = day_indices
            .into_iter()
            .map(|idx| weekday_from_index(idx).ok_or(CalendarError::InvalidWeekdayIndex(idx)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(start_date, end_date, weekdays, holidays))
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn weekly_schedule(&self) -> &[Weekday] {
        &self.weekly_schedule
    }

    pub fn holidays(&self) -> &[NaiveDate] {
        &self.holidays
    }

    pub fn set_range(&mut self, start_date: NaiveDate, end_date: NaiveDate) {
        self.start_date = start_date;
        self.end_date = end_date;
    }

    pub fn set_weekly_schedule(&mut self, days: Vec<Weekday>) {
        *self = Self::new(
            self.start_date,
            self.end_date,
            days,
            std::mem::take(&mut self.holidays),
        );
    }

    /// Add a single holiday
    pub fn add_holiday(&mut self, date: NaiveDate) {
        self.add_holidays(&[date]);
    }

    /// Add multiple holidays at once
    pub fn add_holidays(&mut self, dates: &[NaiveDate]) {
        self.holidays.extend_from_slice(dates);
        self.holidays.sort();
        self.holidays.dedup();
    }

    /// Block out every day of an inclusive break, e.g. a mid-term recess
    pub fn add_holiday_range(&mut self, first: NaiveDate, last: NaiveDate) {
        let dates: Vec<NaiveDate> = first.iter_days().take_while(|d| *d <= last).collect();
        self.add_holidays(&dates);
    }

    /// Add the same month/day as a holiday in every year the range touches
    pub fn add_recurring_holiday(&mut self, month: u32, day: u32) {
        let dates: Vec<NaiveDate> = (self.start_date.year()..=self.end_date.year())
            .filter_map(|year| NaiveDate::from_ymd_opt(year, month, day))
            .collect();
        self.add_holidays(&dates);
    }

    pub fn validate(&self) -> Result<(), CalendarError> {
        if self.start_date > self.end_date {
            return Err(CalendarError::StartAfterEnd {
                start: self.start_date,
                end: self.end_date,
            });
        }
        Ok(())
    }

    pub fn is_teaching_day(&self, date: NaiveDate) -> bool {
        date >= self.start_date
            && date <= self.end_date
            && self.weekly_schedule.contains(&date.weekday())
            && !self.holidays.contains(&date)
    }

    /// Find the first teaching day strictly after `from`, if the range has one
    pub fn next_teaching_day(&self, from: NaiveDate) -> Option<NaiveDate> {
        let mut current = from.succ_opt();
        while let Some(day) = current.filter(|d| *d <= self.end_date) {
            if self.is_teaching_day(day) {
                return Some(day);
            }
            current = day.succ_opt();
        }
        None
    }

    pub fn count_teaching_days(&self) -> usize {
        generate_teaching_days(self).len()
    }
}

/// Every date in `[start_date, end_date]` whose weekday is scheduled and which
/// is not a holiday, in ascending order.
pub fn generate_teaching_days(config: &CalendarConfig) -> Vec<NaiveDate> {
    let weekdays: HashSet<Weekday> = config.weekly_schedule.iter().copied().collect();
    if weekdays.is_empty() || config.start_date > config.end_date {
        return Vec::new();
    }
    let holidays: HashSet<NaiveDate> = config.holidays.iter().copied().collect();

    let mut days = Vec::new();
    let mut current = Some(config.start_date);
    while let Some(day) = current.filter(|d| *d <= config.end_date) {
        if weekdays.contains(&day.weekday()) && !holidays.contains(&day) {
            days.push(day);
        }
        current = day.succ_opt();
    }
    days
}

mod weekday_indices {
    use super::weekday_from_index;
    use chrono::Weekday;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(days: &[Weekday], serializer: S) -> Result<S::Ok, S::Error> {
        let indices: Vec<u32> = days.iter().map(|d| d.num_days_from_sunday()).collect();
        indices.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Weekday>, D::Error> {
        let indices = Vec::<u32>::deserialize(deserializer)?;
        let mut days = indices
            .into_iter()
            .map(|idx| {
                weekday_from_index(idx).ok_or_else(|| {
                    D::Error::custom(format!("weekday index {idx} out of range (0-6)"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        days.sort_by_key(|wd| wd.num_days_from_sunday());
        days.dedup();
        Ok(days)
    }
}
