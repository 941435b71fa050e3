use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use classroom_planner::{
    CalendarConfig, distribute_syllabus, generate_teaching_days, syllabus::LESSONS_PER_WEEK,
    syllabus_to_events,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn weekdays_from(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    start.iter_days().take(count).collect()
}

#[test]
fn contents_are_paired_in_order_and_reused_cyclically() {
    let days = weekdays_from(d(2024, 1, 1), 5);
    let entries = distribute_syllabus(&["Fractions", "Decimals"], &days);
    let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Fractions", "Decimals", "Fractions", "Decimals", "Fractions"]
    );
    assert!(entries.iter().zip(&days).all(|(entry, day)| entry.date == *day));
}

#[test]
fn empty_contents_fall_back_to_numbered_lessons() {
    let days = weekdays_from(d(2024, 1, 1), 7);
    let entries = distribute_syllabus::<&str>(&[], &days);
    let titles: Vec<String> = entries.into_iter().map(|e| e.title).collect();
    let expected: Vec<String> = (1..=7).map(|n| format!("Lesson {n}")).collect();
    assert_eq!(titles, expected);
}

#[test]
fn no_days_means_no_entries() {
    assert!(distribute_syllabus(&["Algebra"], &[]).is_empty());
    assert!(distribute_syllabus::<String>(&[], &[]).is_empty());
}

// Week numbers group by position in the list, not by calendar week: two
// teaching days a week still put the first five lessons in "week 1".
#[test]
fn week_number_groups_by_position_not_calendar_week() {
    let config = CalendarConfig::from_day_indices(
        d(2024, 1, 1),
        d(2024, 2, 29),
        [1, 3],
        Vec::<NaiveDate>::new(),
    )
    .unwrap();
    let days = generate_teaching_days(&config);
    let entries = distribute_syllabus::<&str>(&[], &days);

    assert_eq!(LESSONS_PER_WEEK, 5);
    for (index, entry) in entries.iter().enumerate() {
        assert_eq!(entry.week_number as usize, index / 5 + 1);
    }
    // Jan 1 and Jan 15 fall in different calendar weeks but share week 1
    assert_eq!(entries[0].date, d(2024, 1, 1));
    assert_eq!(entries[4].date, d(2024, 1, 15));
    assert_eq!(entries[4].week_number, 1);
    assert_eq!(entries[5].week_number, 2);
}

#[test]
fn scenario_mon_wed_with_holiday_is_all_week_one() {
    let config = CalendarConfig::from_day_indices(
        d(2024, 1, 1),
        d(2024, 1, 14),
        [1, 3],
        [d(2024, 1, 8)],
    )
    .unwrap();
    let entries = distribute_syllabus(&["Intro"], &generate_teaching_days(&config));
    let summary: Vec<(NaiveDate, u32)> = entries.iter().map(|e| (e.date, e.week_number)).collect();
    assert_eq!(
        summary,
        vec![(d(2024, 1, 1), 1), (d(2024, 1, 3), 1), (d(2024, 1, 10), 1)]
    );
}

#[test]
fn entries_become_utc_events_at_lesson_time() {
    let days = vec![d(2024, 3, 4)];
    let entries = distribute_syllabus(&["Geometry"], &days);
    let start = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
    let events = syllabus_to_events(&entries, start, 50, Some("Room 12"));

    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.title, "Geometry");
    assert_eq!(event.description, "Week 1");
    assert_eq!(event.start_time, Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, 0).unwrap());
    assert_eq!(event.end_time(), Utc.with_ymd_and_hms(2024, 3, 4, 10, 20, 0).unwrap());
    assert_eq!(event.location.as_deref(), Some("Room 12"));
}
