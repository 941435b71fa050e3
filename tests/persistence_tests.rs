use chrono::{NaiveDate, Weekday};
use classroom_planner::{
    CalendarConfig, PersistenceError, distribute_syllabus, generate_teaching_days,
    load_calendar_config_from_json, load_syllabus_from_csv, save_calendar_config_to_json,
    save_syllabus_to_csv,
};
use std::fs;
use tempfile::tempdir;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn term() -> CalendarConfig {
    CalendarConfig::new(
        d(2024, 9, 2),
        d(2024, 10, 31),
        [Weekday::Mon, Weekday::Tue, Weekday::Thu],
        [d(2024, 10, 3)],
    )
}

#[test]
fn calendar_config_json_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("calendar.json");
    save_calendar_config_to_json(&term(), &path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"weekly_schedule\""));
    assert_eq!(load_calendar_config_from_json(&path).unwrap(), term());
}

#[test]
fn inverted_calendar_json_is_rejected_on_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("calendar.json");
    fs::write(
        &path,
        r#"{"start_date":"2024-12-01","end_date":"2024-09-01","weekly_schedule":[1]}"#,
    )
    .unwrap();

    let err = load_calendar_config_from_json(&path).unwrap_err();
    assert!(matches!(err, PersistenceError::InvalidData(_)));
}

#[test]
fn missing_calendar_file_is_an_io_error() {
    let dir = tempdir().unwrap();
    let err = load_calendar_config_from_json(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, PersistenceError::Io(_)));
}

#[test]
fn syllabus_csv_round_trip() {
    let days = generate_teaching_days(&term());
    let entries = distribute_syllabus(&["Cells", "Genetics, part 1", "Ecology"], &days);
    let dir = tempdir().unwrap();
    let path = dir.path().join("syllabus.csv");

    save_syllabus_to_csv(&entries, &path).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("week,date,title\n"));
    assert!(text.contains("1,2024-09-03,\"Genetics, part 1\""));

    assert_eq!(load_syllabus_from_csv(&path).unwrap(), entries);
}

#[test]
fn syllabus_csv_rejects_week_zero_and_unordered_dates() {
    let dir = tempdir().unwrap();

    let week_zero = dir.path().join("zero.csv");
    fs::write(&week_zero, "week,date,title\n0,2024-09-02,Intro\n").unwrap();
    assert!(matches!(
        load_syllabus_from_csv(&week_zero).unwrap_err(),
        PersistenceError::InvalidData(_)
    ));

    let unordered = dir.path().join("unordered.csv");
    fs::write(
        &unordered,
        "week,date,title\n1,2024-09-03,B\n1,2024-09-02,A\n",
    )
    .unwrap();
    assert!(matches!(
        load_syllabus_from_csv(&unordered).unwrap_err(),
        PersistenceError::InvalidData(_)
    ));

    let bad_date = dir.path().join("bad_date.csv");
    fs::write(&bad_date, "week,date,title\n1,03/09/2024,A\n").unwrap();
    assert!(matches!(
        load_syllabus_from_csv(&bad_date).unwrap_err(),
        PersistenceError::InvalidData(_)
    ));
}
