use super::{PersistenceError, PersistenceResult};
use crate::calendar::CalendarConfig;
use crate::syllabus::SyllabusEntry;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

pub fn save_calendar_config_to_json<P: AsRef<Path>>(
    config: &CalendarConfig,
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, config)?;
    Ok(())
}

pub fn load_calendar_config_from_json<P: AsRef<Path>>(
    path: P,
) -> PersistenceResult<CalendarConfig> {
    let file = File::open(path)?;
    let config: CalendarConfig = serde_json::from_reader(file)?;
    config
        .validate()
        .map_err(|err| PersistenceError::InvalidData(err.to_string()))?;
    Ok(config)
}

#[derive(Default, Serialize, Deserialize)]
struct SyllabusCsvRecord {
    week: u32,
    date: String,
    title: String,
}

impl From<&SyllabusEntry> for SyllabusCsvRecord {
    fn from(entry: &SyllabusEntry) -> Self {
        Self {
            week: entry.week_number,
            date: entry.date.format("%Y-%m-%d").to_string(),
            title: entry.title.clone(),
        }
    }
}

impl SyllabusCsvRecord {
    fn into_entry(self) -> PersistenceResult<SyllabusEntry> {
        let date = parse_date(&self.date)?;
        if self.week == 0 {
            return Err(PersistenceError::InvalidData(format!(
                "syllabus row for {date} has week 0 (weeks start at 1)"
            )));
        }
        Ok(SyllabusEntry {
            date,
            title: self.title,
            week_number: self.week,
        })
    }
}

fn parse_date(value: &str) -> PersistenceResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|err| PersistenceError::InvalidData(format!("invalid date '{value}': {err}")))
}

pub fn save_syllabus_to_csv<P: AsRef<Path>>(
    entries: &[SyllabusEntry],
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for entry in entries {
        writer.serialize(SyllabusCsvRecord::from(entry))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_syllabus_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<SyllabusEntry>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut entries = Vec::new();
    for record in reader.deserialize::<SyllabusCsvRecord>() {
        entries.push(record?.into_entry()?);
    }

    if entries.windows(2).any(|pair| pair[0].date >= pair[1].date) {
        return Err(PersistenceError::InvalidData(
            "syllabus dates must be strictly increasing".into(),
        ));
    }
    Ok(entries)
}
