use chrono::{NaiveDate, NaiveTime};
use classroom_planner::{
    AppConfig, CalendarConfig, DraftBackends, DraftSyncStore, FileDraftCache, RemoteDraftStore,
    RestDraftStore, SyllabusEntry, distribute_syllabus, generate_ics_now, generate_teaching_days,
    load_calendar_config_from_json, logging, save_calendar_config_to_json, save_syllabus_to_csv,
    syllabus_to_events,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const DEFAULT_TOOL_ID: &str = "lesson-planner";

/// Everything the planner remembers between runs; persisted as the draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PlannerSession {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    weekly_schedule: Vec<u32>,
    holidays: Vec<NaiveDate>,
    contents: Vec<String>,
    lesson_start: NaiveTime,
    duration_minutes: u32,
    location: Option<String>,
}

impl Default for PlannerSession {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            weekly_schedule: vec![1, 2, 3, 4, 5],
            holidays: Vec::new(),
            contents: Vec::new(),
            lesson_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            duration_minutes: 45,
            location: None,
        }
    }
}

impl PlannerSession {
    fn calendar(&self) -> Result<CalendarConfig, String> {
        let (Some(start), Some(end)) = (self.start_date, self.end_date) else {
            return Err("Set a date range first with 'range <start> <end>'.".to_string());
        };
        let config = CalendarConfig::from_day_indices(
            start,
            end,
            self.weekly_schedule.iter().copied(),
            self.holidays.iter().copied(),
        )
        .map_err(|err| err.to_string())?;
        config.validate().map_err(|err| err.to_string())?;
        Ok(config)
    }

    fn syllabus(&self) -> Result<Vec<SyllabusEntry>, String> {
        let days = generate_teaching_days(&self.calendar()?);
        Ok(distribute_syllabus(&self.contents, &days))
    }

    fn apply_calendar(&mut self, config: &CalendarConfig) {
        self.start_date = Some(config.start_date());
        self.end_date = Some(config.end_date());
        self.weekly_schedule = config
            .weekly_schedule()
            .iter()
            .map(|wd| wd.num_days_from_sunday())
            .collect();
        self.holidays = config.holidays().to_vec();
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{s}' (YYYY-MM-DD)."))
}

fn parse_day_list(s: &str) -> Result<Vec<u32>, String> {
    s.split(',')
        .filter(|p| !p.trim().is_empty())
        .map(|p| {
            p.trim()
                .parse::<u32>()
                .ok()
                .filter(|idx| *idx <= 6)
                .ok_or_else(|| {
                    format!("Invalid weekday index '{}' (0 = Sunday .. 6 = Saturday).", p.trim())
                })
        })
        .collect()
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  show                               Show the current planner session\n  range <start> <end>                Set the term dates (YYYY-MM-DD)\n  days <csv>                         Set teaching weekdays (0 = Sunday, e.g. 1,3)\n  holiday <date>                     Exclude a single date\n  break <first> <last>               Exclude every date in an inclusive range\n  holidays clear                     Remove all holidays\n  lesson add <title...>              Append a syllabus topic\n  lesson clear                       Remove all topics\n  time <HH:MM> <minutes>             Set lesson start time (UTC) and length\n  location <text...>                 Set lesson location\n  teaching-days                      List teaching days\n  syllabus                           Show the syllabus\n  export ics <path>                  Write the syllabus as an .ics calendar\n  export csv <path>                  Write the syllabus as CSV\n  calendar save <path>               Save the calendar settings to JSON\n  calendar load <path>               Load calendar settings from JSON\n  save                               Save the draft now\n  quit|exit                          Save and exit"
    );
}

fn print_session(session: &PlannerSession) {
    let fmt_date = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".into());
    let days = session
        .weekly_schedule
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let holidays = session
        .holidays
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    println!("Term start         : {}", fmt_date(session.start_date));
    println!("Term end           : {}", fmt_date(session.end_date));
    println!("Teaching weekdays  : {}", days);
    println!("Holidays           : {}", holidays);
    println!(
        "Lesson time        : {} UTC, {} min",
        session.lesson_start.format("%H:%M"),
        session.duration_minutes
    );
    println!("Location           : {}", session.location.as_deref().unwrap_or("-"));
    println!("Topics             : {}", session.contents.len());
    for (idx, title) in session.contents.iter().enumerate() {
        println!("  {:>3}. {}", idx + 1, title);
    }
}

fn print_syllabus(entries: &[SyllabusEntry]) {
    if entries.is_empty() {
        println!("No teaching days in range.");
        return;
    }
    println!("{:<6} {:<12} {}", "Week", "Date", "Title");
    for entry in entries {
        println!("{:<6} {:<12} {}", entry.week_number, entry.date, entry.title);
    }
}

/// Handle one command line. Returns whether the session changed.
fn execute(session: &mut PlannerSession, cmd: &str, args: &[&str]) -> Result<bool, String> {
    match (cmd, args) {
        ("help", _) => print_help(),
        ("show", _) => print_session(session),
        ("range", [start, end]) => {
            let (start, end) = (parse_date(start)?, parse_date(end)?);
            if start > end {
                return Err("Term start must be on or before term end.".to_string());
            }
            session.start_date = Some(start);
            session.end_date = Some(end);
            println!("Term set to {start} .. {end}.");
            return Ok(true);
        }
        ("days", [list]) => {
            session.weekly_schedule = parse_day_list(list)?;
            session.weekly_schedule.sort_unstable();
            session.weekly_schedule.dedup();
            println!("Teaching weekdays updated.");
            return Ok(true);
        }
        ("holiday", [date]) => {
            let date = parse_date(date)?;
            if !session.holidays.contains(&date) {
                session.holidays.push(date);
                session.holidays.sort();
            }
            println!("Holiday added: {date}.");
            return Ok(true);
        }
        ("break", [first, last]) => {
            let (first, last) = (parse_date(first)?, parse_date(last)?);
            if first > last {
                return Err("Break start must be on or before break end.".to_string());
            }
            session
                .holidays
                .extend(first.iter_days().take_while(|day| *day <= last));
            session.holidays.sort();
            session.holidays.dedup();
            println!("Break added: {first} .. {last}.");
            return Ok(true);
        }
        ("holidays", ["clear"]) => {
            session.holidays.clear();
            println!("Holidays cleared.");
            return Ok(true);
        }
        ("lesson", ["add", rest @ ..]) if !rest.is_empty() => {
            let title = rest.join(" ");
            println!("Topic {} added: {}", session.contents.len() + 1, title);
            session.contents.push(title);
            return Ok(true);
        }
        ("lesson", ["clear"]) => {
            session.contents.clear();
            println!("Topics cleared.");
            return Ok(true);
        }
        ("time", [start, minutes]) => {
            session.lesson_start = NaiveTime::parse_from_str(start, "%H:%M")
                .map_err(|_| format!("Invalid time '{start}' (HH:MM)."))?;
            session.duration_minutes = minutes
                .parse::<u32>()
                .ok()
                .filter(|m| *m > 0)
                .ok_or_else(|| format!("Invalid duration '{minutes}'."))?;
            println!("Lesson time updated.");
            return Ok(true);
        }
        ("location", rest) if !rest.is_empty() => {
            session.location = Some(rest.join(" "));
            println!("Location updated.");
            return Ok(true);
        }
        ("teaching-days", _) => {
            let days = generate_teaching_days(&session.calendar()?);
            for day in &days {
                println!("{} {}", day, day.format("%a"));
            }
            println!("{} teaching day(s).", days.len());
        }
        ("syllabus", _) => print_syllabus(&session.syllabus()?),
        ("export", ["ics", path]) => {
            let events = syllabus_to_events(
                &session.syllabus()?,
                session.lesson_start,
                session.duration_minutes,
                session.location.as_deref(),
            );
            fs::write(path, generate_ics_now(&events)).map_err(|err| err.to_string())?;
            println!("Calendar with {} event(s) written to {}.", events.len(), path);
        }
        ("export", ["csv", path]) => {
            save_syllabus_to_csv(&session.syllabus()?, path).map_err(|err| err.to_string())?;
            println!("Syllabus written to {path}.");
        }
        ("calendar", ["save", path]) => {
            save_calendar_config_to_json(&session.calendar()?, path)
                .map_err(|err| err.to_string())?;
            println!("Calendar saved to {path}.");
        }
        ("calendar", ["load", path]) => {
            let config = load_calendar_config_from_json(path).map_err(|err| err.to_string())?;
            session.apply_calendar(&config);
            println!("Calendar loaded from {path}.");
            return Ok(true);
        }
        _ => return Err("Unknown command or wrong arguments. Type 'help'.".to_string()),
    }
    Ok(false)
}

fn build_backends(config: &AppConfig) -> Result<DraftBackends, Box<dyn std::error::Error>> {
    let local = FileDraftCache::new(&config.cache_dir)?;
    let remote: Option<Arc<dyn RemoteDraftStore>> = match config.remote.clone() {
        Some(remote) => Some(Arc::new(RestDraftStore::new(remote)?)),
        None => None,
    };
    Ok(DraftBackends::local_only(Arc::new(local))
        .with_optional_remote(remote)
        .with_debounce(config.debounce))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_tracing("warn");
    let config = AppConfig::from_env()?;
    let tool_id = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_TOOL_ID.to_string());

    let backends = build_backends(&config)?;
    let store = DraftSyncStore::load(tool_id, PlannerSession::default(), backends).await;
    let mut acks = store.subscribe();
    tokio::spawn(async move {
        while let Ok(ack) = acks.recv().await {
            let remote = if ack.remote_synced { " (synced)" } else { "" };
            eprintln!("draft saved at {}{}", ack.saved_at.format("%H:%M:%S"), remote);
        }
    });

    let mut session = store.value();
    println!("Classroom Planner (CLI) - type 'help' for commands\n");
    if session != PlannerSession::default() {
        println!("Restored draft '{}'.", store.tool_id());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or_default().to_lowercase();
        let args: Vec<&str> = parts.collect();
        match cmd.as_str() {
            "quit" | "exit" => break,
            "save" => match store.flush().await {
                Some(_) => println!("Draft saved."),
                None => println!("Draft could not be saved locally."),
            },
            _ => match execute(&mut session, &cmd, &args) {
                Ok(true) => store.update(session.clone()),
                Ok(false) => {}
                Err(message) => println!("{message}"),
            },
        }
    }

    store.flush().await;
    Ok(())
}
