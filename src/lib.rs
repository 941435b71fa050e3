pub mod calendar;
pub mod clock;
pub mod config;
pub mod draft;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod ics;
pub mod logging;
pub mod persistence;
pub mod syllabus;

pub use calendar::{CalendarConfig, CalendarError, generate_teaching_days, weekday_from_index};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AppConfig, ConfigError};
#[cfg(feature = "sqlite")]
pub use draft::SqliteDraftStore;
pub use draft::{
    DraftBackends, DraftRecord, DraftSyncStore, FileDraftCache, LocalDraftCache,
    MemoryDraftCache, RemoteConfig, RemoteDraftStore, RestDraftStore, SaveAck,
};
pub use ics::{
    CalendarEvent, SequentialUids, UidGenerator, UuidGenerator, generate_ics, generate_ics_now,
};
pub use persistence::{
    PersistenceError, PersistenceResult, load_calendar_config_from_json, load_syllabus_from_csv,
    save_calendar_config_to_json, save_syllabus_to_csv,
};
pub use syllabus::{SyllabusEntry, distribute_syllabus, syllabus_to_events};
