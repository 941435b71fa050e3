use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    CalendarConfig, CalendarError, CalendarEvent, PersistenceError, SyllabusEntry,
    clock::{Clock, SystemClock},
    distribute_syllabus,
    draft::{DraftRecord, RemoteDraftStore},
    generate_teaching_days,
    ics::{ICS_CONTENT_TYPE, UidGenerator, UuidGenerator, generate_ics, ics_file_name},
};

#[derive(Clone)]
pub struct AppState {
    drafts: Arc<dyn RemoteDraftStore>,
    clock: Arc<dyn Clock>,
    uids: Arc<dyn UidGenerator>,
}

impl AppState {
    pub fn new(drafts: Arc<dyn RemoteDraftStore>) -> Self {
        Self {
            drafts,
            clock: Arc::new(SystemClock),
            uids: Arc::new(UuidGenerator),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_uids(mut self, uids: Arc<dyn UidGenerator>) -> Self {
        self.uids = uids;
        self
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<CalendarError> for ApiError {
    fn from(value: CalendarError) -> Self {
        ApiError::Invalid(value.to_string())
    }
}

impl From<PersistenceError> for ApiError {
    fn from(value: PersistenceError) -> Self {
        match value {
            PersistenceError::InvalidData(message) => ApiError::Invalid(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Invalid(message) => {
                let body = Json(ErrorBody {
                    error: "invalid_request",
                    message,
                });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::Internal(message) => {
                tracing::error!(%message, "request failed");
                let body = Json(ErrorBody {
                    error: "internal_error",
                    message,
                });
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct SyllabusPayload {
    calendar: CalendarConfig,
    #[serde(default)]
    contents: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct IcsPayload {
    events: Vec<CalendarEvent>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UpsertPayload {
    One(DraftRecord),
    Many(Vec<DraftRecord>),
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/teaching-days", post(teaching_days))
        .route("/syllabus", post(syllabus))
        .route("/calendar.ics", post(calendar_ics))
        .route("/rest/v1/drafts", get(fetch_draft).post(upsert_draft))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "classroom-planner HTTP API listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn teaching_days(
    Json(config): Json<CalendarConfig>,
) -> Result<Json<Vec<NaiveDate>>, ApiError> {
    config.validate()?;
    Ok(Json(generate_teaching_days(&config)))
}

async fn syllabus(
    Json(payload): Json<SyllabusPayload>,
) -> Result<Json<Vec<SyllabusEntry>>, ApiError> {
    payload.calendar.validate()?;
    let days = generate_teaching_days(&payload.calendar);
    Ok(Json(distribute_syllabus(&payload.contents, &days)))
}

async fn calendar_ics(
    State(state): State<AppState>,
    Json(payload): Json<IcsPayload>,
) -> Result<Response, ApiError> {
    if payload.events.is_empty() {
        return Err(ApiError::invalid("at least one event is required"));
    }
    let body = generate_ics(&payload.events, state.clock.as_ref(), state.uids.as_ref());
    let file_name = ics_file_name(payload.name.as_deref().unwrap_or("calendar"));
    let disposition = format!("attachment; filename=\"{file_name}\"");
    Ok((
        [
            (header::CONTENT_TYPE, ICS_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

fn tool_id_filter(params: &HashMap<String, String>) -> Result<String, ApiError> {
    let raw = params
        .get("tool_id")
        .ok_or_else(|| ApiError::invalid("a tool_id=eq.<id> filter is required"))?;
    raw.strip_prefix("eq.")
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::invalid(format!("unsupported tool_id filter '{raw}'")))
}

async fn fetch_draft(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<DraftRecord>>, ApiError> {
    let tool_id = tool_id_filter(&params)?;
    let record = state.drafts.fetch(&tool_id).await?;
    Ok(Json(record.into_iter().collect()))
}

async fn upsert_draft(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    Json(payload): Json<UpsertPayload>,
) -> Result<StatusCode, ApiError> {
    if let Some(column) = params.get("on_conflict") {
        if column != "tool_id" {
            return Err(ApiError::invalid(format!(
                "drafts can only be upserted on tool_id, not '{column}'"
            )));
        }
    }
    let records = match payload {
        UpsertPayload::One(record) => vec![record],
        UpsertPayload::Many(records) => records,
    };
    for record in &records {
        if record.tool_id.trim().is_empty() {
            return Err(ApiError::invalid("tool_id must not be empty"));
        }
        state.drafts.upsert(record).await?;
        tracing::debug!(tool_id = %record.tool_id, "draft upserted");
    }
    Ok(StatusCode::CREATED)
}
