use super::{DraftRecord, RemoteDraftStore};
use crate::persistence::{PersistenceError, PersistenceResult};
use async_trait::async_trait;
use std::time::Duration;

pub const REMOTE_URL_VAR: &str = "CLASSROOM_REMOTE_URL";
pub const REMOTE_KEY_VAR: &str = "CLASSROOM_REMOTE_KEY";

const DEFAULT_TABLE: &str = "drafts";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Credentials for the hosted draft table. Both halves must be present for
/// the remote tier to be enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub url: String,
    pub api_key: String,
}

impl RemoteConfig {
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(REMOTE_URL_VAR).filter(|v| !v.trim().is_empty())?;
        let api_key = lookup(REMOTE_KEY_VAR).filter(|v| !v.trim().is_empty())?;
        Some(Self {
            url: url.trim().trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
        })
    }
}

/// PostgREST-style client: `GET /rest/v1/<table>?tool_id=eq.<id>` for lookups
/// and `POST /rest/v1/<table>?on_conflict=tool_id` with merge-duplicates for
/// upserts.
#[derive(Debug, Clone)]
pub struct RestDraftStore {
    client: reqwest::Client,
    config: RemoteConfig,
    table: String,
}

impl RestDraftStore {
    pub fn new(config: RemoteConfig) -> PersistenceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            config,
            table: DEFAULT_TABLE.to_string(),
        })
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.config.url, self.table)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }
}

async fn ensure_success(response: reqwest::Response) -> PersistenceResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PersistenceError::Http(format!(
        "server returned status {status}: {body}"
    )))
}

#[async_trait]
impl RemoteDraftStore for RestDraftStore {
    async fn fetch(&self, tool_id: &str) -> PersistenceResult<Option<DraftRecord>> {
        let filter = format!("eq.{tool_id}");
        let request = self
            .client
            .get(self.table_url())
            .query(&[("tool_id", filter.as_str()), ("select", "*")]);
        let response = ensure_success(self.authorized(request).send().await?).await?;
        let mut rows: Vec<DraftRecord> = response.json().await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    async fn upsert(&self, record: &DraftRecord) -> PersistenceResult<()> {
        let request = self
            .client
            .post(self.table_url())
            .query(&[("on_conflict", "tool_id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(record);
        ensure_success(self.authorized(request).send().await?).await?;
        Ok(())
    }
}
