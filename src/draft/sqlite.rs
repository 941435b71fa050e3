use super::{DraftRecord, RemoteDraftStore};
use crate::persistence::{PersistenceError, PersistenceResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::io;
use std::sync::Arc;

/// Draft table in a SQLite file, usable as the remote tier or as the backing
/// store of the self-hosted HTTP API.
#[derive(Clone)]
pub struct SqliteDraftStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteDraftStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::from_connection(connection)
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> PersistenceResult<Self> {
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS drafts (
                tool_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    pub fn get(&self, tool_id: &str) -> PersistenceResult<Option<DraftRecord>> {
        let conn = self.connection.lock();
        let mut stmt =
            conn.prepare("SELECT tool_id, content, updated_at FROM drafts WHERE tool_id = ?1")?;
        let row: Option<(String, String, String)> = stmt
            .query_row(params![tool_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .optional()?;

        let Some((tool_id, content, updated_at)) = row else {
            return Ok(None);
        };

        let updated_at = DateTime::parse_from_rfc3339(&updated_at)
            .map_err(|err| {
                PersistenceError::InvalidData(format!("invalid updated_at '{updated_at}': {err}"))
            })?
            .with_timezone(&Utc);

        Ok(Some(DraftRecord {
            tool_id,
            content: serde_json::from_str(&content)?,
            updated_at,
        }))
    }

    pub fn put(&self, record: &DraftRecord) -> PersistenceResult<()> {
        let content = serde_json::to_string(&record.content)?;
        let conn = self.connection.lock();
        conn.execute(
            "INSERT INTO drafts (tool_id, content, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(tool_id) DO UPDATE SET
                 content = excluded.content,
                 updated_at = excluded.updated_at",
            params![record.tool_id, content, record.updated_at.to_rfc3339()],
        )?;
        Ok(())
    }
}

fn join_error(err: tokio::task::JoinError) -> PersistenceError {
    PersistenceError::Io(io::Error::other(err))
}

#[async_trait]
impl RemoteDraftStore for SqliteDraftStore {
    async fn fetch(&self, tool_id: &str) -> PersistenceResult<Option<DraftRecord>> {
        let store = self.clone();
        let tool_id = tool_id.to_string();
        tokio::task::spawn_blocking(move || store.get(&tool_id))
            .await
            .map_err(join_error)?
    }

    async fn upsert(&self, record: &DraftRecord) -> PersistenceResult<()> {
        let store = self.clone();
        let record = record.clone();
        tokio::task::spawn_blocking(move || store.put(&record))
            .await
            .map_err(join_error)?
    }
}
