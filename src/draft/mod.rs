//! Draft persistence across a fast local cache and an optional remote store.
//!
//! The local tier is synchronous and always written; the remote tier is
//! best-effort and may be absent entirely. [`DraftSyncStore`] ties the two
//! together with a debounced write-back.

use crate::persistence::PersistenceResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod local;
pub mod rest;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod sync;

pub use local::{FileDraftCache, MemoryDraftCache};
pub use rest::{RemoteConfig, RestDraftStore};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDraftStore;
pub use sync::{DEFAULT_DEBOUNCE, DraftBackends, DraftSyncStore, SaveAck};

const LOCAL_KEY_PREFIX: &str = "draft-";

/// Row shape shared by every remote tier: one record per `tool_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRecord {
    pub tool_id: String,
    pub content: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// Local cache key for a tool's draft.
pub fn local_key(tool_id: &str) -> String {
    format!("{LOCAL_KEY_PREFIX}{tool_id}")
}

/// Synchronous key/value tier holding serialized JSON text.
pub trait LocalDraftCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> PersistenceResult<()>;
}

/// Durable tier keyed by `tool_id` with point lookup and upsert.
#[async_trait]
pub trait RemoteDraftStore: Send + Sync {
    async fn fetch(&self, tool_id: &str) -> PersistenceResult<Option<DraftRecord>>;
    async fn upsert(&self, record: &DraftRecord) -> PersistenceResult<()>;
}
