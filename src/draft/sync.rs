use super::{DraftRecord, LocalDraftCache, RemoteDraftStore, local_key};
use crate::clock::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(2);

const ACK_CHANNEL_CAPACITY: usize = 16;

/// The tiers and timing a [`DraftSyncStore`] runs against.
#[derive(Clone)]
pub struct DraftBackends {
    pub local: Arc<dyn LocalDraftCache>,
    pub remote: Option<Arc<dyn RemoteDraftStore>>,
    pub clock: Arc<dyn Clock>,
    pub debounce: Duration,
}

impl DraftBackends {
    pub fn local_only(local: Arc<dyn LocalDraftCache>) -> Self {
        Self {
            local,
            remote: None,
            clock: Arc::new(SystemClock),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteDraftStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_optional_remote(mut self, remote: Option<Arc<dyn RemoteDraftStore>>) -> Self {
        self.remote = remote;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

/// Transient "saved" notice sent after each persistence cycle whose local
/// write succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveAck {
    pub tool_id: String,
    pub saved_at: DateTime<Utc>,
    pub remote_synced: bool,
}

struct Inner<T> {
    tool_id: String,
    local_key: String,
    value: Mutex<T>,
    loading: AtomicBool,
    backends: DraftBackends,
    pending: Mutex<Option<JoinHandle<()>>>,
    acks: broadcast::Sender<SaveAck>,
}

/// In-memory draft for one `tool_id`, mirrored to a local cache and,
/// best-effort, a remote store.
///
/// Reads are served from memory. `update` only touches memory and (re)arms a
/// single debounce timer; when the timer fires the value is written to the
/// local tier and then upserted remotely. Remote failures are logged and never
/// surface to the caller.
///
/// `update` and `flush` spawn onto the ambient Tokio runtime.
pub struct DraftSyncStore<T> {
    inner: Arc<Inner<T>>,
}

impl<T> DraftSyncStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + 'static,
{
    /// Build the store from the local tier only. The result is usable
    /// immediately but still reports `is_loading()` until
    /// [`sync_from_remote`](Self::sync_from_remote) has run.
    pub fn new(tool_id: impl Into<String>, initial_value: T, backends: DraftBackends) -> Self {
        let tool_id = tool_id.into();
        let local_key = local_key(&tool_id);

        let value = match backends.local.get(&local_key) {
            Some(text) => match serde_json::from_str::<T>(&text) {
                Ok(cached) => {
                    tracing::debug!(tool_id = %tool_id, "restored draft from local cache");
                    cached
                }
                Err(err) => {
                    tracing::warn!(tool_id = %tool_id, error = %err, "ignoring malformed local draft");
                    initial_value
                }
            },
            None => initial_value,
        };

        let (acks, _) = broadcast::channel(ACK_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                tool_id,
                local_key,
                value: Mutex::new(value),
                loading: AtomicBool::new(true),
                backends,
                pending: Mutex::new(None),
                acks,
            }),
        }
    }

    /// Local read followed by the remote fetch; returns once both resolved.
    pub async fn load(tool_id: impl Into<String>, initial_value: T, backends: DraftBackends) -> Self {
        let store = Self::new(tool_id, initial_value, backends);
        store.sync_from_remote().await;
        store
    }

    /// Fetch the remote record, if a remote tier is configured, and let it
    /// replace the current value. A replacement re-arms the debounce timer so
    /// both tiers converge on it. Any failure keeps the current value.
    pub async fn sync_from_remote(&self) {
        let inner = &self.inner;
        match inner.backends.remote.as_ref() {
            None => tracing::debug!(tool_id = %inner.tool_id, "remote draft tier disabled"),
            Some(remote) => match remote.fetch(&inner.tool_id).await {
                Ok(Some(record)) => match serde_json::from_value::<T>(record.content) {
                    Ok(remote_value) => {
                        *inner.value.lock() = remote_value;
                        tracing::debug!(
                            tool_id = %inner.tool_id,
                            updated_at = %record.updated_at,
                            "draft replaced by remote copy"
                        );
                        // the replaced value is saved like any other change
                        self.schedule_write();
                    }
                    Err(err) => tracing::warn!(
                        tool_id = %inner.tool_id,
                        error = %err,
                        "remote draft does not match expected shape; keeping local value"
                    ),
                },
                Ok(None) => tracing::debug!(tool_id = %inner.tool_id, "no remote draft stored"),
                Err(err) => tracing::warn!(
                    tool_id = %inner.tool_id,
                    error = %err,
                    "remote draft fetch failed; keeping local value"
                ),
            },
        }
        inner.loading.store(false, Ordering::Release);
    }

    pub fn tool_id(&self) -> &str {
        &self.inner.tool_id
    }

    pub fn value(&self) -> T {
        self.inner.value.lock().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::Acquire)
    }

    pub fn has_pending_write(&self) -> bool {
        self.inner
            .pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SaveAck> {
        self.inner.acks.subscribe()
    }

    /// Replace the current value and restart the debounce timer.
    pub fn update(&self, new_value: T) {
        *self.inner.value.lock() = new_value;
        self.schedule_write();
    }

    fn schedule_write(&self) {
        let inner = Arc::clone(&self.inner);
        let delay = self.inner.backends.debounce;
        let mut pending = self.inner.pending.lock();
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let snapshot = inner.value.lock().clone();
            // aborting the timer after this point must not cancel the write
            tokio::spawn(persist(inner, snapshot));
        }));
    }

    /// Cancel any pending timer and persist the current value now.
    pub async fn flush(&self) -> Option<SaveAck> {
        if let Some(handle) = self.inner.pending.lock().take() {
            handle.abort();
        }
        let snapshot = self.value();
        persist(Arc::clone(&self.inner), snapshot).await
    }
}

impl<T> Drop for DraftSyncStore<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.inner.pending.lock().take() {
            handle.abort();
        }
    }
}

async fn persist<T: Serialize>(inner: Arc<Inner<T>>, snapshot: T) -> Option<SaveAck> {
    let content = match serde_json::to_value(&snapshot) {
        Ok(content) => content,
        Err(err) => {
            tracing::error!(tool_id = %inner.tool_id, error = %err, "draft is not serializable");
            return None;
        }
    };
    let saved_at = inner.backends.clock.now();

    let local_ok = match inner.backends.local.set(&inner.local_key, &content.to_string()) {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(tool_id = %inner.tool_id, error = %err, "local draft write failed");
            false
        }
    };

    let remote_synced = match inner.backends.remote.as_ref() {
        None => false,
        Some(remote) => {
            let record = DraftRecord {
                tool_id: inner.tool_id.clone(),
                content,
                updated_at: saved_at,
            };
            match remote.upsert(&record).await {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!(tool_id = %inner.tool_id, error = %err, "remote draft upsert failed");
                    false
                }
            }
        }
    };

    if !local_ok {
        return None;
    }

    tracing::debug!(tool_id = %inner.tool_id, remote_synced, "draft saved");
    let ack = SaveAck {
        tool_id: inner.tool_id.clone(),
        saved_at,
        remote_synced,
    };
    // no subscribers is fine
    let _ = inner.acks.send(ack.clone());
    Some(ack)
}
