use super::LocalDraftCache;
use crate::persistence::PersistenceResult;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct MemoryDraftCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryDraftCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl LocalDraftCache for MemoryDraftCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> PersistenceResult<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per draft inside a cache directory.
#[derive(Debug, Clone)]
pub struct FileDraftCache {
    dir: PathBuf,
}

impl FileDraftCache {
    pub fn new<P: AsRef<Path>>(dir: P) -> PersistenceResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`. Every byte outside the URL-unreserved set is
    /// percent-encoded, so distinct keys never share a file and no key can
    /// name a path separator.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", urlencoding::encode(key)))
    }
}

impl LocalDraftCache for FileDraftCache {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "unreadable draft cache entry");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> PersistenceResult<()> {
        let path = self.path_for(key);
        // readers must never observe a partially written entry
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
