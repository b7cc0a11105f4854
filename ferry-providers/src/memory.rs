//! In-memory object store backend
//!
//! Flat key space with directories implied by key prefixes, like an
//! object store. A blake3 digest is recorded at write time and returned
//! from `stat`, so hash comparisons against this backend never re-read
//! content. Doubles as the test backend for cross-mount operations.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use ferry_core::{
    backend::{once_stream, BackendCapabilities, ByteStream, DirEntry, StatInfo, StorageBackend},
    error::{FerryError, FerryResult},
};
use futures::StreamExt;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

#[derive(Clone)]
struct Object {
    data: Bytes,
    mtime: DateTime<Utc>,
    digest: String,
}

#[derive(Default)]
struct State {
    objects: HashMap<String, Object>,
    dirs: HashSet<String>,
}

/// In-memory object store
pub struct MemoryBackend {
    id: String,
    state: RwLock<State>,
    capabilities: BackendCapabilities,
}

impl MemoryBackend {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: RwLock::new(State::default()),
            capabilities: BackendCapabilities::object_store(),
        }
    }

    fn is_implied_dir(state: &State, path: &str) -> bool {
        if path.is_empty() {
            return true;
        }
        if state.dirs.contains(path) {
            return true;
        }
        let prefix = format!("{}/", path);
        state.objects.keys().any(|k| k.starts_with(&prefix))
            || state.dirs.iter().any(|d| d.starts_with(&prefix))
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        "In-Memory Object Store"
    }

    fn capabilities(&self) -> &BackendCapabilities {
        &self.capabilities
    }

    async fn exists(&self, path: &str) -> FerryResult<bool> {
        let state = self.state.read().unwrap();
        Ok(state.objects.contains_key(path) || Self::is_implied_dir(&state, path))
    }

    async fn stat(&self, path: &str) -> FerryResult<StatInfo> {
        let state = self.state.read().unwrap();
        if let Some(obj) = state.objects.get(path) {
            return Ok(StatInfo {
                size: obj.data.len() as u64,
                mtime: Some(obj.mtime),
                content_digest: Some(obj.digest.clone()),
                is_dir: false,
            });
        }
        if Self::is_implied_dir(&state, path) {
            return Ok(StatInfo {
                size: 0,
                mtime: None,
                content_digest: None,
                is_dir: true,
            });
        }
        Err(FerryError::NotFound(path.to_string()))
    }

    async fn read(&self, path: &str) -> FerryResult<ByteStream> {
        let state = self.state.read().unwrap();
        match state.objects.get(path) {
            Some(obj) => Ok(once_stream(obj.data.clone())),
            None if Self::is_implied_dir(&state, path) => {
                Err(FerryError::NotAFile(path.to_string()))
            }
            None => Err(FerryError::NotFound(path.to_string())),
        }
    }

    async fn write(
        &self,
        path: &str,
        mut data: ByteStream,
        _size_hint: Option<u64>,
    ) -> FerryResult<()> {
        // Collect outside the lock; the stream may await on its source.
        let mut buf = Vec::new();
        while let Some(chunk) = data.next().await {
            buf.extend_from_slice(&chunk?);
        }
        let digest = blake3::hash(&buf).to_hex().to_string();

        let mut state = self.state.write().unwrap();
        state.objects.insert(
            path.to_string(),
            Object {
                data: Bytes::from(buf),
                mtime: Utc::now(),
                digest,
            },
        );
        Ok(())
    }

    async fn list(&self, path: &str) -> FerryResult<Vec<DirEntry>> {
        let state = self.state.read().unwrap();
        if !Self::is_implied_dir(&state, path) {
            if state.objects.contains_key(path) {
                return Err(FerryError::NotADirectory(path.to_string()));
            }
            return Err(FerryError::NotFound(path.to_string()));
        }

        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{}/", path)
        };

        // name -> is_dir, sorted for stable listings
        let mut children: BTreeMap<String, bool> = BTreeMap::new();
        for key in state.objects.keys() {
            if let Some(rest) = key.strip_prefix(&prefix) {
                match rest.split_once('/') {
                    Some((first, _)) => {
                        children.insert(first.to_string(), true);
                    }
                    None if !rest.is_empty() => {
                        children.entry(rest.to_string()).or_insert(false);
                    }
                    None => {}
                }
            }
        }
        for dir in &state.dirs {
            if let Some(rest) = dir.strip_prefix(&prefix) {
                if rest.is_empty() {
                    continue;
                }
                let first = rest.split('/').next().unwrap_or(rest);
                children.insert(first.to_string(), true);
            }
        }

        Ok(children
            .into_iter()
            .map(|(name, is_dir)| DirEntry { name, is_dir })
            .collect())
    }

    async fn mkdir_if_absent(&self, path: &str) -> FerryResult<()> {
        if path.is_empty() {
            return Ok(());
        }
        let mut state = self.state.write().unwrap();
        state.dirs.insert(path.to_string());
        Ok(())
    }

    async fn delete(&self, path: &str, recursive: bool) -> FerryResult<()> {
        let mut state = self.state.write().unwrap();
        if state.objects.remove(path).is_some() {
            return Ok(());
        }
        if Self::is_implied_dir(&state, path) {
            let prefix = format!("{}/", path);
            let occupied = state.objects.keys().any(|k| k.starts_with(&prefix));
            if occupied && !recursive {
                return Err(FerryError::Unsupported(format!(
                    "directory not empty: {}",
                    path
                )));
            }
            state.objects.retain(|k, _| !k.starts_with(&prefix));
            state
                .dirs
                .retain(|d| d != path && !d.starts_with(&prefix));
            return Ok(());
        }
        Err(FerryError::NotFound(path.to_string()))
    }

    async fn rename(&self, from: &str, to: &str) -> FerryResult<()> {
        let mut state = self.state.write().unwrap();
        if let Some(obj) = state.objects.remove(from) {
            state.objects.insert(to.to_string(), obj);
            return Ok(());
        }
        if Self::is_implied_dir(&state, from) {
            let prefix = format!("{}/", from);
            let moved: Vec<(String, Object)> = state
                .objects
                .iter()
                .filter(|(k, _)| k.starts_with(&prefix))
                .map(|(k, v)| (format!("{}/{}", to, &k[prefix.len()..]), v.clone()))
                .collect();
            state.objects.retain(|k, _| !k.starts_with(&prefix));
            state.objects.extend(moved);
            state.dirs.remove(from);
            state.dirs.insert(to.to_string());
            return Ok(());
        }
        Err(FerryError::NotFound(from.to_string()))
    }
}
