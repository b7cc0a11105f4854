//! Relative mount: re-roots another mount under a base path

use async_trait::async_trait;
use ferry_core::{
    backend::{BackendCapabilities, ByteStream, DirEntry, StatInfo, StorageBackend},
    error::FerryResult,
};
use std::path::PathBuf;
use std::sync::Arc;

/// A mount that delegates to another mount's backend with a path prefix
///
/// Shares the target backend, so objects are visible through both
/// mounts. The base path is fixed at configuration time.
pub struct RelativeBackend {
    id: String,
    inner: Arc<dyn StorageBackend>,
    base: String,
    capabilities: BackendCapabilities,
}

impl RelativeBackend {
    pub fn new(id: impl Into<String>, inner: Arc<dyn StorageBackend>, base: impl Into<String>) -> Self {
        let capabilities = inner.capabilities().clone();
        Self {
            id: id.into(),
            inner,
            base: base.into().trim_matches('/').to_string(),
            capabilities,
        }
    }

    fn full(&self, path: &str) -> String {
        match (self.base.is_empty(), path.is_empty()) {
            (true, _) => path.to_string(),
            (false, true) => self.base.clone(),
            (false, false) => format!("{}/{}", self.base, path),
        }
    }
}

#[async_trait]
impl StorageBackend for RelativeBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        self.inner.display_name()
    }

    fn capabilities(&self) -> &BackendCapabilities {
        &self.capabilities
    }

    async fn exists(&self, path: &str) -> FerryResult<bool> {
        self.inner.exists(&self.full(path)).await
    }

    async fn stat(&self, path: &str) -> FerryResult<StatInfo> {
        self.inner.stat(&self.full(path)).await
    }

    async fn read(&self, path: &str) -> FerryResult<ByteStream> {
        self.inner.read(&self.full(path)).await
    }

    async fn write(
        &self,
        path: &str,
        data: ByteStream,
        size_hint: Option<u64>,
    ) -> FerryResult<()> {
        self.inner.write(&self.full(path), data, size_hint).await
    }

    async fn list(&self, path: &str) -> FerryResult<Vec<DirEntry>> {
        self.inner.list(&self.full(path)).await
    }

    async fn mkdir_if_absent(&self, path: &str) -> FerryResult<()> {
        self.inner.mkdir_if_absent(&self.full(path)).await
    }

    async fn delete(&self, path: &str, recursive: bool) -> FerryResult<()> {
        self.inner.delete(&self.full(path), recursive).await
    }

    async fn rename(&self, from: &str, to: &str) -> FerryResult<()> {
        self.inner.rename(&self.full(from), &self.full(to)).await
    }

    fn local_path(&self, path: &str) -> Option<PathBuf> {
        self.inner.local_path(&self.full(path))
    }
}
