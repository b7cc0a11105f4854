//! Storage backend capability interface

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use std::path::PathBuf;
use std::pin::Pin;

use crate::error::FerryResult;

/// Byte stream type used for all reads and writes
pub type ByteStream = Pin<Box<dyn Stream<Item = FerryResult<Bytes>> + Send>>;

/// Wrap a single buffer as a `ByteStream`.
pub fn once_stream(data: Bytes) -> ByteStream {
    Box::pin(futures::stream::once(async move { Ok(data) }))
}

/// Declared capabilities of a backend
///
/// `native_digest` is the load-bearing flag for the sync engine: it means
/// `stat` returns a content digest without reading the object, so
/// hash-based skip decisions cost a metadata call instead of a full read.
#[derive(Debug, Clone, Default)]
pub struct BackendCapabilities {
    pub read: bool,
    pub write: bool,
    pub delete: bool,
    pub rename: bool,
    pub list: bool,
    /// `stat` carries a cheap content digest (object stores)
    pub native_digest: bool,
    /// Objects live at real filesystem paths (`local_path` returns Some)
    pub local_paths: bool,
}

impl BackendCapabilities {
    pub fn local_filesystem() -> Self {
        Self {
            read: true,
            write: true,
            delete: true,
            rename: true,
            list: true,
            native_digest: false,
            local_paths: true,
        }
    }

    pub fn object_store() -> Self {
        Self {
            read: true,
            write: true,
            delete: true,
            rename: true,
            list: true,
            native_digest: true,
            local_paths: false,
        }
    }

    pub fn read_only() -> Self {
        Self {
            read: true,
            list: true,
            ..Default::default()
        }
    }
}

/// Result of a stat call
#[derive(Debug, Clone)]
pub struct StatInfo {
    pub size: u64,
    pub mtime: Option<DateTime<Utc>>,
    /// Backend-native content digest (hex), if one is stored with the
    /// object and matches the workspace digest algorithm (blake3).
    pub content_digest: Option<String>,
    pub is_dir: bool,
}

/// A single directory listing entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Storage backend trait
///
/// Paths are mount-relative, `/`-separated, already normalized by
/// `NodePath`. Every method is a blocking I/O call from the caller's
/// perspective; failures surface as `NotFound`, `PermissionDenied` or
/// `Unavailable`. Backends hold no per-call state and are shared behind
/// `Arc` for the process lifetime.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn id(&self) -> &str;
    fn display_name(&self) -> &str;
    fn capabilities(&self) -> &BackendCapabilities;

    /// Cheap existence probe; never reads content.
    async fn exists(&self, path: &str) -> FerryResult<bool>;

    /// Metadata for a file or directory. `NotFound` if absent.
    async fn stat(&self, path: &str) -> FerryResult<StatInfo>;

    /// Open for reading as a bounded-chunk stream.
    async fn read(&self, path: &str) -> FerryResult<ByteStream>;

    /// Write a stream to `path`, replacing any existing object. The
    /// parent directory must already exist.
    async fn write(
        &self,
        path: &str,
        data: ByteStream,
        size_hint: Option<u64>,
    ) -> FerryResult<()>;

    /// List immediate children of a directory.
    async fn list(&self, path: &str) -> FerryResult<Vec<DirEntry>>;

    /// Create a directory (and missing parents); no error if present.
    async fn mkdir_if_absent(&self, path: &str) -> FerryResult<()>;

    /// Delete a file, or a directory when `recursive`.
    async fn delete(&self, path: &str, recursive: bool) -> FerryResult<()>;

    /// Rename within this backend.
    async fn rename(&self, from: &str, to: &str) -> FerryResult<()>;

    /// Real filesystem path for `path`, for backends whose objects live
    /// on local disk. Staging uses this to skip the download/upload
    /// round-trip entirely.
    fn local_path(&self, _path: &str) -> Option<PathBuf> {
        None
    }
}
