//! Node - addressable handle to an object in some mount

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::sync::Arc;

use crate::backend::{once_stream, ByteStream, StorageBackend};
use crate::error::{FerryError, FerryResult};
use crate::path::NodePath;

/// Handle to a file or directory in a storage mount
///
/// A node is only an address (backend + normalized path); existence,
/// size and the rest are queried live from the backend on every call,
/// never cached on the node.
#[derive(Clone)]
pub struct Node {
    backend: Arc<dyn StorageBackend>,
    path: NodePath,
}

impl Node {
    pub fn new(backend: Arc<dyn StorageBackend>, path: NodePath) -> Self {
        Self { backend, path }
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// Mount-relative path string passed to the backend.
    pub fn relative(&self) -> String {
        self.path.relative()
    }

    /// Full `mount:path` address.
    pub fn address(&self) -> String {
        self.path.address()
    }

    // Navigation

    pub fn child(&self, name: &str) -> Node {
        Node::new(self.backend.clone(), self.path.join(name))
    }

    pub fn parent(&self) -> Option<Node> {
        self.path
            .parent()
            .map(|p| Node::new(self.backend.clone(), p))
    }

    pub fn basename(&self) -> Option<&str> {
        self.path.name()
    }

    pub fn stem(&self) -> Option<&str> {
        self.path.stem()
    }

    pub fn extension(&self) -> Option<&str> {
        self.path.extension()
    }

    // Live state

    pub async fn exists(&self) -> FerryResult<bool> {
        self.backend.exists(&self.relative()).await
    }

    pub async fn is_file(&self) -> FerryResult<bool> {
        match self.backend.stat(&self.relative()).await {
            Ok(info) => Ok(!info.is_dir),
            Err(FerryError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn is_dir(&self) -> FerryResult<bool> {
        match self.backend.stat(&self.relative()).await {
            Ok(info) => Ok(info.is_dir),
            Err(FerryError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// File size in bytes. `NotAFile` for directories.
    pub async fn size(&self) -> FerryResult<u64> {
        let info = self.backend.stat(&self.relative()).await?;
        if info.is_dir {
            return Err(FerryError::NotAFile(self.address()));
        }
        Ok(info.size)
    }

    pub async fn mtime(&self) -> FerryResult<Option<DateTime<Utc>>> {
        let info = self.backend.stat(&self.relative()).await?;
        Ok(info.mtime)
    }

    // I/O

    pub async fn read_stream(&self) -> FerryResult<ByteStream> {
        self.backend.read(&self.relative()).await
    }

    pub async fn read_bytes(&self) -> FerryResult<Bytes> {
        let mut stream = self.read_stream().await?;
        let mut buf = Vec::new();
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(buf))
    }

    pub async fn read_text(&self) -> FerryResult<String> {
        let bytes = self.read_bytes().await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| FerryError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }

    /// Write bytes, creating parent directories as needed.
    pub async fn write_bytes(&self, data: impl Into<Bytes>) -> FerryResult<()> {
        let data = data.into();
        let len = data.len() as u64;
        self.write_stream(once_stream(data), Some(len)).await
    }

    pub async fn write_text(&self, text: &str) -> FerryResult<()> {
        self.write_bytes(Bytes::copy_from_slice(text.as_bytes()))
            .await
    }

    pub async fn write_stream(&self, data: ByteStream, size_hint: Option<u64>) -> FerryResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.is_root() {
                self.backend.mkdir_if_absent(&parent.relative()).await?;
            }
        }
        self.backend
            .write(&self.relative(), data, size_hint)
            .await
    }

    /// Delete the file or directory. Idempotent: a missing target is Ok.
    pub async fn delete(&self, recursive: bool) -> FerryResult<()> {
        match self.backend.delete(&self.relative(), recursive).await {
            Ok(()) => Ok(()),
            Err(FerryError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn mkdir(&self) -> FerryResult<()> {
        self.backend.mkdir_if_absent(&self.relative()).await
    }

    /// List directory contents as nodes.
    pub async fn children(&self) -> FerryResult<Vec<Node>> {
        let entries = self.backend.list(&self.relative()).await?;
        Ok(entries
            .into_iter()
            .map(|e| self.child(&e.name))
            .collect())
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Node({})", self.address())
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.address())
    }
}
