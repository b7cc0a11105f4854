//! Local staging
//!
//! Gives any node a real filesystem path for the duration of some work:
//! direct when the backend already keeps objects on local disk, a
//! temporary file otherwise. The write-back is explicit: `commit()`
//! uploads, dropping without commit discards. A failed caller never
//! pushes a half-written staging file to the remote.

use bytes::Bytes;
use ferry_core::{ByteStream, FerryError, FerryResult, Node};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const CHUNK_SIZE: usize = 64 * 1024;

/// Access intent for a staged node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageMode {
    /// Content is downloaded; changes are never written back
    Read,
    /// Starts empty; content is uploaded on commit
    Write,
    /// Existing content is downloaded; the result is uploaded on commit
    ReadWrite,
}

impl StageMode {
    pub fn reads(&self) -> bool {
        matches!(self, StageMode::Read | StageMode::ReadWrite)
    }

    pub fn writes(&self) -> bool {
        matches!(self, StageMode::Write | StageMode::ReadWrite)
    }
}

/// A node materialized at a local filesystem path
///
/// For write modes the remote object is only touched by [`commit`];
/// dropping the handle discards the staging copy and deletes the
/// temporary file. Direct paths (backends with `local_paths`) have no
/// staging copy at all; writes land on the real file as they happen.
///
/// [`commit`]: StagedPath::commit
pub struct StagedPath {
    node: Node,
    mode: StageMode,
    path: PathBuf,
    temp: Option<NamedTempFile>,
}

impl StagedPath {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn mode(&self) -> StageMode {
        self.mode
    }

    /// True when the path is the backend's real file, not a staging copy.
    pub fn is_direct(&self) -> bool {
        self.temp.is_none()
    }

    /// Upload the staged content for write modes. No-op for read-only
    /// staging and for direct paths. Consumes the handle; the temporary
    /// file is removed afterwards whether the upload succeeded or not.
    pub async fn commit(self) -> FerryResult<()> {
        if !self.mode.writes() {
            return Ok(());
        }
        let Some(temp) = &self.temp else {
            return Ok(());
        };
        tracing::debug!(node = %self.node.address(), "uploading staged content");
        let file = tokio::fs::File::open(temp.path()).await?;
        let len = file.metadata().await?.len();
        self.node.write_stream(file_stream(file), Some(len)).await
    }
}

/// Stage `node` at a local path under `mode`.
///
/// `Read` on a missing node is `NotFound`; `ReadWrite` starts empty in
/// that case, and `Write` never downloads at all. Temporary files keep
/// the node's extension so tools that sniff filenames behave.
pub async fn stage(node: &Node, mode: StageMode) -> FerryResult<StagedPath> {
    if let Some(real) = node.backend().local_path(&node.relative()) {
        if mode.writes() {
            if let Some(parent) = node.path().parent() {
                if !parent.is_root() {
                    node.backend().mkdir_if_absent(&parent.relative()).await?;
                }
            }
        }
        if mode == StageMode::Read && !node.exists().await? {
            return Err(FerryError::NotFound(node.address()));
        }
        return Ok(StagedPath {
            node: node.clone(),
            mode,
            path: real,
            temp: None,
        });
    }

    let mut builder = tempfile::Builder::new();
    builder.prefix("ferry-stage-");
    let suffix = node.extension().map(|e| format!(".{}", e));
    if let Some(suffix) = &suffix {
        builder.suffix(suffix);
    }
    let temp = builder.tempfile()?;

    let exists = node.exists().await?;
    if mode == StageMode::Read && !exists {
        return Err(FerryError::NotFound(node.address()));
    }
    if mode.reads() && exists {
        download(node, temp.path()).await?;
    }

    Ok(StagedPath {
        node: node.clone(),
        mode,
        path: temp.path().to_path_buf(),
        temp: Some(temp),
    })
}

async fn download(node: &Node, path: &Path) -> FerryResult<()> {
    let mut stream = node.read_stream().await?;
    let mut file = tokio::fs::File::create(path).await?;
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    Ok(())
}

fn file_stream(file: tokio::fs::File) -> ByteStream {
    Box::pin(futures::stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let n = file.read(&mut buf).await.map_err(FerryError::Io)?;
        if n == 0 {
            Ok(None)
        } else {
            buf.truncate(n);
            Ok(Some((Bytes::from(buf), file)))
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::NodePath;
    use ferry_providers::{LocalBackend, MemoryBackend};
    use std::sync::Arc;

    fn mem_node(backend: &Arc<MemoryBackend>, path: &str) -> Node {
        Node::new(backend.clone(), NodePath::new("mem", path))
    }

    #[tokio::test]
    async fn test_read_write_roundtrip() {
        let backend = Arc::new(MemoryBackend::new("mem"));
        let node = mem_node(&backend, "doc.txt");
        node.write_bytes(&b"before"[..]).await.unwrap();

        let staged = stage(&node, StageMode::ReadWrite).await.unwrap();
        assert!(!staged.is_direct());
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"before");

        std::fs::write(staged.path(), b"after").unwrap();
        staged.commit().await.unwrap();

        assert_eq!(node.read_text().await.unwrap(), "after");
    }

    #[tokio::test]
    async fn test_drop_without_commit_discards() {
        let backend = Arc::new(MemoryBackend::new("mem"));
        let node = mem_node(&backend, "doc.txt");
        node.write_bytes(&b"original"[..]).await.unwrap();

        let temp_path;
        {
            let staged = stage(&node, StageMode::ReadWrite).await.unwrap();
            temp_path = staged.path().to_path_buf();
            std::fs::write(staged.path(), b"scribbles").unwrap();
        }

        // Remote untouched, staging file gone
        assert_eq!(node.read_text().await.unwrap(), "original");
        assert!(!temp_path.exists());
    }

    #[tokio::test]
    async fn test_local_backend_stages_directly() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(LocalBackend::new("disk", dir.path()));
        let node = Node::new(backend, NodePath::new("disk", "sub/file.txt"));
        node.write_bytes(&b"on disk"[..]).await.unwrap();

        let staged = stage(&node, StageMode::Read).await.unwrap();
        assert!(staged.is_direct());
        assert_eq!(staged.path(), dir.path().join("sub/file.txt"));
    }

    #[tokio::test]
    async fn test_write_mode_starts_empty_and_uploads() {
        let backend = Arc::new(MemoryBackend::new("mem"));
        let node = mem_node(&backend, "fresh.bin");

        let staged = stage(&node, StageMode::Write).await.unwrap();
        assert_eq!(std::fs::metadata(staged.path()).unwrap().len(), 0);

        std::fs::write(staged.path(), b"produced").unwrap();
        staged.commit().await.unwrap();
        assert_eq!(node.read_text().await.unwrap(), "produced");
    }

    #[tokio::test]
    async fn test_read_of_missing_node() {
        let backend = Arc::new(MemoryBackend::new("mem"));
        let result = stage(&mem_node(&backend, "ghost.txt"), StageMode::Read).await;
        assert!(matches!(result, Err(FerryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_read_write_of_missing_node_starts_empty() {
        let backend = Arc::new(MemoryBackend::new("mem"));
        let node = mem_node(&backend, "new.txt");

        let staged = stage(&node, StageMode::ReadWrite).await.unwrap();
        assert_eq!(std::fs::metadata(staged.path()).unwrap().len(), 0);
        std::fs::write(staged.path(), b"created").unwrap();
        staged.commit().await.unwrap();
        assert_eq!(node.read_text().await.unwrap(), "created");
    }

    #[tokio::test]
    async fn test_staged_file_keeps_extension() {
        let backend = Arc::new(MemoryBackend::new("mem"));
        let node = mem_node(&backend, "image.png");
        node.write_bytes(&b"not really a png"[..]).await.unwrap();

        let staged = stage(&node, StageMode::Read).await.unwrap();
        assert_eq!(
            staged.path().extension().and_then(|e| e.to_str()),
            Some("png")
        );
    }

    #[tokio::test]
    async fn test_read_mode_never_writes_back() {
        let backend = Arc::new(MemoryBackend::new("mem"));
        let node = mem_node(&backend, "doc.txt");
        node.write_bytes(&b"original"[..]).await.unwrap();

        let staged = stage(&node, StageMode::Read).await.unwrap();
        std::fs::write(staged.path(), b"tampered").unwrap();
        staged.commit().await.unwrap();

        assert_eq!(node.read_text().await.unwrap(), "original");
    }
}
