//! Local filesystem backend

use async_trait::async_trait;
use bytes::Bytes;
use ferry_core::{
    backend::{BackendCapabilities, ByteStream, DirEntry, StatInfo, StorageBackend},
    error::{FerryError, FerryResult},
};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Read chunk size; keeps working memory constant for any object size.
const CHUNK_SIZE: usize = 64 * 1024;

/// Local filesystem backend rooted at a directory
pub struct LocalBackend {
    id: String,
    root: PathBuf,
    capabilities: BackendCapabilities,
}

impl LocalBackend {
    pub fn new(id: impl Into<String>, root: impl AsRef<Path>) -> Self {
        Self {
            id: id.into(),
            root: root.as_ref().to_path_buf(),
            capabilities: BackendCapabilities::local_filesystem(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn to_real_path(&self, path: &str) -> PathBuf {
        let mut real = self.root.clone();
        for seg in path.split('/').filter(|s| !s.is_empty()) {
            real.push(seg);
        }
        real
    }
}

fn chunked_stream(file: fs::File) -> ByteStream {
    Box::pin(futures::stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let n = file.read(&mut buf).await?;
        if n == 0 {
            Ok(None)
        } else {
            buf.truncate(n);
            Ok(Some((Bytes::from(buf), file)))
        }
    }))
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        "Local Filesystem"
    }

    fn capabilities(&self) -> &BackendCapabilities {
        &self.capabilities
    }

    async fn exists(&self, path: &str) -> FerryResult<bool> {
        match fs::metadata(self.to_real_path(path)).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FerryError::from_io(path, e)),
        }
    }

    async fn stat(&self, path: &str) -> FerryResult<StatInfo> {
        let meta = fs::metadata(self.to_real_path(path))
            .await
            .map_err(|e| FerryError::from_io(path, e))?;
        Ok(StatInfo {
            size: meta.len(),
            mtime: meta.modified().ok().map(Into::into),
            content_digest: None,
            is_dir: meta.is_dir(),
        })
    }

    async fn read(&self, path: &str) -> FerryResult<ByteStream> {
        let real = self.to_real_path(path);
        let meta = fs::metadata(&real)
            .await
            .map_err(|e| FerryError::from_io(path, e))?;
        if meta.is_dir() {
            return Err(FerryError::NotAFile(path.to_string()));
        }
        let file = fs::File::open(&real)
            .await
            .map_err(|e| FerryError::from_io(path, e))?;
        Ok(chunked_stream(file))
    }

    async fn write(
        &self,
        path: &str,
        mut data: ByteStream,
        _size_hint: Option<u64>,
    ) -> FerryResult<()> {
        let real = self.to_real_path(path);
        let mut file = fs::File::create(&real)
            .await
            .map_err(|e| FerryError::from_io(path, e))?;
        while let Some(chunk) = data.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        Ok(())
    }

    async fn list(&self, path: &str) -> FerryResult<Vec<DirEntry>> {
        let real = self.to_real_path(path);
        let meta = fs::metadata(&real)
            .await
            .map_err(|e| FerryError::from_io(path, e))?;
        if !meta.is_dir() {
            return Err(FerryError::NotADirectory(path.to_string()));
        }

        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(&real)
            .await
            .map_err(|e| FerryError::from_io(path, e))?;
        while let Some(entry) = read_dir.next_entry().await? {
            let is_dir = entry.file_type().await?.is_dir();
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            });
        }
        Ok(entries)
    }

    async fn mkdir_if_absent(&self, path: &str) -> FerryResult<()> {
        fs::create_dir_all(self.to_real_path(path))
            .await
            .map_err(|e| FerryError::from_io(path, e))
    }

    async fn delete(&self, path: &str, recursive: bool) -> FerryResult<()> {
        let real = self.to_real_path(path);
        let meta = fs::metadata(&real)
            .await
            .map_err(|e| FerryError::from_io(path, e))?;
        let result = if meta.is_dir() {
            if recursive {
                fs::remove_dir_all(&real).await
            } else {
                fs::remove_dir(&real).await
            }
        } else {
            fs::remove_file(&real).await
        };
        result.map_err(|e| FerryError::from_io(path, e))
    }

    async fn rename(&self, from: &str, to: &str) -> FerryResult<()> {
        fs::rename(self.to_real_path(from), self.to_real_path(to))
            .await
            .map_err(|e| FerryError::from_io(from, e))
    }

    fn local_path(&self, path: &str) -> Option<PathBuf> {
        Some(self.to_real_path(path))
    }
}
