//! Metadata resolver
//!
//! Obtains size/mtime/digest for a node while paying as little as
//! possible. The load-bearing distinction: a backend-native digest
//! comes back from a single stat call, while a computed digest streams
//! the whole object through blake3. Which path was taken is visible in
//! `DigestSource` so callers can reason about cost.

use chrono::{DateTime, Utc};
use ferry_core::{FerryError, FerryResult, Node};
use futures::StreamExt;

/// How a digest was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestSource {
    /// Supplied by the backend's metadata, no content read
    Native,
    /// Computed by streaming the full content
    Computed,
}

/// A content digest with its provenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    /// Hex-encoded blake3 digest
    pub value: String,
    pub source: DigestSource,
}

/// Resolved metadata for a node
///
/// A nonexistent node resolves to `exists: false` with everything else
/// unset; that is not an error. `digest` here is only ever the cheap
/// native one; use [`digest`] for the possibly-expensive full answer.
#[derive(Debug, Clone, Default)]
pub struct NodeMetadata {
    pub exists: bool,
    pub is_dir: bool,
    pub size: Option<u64>,
    pub mtime: Option<DateTime<Utc>>,
    pub digest: Option<Digest>,
}

impl NodeMetadata {
    fn absent() -> Self {
        Self::default()
    }
}

/// Resolve metadata with a single stat call.
///
/// Transport faults surface as `Unavailable`/`Io`; only `NotFound` is
/// absorbed into `exists: false`.
pub async fn resolve(node: &Node) -> FerryResult<NodeMetadata> {
    match node.backend().stat(&node.relative()).await {
        Ok(info) => Ok(NodeMetadata {
            exists: true,
            is_dir: info.is_dir,
            size: Some(info.size),
            mtime: info.mtime,
            digest: info.content_digest.map(|value| Digest {
                value,
                source: DigestSource::Native,
            }),
        }),
        Err(FerryError::NotFound(_)) => Ok(NodeMetadata::absent()),
        Err(e) => Err(e),
    }
}

/// Digest only if the backend can supply one without reading content.
pub async fn digest_if_cheap(node: &Node) -> FerryResult<Option<Digest>> {
    Ok(resolve(node).await?.digest)
}

/// Full digest: native when available, otherwise computed by streaming.
///
/// Fails with `NotFound` for a missing node and `HashUnavailable` when
/// the backend can neither supply nor stream content for hashing.
pub async fn digest(node: &Node) -> FerryResult<Digest> {
    let meta = resolve(node).await?;
    if !meta.exists {
        return Err(FerryError::NotFound(node.address()));
    }
    if let Some(digest) = meta.digest {
        return Ok(digest);
    }
    if !node.backend().capabilities().read {
        return Err(FerryError::HashUnavailable(node.address()));
    }

    tracing::debug!(node = %node.address(), "no native digest, hashing content");
    let mut hasher = blake3::Hasher::new();
    let mut stream = node.read_stream().await?;
    while let Some(chunk) = stream.next().await {
        hasher.update(&chunk?);
    }
    Ok(Digest {
        value: hasher.finalize().to_hex().to_string(),
        source: DigestSource::Computed,
    })
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
    async fn test_resolve_missing_is_not_an_error() {
        let backend = Arc::new(MemoryBackend::new("mem"));
        let meta = resolve(&mem_node(&backend, "ghost.txt")).await.unwrap();
        assert!(!meta.exists);
        assert!(meta.size.is_none());
        assert!(meta.digest.is_none());
    }

    #[tokio::test]
    async fn test_native_digest_from_object_store() {
        let backend = Arc::new(MemoryBackend::new("mem"));
        let node = mem_node(&backend, "file.bin");
        node.write_bytes(&b"payload"[..]).await.unwrap();

        let meta = resolve(&node).await.unwrap();
        assert!(meta.exists);
        assert_eq!(meta.size, Some(7));
        let d = meta.digest.unwrap();
        assert_eq!(d.source, DigestSource::Native);
        assert_eq!(d.value, blake3::hash(b"payload").to_hex().to_string());

        // digest() takes the cheap path too
        let d = digest(&node).await.unwrap();
        assert_eq!(d.source, DigestSource::Native);
    }

    #[tokio::test]
    async fn test_computed_digest_from_local() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(LocalBackend::new("disk", dir.path()));
        let node = Node::new(backend, NodePath::new("disk", "file.bin"));
        node.write_bytes(&b"payload"[..]).await.unwrap();

        assert!(digest_if_cheap(&node).await.unwrap().is_none());

        let d = digest(&node).await.unwrap();
        assert_eq!(d.source, DigestSource::Computed);
        assert_eq!(d.value, blake3::hash(b"payload").to_hex().to_string());
    }

    #[tokio::test]
    async fn test_digest_algorithms_agree_across_backends() {
        let dir = tempfile::tempdir().unwrap();
        let local = Arc::new(LocalBackend::new("disk", dir.path()));
        let mem = Arc::new(MemoryBackend::new("mem"));

        let a = Node::new(local, NodePath::new("disk", "x"));
        let b = mem_node(&mem, "x");
        a.write_bytes(&b"same content"[..]).await.unwrap();
        b.write_bytes(&b"same content"[..]).await.unwrap();

        assert_eq!(
            digest(&a).await.unwrap().value,
            digest(&b).await.unwrap().value
        );
    }

    #[tokio::test]
    async fn test_digest_of_missing_node() {
        let backend = Arc::new(MemoryBackend::new("mem"));
        assert!(matches!(
            digest(&mem_node(&backend, "ghost")).await,
            Err(FerryError::NotFound(_))
        ));
    }
}
