//! Skip strategies for copy operations

use ferry_core::{FerryError, FerryResult, Node};
use std::fmt;
use std::sync::Arc;

use crate::resolver::{self, NodeMetadata};

/// Custom skip predicate
///
/// Receives resolved metadata for source and destination. The predicate
/// must check `destination.exists` itself before comparing attributes
/// that require existence; the evaluator performs no implicit existence
/// check for the custom strategy.
pub type SkipPredicate = Arc<dyn Fn(&NodeMetadata, &NodeMetadata) -> bool + Send + Sync>;

/// Policy deciding whether a copy of a given item is necessary
#[derive(Clone)]
pub enum SkipStrategy {
    /// Always copy
    Never,
    /// Skip when the destination exists, regardless of content
    Exists,
    /// Skip when sizes match. Deliberately imprecise: equal-length
    /// different content is treated as identical, trading accuracy for
    /// a stat-only comparison.
    Size,
    /// Skip when content digests match
    Hash,
    /// Skip when the caller-supplied predicate returns true
    Custom(SkipPredicate),
}

impl SkipStrategy {
    /// Parse a configuration name. `custom` cannot be built from a name
    /// alone (it needs a predicate), so it is rejected here, before
    /// any I/O happens.
    pub fn from_name(name: &str) -> FerryResult<Self> {
        match name {
            "never" => Ok(SkipStrategy::Never),
            "exists" => Ok(SkipStrategy::Exists),
            "size" => Ok(SkipStrategy::Size),
            "hash" => Ok(SkipStrategy::Hash),
            "custom" => Err(FerryError::InvalidConfig(
                "skip strategy 'custom' requires a predicate; use SkipStrategy::custom".into(),
            )),
            other => Err(FerryError::InvalidConfig(format!(
                "unknown skip strategy '{}'",
                other
            ))),
        }
    }

    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&NodeMetadata, &NodeMetadata) -> bool + Send + Sync + 'static,
    {
        SkipStrategy::Custom(Arc::new(predicate))
    }

    pub fn name(&self) -> &'static str {
        match self {
            SkipStrategy::Never => "never",
            SkipStrategy::Exists => "exists",
            SkipStrategy::Size => "size",
            SkipStrategy::Hash => "hash",
            SkipStrategy::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for SkipStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SkipStrategy::{}", self.name())
    }
}

/// Outcome of a skip evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipDecision {
    Copy,
    /// Skip, with the human-readable reason
    Skip(String),
}

impl SkipDecision {
    pub fn is_skip(&self) -> bool {
        matches!(self, SkipDecision::Skip(_))
    }
}

/// Per-item skip evaluator
///
/// Stateless beyond the configured strategy; every evaluation is
/// independent.
pub struct SkipEvaluator {
    strategy: SkipStrategy,
}

impl SkipEvaluator {
    pub fn new(strategy: SkipStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &SkipStrategy {
        &self.strategy
    }

    /// Decide copy vs. skip for one source/destination pair.
    pub async fn evaluate(&self, source: &Node, destination: &Node) -> FerryResult<SkipDecision> {
        match &self.strategy {
            SkipStrategy::Never => Ok(SkipDecision::Copy),

            SkipStrategy::Exists => {
                if destination.exists().await? {
                    Ok(SkipDecision::Skip("destination exists".into()))
                } else {
                    Ok(SkipDecision::Copy)
                }
            }

            SkipStrategy::Size => {
                let dest = resolver::resolve(destination).await?;
                if !dest.exists {
                    return Ok(SkipDecision::Copy);
                }
                let src = resolver::resolve(source).await?;
                if src.size.is_some() && src.size == dest.size {
                    Ok(SkipDecision::Skip(format!(
                        "same size: {} bytes",
                        src.size.unwrap_or(0)
                    )))
                } else {
                    Ok(SkipDecision::Copy)
                }
            }

            SkipStrategy::Hash => {
                if !destination.exists().await? {
                    return Ok(SkipDecision::Copy);
                }
                let src = resolver::digest(source).await?;
                let dst = resolver::digest(destination).await?;
                if src.value == dst.value {
                    Ok(SkipDecision::Skip(format!(
                        "same content (hash: {})",
                        src.value
                    )))
                } else {
                    Ok(SkipDecision::Copy)
                }
            }

            SkipStrategy::Custom(predicate) => {
                let src = resolver::resolve(source).await?;
                let dst = resolver::resolve(destination).await?;
                if predicate(&src, &dst) {
                    Ok(SkipDecision::Skip("custom predicate".into()))
                } else {
                    Ok(SkipDecision::Copy)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ferry_core::{
        BackendCapabilities, ByteStream, DirEntry, NodePath, StatInfo, StorageBackend,
    };
    use ferry_providers::MemoryBackend;
    use std::sync::Arc;

    /// Backend that has objects but can neither report a digest nor
    /// stream their content.
    struct OpaqueBackend {
        capabilities: BackendCapabilities,
    }

    impl OpaqueBackend {
        fn new() -> Self {
            Self {
                capabilities: BackendCapabilities::default(),
            }
        }
    }

    #[async_trait]
    impl StorageBackend for OpaqueBackend {
        fn id(&self) -> &str {
            "opaque"
        }

        fn display_name(&self) -> &str {
            "Opaque Store"
        }

        fn capabilities(&self) -> &BackendCapabilities {
            &self.capabilities
        }

        async fn exists(&self, _path: &str) -> FerryResult<bool> {
            Ok(true)
        }

        async fn stat(&self, _path: &str) -> FerryResult<StatInfo> {
            Ok(StatInfo {
                size: 3,
                mtime: None,
                content_digest: None,
                is_dir: false,
            })
        }

        async fn read(&self, path: &str) -> FerryResult<ByteStream> {
            Err(FerryError::Unsupported(path.to_string()))
        }

        async fn write(
            &self,
            path: &str,
            _data: ByteStream,
            _size_hint: Option<u64>,
        ) -> FerryResult<()> {
            Err(FerryError::Unsupported(path.to_string()))
        }

        async fn list(&self, _path: &str) -> FerryResult<Vec<DirEntry>> {
            Ok(Vec::new())
        }

        async fn mkdir_if_absent(&self, _path: &str) -> FerryResult<()> {
            Ok(())
        }

        async fn delete(&self, path: &str, _recursive: bool) -> FerryResult<()> {
            Err(FerryError::Unsupported(path.to_string()))
        }

        async fn rename(&self, from: &str, _to: &str) -> FerryResult<()> {
            Err(FerryError::Unsupported(from.to_string()))
        }
    }

    fn node(backend: &Arc<MemoryBackend>, path: &str) -> Node {
        Node::new(backend.clone(), NodePath::new("mem", path))
    }

    async fn pair(src_content: Option<&[u8]>, dst_content: Option<&[u8]>) -> (Node, Node) {
        let backend = Arc::new(MemoryBackend::new("mem"));
        let src = node(&backend, "src.txt");
        let dst = node(&backend, "dst.txt");
        if let Some(c) = src_content {
            src.write_bytes(c.to_vec()).await.unwrap();
        }
        if let Some(c) = dst_content {
            dst.write_bytes(c.to_vec()).await.unwrap();
        }
        (src, dst)
    }

    #[tokio::test]
    async fn test_never_always_copies() {
        let (src, dst) = pair(Some(b"a"), Some(b"a")).await;
        let eval = SkipEvaluator::new(SkipStrategy::Never);
        assert_eq!(eval.evaluate(&src, &dst).await.unwrap(), SkipDecision::Copy);
    }

    #[tokio::test]
    async fn test_exists_skips_only_when_destination_present() {
        let eval = SkipEvaluator::new(SkipStrategy::Exists);

        let (src, dst) = pair(Some(b"new"), Some(b"old")).await;
        assert_eq!(
            eval.evaluate(&src, &dst).await.unwrap(),
            SkipDecision::Skip("destination exists".into())
        );

        let (src, dst) = pair(Some(b"new"), None).await;
        assert_eq!(eval.evaluate(&src, &dst).await.unwrap(), SkipDecision::Copy);
    }

    #[tokio::test]
    async fn test_size_skips_equal_sizes_even_with_different_content() {
        let eval = SkipEvaluator::new(SkipStrategy::Size);

        // Equal length, different bytes: skipped. This imprecision is
        // the documented contract of the size strategy.
        let (src, dst) = pair(Some(b"hello"), Some(b"world")).await;
        assert_eq!(
            eval.evaluate(&src, &dst).await.unwrap(),
            SkipDecision::Skip("same size: 5 bytes".into())
        );

        let (src, dst) = pair(Some(b"hello!"), Some(b"world")).await;
        assert_eq!(eval.evaluate(&src, &dst).await.unwrap(), SkipDecision::Copy);
    }

    #[tokio::test]
    async fn test_size_copies_when_destination_missing() {
        let eval = SkipEvaluator::new(SkipStrategy::Size);
        let (src, dst) = pair(Some(b"hello"), None).await;
        assert_eq!(eval.evaluate(&src, &dst).await.unwrap(), SkipDecision::Copy);
    }

    #[tokio::test]
    async fn test_hash_compares_content() {
        let eval = SkipEvaluator::new(SkipStrategy::Hash);

        let (src, dst) = pair(Some(b"identical"), Some(b"identical")).await;
        match eval.evaluate(&src, &dst).await.unwrap() {
            SkipDecision::Skip(reason) => {
                assert!(reason.starts_with("same content (hash: "));
            }
            other => panic!("expected skip, got {:?}", other),
        }

        // One byte differs
        let (src, dst) = pair(Some(b"identical"), Some(b"identicaX")).await;
        assert_eq!(eval.evaluate(&src, &dst).await.unwrap(), SkipDecision::Copy);
    }

    #[tokio::test]
    async fn test_hash_copies_when_destination_missing() {
        let eval = SkipEvaluator::new(SkipStrategy::Hash);
        let (src, dst) = pair(Some(b"content"), None).await;
        assert_eq!(eval.evaluate(&src, &dst).await.unwrap(), SkipDecision::Copy);
    }

    #[tokio::test]
    async fn test_custom_predicate_sees_both_sides() {
        // Skip when destination exists and is at least as large
        let eval = SkipEvaluator::new(SkipStrategy::custom(|src, dst| {
            dst.exists && dst.size >= src.size
        }));

        let (src, dst) = pair(Some(b"abc"), Some(b"abcdef")).await;
        assert!(eval.evaluate(&src, &dst).await.unwrap().is_skip());

        let (src, dst) = pair(Some(b"abcdef"), Some(b"abc")).await;
        assert_eq!(eval.evaluate(&src, &dst).await.unwrap(), SkipDecision::Copy);

        // Predicate is called even with an absent destination
        let (src, dst) = pair(Some(b"abc"), None).await;
        assert_eq!(eval.evaluate(&src, &dst).await.unwrap(), SkipDecision::Copy);
    }

    #[tokio::test]
    async fn test_hash_fails_when_digest_cannot_be_supplied_or_computed() {
        let opaque = Arc::new(OpaqueBackend::new());
        let src = Node::new(opaque, NodePath::new("opaque", "blob"));

        // The resolver itself refuses rather than silently degrading
        assert!(matches!(
            resolver::digest(&src).await,
            Err(FerryError::HashUnavailable(_))
        ));

        // And the hash strategy surfaces that refusal instead of
        // falling back to another comparison
        let backend = Arc::new(MemoryBackend::new("mem"));
        let dst = node(&backend, "blob");
        dst.write_bytes(&b"abc"[..]).await.unwrap();

        let eval = SkipEvaluator::new(SkipStrategy::Hash);
        assert!(matches!(
            eval.evaluate(&src, &dst).await,
            Err(FerryError::HashUnavailable(_))
        ));
    }

    #[test]
    fn test_from_name() {
        assert!(matches!(
            SkipStrategy::from_name("never").unwrap(),
            SkipStrategy::Never
        ));
        assert!(matches!(
            SkipStrategy::from_name("hash").unwrap(),
            SkipStrategy::Hash
        ));
        assert!(matches!(
            SkipStrategy::from_name("custom"),
            Err(FerryError::InvalidConfig(_))
        ));
        assert!(matches!(
            SkipStrategy::from_name("bogus"),
            Err(FerryError::InvalidConfig(_))
        ));
    }
}
