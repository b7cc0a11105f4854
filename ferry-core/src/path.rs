//! Mount-qualified path abstraction

use crate::error::{FerryError, FerryResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Path to an object inside a named mount
///
/// The textual form is `mount:seg/seg/name`. Segments are normalized at
/// construction: empty segments and `.` disappear, `..` pops the previous
/// segment and can never climb above the mount root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodePath {
    /// Mount name (e.g., "home", "uploads")
    pub mount: String,
    /// Path segments relative to the mount root
    pub segments: Vec<String>,
}

impl NodePath {
    pub fn new(mount: impl Into<String>, path: impl AsRef<str>) -> Self {
        let mut segments = Vec::new();
        push_normalized(&mut segments, path.as_ref());
        Self {
            mount: mount.into(),
            segments,
        }
    }

    pub fn root(mount: impl Into<String>) -> Self {
        Self {
            mount: mount.into(),
            segments: Vec::new(),
        }
    }

    /// Parse the `mount:path` address form.
    pub fn parse(address: &str) -> FerryResult<Self> {
        let (mount, path) = address
            .split_once(':')
            .ok_or_else(|| FerryError::InvalidPath(address.to_string()))?;
        if mount.is_empty() {
            return Err(FerryError::InvalidPath(address.to_string()));
        }
        Ok(Self::new(mount, path))
    }

    pub fn join(&self, name: impl AsRef<str>) -> Self {
        let mut segments = self.segments.clone();
        push_normalized(&mut segments, name.as_ref());
        Self {
            mount: self.mount.clone(),
            segments,
        }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            None
        } else {
            let mut segments = self.segments.clone();
            segments.pop();
            Some(Self {
                mount: self.mount.clone(),
                segments,
            })
        }
    }

    /// Filename with extension, if not the mount root.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    /// Filename without its extension.
    pub fn stem(&self) -> Option<&str> {
        self.name()
            .map(|n| n.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(n))
    }

    /// Extension without the dot.
    pub fn extension(&self) -> Option<&str> {
        self.name()
            .and_then(|n| n.rsplit_once('.'))
            .map(|(_, ext)| ext)
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Mount-relative path string (`seg/seg/name`, empty for the root).
    pub fn relative(&self) -> String {
        self.segments.join("/")
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.mount, self.relative())
    }
}

fn push_normalized(segments: &mut Vec<String>, path: &str) {
    for part in path.split('/').filter(|s| !s.is_empty()) {
        if part == ".." {
            segments.pop();
        } else if part != "." {
            segments.push(part.to_string());
        }
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let path = NodePath::new("home", "documents/reports/q4.pdf");
        assert_eq!(path.mount, "home");
        assert_eq!(path.segments, vec!["documents", "reports", "q4.pdf"]);
    }

    #[test]
    fn test_new_handles_empty_segments() {
        let path = NodePath::new("home", "//documents//reports//");
        assert_eq!(path.segments, vec!["documents", "reports"]);
    }

    #[test]
    fn test_root() {
        let path = NodePath::root("uploads");
        assert_eq!(path.mount, "uploads");
        assert!(path.is_root());
    }

    #[test]
    fn test_parse() {
        let path = NodePath::parse("home:documents/file.txt").unwrap();
        assert_eq!(path.mount, "home");
        assert_eq!(path.segments, vec!["documents", "file.txt"]);
    }

    #[test]
    fn test_parse_root() {
        let path = NodePath::parse("home:").unwrap();
        assert!(path.is_root());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(NodePath::parse("no-colon-here").is_err());
        assert!(NodePath::parse(":path/only").is_err());
    }

    #[test]
    fn test_join() {
        let root = NodePath::root("home");
        let path = root.join("documents").join("file.txt");
        assert_eq!(path.segments, vec!["documents", "file.txt"]);
    }

    #[test]
    fn test_dotdot_cannot_escape_root() {
        let path = NodePath::new("home", "../../etc/passwd");
        assert_eq!(path.segments, vec!["etc", "passwd"]);

        let path = NodePath::new("home", "a/../../b");
        assert_eq!(path.segments, vec!["b"]);
    }

    #[test]
    fn test_join_with_dot_and_dotdot() {
        let path = NodePath::new("home", "documents/reports");
        assert_eq!(
            path.join("../pictures").segments,
            vec!["documents", "pictures"]
        );
        assert_eq!(
            path.join("./2024").segments,
            vec!["documents", "reports", "2024"]
        );
    }

    #[test]
    fn test_parent() {
        let path = NodePath::new("home", "documents/file.txt");
        assert_eq!(path.parent().unwrap().segments, vec!["documents"]);
        assert!(NodePath::root("home").parent().is_none());
    }

    #[test]
    fn test_name_stem_extension() {
        let path = NodePath::new("home", "archive.tar.gz");
        assert_eq!(path.name(), Some("archive.tar.gz"));
        assert_eq!(path.stem(), Some("archive.tar"));
        assert_eq!(path.extension(), Some("gz"));

        let bare = NodePath::new("home", "README");
        assert_eq!(bare.stem(), Some("README"));
        assert!(bare.extension().is_none());
    }

    #[test]
    fn test_relative_and_display() {
        let path = NodePath::new("s3", "bucket/key.bin");
        assert_eq!(path.relative(), "bucket/key.bin");
        assert_eq!(format!("{}", path), "s3:bucket/key.bin");

        let root = NodePath::root("s3");
        assert_eq!(root.relative(), "");
        assert_eq!(format!("{}", root), "s3:");
    }

    #[test]
    fn test_equality() {
        let a = NodePath::new("home", "/docs/file");
        let b = NodePath::new("home", "docs//file");
        assert_eq!(a, b);
    }
}
