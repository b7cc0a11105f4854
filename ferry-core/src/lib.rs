//! ferry core
//!
//! Core traits and types for the unified storage interface: the backend
//! capability contract, the mount-qualified path form, and the `Node`
//! handle everything else operates through.

pub mod backend;
pub mod error;
pub mod node;
pub mod path;

pub use backend::{
    once_stream, BackendCapabilities, ByteStream, DirEntry, StatInfo, StorageBackend,
};
pub use error::{FerryError, FerryResult};
pub use node::Node;
pub use path::NodePath;
