//! Storage providers for ferry
//!
//! Backends behind the uniform capability interface, plus the mount
//! configuration layer that turns `mount:path` addresses into nodes.

pub mod local;
pub mod manager;
pub mod memory;
pub mod relative;

pub use local::LocalBackend;
pub use manager::{MountConfig, StorageManager};
pub use memory::MemoryBackend;
pub use relative::RelativeBackend;
