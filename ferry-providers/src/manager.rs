//! Mount configuration and the storage manager

use ferry_core::{
    error::{FerryError, FerryResult},
    Node, NodePath, StorageBackend,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::local::LocalBackend;
use crate::memory::MemoryBackend;
use crate::relative::RelativeBackend;

/// One mount definition
///
/// `kind` selects the backend implementation; `path` is the local root
/// for `local` mounts and the `mount:base` target for `relative` mounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub path: Option<String>,
}

/// Registry of named mounts
///
/// Backends are constructed once from configuration and shared behind
/// `Arc` for the process lifetime; nodes reference them by mount name.
pub struct StorageManager {
    mounts: RwLock<HashMap<String, Arc<dyn StorageBackend>>>,
}

impl StorageManager {
    pub fn new() -> Self {
        Self {
            mounts: RwLock::new(HashMap::new()),
        }
    }

    /// Build mounts from a configuration list. Relative mounts must
    /// name an already-configured target, so order matters.
    pub fn configure(&self, configs: Vec<MountConfig>) -> FerryResult<()> {
        for config in configs {
            let backend: Arc<dyn StorageBackend> = match config.kind.as_str() {
                "local" => {
                    let root = config.path.ok_or_else(|| {
                        FerryError::InvalidConfig(format!(
                            "local mount '{}' requires a path",
                            config.name
                        ))
                    })?;
                    Arc::new(LocalBackend::new(config.name.clone(), root))
                }
                "memory" => Arc::new(MemoryBackend::new(config.name.clone())),
                "relative" => {
                    let target = config.path.ok_or_else(|| {
                        FerryError::InvalidConfig(format!(
                            "relative mount '{}' requires a 'mount:base' path",
                            config.name
                        ))
                    })?;
                    let target = NodePath::parse(&target)?;
                    let inner = self.get(&target.mount)?;
                    Arc::new(RelativeBackend::new(
                        config.name.clone(),
                        inner,
                        target.relative(),
                    ))
                }
                other => {
                    return Err(FerryError::InvalidConfig(format!(
                        "unknown mount type '{}' for '{}'",
                        other, config.name
                    )))
                }
            };
            self.add_mount(backend);
        }
        Ok(())
    }

    /// Register a backend under its own id.
    pub fn add_mount(&self, backend: Arc<dyn StorageBackend>) {
        tracing::debug!(mount = backend.id(), kind = backend.display_name(), "mount added");
        self.mounts
            .write()
            .unwrap()
            .insert(backend.id().to_string(), backend);
    }

    pub fn unmount(&self, name: &str) -> bool {
        self.mounts.write().unwrap().remove(name).is_some()
    }

    pub fn mount_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.mounts.read().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn get(&self, name: &str) -> FerryResult<Arc<dyn StorageBackend>> {
        self.mounts
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| FerryError::MountNotFound(name.to_string()))
    }

    /// Resolve a `mount:path` address to a node.
    pub fn node(&self, address: &str) -> FerryResult<Node> {
        let path = NodePath::parse(address)?;
        let backend = self.get(&path.mount)?;
        Ok(Node::new(backend, path))
    }
}

impl Default for StorageManager {
    fn default() -> Self {
        Self::new()
    }
}
