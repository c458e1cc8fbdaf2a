//! Instance set keys

use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic key of an instance set, typically the mesh it renders
///
/// Each key owns its own backend, metadata list and object pool.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MeshKey(String);

impl MeshKey {
    /// Create a key from a name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the human-readable name for this key
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MeshKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for MeshKey {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for MeshKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
