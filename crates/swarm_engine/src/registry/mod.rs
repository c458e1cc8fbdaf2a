//! Instance Registry
//!
//! Maps a [`MeshKey`](crate::instancing::MeshKey) to an [`InstanceSet`]: the
//! batched backend, the per-instance movement/swap records, the shared
//! movement configuration and the near-field pool.

pub mod record;
pub mod instance_set;
pub mod instance_registry;

pub use record::{FieldState, InstanceRecord, DEFAULT_SPEED};
pub use instance_set::{InstanceSet, NearFieldInfo};
pub use instance_registry::InstanceRegistry;
