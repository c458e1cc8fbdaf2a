//! Batched instance storage
//!
//! The swarm never talks to a renderer directly. It drives an
//! [`InstanceBackend`], addressing instances by stable [`InstanceId`] and
//! resolving to a transient [`SlotIndex`] only inside a single call.

pub mod ids;
pub mod mesh_key;
pub mod backend;
pub mod instance_buffer;

pub use ids::{InstanceId, SlotIndex};
pub use mesh_key::MeshKey;
pub use backend::InstanceBackend;
pub use instance_buffer::{InstanceBuffer, InstanceBufferStats, InstanceData, CUSTOM_DATA_CHANNELS};
