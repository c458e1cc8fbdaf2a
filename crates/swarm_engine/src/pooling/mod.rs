//! Promoted-object pooling
//!
//! One [`ObjectPool`] per instance set holds the individually simulated
//! objects that stand in for instances close to the observer. Objects are
//! created lazily up to a fixed budget and reused; the
//! [`CoordinateAdapter`] maps transforms across the instance/object boundary.

pub mod object;
pub mod coordinate;
pub mod object_pool;

pub use object::{ActivationFlags, HandoffData, ObjectFactory, PooledObject, Promotable, Promotion};
pub use coordinate::CoordinateAdapter;
pub use object_pool::{ObjectKey, ObjectPool, PoolStats};
