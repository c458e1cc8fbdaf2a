//! Instance identity types
//!
//! [`InstanceId`] is the durable identity of a batched instance. [`SlotIndex`]
//! is where that instance currently sits inside a backend's storage and is
//! invalidated by any add or remove. The only bridge from one to the other is
//! [`InstanceBackend::resolve`](super::InstanceBackend::resolve); records and
//! tick buffers store ids, never slots.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable opaque identity of a batched instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Wrap a raw backend identifier
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw backend identifier
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Current storage position of an instance inside a backend
///
/// Only valid until the backend's next structural mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotIndex(usize);

impl SlotIndex {
    /// Wrap a storage position
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Storage position
    pub const fn get(self) -> usize {
        self.0
    }
}
