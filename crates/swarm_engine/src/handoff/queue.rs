//! Placement channel

use crossbeam::channel::{unbounded, Receiver, Sender};

use crate::foundation::math::Transform;
use crate::instancing::MeshKey;

/// How a batch is applied to its set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementMode {
    /// Replace every instance of the set
    Replace,
    /// Add after the existing instances
    Append,
}

/// Transforms produced off the tick thread for one set
#[derive(Debug, Clone)]
pub struct PlacementBatch {
    /// Target set
    pub key: MeshKey,
    /// Instance transforms
    pub transforms: Vec<Transform>,
    /// Replace or append
    pub mode: PlacementMode,
}

impl PlacementBatch {
    /// Batch replacing the set's instances
    pub fn replace(key: impl Into<MeshKey>, transforms: Vec<Transform>) -> Self {
        Self {
            key: key.into(),
            transforms,
            mode: PlacementMode::Replace,
        }
    }

    /// Batch appended to the set's instances
    pub fn append(key: impl Into<MeshKey>, transforms: Vec<Transform>) -> Self {
        Self {
            key: key.into(),
            transforms,
            mode: PlacementMode::Append,
        }
    }
}

/// Producer half; cheap to clone across threads
#[derive(Debug, Clone)]
pub struct PlacementSender {
    sender: Sender<PlacementBatch>,
}

impl PlacementSender {
    /// Send a batch; returns `false` once the queue has been dropped
    pub fn send(&self, batch: PlacementBatch) -> bool {
        self.sender.send(batch).is_ok()
    }
}

/// Consumer half, owned by the tick thread
#[derive(Debug)]
pub struct PlacementQueue {
    receiver: Receiver<PlacementBatch>,
}

impl PlacementQueue {
    /// Take every batch sent so far without blocking
    pub fn drain(&self) -> Vec<PlacementBatch> {
        self.receiver.try_iter().collect()
    }

    /// Batches waiting
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether no batch is waiting
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

/// Create a connected sender/queue pair
pub fn placement_channel() -> (PlacementSender, PlacementQueue) {
    let (sender, receiver) = unbounded();
    (PlacementSender { sender }, PlacementQueue { receiver })
}
