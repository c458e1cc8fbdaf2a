//! Placement handoff between background producers and the tick thread
//!
//! Instance sets and pools are owned by the thread that ticks them.
//! Background work (procedural placement, streaming) sends finished
//! transforms through a [`PlacementSender`]; the tick thread drains the
//! matching [`PlacementQueue`] before it touches any set.

pub mod queue;
pub mod worker;

pub use queue::{placement_channel, PlacementBatch, PlacementMode, PlacementQueue, PlacementSender};
pub use worker::{PlacementWorker, WorkerStep};
