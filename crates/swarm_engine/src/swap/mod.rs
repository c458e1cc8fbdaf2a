//! Near/far field swapping and the per-tick frame it writes into

pub mod frame;
pub mod scheduler;

pub use frame::CommitStats;
pub use scheduler::{SwapCounts, SwapScheduler};
