//! Swarm notifications
//!
//! Ticks queue [`SwarmEvent`]s; [`EventQueue::dispatch`] hands each one to
//! the handlers registered for its kind. A handler returning `true`
//! consumes the event. Events nobody consumed stay available to
//! [`EventQueue::drain`] for consumers that prefer polling.

use std::collections::HashMap;

use crate::instancing::{InstanceId, MeshKey};

/// Event type identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwarmEventKind {
    /// The number of reached targets in a set changed
    TargetsReached,
    /// Every live instance of a set reached its target
    AllTargetsReached,
    /// An instance became near field
    Promoted,
    /// An instance returned to far field
    Demoted,
}

/// Notification raised during a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwarmEvent {
    /// Reached count changed to a non-zero value
    TargetsReached {
        /// Instance set
        key: MeshKey,
        /// Instances currently at their target
        count: usize,
    },
    /// Raised once each time a set runs out of unfinished targets
    AllTargetsReached {
        /// Instance set
        key: MeshKey,
        /// Instances currently at their target
        count: usize,
    },
    /// Instance bound to a pooled object
    Promoted {
        /// Instance set
        key: MeshKey,
        /// Promoted instance
        id: InstanceId,
    },
    /// Instance released its pooled object
    Demoted {
        /// Instance set
        key: MeshKey,
        /// Demoted instance
        id: InstanceId,
    },
}

impl SwarmEvent {
    /// Kind used for handler registration
    pub fn kind(&self) -> SwarmEventKind {
        match self {
            Self::TargetsReached { .. } => SwarmEventKind::TargetsReached,
            Self::AllTargetsReached { .. } => SwarmEventKind::AllTargetsReached,
            Self::Promoted { .. } => SwarmEventKind::Promoted,
            Self::Demoted { .. } => SwarmEventKind::Demoted,
        }
    }

    /// Instance set the event belongs to
    pub fn key(&self) -> &MeshKey {
        match self {
            Self::TargetsReached { key, .. }
            | Self::AllTargetsReached { key, .. }
            | Self::Promoted { key, .. }
            | Self::Demoted { key, .. } => key,
        }
    }
}

/// Event handler trait
/// Returns true if event was consumed (stops forwarding)
pub trait SwarmEventHandler {
    /// Handle an event, return true if consumed
    fn on_event(&mut self, event: &SwarmEvent) -> bool;
}

impl<F> SwarmEventHandler for F
where
    F: FnMut(&SwarmEvent) -> bool,
{
    fn on_event(&mut self, event: &SwarmEvent) -> bool {
        self(event)
    }
}

/// Event queue with per-kind handler registration
#[derive(Default)]
pub struct EventQueue {
    pending: Vec<SwarmEvent>,
    unhandled: Vec<SwarmEvent>,
    handlers: HashMap<SwarmEventKind, Vec<Box<dyn SwarmEventHandler>>>,
}

impl EventQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind
    pub fn register_handler(&mut self, kind: SwarmEventKind, handler: Box<dyn SwarmEventHandler>) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    /// Queue an event for the next dispatch
    pub fn send(&mut self, event: SwarmEvent) {
        self.pending.push(event);
    }

    /// Events queued but not yet dispatched
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Deliver queued events; unconsumed ones are kept for [`drain`](Self::drain)
    pub fn dispatch(&mut self) {
        for event in std::mem::take(&mut self.pending) {
            let consumed = self
                .handlers
                .get_mut(&event.kind())
                .is_some_and(|handlers| handlers.iter_mut().any(|handler| handler.on_event(&event)));
            if !consumed {
                self.unhandled.push(event);
            }
        }
    }

    /// Dispatch, then take every event no handler consumed
    pub fn drain(&mut self) -> Vec<SwarmEvent> {
        self.dispatch();
        std::mem::take(&mut self.unhandled)
    }

    /// Drop every queued event
    pub fn clear(&mut self) {
        self.pending.clear();
        self.unhandled.clear();
    }
}
