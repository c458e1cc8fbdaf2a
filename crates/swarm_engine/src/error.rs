//! Error types for object spawning
//!
//! Hot-path operations (acquire, promote, tick) never return these; they
//! surface failures as `None`/`false` plus a log line. These errors only
//! cross the [`ObjectFactory`](crate::pooling::ObjectFactory) boundary.

/// The factory could not find the world/simulation context it spawns into
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("could not resolve a simulation context from {context}")]
pub struct ContextResolutionError {
    /// Description of the context object that failed to resolve
    pub context: String,
}

impl ContextResolutionError {
    /// Create a new error for the named context
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
        }
    }
}

/// Failure to create a pooled object
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SpawnError {
    /// No simulation context was available
    #[error(transparent)]
    Context(#[from] ContextResolutionError),

    /// The underlying engine refused to create the object
    #[error("spawn rejected: {0}")]
    Rejected(String),
}
