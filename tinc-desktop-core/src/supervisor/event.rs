//! Worker lifecycle events
//!
//! Emitted by the manager so presentation layers can follow workers
//! without polling the registry.

use crate::error::TerminationError;

/// Lifecycle transitions of a registered worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// A worker was spawned and registered
    Started { name: String },

    /// A worker terminated and its registry entry was removed
    Stopped {
        name: String,
        error: Option<TerminationError>,
    },
}

impl WorkerEvent {
    /// Network the event refers to
    pub fn name(&self) -> &str {
        match self {
            WorkerEvent::Started { name } | WorkerEvent::Stopped { name, .. } => name,
        }
    }
}

impl std::fmt::Display for WorkerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerEvent::Started { name } => write!(f, "{}: started", name),
            WorkerEvent::Stopped { name, error: None } => write!(f, "{}: stopped", name),
            WorkerEvent::Stopped {
                name,
                error: Some(e),
            } => write!(f, "{}: stopped ({})", name, e),
        }
    }
}
