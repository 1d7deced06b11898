//! Typed error hierarchy for TaskFlow.
//!
//! `TaskflowError` is returned at the board's module boundaries (forms,
//! propagator, views, HTTP handlers). The store itself works in
//! `anyhow::Result` and wraps the not-found cases in this enum so callers
//! can recover them with `downcast_ref`.

use thiserror::Error;
use uuid::Uuid;

/// Errors from the board subsystem and its store.
#[derive(Debug, Error)]
pub enum TaskflowError {
    #[error("Project {id} not found")]
    ProjectNotFound { id: Uuid },

    #[error("Ticket {id} not found")]
    TicketNotFound { id: Uuid },

    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("Invalid status '{value}'")]
    InvalidStatus { value: String },

    #[error("Not signed in")]
    Unauthenticated,

    #[error("{0:#}")]
    Store(#[source] anyhow::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskflowError {
    /// Wrap a store failure, unwrapping a `TaskflowError` that was carried
    /// through `anyhow` so not-found cases keep their variant.
    pub fn from_store(err: anyhow::Error) -> Self {
        match err.downcast::<TaskflowError>() {
            Ok(typed) => typed,
            Err(other) => TaskflowError::Store(other),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TaskflowError::ProjectNotFound { .. } | TaskflowError::TicketNotFound { .. }
        )
    }
}
