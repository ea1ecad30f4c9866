use thiserror::Error;

use crate::domain::todo::{Todo, TodoId};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("todo {0} not found")]
    NotFound(TodoId),
    #[error("internal failure: {0:#}")]
    Internal(anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Why a write was refused before reaching the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("subject must not be empty")]
    EmptySubject,
    #[error("id must not be zero")]
    MissingId,
}

/// Result of a create or update that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Persisted(Todo),
    Rejected(Rejection),
}

impl Outcome {
    pub fn record(&self) -> Option<&Todo> {
        match self {
            Outcome::Persisted(t) => Some(t),
            Outcome::Rejected(_) => None,
        }
    }

    /// Flattens to a record, with a rejection becoming the zero-value `Todo`.
    pub fn into_record(self) -> Todo {
        match self {
            Outcome::Persisted(t) => t,
            Outcome::Rejected(_) => Todo::default(),
        }
    }
}
