// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for projection operations

use thiserror::Error;

/// Errors that can occur while projecting events into the state tables
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// Event payload could not be decoded
    #[error("Invalid payload for {event_type}: {reason}")]
    InvalidPayload { event_type: String, reason: String },

    /// Payload decoded but references data it does not carry
    #[error("Inconsistent payload: {0}")]
    InconsistentPayload(String),

    /// Event type is not part of the catalog for this schema version
    #[error("Unknown event type {event_type} for schema version {schema_version}")]
    UnknownEventType {
        event_type: String,
        schema_version: u8,
    },

    /// Schema version other than 1 or 2
    #[error("Unsupported event schema version: {0}")]
    UnsupportedSchemaVersion(u8),

    /// A concurrent writer won the conditional write
    #[error("Conditional check failed for {pk}")]
    ConditionalCheckFailed { pk: String },

    /// Backend or network failure
    #[error("Store error: {0}")]
    Store(String),

    /// A row of the wrong kind is stored under the key
    #[error("Unexpected entry under {pk}: expected {expected}")]
    UnexpectedEntry { pk: String, expected: &'static str },

    /// Fan-out rows left unwritten after the retry budget ran out
    #[error("Batch write left {unprocessed} items unprocessed after {attempts} attempts")]
    BatchWriteExhausted { unprocessed: usize, attempts: usize },

    /// Row serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type for projection operations
pub type ProjectionResult<T> = Result<T, ProjectionError>;

impl ProjectionError {
    /// Redelivering the same event may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProjectionError::ConditionalCheckFailed { .. } | ProjectionError::Store(_)
        )
    }

    /// Redelivering the same event can never succeed
    pub fn is_fatal(&self) -> bool {
        !self.is_retryable() && !matches!(self, ProjectionError::BatchWriteExhausted { .. })
    }

    pub(crate) fn invalid_payload(event_type: &str, err: impl std::fmt::Display) -> Self {
        ProjectionError::InvalidPayload {
            event_type: event_type.to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ProjectionError {
    fn from(err: serde_json::Error) -> Self {
        ProjectionError::Serialization(err.to_string())
    }
}
