//! Error types for the registry.

use crate::subscriptions::HandlerError;
use thiserror::Error;

/// Main error type for registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Topic {topic:?} is full ({limit} subscribers)")]
    TopicFull { topic: String, limit: usize },

    #[error("Handler for topic {topic:?} failed: {source}")]
    HandlerFailed {
        topic: String,
        #[source]
        source: HandlerError,
    },
}

impl RegistryError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        RegistryError::InvalidArgument(msg.into())
    }
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
