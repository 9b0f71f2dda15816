//! Error types for logwarden

use thiserror::Error;

/// Errors that can occur in the log pipeline
#[derive(Debug, Error)]
pub enum WardenError {
    /// Transport connection failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// Inbound request rejected before any side effect occurred
    #[error("Validation error: {0}")]
    Validation(String),

    /// Submission failure
    #[error("Failed to submit event to subject '{subject}': {reason}")]
    Publish {
        subject: String,
        reason: String,
    },

    /// Subscribe failure
    #[error("Failed to subscribe to subject '{subject}': {reason}")]
    Subscribe {
        subject: String,
        reason: String,
    },

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stream/topic creation or management error
    #[error("Stream error: {0}")]
    Stream(String),

    /// Consumer/subscription creation or management error
    #[error("Consumer error: {0}")]
    Consumer(String),

    /// Delivery failure reported after submission was accepted
    #[error("Transport error: {0}")]
    Transport(String),

    /// Event or alert store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Acknowledgement of an alert that was already acknowledged
    #[error("Alert {0} is already acknowledged")]
    AlreadyAcknowledged(uuid::Uuid),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, WardenError>;
