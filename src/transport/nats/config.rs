//! NATS transport configuration

use crate::error::{Result, WardenError};

/// Storage backend for the JetStream stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// Durable file-backed storage
    File,
    /// Fast, volatile in-memory storage
    Memory,
}

/// Configuration for the NATS JetStream transport
///
/// Immutable once the transport is built; changing limits means
/// reconnecting with a new config.
#[derive(Debug, Clone)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,

    /// JetStream stream name
    pub stream_name: String,

    /// Subject prefix; payloads are submitted to `<prefix>.<key>`
    pub subject_prefix: String,

    /// Stream storage backend
    pub storage: StorageType,

    /// Maximum messages retained (-1 = unlimited)
    pub max_messages: i64,

    /// Maximum message age in seconds (0 = unlimited)
    pub max_age_secs: u64,

    /// Maximum stream size in bytes (-1 = unlimited)
    pub max_bytes: i64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Optional authentication token
    pub token: Option<String>,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://127.0.0.1:4222".to_string(),
            stream_name: "LOG_EVENTS".to_string(),
            subject_prefix: "logs.events".to_string(),
            storage: StorageType::File,
            max_messages: -1,
            max_age_secs: 0,
            max_bytes: -1,
            connect_timeout_secs: 5,
            request_timeout_secs: 10,
            token: None,
        }
    }
}

impl NatsConfig {
    /// Validate the configuration before connecting
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(WardenError::Config("NATS url must not be empty".to_string()));
        }
        if self.stream_name.is_empty() {
            return Err(WardenError::Config(
                "stream name must not be empty".to_string(),
            ));
        }
        if self.subject_prefix.is_empty() || self.subject_prefix.contains('>') {
            return Err(WardenError::Config(format!(
                "invalid subject prefix '{}'",
                self.subject_prefix
            )));
        }
        Ok(())
    }

    /// Full subject for a keyed submission
    pub fn subject_for(&self, key: &str) -> String {
        format!("{}.{}", self.subject_prefix, key)
    }

    /// Wildcard subject covering every event under the prefix
    pub fn wildcard_subject(&self) -> String {
        format!("{}.>", self.subject_prefix)
    }

    /// Subjects bound to the JetStream stream
    pub fn stream_subjects(&self) -> Vec<String> {
        vec![self.wildcard_subject()]
    }
}
