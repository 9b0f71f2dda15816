//! Core types for the log pipeline
//!
//! All wire-facing types use camelCase JSON serialization; enumerated values
//! keep the uppercase forms producers already send.

use crate::error::{Result, WardenError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Severity level of a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// Whether this level participates in error-rate detection
    pub fn is_error_class(self) -> bool {
        matches!(self, LogLevel::Error | LogLevel::Fatal)
    }

    /// Uppercase wire form of the level
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single inbound log record from a producer
///
/// Untrusted input: the publisher validates and sanitizes it before anything
/// crosses the ingest boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    /// Event time; stamped with the publish time when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Severity level
    pub level: LogLevel,

    /// Free-text message
    pub message: String,

    /// Originating service name
    pub service: String,

    /// Optional key-value metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl IngestRequest {
    /// Create a request with the required fields
    pub fn new(level: LogLevel, message: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            timestamp: None,
            level,
            message: message.into(),
            service: service.into(),
            metadata: HashMap::new(),
        }
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set an explicit event timestamp
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// A batch of inbound log records submitted together
///
/// Batches are not atomic: each record is accepted or rejected on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchIngestRequest {
    /// Records to ingest, in submission order
    pub logs: Vec<IngestRequest>,
}

/// Acceptance status reported back to the producer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IngestStatus {
    Accepted,
    Failed,
}

/// Receipt for a single ingested record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReceipt {
    /// Pipeline-assigned event identifier
    pub id: Uuid,

    /// Whether submission to the transport was initiated
    pub status: IngestStatus,

    /// When the receipt was issued
    pub timestamp: DateTime<Utc>,
}

impl IngestReceipt {
    /// Receipt for a record whose submission was initiated
    pub fn accepted(id: Uuid) -> Self {
        Self {
            id,
            status: IngestStatus::Accepted,
            timestamp: Utc::now(),
        }
    }

    /// Receipt for a record that never reached the transport
    pub fn failed(id: Uuid) -> Self {
        Self {
            id,
            status: IngestStatus::Failed,
            timestamp: Utc::now(),
        }
    }
}

/// Receipt for a batch ingest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchIngestReceipt {
    /// Number of records accepted
    pub accepted_count: usize,

    /// Number of records that failed validation or serialization
    pub failed_count: usize,

    /// Identifiers of the accepted records, in submission order
    pub accepted_ids: Vec<Uuid>,

    /// When the batch finished processing
    pub timestamp: DateTime<Utc>,
}

/// Event time as it appears on the wire
///
/// Producers encode event time either as fractional epoch seconds or as an
/// ISO-8601 string; both forms decode here and [`resolve`](Self::resolve)
/// normalizes them to an instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    /// Epoch seconds, fractional part allowed
    Epoch(f64),
    /// ISO-8601 string with offset (RFC 3339)
    Iso(String),
}

impl WireTimestamp {
    /// Normalize to an instant
    ///
    /// Fractional epoch seconds split into whole seconds plus nanoseconds by
    /// truncation, never rounding, so a value close to the next second stays
    /// on its own side of the boundary.
    pub fn resolve(&self) -> Result<DateTime<Utc>> {
        match self {
            WireTimestamp::Epoch(epoch) => {
                let secs = *epoch as i64;
                let nanos = ((epoch - secs as f64) * 1_000_000_000.0) as u32;
                DateTime::from_timestamp(secs, nanos).ok_or_else(|| {
                    WardenError::Validation(format!("epoch timestamp out of range: {epoch}"))
                })
            }
            WireTimestamp::Iso(text) => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    WardenError::Validation(format!("invalid ISO-8601 timestamp '{text}': {e}"))
                }),
        }
    }
}

impl From<DateTime<Utc>> for WireTimestamp {
    fn from(timestamp: DateTime<Utc>) -> Self {
        WireTimestamp::Iso(timestamp.to_rfc3339())
    }
}

/// Wire-level wrapper pairing the pipeline-assigned identifier with an event
///
/// The identifier here is authoritative: it equals the id returned in the
/// producer's receipt and keys the stream so per-event ordering survives
/// partitioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Pipeline-assigned event identifier
    pub id: Uuid,

    /// The event payload
    pub event: WireRecord,
}

impl Envelope {
    /// Serialize to the JSON wire form
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse from the JSON wire form
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Log record as carried inside an envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRecord {
    /// Event time in either wire encoding; consumers stamp receipt time
    /// when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<WireTimestamp>,

    /// Severity level
    pub level: LogLevel,

    /// Free-text message
    pub message: String,

    /// Originating service name
    pub service: String,

    /// Optional key-value metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A normalized log event as persisted by the stream consumer
///
/// Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    /// Pipeline-assigned identifier
    pub id: Uuid,

    /// Normalized event time
    pub timestamp: DateTime<Utc>,

    /// Severity level
    pub level: LogLevel,

    /// Sanitized message text
    pub message: String,

    /// Originating service name
    pub service: String,

    /// Key-value metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// When the consumer persisted the record
    pub created_at: DateTime<Utc>,
}

/// Alert severity tier, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// Uppercase wire form of the severity
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detection rule that produced an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    HighErrorRate,
}

impl AlertType {
    /// Wire form of the alert type
    pub fn as_str(self) -> &'static str {
        match self {
            AlertType::HighErrorRate => "HIGH_ERROR_RATE",
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An alert raised by the anomaly detector
///
/// Immutable except for the acknowledgement fields, which transition exactly
/// once when an operator acts on the alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Unique alert identifier
    pub id: Uuid,

    /// Rule that raised the alert
    #[serde(rename = "type")]
    pub alert_type: AlertType,

    /// Severity derived from the triggering count, never caller-supplied
    pub severity: Severity,

    /// Human-readable description of what fired
    pub message: String,

    /// Service the triggering event came from
    pub service: String,

    /// When the rule fired
    pub detected_at: DateTime<Utc>,

    /// Whether an operator has acknowledged the alert
    pub acknowledged: bool,

    /// Who acknowledged it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<String>,

    /// When it was acknowledged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Create an unacknowledged alert detected now
    pub fn new(
        alert_type: AlertType,
        severity: Severity,
        message: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert_type,
            severity,
            message: message.into(),
            service: service.into(),
            detected_at: Utc::now(),
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
        }
    }

    /// Mark the alert acknowledged
    ///
    /// Fails if the alert was already acknowledged; the transition happens at
    /// most once and the original acknowledger is never overwritten.
    pub fn acknowledge(&mut self, acknowledged_by: impl Into<String>) -> Result<()> {
        if self.acknowledged {
            return Err(WardenError::AlreadyAcknowledged(self.id));
        }
        self.acknowledged = true;
        self.acknowledged_by = Some(acknowledged_by.into());
        self.acknowledged_at = Some(Utc::now());
        Ok(())
    }
}
