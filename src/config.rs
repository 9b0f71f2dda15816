//! Pipeline configuration
//!
//! Explicit, immutable knobs handed to components at construction. Defaults
//! match what a small deployment wants; larger ones override per instance.

/// Policy knobs for the anomaly detector
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Count that must be exceeded (strictly) within the window before an
    /// alert fires
    pub error_threshold: u64,

    /// Sliding window length, in minutes
    pub window_minutes: i64,

    /// Minimum gap between alerts of the same type for one service,
    /// in minutes
    pub cooldown_minutes: i64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            error_threshold: 5,
            window_minutes: 1,
            cooldown_minutes: 5,
        }
    }
}

/// Bounds applied to inbound ingest requests
#[derive(Debug, Clone)]
pub struct IngestLimits {
    /// Maximum number of records in one batch
    pub max_batch_size: usize,

    /// Maximum message length, in bytes
    pub max_message_bytes: usize,

    /// Maximum service name length, in characters
    pub max_service_chars: usize,
}

impl Default for IngestLimits {
    fn default() -> Self {
        Self {
            max_batch_size: 1000,
            max_message_bytes: 64 * 1024,
            max_service_chars: 100,
        }
    }
}
