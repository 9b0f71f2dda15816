//! Log event publisher — the ingest boundary
//!
//! Validates, sanitizes, identifies, and submits inbound log records to the
//! stream transport. Acceptance is fire-and-forget: a receipt says submission
//! was initiated, and the transport's confirmation only ever reaches the
//! logs, never the producer.

use crate::config::IngestLimits;
use crate::error::{Result, WardenError};
use crate::sanitize;
use crate::transport::EventTransport;
use crate::types::{
    BatchIngestReceipt, BatchIngestRequest, Envelope, IngestReceipt, IngestRequest, IngestStatus,
    WireRecord, WireTimestamp,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Publishes sanitized log events to the stream transport
pub struct LogPublisher {
    transport: Arc<dyn EventTransport>,
    limits: IngestLimits,
}

impl LogPublisher {
    /// Create a publisher over a transport with explicit limits
    pub fn new(transport: Arc<dyn EventTransport>, limits: IngestLimits) -> Self {
        Self { transport, limits }
    }

    /// Ingest a single log record
    ///
    /// Returns an `ACCEPTED` receipt as soon as submission is initiated; the
    /// later delivery confirmation (or failure) is observed by a detached
    /// task and logged. A `FAILED` receipt means the envelope could not be
    /// serialized and nothing was submitted. Validation failures reject the
    /// request outright with no side effect.
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestReceipt> {
        self.validate(&request)?;

        let id = Uuid::new_v4();
        let record = self.scrub(request);
        let envelope = Envelope { id, event: record };

        let payload = match envelope.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(event_id = %id, error = %e, "Failed to serialize log event");
                return Ok(IngestReceipt::failed(id));
            }
        };

        let handle = self.transport.submit(&id.to_string(), payload.into()).await;

        // The receipt below is already final; the confirmation outcome is
        // observed off the request path.
        tokio::spawn(async move {
            match handle.confirm().await {
                Ok(sequence) => {
                    tracing::debug!(event_id = %id, sequence, "Log event delivered");
                }
                Err(e) => {
                    tracing::error!(event_id = %id, error = %e, "Failed to deliver log event");
                }
            }
        });

        tracing::debug!(event_id = %id, "Log event accepted");

        Ok(IngestReceipt::accepted(id))
    }

    /// Ingest a batch of log records
    ///
    /// Not atomic: records are submitted sequentially, each accepted or
    /// rejected on its own, and the receipt enumerates exactly which
    /// identifiers were accepted. An empty or oversized batch is rejected
    /// as a whole before any record is processed.
    pub async fn ingest_batch(&self, batch: BatchIngestRequest) -> Result<BatchIngestReceipt> {
        if batch.logs.is_empty() {
            return Err(WardenError::Validation(
                "batch contains no log events".to_string(),
            ));
        }
        if batch.logs.len() > self.limits.max_batch_size {
            return Err(WardenError::Validation(format!(
                "batch of {} events exceeds the limit of {}",
                batch.logs.len(),
                self.limits.max_batch_size
            )));
        }

        let total = batch.logs.len();
        let mut accepted_ids = Vec::with_capacity(total);
        let mut failed_count = 0usize;

        for request in batch.logs {
            match self.ingest(request).await {
                Ok(receipt) if receipt.status == IngestStatus::Accepted => {
                    accepted_ids.push(receipt.id);
                }
                Ok(_) => failed_count += 1,
                Err(e) => {
                    tracing::warn!(error = %e, "Batch record rejected");
                    failed_count += 1;
                }
            }
        }

        tracing::info!(
            total,
            accepted = accepted_ids.len(),
            failed = failed_count,
            "Batch ingest complete"
        );

        Ok(BatchIngestReceipt {
            accepted_count: accepted_ids.len(),
            failed_count,
            accepted_ids,
            timestamp: Utc::now(),
        })
    }

    fn validate(&self, request: &IngestRequest) -> Result<()> {
        if request.message.trim().is_empty() {
            return Err(WardenError::Validation(
                "message must not be blank".to_string(),
            ));
        }
        if request.message.len() > self.limits.max_message_bytes {
            return Err(WardenError::Validation(format!(
                "message of {} bytes exceeds the limit of {}",
                request.message.len(),
                self.limits.max_message_bytes
            )));
        }
        if request.service.trim().is_empty() {
            return Err(WardenError::Validation(
                "service name must not be blank".to_string(),
            ));
        }
        let service_chars = request.service.chars().count();
        if service_chars > self.limits.max_service_chars {
            return Err(WardenError::Validation(format!(
                "service name of {} characters exceeds the limit of {}",
                service_chars, self.limits.max_service_chars
            )));
        }
        Ok(())
    }

    /// Scrub untrusted text and stamp a missing timestamp with publish time
    fn scrub(&self, request: IngestRequest) -> WireRecord {
        let timestamp = request.timestamp.unwrap_or_else(Utc::now);

        let metadata = request
            .metadata
            .into_iter()
            .map(|(key, value)| (key, sanitize::sanitize(&value)))
            .collect();

        WireRecord {
            timestamp: Some(WireTimestamp::from(timestamp)),
            level: request.level,
            message: sanitize::sanitize(&request.message),
            service: sanitize::sanitize_service_name(&request.service),
            metadata,
        }
    }
}
