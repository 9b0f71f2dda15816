//! Stream consumer — parse, normalize, persist, detect
//!
//! Pulls raw messages off the transport, turns them into normalized
//! `LogEvent`s, persists them, and hands each persisted event to the anomaly
//! detector. Processing never fails outward: a malformed or unprocessable
//! message is logged and dropped, so one poison message cannot stall the
//! stream behind it.

use crate::detector::AnomalyDetector;
use crate::error::Result;
use crate::store::EventStore;
use crate::transport::{EventStream, TransportMessage};
use crate::types::{Envelope, LogEvent};
use chrono::Utc;
use std::sync::Arc;

/// Longest message prefix echoed into the consumer's own logs
const LOG_PREVIEW_CHARS: usize = 100;

/// Consumes envelopes from the stream into the event store
pub struct StreamConsumer {
    events: Arc<dyn EventStore>,
    detector: AnomalyDetector,
}

impl StreamConsumer {
    /// Create a consumer over an event store and a detector
    pub fn new(events: Arc<dyn EventStore>, detector: AnomalyDetector) -> Self {
        Self { events, detector }
    }

    /// Drive a subscription until its stream closes
    ///
    /// Message-level failures are absorbed by [`process`](Self::process);
    /// only a failure of the stream itself ends the loop with an error.
    pub async fn run(&self, mut stream: Box<dyn EventStream>) -> Result<()> {
        loop {
            match stream.next().await {
                Ok(Some(message)) => self.process(&message).await,
                Ok(None) => {
                    tracing::info!("Event stream closed");
                    return Ok(());
                }
                Err(e) => {
                    tracing::error!(error = %e, "Event stream failed");
                    return Err(e);
                }
            }
        }
    }

    /// Process one transport message
    ///
    /// By the time this returns, the message counts as consumed whether or
    /// not parsing, persistence, or detection succeeded.
    pub async fn process(&self, message: &TransportMessage) {
        let envelope = match Envelope::from_bytes(&message.payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(
                    sequence = message.sequence,
                    stream = %message.stream,
                    error = %e,
                    "Failed to parse log envelope, dropping message"
                );
                return;
            }
        };

        let event = match normalize(envelope) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(
                    sequence = message.sequence,
                    error = %e,
                    "Failed to normalize log event, dropping message"
                );
                return;
            }
        };

        if let Err(e) = self.events.insert(event.clone()).await {
            tracing::error!(event_id = %event.id, error = %e, "Failed to persist log event");
            return;
        }

        tracing::info!(
            event_id = %event.id,
            service = %event.service,
            level = %event.level,
            message = %preview(&event.message),
            "Stored log event"
        );

        if let Err(e) = self.detector.analyze(&event).await {
            tracing::error!(event_id = %event.id, error = %e, "Anomaly detection failed");
        }
    }
}

/// Build a normalized, persistable event from a wire envelope
///
/// Resolves whichever timestamp encoding the producer used; an envelope
/// without a timestamp is stamped with the time of consumption.
fn normalize(envelope: Envelope) -> Result<LogEvent> {
    let record = envelope.event;

    let timestamp = match record.timestamp {
        Some(wire) => wire.resolve()?,
        None => Utc::now(),
    };

    Ok(LogEvent {
        id: envelope.id,
        timestamp,
        level: record.level,
        message: record.message,
        service: record.service,
        metadata: record.metadata,
        created_at: Utc::now(),
    })
}

/// Truncate a message for log output
fn preview(message: &str) -> String {
    if message.chars().count() <= LOG_PREVIEW_CHARS {
        message.to_string()
    } else {
        let truncated: String = message.chars().take(LOG_PREVIEW_CHARS).collect();
        format!("{}...", truncated)
    }
}
