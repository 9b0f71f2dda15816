//! # logwarden
//!
//! Log event ingestion, stream transport, and real-time anomaly alerting.
//!
//! ## Overview
//!
//! `logwarden` takes structured log events from untrusted producers,
//! sanitizes them, and submits them to an ordered stream transport. On the
//! other side a consumer normalizes and persists each event, then runs an
//! error-rate rule that raises deduplicated, severity-tiered alerts. Swap
//! transports and stores (NATS, in-memory) without changing pipeline code.
//!
//! ## Quick Start
//!
//! ```rust
//! use logwarden::{
//!     AnomalyDetector, DetectorConfig, EventStream, EventTransport, IngestLimits,
//!     IngestRequest, LogLevel, LogPublisher, MemoryAlertStore, MemoryEventStore,
//!     MemoryTransport, StreamConsumer,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> logwarden::Result<()> {
//! let transport = Arc::new(MemoryTransport::new());
//! let events = Arc::new(MemoryEventStore::new());
//! let alerts = Arc::new(MemoryAlertStore::new());
//!
//! // Ingest side: validate, sanitize, submit
//! let publisher = LogPublisher::new(transport.clone(), IngestLimits::default());
//! let receipt = publisher
//!     .ingest(IngestRequest::new(LogLevel::Error, "connection refused", "checkout"))
//!     .await?;
//! println!("Accepted: {}", receipt.id);
//!
//! // Consume side: normalize, persist, detect
//! let detector = AnomalyDetector::new(events.clone(), alerts.clone(), DetectorConfig::default());
//! let consumer = StreamConsumer::new(events, detector);
//! let mut stream = transport.subscribe("analysis").await?;
//! if let Some(message) = stream.next().await? {
//!     consumer.process(&message).await;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Backends
//!
//! - **memory** — in-memory transport and stores for testing and
//!   single-process use
//! - **nats** — NATS JetStream for distributed, persistent log streaming
//!
//! ## Architecture
//!
//! - **LogPublisher** — sanitizing, fire-and-forget ingest boundary
//! - **EventTransport** / **EventStream** traits — ordered delivery
//!   abstraction all backends implement
//! - **StreamConsumer** — parse, normalize, persist, then detect
//! - **AnomalyDetector** — windowed error-rate rule with per-service
//!   deduplication
//! - **EventStore** / **AlertStore** traits — append-and-query persistence
//!   collaborators

pub mod config;
pub mod consumer;
pub mod detector;
pub mod error;
pub mod publisher;
pub mod sanitize;
pub mod store;
pub mod transport;
pub mod types;

// Re-export core types
pub use config::{DetectorConfig, IngestLimits};
pub use consumer::StreamConsumer;
pub use detector::AnomalyDetector;
pub use error::{Result, WardenError};
pub use publisher::LogPublisher;
pub use store::{AlertStore, EventQuery, EventStore};
pub use transport::{DeliveryHandle, EventStream, EventTransport, TransportMessage};
pub use types::{
    Alert, AlertType, BatchIngestReceipt, BatchIngestRequest, Envelope, IngestReceipt,
    IngestRequest, IngestStatus, LogEvent, LogLevel, Severity, WireRecord, WireTimestamp,
};

// Re-export backends for convenience
pub use store::memory::{MemoryAlertStore, MemoryEventStore};
pub use transport::memory::MemoryTransport;
pub use transport::nats::{NatsClient, NatsConfig, NatsStream, NatsTransport, StorageType};
