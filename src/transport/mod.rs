//! Stream transport trait — the core abstraction for event delivery
//!
//! All stream backends (NATS, in-memory, etc.) implement `EventTransport` to
//! provide a uniform API for keyed submission and ordered consumption. The
//! publisher and consumer never see a concrete backend.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;

pub mod memory;
pub mod nats;

/// Core trait for stream transports
///
/// Implementations handle the backend-specific details of delivery and
/// ordering. Submission is fire-and-forget: `submit` returns once the
/// submission is initiated, and the outcome is observable only through the
/// returned [`DeliveryHandle`].
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Submit a payload under an ordering key
    ///
    /// Payloads sharing a key are delivered in submission order. Failures
    /// after initiation are reported through the handle, never here.
    async fn submit(&self, key: &str, payload: Bytes) -> DeliveryHandle;

    /// Create a durable named subscription covering the whole stream
    ///
    /// Subscribing again with the same `consumer_name` resumes from where
    /// that consumer left off, on backends that persist consumer state.
    async fn subscribe(&self, consumer_name: &str) -> Result<Box<dyn EventStream>>;

    /// Transport name (e.g., "nats", "memory")
    fn name(&self) -> &str;
}

/// Async handle for receiving raw messages from a transport
#[async_trait]
pub trait EventStream: Send + Sync {
    /// Receive the next message; `None` once the stream is closed
    ///
    /// Messages are settled on receipt: whatever the caller does with the
    /// message afterwards, the transport will not redeliver it.
    async fn next(&mut self) -> Result<Option<TransportMessage>>;
}

/// A raw message delivered by a transport
#[derive(Debug, Clone)]
pub struct TransportMessage {
    /// Serialized envelope payload
    pub payload: Bytes,

    /// Transport-assigned sequence number
    pub sequence: u64,

    /// Stream name the message came from
    pub stream: String,
}

/// Pending confirmation for a submitted payload
///
/// Resolves to the transport-assigned sequence number once the backend
/// reports the outcome. Dropping the handle abandons the confirmation
/// without cancelling the submission.
pub struct DeliveryHandle {
    outcome: BoxFuture<'static, Result<u64>>,
}

impl DeliveryHandle {
    /// Wrap a confirmation future
    pub fn new(outcome: impl std::future::Future<Output = Result<u64>> + Send + 'static) -> Self {
        Self {
            outcome: Box::pin(outcome),
        }
    }

    /// A handle whose outcome is already settled
    ///
    /// Used when submission fails before anything reaches the backend, so
    /// callers observe every failure the same way.
    pub fn resolved(result: Result<u64>) -> Self {
        Self::new(async move { result })
    }

    /// Await the transport's delivery outcome
    pub async fn confirm(self) -> Result<u64> {
        self.outcome.await
    }
}
