//! In-memory transport for tests and single-process pipelines
//!
//! Retains every submitted message and fans out to all live subscribers.
//! Sequence numbers are assigned from a single counter, so global order (and
//! therefore per-key order) holds trivially. State is lost on drop.

use super::{DeliveryHandle, EventStream, EventTransport, TransportMessage};
use crate::error::{Result, WardenError};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

const STREAM_NAME: &str = "memory";

struct Inner {
    messages: Vec<TransportMessage>,
    senders: Vec<mpsc::UnboundedSender<TransportMessage>>,
}

/// In-memory stream transport
pub struct MemoryTransport {
    inner: Arc<RwLock<Inner>>,
    fail_submissions: AtomicBool,
}

impl MemoryTransport {
    /// Create an empty transport
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                messages: Vec::new(),
                senders: Vec::new(),
            })),
            fail_submissions: AtomicBool::new(false),
        }
    }

    /// Number of messages retained
    pub async fn message_count(&self) -> usize {
        self.inner.read().await.messages.len()
    }

    /// Make subsequent submissions resolve as delivery failures
    ///
    /// Test hook for exercising the fire-and-forget path: submissions still
    /// return a handle, and the failure only surfaces through it.
    pub fn fail_submissions(&self, fail: bool) {
        self.fail_submissions.store(fail, Ordering::Relaxed);
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventTransport for MemoryTransport {
    async fn submit(&self, key: &str, payload: Bytes) -> DeliveryHandle {
        if self.fail_submissions.load(Ordering::Relaxed) {
            return DeliveryHandle::resolved(Err(WardenError::Transport(format!(
                "simulated delivery failure for key '{key}'"
            ))));
        }

        let mut inner = self.inner.write().await;
        let sequence = inner.messages.len() as u64 + 1;
        let message = TransportMessage {
            payload,
            sequence,
            stream: STREAM_NAME.to_string(),
        };

        inner.messages.push(message.clone());
        inner.senders.retain(|tx| tx.send(message.clone()).is_ok());

        DeliveryHandle::resolved(Ok(sequence))
    }

    async fn subscribe(&self, _consumer_name: &str) -> Result<Box<dyn EventStream>> {
        let (tx, rx) = mpsc::unbounded_channel();

        // Replay retained history so a late subscriber starts from the
        // beginning, then register for live messages. Both under one lock so
        // nothing submitted in between is missed or duplicated.
        let mut inner = self.inner.write().await;
        for message in &inner.messages {
            let _ = tx.send(message.clone());
        }
        inner.senders.push(tx);

        Ok(Box::new(MemoryStream { receiver: rx }))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Subscription handle over the in-memory transport
pub struct MemoryStream {
    receiver: mpsc::UnboundedReceiver<TransportMessage>,
}

#[async_trait]
impl EventStream for MemoryStream {
    async fn next(&mut self) -> Result<Option<TransportMessage>> {
        Ok(self.receiver.recv().await)
    }
}
