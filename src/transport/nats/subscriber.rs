//! NATS JetStream subscription stream

use crate::error::{Result, WardenError};
use crate::transport::{EventStream, TransportMessage};
use async_nats::jetstream::consumer::pull;
use async_trait::async_trait;
use futures::StreamExt;

/// Message stream over a JetStream pull consumer
///
/// Messages are acknowledged the moment they are handed to the caller, so a
/// downstream processing failure never causes redelivery. A poison message
/// therefore cannot wedge the consumer.
pub struct NatsStream {
    messages: pull::Stream,
    stream_name: String,
}

impl NatsStream {
    pub(crate) fn new(messages: pull::Stream, stream_name: String) -> Self {
        Self {
            messages,
            stream_name,
        }
    }
}

#[async_trait]
impl EventStream for NatsStream {
    async fn next(&mut self) -> Result<Option<TransportMessage>> {
        match self.messages.next().await {
            Some(Ok(message)) => {
                let sequence = message
                    .info()
                    .map(|info| info.stream_sequence)
                    .unwrap_or_default();

                if let Err(e) = message.ack().await {
                    tracing::warn!(sequence, error = %e, "Failed to acknowledge message");
                }

                Ok(Some(TransportMessage {
                    payload: message.payload.clone(),
                    sequence,
                    stream: self.stream_name.clone(),
                }))
            }
            Some(Err(e)) => Err(WardenError::Consumer(format!(
                "Message stream error: {}",
                e
            ))),
            None => Ok(None),
        }
    }
}
