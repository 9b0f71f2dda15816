//! NATS JetStream stream transport
//!
//! Implements `EventTransport` using NATS JetStream for persistent,
//! distributed log delivery with at-least-once semantics.

mod client;
mod config;
mod subscriber;

pub use client::NatsClient;
pub use config::{NatsConfig, StorageType};
pub use subscriber::NatsStream;

use crate::error::Result;
use crate::transport::{DeliveryHandle, EventStream, EventTransport};
use async_trait::async_trait;
use bytes::Bytes;

/// NATS JetStream stream transport
///
/// Wraps `NatsClient` and implements the `EventTransport` trait.
pub struct NatsTransport {
    client: NatsClient,
}

impl NatsTransport {
    /// Connect to NATS and initialize the JetStream stream
    pub async fn connect(config: NatsConfig) -> Result<Self> {
        let client = NatsClient::connect(config).await?;
        Ok(Self { client })
    }

    /// Get the underlying NATS client for advanced usage
    pub fn client(&self) -> &NatsClient {
        &self.client
    }
}

#[async_trait]
impl EventTransport for NatsTransport {
    async fn submit(&self, key: &str, payload: Bytes) -> DeliveryHandle {
        self.client.submit(key, payload).await
    }

    async fn subscribe(&self, consumer_name: &str) -> Result<Box<dyn EventStream>> {
        let stream = self.client.subscribe(consumer_name).await?;
        Ok(Box::new(stream))
    }

    fn name(&self) -> &str {
        "nats"
    }
}
