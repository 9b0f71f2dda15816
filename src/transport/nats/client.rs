//! NATS JetStream client — connection and stream lifecycle

use super::config::{NatsConfig, StorageType};
use super::subscriber::NatsStream;
use crate::error::{Result, WardenError};
use crate::transport::DeliveryHandle;
use async_nats::jetstream;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Low-level JetStream client for log envelopes
///
/// Owns the connection and the stream handle; `NatsTransport` wraps it for
/// the `EventTransport` trait, and tests reach it directly for consumer
/// cleanup.
pub struct NatsClient {
    jetstream: jetstream::Context,

    /// Consumer management needs `&mut` on the stream handle
    stream: Mutex<jetstream::stream::Stream>,

    config: Arc<NatsConfig>,
}

impl NatsClient {
    /// Connect to the configured server and provision the stream
    pub async fn connect(config: NatsConfig) -> Result<Self> {
        config.validate()?;

        let client = connect_options(&config)
            .connect(&config.url)
            .await
            .map_err(|e| WardenError::Connection(format!("{}: {}", config.url, e)))?;

        tracing::info!(url = %config.url, "NATS connection established");

        let jetstream = jetstream::new(client);
        let stream = provision_stream(&jetstream, &config).await?;

        Ok(Self {
            jetstream,
            stream: Mutex::new(stream),
            config: Arc::new(config),
        })
    }

    /// Submit a payload to the subject derived from `key`
    ///
    /// One subject carries one key, and the broker totally orders each
    /// subject, so per-key submission order is preserved. The returned
    /// handle resolves with the stream sequence once the broker acks; a
    /// submission that never left the process comes back already settled.
    pub async fn submit(&self, key: &str, payload: Bytes) -> DeliveryHandle {
        let subject = self.config.subject_for(key);

        match self.jetstream.publish(subject.clone(), payload).await {
            Ok(ack_fut) => DeliveryHandle::new(async move {
                let ack = ack_fut.await.map_err(|e| WardenError::Publish {
                    subject: subject.clone(),
                    reason: format!("ack failed: {}", e),
                })?;

                tracing::debug!(subject = %subject, sequence = ack.sequence, "Envelope on stream");

                Ok(ack.sequence)
            }),
            Err(e) => DeliveryHandle::resolved(Err(WardenError::Publish {
                subject,
                reason: e.to_string(),
            })),
        }
    }

    /// Open a durable pull subscription over every subject under the prefix
    ///
    /// The same `consumer_name` resumes from wherever that consumer last
    /// acked, which is what lets a restarted pipeline pick up where it
    /// stopped.
    pub async fn subscribe(&self, consumer_name: &str) -> Result<NatsStream> {
        let filter = self.config.wildcard_subject();

        let pull_config = jetstream::consumer::pull::Config {
            durable_name: Some(consumer_name.to_string()),
            filter_subject: filter.clone(),
            ack_policy: jetstream::consumer::AckPolicy::Explicit,
            ..Default::default()
        };

        let stream = self.stream.lock().await;
        let consumer = stream
            .get_or_create_consumer(consumer_name, pull_config)
            .await
            .map_err(|e| {
                WardenError::Consumer(format!("durable consumer '{}': {}", consumer_name, e))
            })?;
        drop(stream);

        let messages = consumer.messages().await.map_err(|e| WardenError::Subscribe {
            subject: filter.clone(),
            reason: e.to_string(),
        })?;

        tracing::info!(consumer = consumer_name, filter = %filter, "Pull subscription open");

        Ok(NatsStream::new(messages, self.config.stream_name.clone()))
    }

    /// Remove a durable consumer and its tracked position
    pub async fn unsubscribe(&self, consumer_name: &str) -> Result<()> {
        self.stream
            .lock()
            .await
            .delete_consumer(consumer_name)
            .await
            .map_err(|e| {
                WardenError::Consumer(format!("deleting consumer '{}': {}", consumer_name, e))
            })?;

        tracing::info!(consumer = consumer_name, "Durable consumer removed");
        Ok(())
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &NatsConfig {
        &self.config
    }
}

fn connect_options(config: &NatsConfig) -> async_nats::ConnectOptions {
    let base = async_nats::ConnectOptions::new()
        .connection_timeout(Duration::from_secs(config.connect_timeout_secs))
        .request_timeout(Some(Duration::from_secs(config.request_timeout_secs)));

    match config.token {
        Some(ref token) => base.token(token.clone()),
        None => base,
    }
}

/// Create the stream if it does not exist, or reuse it if it does
async fn provision_stream(
    js: &jetstream::Context,
    config: &NatsConfig,
) -> Result<jetstream::stream::Stream> {
    let stream = js
        .get_or_create_stream(jetstream::stream::Config {
            name: config.stream_name.clone(),
            subjects: config.stream_subjects(),
            storage: match config.storage {
                StorageType::File => jetstream::stream::StorageType::File,
                StorageType::Memory => jetstream::stream::StorageType::Memory,
            },
            max_messages: config.max_messages,
            // Zero means no age limit
            max_age: Duration::from_secs(config.max_age_secs),
            max_bytes: config.max_bytes,
            retention: jetstream::stream::RetentionPolicy::Limits,
            ..Default::default()
        })
        .await
        .map_err(|e| {
            WardenError::Stream(format!("stream '{}' unavailable: {}", config.stream_name, e))
        })?;

    tracing::info!(
        stream = %config.stream_name,
        subjects = ?config.stream_subjects(),
        "JetStream stream provisioned"
    );

    Ok(stream)
}
