//! In-memory pipeline integration tests
//!
//! End-to-end tests exercising the full ingest pipeline over the in-memory
//! transport: publish, consume, persistence, anomaly detection, alert
//! acknowledgement, and concurrency.

use chrono::{DateTime, Utc};
use logwarden::{
    AlertStore, AlertType, AnomalyDetector, BatchIngestRequest, DetectorConfig, EventQuery,
    EventStore, EventStream, EventTransport, IngestLimits, IngestRequest, IngestStatus, LogEvent,
    LogLevel, LogPublisher, MemoryAlertStore, MemoryEventStore, MemoryTransport, Severity,
    StreamConsumer, WardenError,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

struct Pipeline {
    transport: Arc<MemoryTransport>,
    events: Arc<MemoryEventStore>,
    alerts: Arc<MemoryAlertStore>,
    publisher: LogPublisher,
    consumer: StreamConsumer,
}

fn pipeline() -> Pipeline {
    let transport = Arc::new(MemoryTransport::new());
    let events = Arc::new(MemoryEventStore::new());
    let alerts = Arc::new(MemoryAlertStore::new());
    let detector = AnomalyDetector::new(events.clone(), alerts.clone(), DetectorConfig::default());
    Pipeline {
        publisher: LogPublisher::new(transport.clone(), IngestLimits::default()),
        consumer: StreamConsumer::new(events.clone(), detector),
        transport,
        events,
        alerts,
    }
}

impl Pipeline {
    /// Feed everything currently on the transport through the consumer.
    async fn drain(&self) {
        let pending = self.transport.message_count().await;
        let mut stream = self.transport.subscribe("drain").await.unwrap();
        for _ in 0..pending {
            let message = stream.next().await.unwrap().unwrap();
            self.consumer.process(&message).await;
        }
    }
}

fn stored_error(service: &str) -> LogEvent {
    LogEvent {
        id: Uuid::new_v4(),
        timestamp: Utc::now(),
        level: LogLevel::Error,
        message: "seeded failure".to_string(),
        service: service.to_string(),
        metadata: HashMap::new(),
        created_at: Utc::now(),
    }
}

// ─── Ingest to Store ─────────────────────────────────────────────

#[tokio::test]
async fn test_ingest_flows_through_to_store() {
    let p = pipeline();

    let receipt = p
        .publisher
        .ingest(
            IngestRequest::new(LogLevel::Info, "cache warmed", "api")
                .with_metadata("region", "eu-west-1"),
        )
        .await
        .unwrap();
    assert_eq!(receipt.status, IngestStatus::Accepted);

    p.drain().await;

    assert_eq!(p.events.len().await, 1);
    let stored = p.events.query(&EventQuery::default(), 10).await.unwrap();
    assert_eq!(stored[0].id, receipt.id);
    assert_eq!(stored[0].level, LogLevel::Info);
    assert_eq!(stored[0].message, "cache warmed");
    assert_eq!(stored[0].service, "api");
    assert_eq!(stored[0].metadata["region"], "eu-west-1");
}

#[tokio::test]
async fn test_stored_timestamps_are_normalized() {
    let p = pipeline();

    let before = Utc::now();
    p.publisher
        .ingest(IngestRequest::new(LogLevel::Warn, "no explicit timestamp", "api"))
        .await
        .unwrap();
    p.drain().await;
    let after = Utc::now();

    let stored = p.events.query(&EventQuery::default(), 10).await.unwrap();
    assert!(stored[0].timestamp >= before && stored[0].timestamp <= after);
    assert!(stored[0].created_at >= stored[0].timestamp);
}

#[tokio::test]
async fn test_explicit_timestamp_survives_pipeline() {
    let p = pipeline();

    let explicit: DateTime<Utc> = "2024-03-01T10:15:30Z".parse().unwrap();
    let receipt = p
        .publisher
        .ingest(IngestRequest::new(LogLevel::Info, "gc pause", "jvm-app").with_timestamp(explicit))
        .await
        .unwrap();
    p.drain().await;

    let stored = p.events.query(&EventQuery::default(), 10).await.unwrap();
    assert_eq!(stored[0].id, receipt.id);
    assert_eq!(stored[0].timestamp, explicit);
}

#[tokio::test]
async fn test_hostile_content_sanitized_end_to_end() {
    let p = pipeline();

    p.publisher
        .ingest(
            IngestRequest::new(
                LogLevel::Error,
                "<script>alert(1)</script> login failed",
                "auth service!",
            )
            .with_metadata("query", "name=x' OR 'a'='a"),
        )
        .await
        .unwrap();
    p.drain().await;

    let stored = p.events.query(&EventQuery::default(), 10).await.unwrap();
    assert_eq!(stored[0].message, "[removed] login failed");
    assert_eq!(stored[0].service, "authservice");
    assert!(!stored[0].metadata["query"].contains("' OR '"));
}

#[tokio::test]
async fn test_batch_flows_through_to_store() {
    let p = pipeline();

    let receipt = p
        .publisher
        .ingest_batch(BatchIngestRequest {
            logs: vec![
                IngestRequest::new(LogLevel::Info, "one", "api"),
                IngestRequest::new(LogLevel::Warn, "two", "worker"),
                IngestRequest::new(LogLevel::Debug, "three", "api"),
            ],
        })
        .await
        .unwrap();
    assert_eq!(receipt.accepted_count, 3);
    assert_eq!(receipt.failed_count, 0);

    p.drain().await;

    assert_eq!(p.events.len().await, 3);
    let stored = p.events.query(&EventQuery::default(), 10).await.unwrap();
    for id in &receipt.accepted_ids {
        assert!(stored.iter().any(|event| event.id == *id));
    }
}

// ─── Consumer Robustness ─────────────────────────────────────────

#[tokio::test]
async fn test_malformed_payload_dropped_not_fatal() {
    let p = pipeline();

    p.transport
        .submit("junk", b"not an envelope".to_vec().into())
        .await
        .confirm()
        .await
        .unwrap();
    p.publisher
        .ingest(IngestRequest::new(LogLevel::Info, "still fine", "api"))
        .await
        .unwrap();

    p.drain().await;

    // The garbage is dropped; the valid event lands
    assert_eq!(p.events.len().await, 1);
}

#[tokio::test]
async fn test_raw_epoch_payload_from_foreign_producer() {
    let p = pipeline();

    // A producer bypassing the publisher, using the fractional-epoch form
    let raw = serde_json::json!({
        "id": Uuid::new_v4(),
        "event": {
            "timestamp": 1_700_000_000.5,
            "level": "ERROR",
            "message": "legacy agent line",
            "service": "edge",
            "metadata": {}
        }
    });
    p.transport
        .submit("legacy", serde_json::to_vec(&raw).unwrap().into())
        .await
        .confirm()
        .await
        .unwrap();

    p.drain().await;

    let stored = p.events.query(&EventQuery::default(), 10).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(
        stored[0].timestamp,
        DateTime::from_timestamp(1_700_000_000, 500_000_000).unwrap()
    );
    assert_eq!(stored[0].service, "edge");
}

#[tokio::test]
async fn test_unknown_level_dropped() {
    let p = pipeline();

    let raw = serde_json::json!({
        "id": Uuid::new_v4(),
        "event": {
            "level": "NOTICE",
            "message": "unmapped severity",
            "service": "edge",
            "metadata": {}
        }
    });
    p.transport
        .submit("legacy", serde_json::to_vec(&raw).unwrap().into())
        .await
        .confirm()
        .await
        .unwrap();

    p.drain().await;
    assert_eq!(p.events.len().await, 0);
}

#[tokio::test]
async fn test_run_loop_processes_until_transport_closes() {
    let transport = Arc::new(MemoryTransport::new());
    let events = Arc::new(MemoryEventStore::new());
    let alerts = Arc::new(MemoryAlertStore::new());
    let detector = AnomalyDetector::new(events.clone(), alerts.clone(), DetectorConfig::default());
    let publisher = LogPublisher::new(transport.clone(), IngestLimits::default());
    let consumer = StreamConsumer::new(events.clone(), detector);

    for i in 0..3 {
        publisher
            .ingest(IngestRequest::new(LogLevel::Info, format!("line {i}"), "api"))
            .await
            .unwrap();
    }

    let stream = transport.subscribe("runner").await.unwrap();

    // Dropping every transport handle closes the stream after the replay
    drop(publisher);
    drop(transport);

    consumer.run(stream).await.unwrap();
    assert_eq!(events.len().await, 3);
}

// ─── Anomaly Detection ───────────────────────────────────────────

#[tokio::test]
async fn test_error_burst_raises_one_alert() {
    let p = pipeline();

    for i in 0..6 {
        p.publisher
            .ingest(IngestRequest::new(
                LogLevel::Error,
                format!("timeout {i}"),
                "payments",
            ))
            .await
            .unwrap();
    }
    p.drain().await;

    let alerts = p.alerts.list_recent(10).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::HighErrorRate);
    assert_eq!(alerts[0].severity, Severity::Info);
    assert_eq!(alerts[0].service, "payments");
    assert!(!alerts[0].acknowledged);
    assert_eq!(
        alerts[0].message,
        "High error rate detected: 6 ERROR events from service 'payments' in the last 1 minute(s)"
    );
}

#[tokio::test]
async fn test_exact_threshold_does_not_fire() {
    let p = pipeline();

    for _ in 0..5 {
        p.publisher
            .ingest(IngestRequest::new(LogLevel::Error, "boom", "api"))
            .await
            .unwrap();
    }
    p.drain().await;

    assert_eq!(p.alerts.len().await, 0);
}

#[tokio::test]
async fn test_non_error_levels_never_alert() {
    let p = pipeline();

    for _ in 0..10 {
        p.publisher
            .ingest(IngestRequest::new(LogLevel::Warn, "slow response", "api"))
            .await
            .unwrap();
        p.publisher
            .ingest(IngestRequest::new(LogLevel::Info, "ok", "api"))
            .await
            .unwrap();
    }
    p.drain().await;

    assert_eq!(p.events.len().await, 20);
    assert_eq!(p.alerts.len().await, 0);
}

#[tokio::test]
async fn test_cooldown_suppresses_repeat_alerts() {
    let p = pipeline();

    for _ in 0..12 {
        p.publisher
            .ingest(IngestRequest::new(LogLevel::Error, "boom", "api"))
            .await
            .unwrap();
    }
    p.drain().await;

    // The sixth event fires; the rest fall inside the cooldown
    assert_eq!(p.alerts.len().await, 1);
}

#[tokio::test]
async fn test_alert_dedup_is_per_service() {
    let p = pipeline();

    for _ in 0..6 {
        p.publisher
            .ingest(IngestRequest::new(LogLevel::Error, "boom", "api"))
            .await
            .unwrap();
    }
    for _ in 0..3 {
        p.publisher
            .ingest(IngestRequest::new(LogLevel::Error, "boom", "billing"))
            .await
            .unwrap();
    }
    p.drain().await;

    // The count spans services, so billing crosses the threshold on its
    // first event; dedup still yields one alert per service
    let alerts = p.alerts.list_recent(10).await.unwrap();
    assert_eq!(alerts.len(), 2);
    let services: Vec<&str> = alerts.iter().map(|a| a.service.as_str()).collect();
    assert!(services.contains(&"api"));
    assert!(services.contains(&"billing"));
}

#[tokio::test]
async fn test_correlated_burst_attributes_to_triggering_service() {
    let p = pipeline();

    for service in ["auth", "billing", "catalog", "checkout", "search"] {
        p.publisher
            .ingest(IngestRequest::new(LogLevel::Error, "upstream reset", service))
            .await
            .unwrap();
    }
    p.publisher
        .ingest(IngestRequest::new(LogLevel::Error, "upstream reset", "gateway"))
        .await
        .unwrap();
    p.drain().await;

    let alerts = p.alerts.list_recent(10).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].service, "gateway");
    assert!(alerts[0].message.contains("6 ERROR events from service 'gateway'"));
}

#[tokio::test]
async fn test_fatal_and_error_counted_separately() {
    let p = pipeline();

    for _ in 0..5 {
        p.publisher
            .ingest(IngestRequest::new(LogLevel::Error, "boom", "api"))
            .await
            .unwrap();
        p.publisher
            .ingest(IngestRequest::new(LogLevel::Fatal, "dead", "api"))
            .await
            .unwrap();
    }
    p.drain().await;
    assert_eq!(p.alerts.len().await, 0);

    // One more FATAL pushes only the FATAL count past the threshold
    p.publisher
        .ingest(IngestRequest::new(LogLevel::Fatal, "dead", "api"))
        .await
        .unwrap();
    p.drain().await;

    let alerts = p.alerts.list_recent(10).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].message.contains("6 FATAL events"));
}

// ─── Severity Escalation ─────────────────────────────────────────

#[tokio::test]
async fn test_severity_escalates_with_count() {
    // Eleven errors already on record put the next one past twice the
    // threshold
    let p = pipeline();
    for _ in 0..11 {
        p.events.insert(stored_error("api")).await.unwrap();
    }
    p.publisher
        .ingest(IngestRequest::new(LogLevel::Error, "boom", "api"))
        .await
        .unwrap();
    p.drain().await;

    let alerts = p.alerts.list_recent(10).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, Severity::Warning);

    // Past three times the threshold the alert is critical
    let p = pipeline();
    for _ in 0..15 {
        p.events.insert(stored_error("api")).await.unwrap();
    }
    p.publisher
        .ingest(IngestRequest::new(LogLevel::Error, "boom", "api"))
        .await
        .unwrap();
    p.drain().await;

    let alerts = p.alerts.list_recent(10).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, Severity::Critical);
}

// ─── Alert Acknowledgement ───────────────────────────────────────

#[tokio::test]
async fn test_acknowledge_flow() {
    let p = pipeline();

    for _ in 0..6 {
        p.publisher
            .ingest(IngestRequest::new(LogLevel::Error, "boom", "api"))
            .await
            .unwrap();
    }
    p.drain().await;

    let open = p.alerts.list_unacknowledged().await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(p.alerts.count_unacknowledged().await.unwrap(), 1);

    let updated = p.alerts.acknowledge(open[0].id, "oncall").await.unwrap();
    assert!(updated.acknowledged);
    assert_eq!(updated.acknowledged_by.as_deref(), Some("oncall"));
    assert!(updated.acknowledged_at.is_some());

    assert_eq!(p.alerts.count_unacknowledged().await.unwrap(), 0);
    assert!(p.alerts.list_unacknowledged().await.unwrap().is_empty());

    // Acknowledging twice is rejected
    let err = p.alerts.acknowledge(open[0].id, "oncall").await.unwrap_err();
    assert!(matches!(err, WardenError::AlreadyAcknowledged(_)));

    // Unknown alert id
    let err = p
        .alerts
        .acknowledge(Uuid::new_v4(), "oncall")
        .await
        .unwrap_err();
    assert!(matches!(err, WardenError::NotFound(_)));
}

// ─── Fire-and-Forget Delivery ────────────────────────────────────

#[tokio::test]
async fn test_transport_failure_invisible_to_producer() {
    let p = pipeline();
    p.transport.fail_submissions(true);

    let receipt = p
        .publisher
        .ingest(IngestRequest::new(
            LogLevel::Error,
            "dropped on the floor",
            "api",
        ))
        .await
        .unwrap();

    // The producer still gets an accepted receipt; the event is simply gone
    assert_eq!(receipt.status, IngestStatus::Accepted);
    assert_eq!(p.transport.message_count().await, 0);

    p.drain().await;
    assert_eq!(p.events.len().await, 0);
}

// ─── Concurrency ─────────────────────────────────────────────────

#[tokio::test]
async fn test_concurrent_ingest_50_tasks() {
    let transport = Arc::new(MemoryTransport::new());
    let events = Arc::new(MemoryEventStore::new());
    let alerts = Arc::new(MemoryAlertStore::new());
    let detector = AnomalyDetector::new(events.clone(), alerts.clone(), DetectorConfig::default());
    let consumer = StreamConsumer::new(events.clone(), detector);
    let publisher = Arc::new(LogPublisher::new(transport.clone(), IngestLimits::default()));

    let mut handles = Vec::new();
    for i in 0..50 {
        let publisher = publisher.clone();
        handles.push(tokio::spawn(async move {
            publisher
                .ingest(IngestRequest::new(
                    LogLevel::Info,
                    format!("event {i}"),
                    "stress",
                ))
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        let receipt = handle.await.unwrap();
        assert_eq!(receipt.status, IngestStatus::Accepted);
    }

    assert_eq!(transport.message_count().await, 50);

    // Sequences are dense and unique
    let mut stream = transport.subscribe("verify").await.unwrap();
    let mut sequences = Vec::new();
    for _ in 0..50 {
        let message = stream.next().await.unwrap().unwrap();
        consumer.process(&message).await;
        sequences.push(message.sequence);
    }
    assert_eq!(sequences, (1..=50).collect::<Vec<u64>>());
    assert_eq!(events.len().await, 50);
}

#[tokio::test]
async fn test_competing_consumers_store_once_alert_once() {
    let transport = Arc::new(MemoryTransport::new());
    let events = Arc::new(MemoryEventStore::new());
    let alerts = Arc::new(MemoryAlertStore::new());
    let detector = AnomalyDetector::new(events.clone(), alerts.clone(), DetectorConfig::default());
    let publisher = LogPublisher::new(transport.clone(), IngestLimits::default());

    for _ in 0..10 {
        publisher
            .ingest(IngestRequest::new(LogLevel::Error, "boom", "api"))
            .await
            .unwrap();
    }

    // Two consumers over the same stores; detector clones share dedup locks
    let consumer_a = StreamConsumer::new(events.clone(), detector.clone());
    let consumer_b = StreamConsumer::new(events.clone(), detector);
    let stream_a = transport.subscribe("a").await.unwrap();
    let stream_b = transport.subscribe("b").await.unwrap();

    drop(publisher);
    drop(transport);

    let task_a = tokio::spawn(async move { consumer_a.run(stream_a).await.unwrap() });
    let task_b = tokio::spawn(async move { consumer_b.run(stream_b).await.unwrap() });
    task_a.await.unwrap();
    task_b.await.unwrap();

    // Upsert keeps the store at one row per event; the per-service guard
    // keeps the alarm at one alert
    assert_eq!(events.len().await, 10);
    assert_eq!(alerts.len().await, 1);
}

// ─── Full Pipeline ───────────────────────────────────────────────

#[tokio::test]
async fn test_full_pipeline_end_to_end() {
    let transport = Arc::new(MemoryTransport::new());
    let events = Arc::new(MemoryEventStore::new());
    let alerts = Arc::new(MemoryAlertStore::new());
    let detector = AnomalyDetector::new(events.clone(), alerts.clone(), DetectorConfig::default());
    let publisher = LogPublisher::new(transport.clone(), IngestLimits::default());
    let consumer = StreamConsumer::new(events.clone(), detector);

    // Normal traffic
    publisher
        .ingest(
            IngestRequest::new(LogLevel::Info, "deploy finished", "deployer")
                .with_metadata("version", "2.4.1"),
        )
        .await
        .unwrap();
    publisher
        .ingest(IngestRequest::new(
            LogLevel::Warn,
            "<b>slow</b> upstream",
            "checkout",
        ))
        .await
        .unwrap();

    // An error burst from checkout
    let burst = BatchIngestRequest {
        logs: (0..6)
            .map(|i| {
                IngestRequest::new(LogLevel::Error, format!("payment timeout {i}"), "checkout")
            })
            .collect(),
    };
    let receipt = publisher.ingest_batch(burst).await.unwrap();
    assert_eq!(receipt.accepted_count, 6);

    // Run the consumer loop over everything published
    let stream = transport.subscribe("processor").await.unwrap();
    drop(publisher);
    drop(transport);
    consumer.run(stream).await.unwrap();

    // Everything stored, markup stripped
    assert_eq!(events.len().await, 8);
    let warn = events
        .query(
            &EventQuery {
                level: Some(LogLevel::Warn),
                ..Default::default()
            },
            10,
        )
        .await
        .unwrap();
    assert_eq!(warn.len(), 1);
    assert_eq!(warn[0].message, "[removed]slow[removed] upstream");

    // Checkout errors are queryable as a group
    let errors = events
        .query(
            &EventQuery {
                service: Some("checkout".to_string()),
                level: Some(LogLevel::Error),
                ..Default::default()
            },
            10,
        )
        .await
        .unwrap();
    assert_eq!(errors.len(), 6);

    // The burst raised exactly one alert, attributed to checkout
    let raised = alerts.list_recent(10).await.unwrap();
    assert_eq!(raised.len(), 1);
    assert_eq!(raised[0].service, "checkout");
    assert_eq!(raised[0].severity, Severity::Info);

    // Acknowledging closes it out
    let updated = alerts.acknowledge(raised[0].id, "sre-oncall").await.unwrap();
    assert!(updated.acknowledged);
    assert_eq!(alerts.count_unacknowledged().await.unwrap(), 0);
}
