//! Anomaly detection over the event store
//!
//! Stateless rule evaluation: every triggering event re-derives what it
//! needs from the stores, so restarts lose nothing. The only in-process
//! state is a per-service lock map that keeps alert decisions serialized.

use crate::config::DetectorConfig;
use crate::error::Result;
use crate::store::{AlertStore, EventStore};
use crate::types::{Alert, AlertType, LogEvent, Severity};
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Serializes alert decisions per service
///
/// The cooldown check and the alert insert must not interleave for one
/// service, or two racing triggers would both pass the check and file
/// duplicate alerts.
#[derive(Default)]
struct ServiceLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ServiceLocks {
    async fn acquire(&self, service: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().await;
            locks.entry(service.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Evaluates error-rate rules and raises alerts
///
/// Cloning is cheap and clones share the per-service locks, so concurrent
/// consumers holding clones stay mutually serialized.
#[derive(Clone)]
pub struct AnomalyDetector {
    events: Arc<dyn EventStore>,
    alerts: Arc<dyn AlertStore>,
    config: DetectorConfig,
    locks: Arc<ServiceLocks>,
}

impl AnomalyDetector {
    /// Create a detector over the given stores with an explicit policy
    pub fn new(
        events: Arc<dyn EventStore>,
        alerts: Arc<dyn AlertStore>,
        config: DetectorConfig,
    ) -> Self {
        Self {
            events,
            alerts,
            config,
            locks: Arc::new(ServiceLocks::default()),
        }
    }

    /// Analyze one persisted event, returning the alert if one was raised
    ///
    /// Only ERROR and FATAL events can trigger the high-error-rate rule;
    /// everything else returns immediately.
    pub async fn analyze(&self, event: &LogEvent) -> Result<Option<Alert>> {
        if !event.level.is_error_class() {
            return Ok(None);
        }
        self.check_high_error_rate(event).await
    }

    /// High error rate: more than `error_threshold` events at the triggering
    /// level inside the sliding window
    ///
    /// The count spans all services, so a correlated burst anywhere raises
    /// the alarm; deduplication is still per service. At most one alert per
    /// service fires within a cooldown period.
    async fn check_high_error_rate(&self, event: &LogEvent) -> Result<Option<Alert>> {
        let now = Utc::now();
        let window_start = now - Duration::minutes(self.config.window_minutes);

        let count = self
            .events
            .count_by_level_between(event.level, window_start, now)
            .await?;

        if count <= self.config.error_threshold {
            return Ok(None);
        }

        // Single writer per service: the cooldown check and the insert
        // happen under one guard.
        let _guard = self.locks.acquire(&event.service).await;

        let cooldown_start = now - Duration::minutes(self.config.cooldown_minutes);
        let in_cooldown = self
            .alerts
            .exists_recent(AlertType::HighErrorRate, &event.service, cooldown_start)
            .await?;

        if in_cooldown {
            tracing::debug!(service = %event.service, "Skipping alert, cooldown period active");
            return Ok(None);
        }

        let severity = self.severity_for(count);
        let alert = Alert::new(
            AlertType::HighErrorRate,
            severity,
            format!(
                "High error rate detected: {} {} events from service '{}' in the last {} minute(s)",
                count, event.level, event.service, self.config.window_minutes
            ),
            event.service.clone(),
        );

        self.alerts.insert(alert.clone()).await?;

        tracing::warn!(
            alert_id = %alert.id,
            alert_type = %alert.alert_type,
            severity = %alert.severity,
            service = %alert.service,
            "ALERT CREATED: {}",
            alert.message
        );

        Ok(Some(alert))
    }

    /// Map the triggering count to a severity tier
    fn severity_for(&self, count: u64) -> Severity {
        if count > self.config.error_threshold * 3 {
            Severity::Critical
        } else if count > self.config.error_threshold * 2 {
            Severity::Warning
        } else {
            Severity::Info
        }
    }
}
