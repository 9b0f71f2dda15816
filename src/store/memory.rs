//! In-memory store implementations
//!
//! Back tests and single-process pipelines. State is lost on drop.

use super::{AlertStore, EventQuery, EventStore};
use crate::error::{Result, WardenError};
use crate::types::{Alert, AlertType, LogEvent, LogLevel};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory event store
#[derive(Default)]
pub struct MemoryEventStore {
    events: RwLock<Vec<LogEvent>>,
}

impl MemoryEventStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    /// Whether the store holds no events
    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn insert(&self, event: LogEvent) -> Result<()> {
        let mut events = self.events.write().await;
        if let Some(existing) = events.iter_mut().find(|e| e.id == event.id) {
            *existing = event;
        } else {
            events.push(event);
        }
        Ok(())
    }

    async fn count_by_level_between(
        &self,
        level: LogLevel,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64> {
        let events = self.events.read().await;
        let count = events
            .iter()
            .filter(|e| e.level == level && e.timestamp >= start && e.timestamp <= end)
            .count();
        Ok(count as u64)
    }

    async fn query(&self, filter: &EventQuery, limit: usize) -> Result<Vec<LogEvent>> {
        let events = self.events.read().await;
        let mut matched: Vec<LogEvent> = events
            .iter()
            .filter(|e| {
                filter.service.as_deref().is_none_or(|s| e.service == s)
                    && filter.level.is_none_or(|l| e.level == l)
                    && filter.start.is_none_or(|start| e.timestamp >= start)
                    && filter.end.is_none_or(|end| e.timestamp <= end)
            })
            .cloned()
            .collect();

        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matched.truncate(limit);
        Ok(matched)
    }
}

/// In-memory alert store
#[derive(Default)]
pub struct MemoryAlertStore {
    alerts: RwLock<Vec<Alert>>,
}

impl MemoryAlertStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored alerts
    pub async fn len(&self) -> usize {
        self.alerts.read().await.len()
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn insert(&self, alert: Alert) -> Result<()> {
        self.alerts.write().await.push(alert);
        Ok(())
    }

    async fn exists_recent(
        &self,
        alert_type: AlertType,
        service: &str,
        since: DateTime<Utc>,
    ) -> Result<bool> {
        let alerts = self.alerts.read().await;
        Ok(alerts
            .iter()
            .any(|a| a.alert_type == alert_type && a.service == service && a.detected_at > since))
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Alert>> {
        let alerts = self.alerts.read().await;
        let mut out: Vec<Alert> = alerts.iter().cloned().collect();
        out.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
        out.truncate(limit);
        Ok(out)
    }

    async fn list_unacknowledged(&self) -> Result<Vec<Alert>> {
        let alerts = self.alerts.read().await;
        let mut out: Vec<Alert> = alerts.iter().filter(|a| !a.acknowledged).cloned().collect();
        out.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
        Ok(out)
    }

    async fn count_unacknowledged(&self) -> Result<u64> {
        let alerts = self.alerts.read().await;
        Ok(alerts.iter().filter(|a| !a.acknowledged).count() as u64)
    }

    async fn acknowledge(&self, id: Uuid, acknowledged_by: &str) -> Result<Alert> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| WardenError::NotFound(format!("Alert not found: {}", id)))?;

        alert.acknowledge(acknowledged_by)?;
        Ok(alert.clone())
    }
}
