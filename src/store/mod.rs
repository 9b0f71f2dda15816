//! Store collaborators for events and alerts
//!
//! Append-and-query backends consumed by the stream consumer and the anomaly
//! detector. In-memory implementations live in `memory`; deployments wanting
//! durable storage plug their own backends in behind the same traits.

use crate::error::Result;
use crate::types::{Alert, AlertType, LogEvent, LogLevel};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod memory;

/// Filter for querying stored log events
///
/// Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    /// Restrict to one service
    pub service: Option<String>,

    /// Restrict to one level
    pub level: Option<LogLevel>,

    /// Inclusive lower bound on event time
    pub start: Option<DateTime<Utc>>,

    /// Inclusive upper bound on event time
    pub end: Option<DateTime<Utc>>,
}

/// Store for normalized log events
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist an event
    ///
    /// Inserting an id that already exists overwrites the stored record, so
    /// a redelivered message settles on the same row instead of duplicating.
    async fn insert(&self, event: LogEvent) -> Result<()>;

    /// Count events at `level` with `start <= timestamp <= end`, across
    /// all services
    async fn count_by_level_between(
        &self,
        level: LogLevel,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64>;

    /// Fetch events matching the filter, newest first
    async fn query(&self, filter: &EventQuery, limit: usize) -> Result<Vec<LogEvent>>;
}

/// Store for detector alerts
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Persist a new alert
    async fn insert(&self, alert: Alert) -> Result<()>;

    /// Whether an alert of `alert_type` for `service` was detected
    /// after `since`
    async fn exists_recent(
        &self,
        alert_type: AlertType,
        service: &str,
        since: DateTime<Utc>,
    ) -> Result<bool>;

    /// Fetch alerts, newest first
    async fn list_recent(&self, limit: usize) -> Result<Vec<Alert>>;

    /// Fetch unacknowledged alerts, newest first
    async fn list_unacknowledged(&self) -> Result<Vec<Alert>>;

    /// Count unacknowledged alerts
    async fn count_unacknowledged(&self) -> Result<u64>;

    /// Acknowledge an alert exactly once, returning the updated record
    ///
    /// Fails with `NotFound` for an unknown id and `AlreadyAcknowledged`
    /// when the transition has already happened.
    async fn acknowledge(&self, id: Uuid, acknowledged_by: &str) -> Result<Alert>;
}
