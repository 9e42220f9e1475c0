//! Callback schedule persistence
//!
//! One row per lead. Re-scheduling a lead overwrites its row while carrying
//! the attempt count forward, so repeated machine-answered calls show up as
//! a growing attempt_count rather than duplicate schedule entries.

use crate::{PersistenceError, ScyllaClient};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A scheduled redial for a lead
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackSchedule {
    pub lead_id: String,
    pub phone_number: String,
    pub scheduled_at: DateTime<Utc>,
    pub attempt_count: i32,
    pub reason: String,
    pub updated_at: DateTime<Utc>,
}

/// Callback store trait
#[async_trait]
pub trait CallbackStore: Send + Sync {
    async fn get(&self, lead_id: &str) -> Result<Option<CallbackSchedule>, PersistenceError>;
    async fn put(&self, schedule: &CallbackSchedule) -> Result<(), PersistenceError>;
    /// Schedules whose scheduled_at is at or before `now`
    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<CallbackSchedule>, PersistenceError>;
}

/// ScyllaDB implementation of the callback store
#[derive(Clone)]
pub struct ScyllaCallbackStore {
    client: ScyllaClient,
}

impl ScyllaCallbackStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    fn row_to_schedule(
        &self,
        row: scylla::frame::response::result::Row,
    ) -> Result<CallbackSchedule, PersistenceError> {
        let (lead_id, phone_number, scheduled_at, attempt_count, reason, updated_at): (
            String,
            String,
            i64,
            i32,
            String,
            i64,
        ) = row
            .into_typed()
            .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

        Ok(CallbackSchedule {
            lead_id,
            phone_number,
            scheduled_at: DateTime::from_timestamp_millis(scheduled_at).unwrap_or_else(Utc::now),
            attempt_count,
            reason,
            updated_at: DateTime::from_timestamp_millis(updated_at).unwrap_or_else(Utc::now),
        })
    }
}

#[async_trait]
impl CallbackStore for ScyllaCallbackStore {
    async fn get(&self, lead_id: &str) -> Result<Option<CallbackSchedule>, PersistenceError> {
        let query = format!(
            "SELECT lead_id, phone_number, scheduled_at, attempt_count, reason, updated_at
             FROM {}.callbacks WHERE lead_id = ?",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (lead_id,))
            .await?;

        if let Some(rows) = result.rows {
            if let Some(row) = rows.into_iter().next() {
                return Ok(Some(self.row_to_schedule(row)?));
            }
        }

        Ok(None)
    }

    async fn put(&self, schedule: &CallbackSchedule) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.callbacks (
                lead_id, phone_number, scheduled_at, attempt_count, reason, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    &schedule.lead_id,
                    &schedule.phone_number,
                    schedule.scheduled_at.timestamp_millis(),
                    schedule.attempt_count,
                    &schedule.reason,
                    schedule.updated_at.timestamp_millis(),
                ),
            )
            .await?;

        tracing::info!(
            lead_id = %schedule.lead_id,
            scheduled_at = %schedule.scheduled_at,
            attempt_count = schedule.attempt_count,
            "Callback schedule persisted"
        );

        Ok(())
    }

    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<CallbackSchedule>, PersistenceError> {
        // Full-table filter; the callbacks table stays small (one row per
        // pending lead) so ALLOW FILTERING is acceptable here.
        let query = format!(
            "SELECT lead_id, phone_number, scheduled_at, attempt_count, reason, updated_at
             FROM {}.callbacks WHERE scheduled_at <= ? ALLOW FILTERING",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (now.timestamp_millis(),))
            .await?;

        let mut schedules = Vec::new();
        if let Some(rows) = result.rows {
            for row in rows {
                schedules.push(self.row_to_schedule(row)?);
            }
        }

        Ok(schedules)
    }
}

/// In-memory callback store for tests and local development
#[derive(Default)]
pub struct InMemoryCallbackStore {
    schedules: Mutex<HashMap<String, CallbackSchedule>>,
}

impl InMemoryCallbackStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CallbackStore for InMemoryCallbackStore {
    async fn get(&self, lead_id: &str) -> Result<Option<CallbackSchedule>, PersistenceError> {
        Ok(self.schedules.lock().get(lead_id).cloned())
    }

    async fn put(&self, schedule: &CallbackSchedule) -> Result<(), PersistenceError> {
        self.schedules
            .lock()
            .insert(schedule.lead_id.clone(), schedule.clone());
        Ok(())
    }

    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<CallbackSchedule>, PersistenceError> {
        Ok(self
            .schedules
            .lock()
            .values()
            .filter(|s| s.scheduled_at <= now)
            .cloned()
            .collect())
    }
}

/// Computes and persists redial schedules.
pub struct CallbackScheduler {
    store: Arc<dyn CallbackStore>,
    delay: Duration,
}

impl CallbackScheduler {
    pub fn new(store: Arc<dyn CallbackStore>, delay: Duration) -> Self {
        Self { store, delay }
    }

    /// Schedule a redial for a lead at now + configured delay.
    ///
    /// Increments the lead's attempt count if a schedule already exists.
    pub async fn schedule(
        &self,
        lead_id: &str,
        phone_number: &str,
        reason: &str,
    ) -> Result<CallbackSchedule, PersistenceError> {
        let now = Utc::now();
        let attempt_count = match self.store.get(lead_id).await? {
            Some(existing) => existing.attempt_count + 1,
            None => 1,
        };

        let schedule = CallbackSchedule {
            lead_id: lead_id.to_string(),
            phone_number: phone_number.to_string(),
            scheduled_at: now + self.delay,
            attempt_count,
            reason: reason.to_string(),
            updated_at: now,
        };

        self.store.put(&schedule).await?;

        tracing::info!(
            lead_id = %lead_id,
            scheduled_at = %schedule.scheduled_at,
            attempt_count = attempt_count,
            reason = %reason,
            "Callback scheduled"
        );

        Ok(schedule)
    }

    /// Schedules that are ready to redial
    pub async fn due_now(&self) -> Result<Vec<CallbackSchedule>, PersistenceError> {
        self.store.due(Utc::now()).await
    }
}
