//! Per-call outcome audit trail

use crate::{PersistenceError, ScyllaClient};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Final classification record for one answered call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallOutcome {
    pub outcome_id: Uuid,
    pub call_id: String,
    pub lead_id: String,
    pub phone_number: String,
    /// Classification result, snake_case (e.g. "answering_machine")
    pub result: String,
    /// Signal that produced the decision (e.g. "Tone", "Keyword")
    pub source: String,
    pub transcript: String,
    pub connected_at: DateTime<Utc>,
    pub decided_at: DateTime<Utc>,
}

/// Outcome store trait
#[async_trait]
pub trait OutcomeStore: Send + Sync {
    async fn record(&self, outcome: &CallOutcome) -> Result<(), PersistenceError>;
    async fn list_for_lead(
        &self,
        lead_id: &str,
        limit: i32,
    ) -> Result<Vec<CallOutcome>, PersistenceError>;
}

/// ScyllaDB implementation of the outcome store
#[derive(Clone)]
pub struct ScyllaOutcomeStore {
    client: ScyllaClient,
}

impl ScyllaOutcomeStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OutcomeStore for ScyllaOutcomeStore {
    async fn record(&self, outcome: &CallOutcome) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.call_outcomes (
                lead_id, outcome_id, call_id, phone_number,
                result, source, transcript, connected_at, decided_at
            ) VALUES (?, now(), ?, ?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    &outcome.lead_id,
                    &outcome.call_id,
                    &outcome.phone_number,
                    &outcome.result,
                    &outcome.source,
                    &outcome.transcript,
                    outcome.connected_at.timestamp_millis(),
                    outcome.decided_at.timestamp_millis(),
                ),
            )
            .await?;

        tracing::info!(
            call_id = %outcome.call_id,
            lead_id = %outcome.lead_id,
            result = %outcome.result,
            "Call outcome recorded"
        );

        Ok(())
    }

    async fn list_for_lead(
        &self,
        lead_id: &str,
        limit: i32,
    ) -> Result<Vec<CallOutcome>, PersistenceError> {
        let query = format!(
            "SELECT lead_id, outcome_id, call_id, phone_number,
                    result, source, transcript, connected_at, decided_at
             FROM {}.call_outcomes WHERE lead_id = ? LIMIT ?",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (lead_id, limit))
            .await?;

        let mut outcomes = Vec::new();
        if let Some(rows) = result.rows {
            for row in rows {
                let (
                    lead_id,
                    outcome_id,
                    call_id,
                    phone_number,
                    result,
                    source,
                    transcript,
                    connected_at,
                    decided_at,
                ): (String, Uuid, String, String, String, String, String, i64, i64) = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

                outcomes.push(CallOutcome {
                    outcome_id,
                    call_id,
                    lead_id,
                    phone_number,
                    result,
                    source,
                    transcript,
                    connected_at: DateTime::from_timestamp_millis(connected_at)
                        .unwrap_or_else(Utc::now),
                    decided_at: DateTime::from_timestamp_millis(decided_at)
                        .unwrap_or_else(Utc::now),
                });
            }
        }

        Ok(outcomes)
    }
}

/// In-memory outcome store for tests and local development
#[derive(Default)]
pub struct InMemoryOutcomeStore {
    outcomes: Mutex<Vec<CallOutcome>>,
}

impl InMemoryOutcomeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OutcomeStore for InMemoryOutcomeStore {
    async fn record(&self, outcome: &CallOutcome) -> Result<(), PersistenceError> {
        self.outcomes.lock().push(outcome.clone());
        Ok(())
    }

    async fn list_for_lead(
        &self,
        lead_id: &str,
        limit: i32,
    ) -> Result<Vec<CallOutcome>, PersistenceError> {
        Ok(self
            .outcomes
            .lock()
            .iter()
            .filter(|o| o.lead_id == lead_id)
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
