//! ScyllaDB schema creation

use crate::error::PersistenceError;
use scylla::Session;

/// Create the keyspace if it doesn't exist
pub async fn create_keyspace(
    session: &Session,
    keyspace: &str,
    replication_factor: u8,
) -> Result<(), PersistenceError> {
    let query = format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        keyspace, replication_factor
    );

    session
        .query_unpaged(query, &[])
        .await
        .map_err(|e| PersistenceError::SchemaError(format!("Failed to create keyspace: {}", e)))?;

    Ok(())
}

/// Create all required tables
pub async fn create_tables(session: &Session, keyspace: &str) -> Result<(), PersistenceError> {
    // Callback schedules, one row per lead. Re-scheduling overwrites the
    // row; attempt_count carries across overwrites.
    let callbacks_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.callbacks (
            lead_id TEXT,
            phone_number TEXT,
            scheduled_at TIMESTAMP,
            attempt_count INT,
            reason TEXT,
            updated_at TIMESTAMP,
            PRIMARY KEY (lead_id)
        )
    "#,
        keyspace
    );

    session
        .query_unpaged(callbacks_table, &[])
        .await
        .map_err(|e| {
            PersistenceError::SchemaError(format!("Failed to create callbacks table: {}", e))
        })?;

    // Per-call outcome audit trail, newest first per lead
    let outcomes_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.call_outcomes (
            lead_id TEXT,
            outcome_id TIMEUUID,
            call_id TEXT,
            phone_number TEXT,
            result TEXT,
            source TEXT,
            transcript TEXT,
            connected_at TIMESTAMP,
            decided_at TIMESTAMP,
            PRIMARY KEY ((lead_id), outcome_id)
        ) WITH CLUSTERING ORDER BY (outcome_id DESC)
    "#,
        keyspace
    );

    session
        .query_unpaged(outcomes_table, &[])
        .await
        .map_err(|e| {
            PersistenceError::SchemaError(format!("Failed to create call_outcomes table: {}", e))
        })?;

    tracing::info!("All tables created successfully");
    Ok(())
}
