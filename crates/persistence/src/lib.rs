//! ScyllaDB persistence layer for the outbound dialer
//!
//! Provides persistent storage for:
//! - Callback schedules (redial machine-answered leads after a delay)
//! - Call outcomes (classification audit trail)
//!
//! Each store has a Scylla-backed implementation for production and an
//! in-memory one for tests and local development.

pub mod callbacks;
pub mod client;
pub mod error;
pub mod outcomes;
pub mod schema;

pub use callbacks::{
    CallbackSchedule, CallbackScheduler, CallbackStore, InMemoryCallbackStore, ScyllaCallbackStore,
};
pub use client::{ScyllaClient, ScyllaConfig};
pub use error::PersistenceError;
pub use outcomes::{CallOutcome, InMemoryOutcomeStore, OutcomeStore, ScyllaOutcomeStore};

/// Initialize the persistence layer with ScyllaDB
pub async fn init(config: ScyllaConfig) -> Result<PersistenceLayer, PersistenceError> {
    let client = ScyllaClient::connect(config).await?;
    client.ensure_schema().await?;

    Ok(PersistenceLayer {
        callbacks: ScyllaCallbackStore::new(client.clone()),
        outcomes: ScyllaOutcomeStore::new(client),
    })
}

/// Combined persistence layer with all stores
pub struct PersistenceLayer {
    pub callbacks: ScyllaCallbackStore,
    pub outcomes: ScyllaOutcomeStore,
}
