//! Error types shared across the engine

use thiserror::Error;

/// Errors from the external telephony actuation layer
#[derive(Error, Debug, Clone)]
pub enum TelephonyError {
    #[error("Call not found: {0}")]
    CallNotFound(String),

    #[error("Telephony API error: {0}")]
    Api(String),

    #[error("Telephony request timed out")]
    Timeout,
}
