//! Error types for the gatherer.
//!
//! Everything raised while a pass is being gathered is a [`GatherError`].
//! Only errors from `before_pass` ever reach the caller; the rest are turned
//! into the failure sentinel by the lifecycle controller.

use crate::driver::DriverError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatherError {
    /// Parse notifications could not be enabled or disabled.
    #[error("failed to {action} script tracking: {source}")]
    Tracking {
        action: &'static str,
        #[source]
        source: DriverError,
    },

    #[error("script tracking is already active")]
    AlreadyTracking,

    #[error("script tracking is not active")]
    NotTracking,

    /// A target could not be turned into a remote object.
    #[error("cannot resolve {target}: {reason}")]
    Resolution { target: String, reason: String },

    /// The listener query for a resolved object failed.
    #[error("listener query for {target} failed: {source}")]
    Fetch {
        target: String,
        #[source]
        source: DriverError,
    },

    #[error("malformed {method} response: {source}")]
    MalformedResponse {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Page elements could not be enumerated.
    #[error("failed to enumerate targets: {0}")]
    Enumeration(#[source] DriverError),
}

pub type Result<T> = std::result::Result<T, GatherError>;
