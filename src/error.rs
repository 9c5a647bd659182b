//! Error types.
//!
//! Balance queries never fail outward: [`QueryError`] values are folded into
//! [`crate::balance::BalanceResult::Err`]. The monitor session and the front
//! ends report the remaining kinds.

use thiserror::Error;

/// Failure of a single balance lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The address does not match the network's address format.
    #[error("invalid address")]
    InvalidAddress,
    /// Endpoint unreachable, timeout, malformed response or chain id mismatch.
    #[error("{0}")]
    Transport(String),
}

/// Errors surfaced by a monitor session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    #[error("Please enter a wallet address")]
    NoAddress,
    #[error("Invalid {network} wallet address")]
    InvalidAddress { network: String },
    #[error("Monitoring is already active")]
    AlreadyActive,
    #[error("Stop monitoring before running a manual check")]
    MonitoringActive,
    #[error("A balance check is already in progress")]
    QueryInFlight,
    #[error("Failed to fetch balance: {0}")]
    QueryFailed(String),
}

/// Top-level application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("No address provided")]
    NoAddressProvided,
    #[error("Unknown network '{0}', run `networks` to list the available keys")]
    UnknownNetwork(String),
    #[error("Invalid threshold '{0}', expected a non-negative decimal number")]
    InvalidThreshold(String),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
