// SPDX-License-Identifier: MIT
// Crate-wide error taxonomy shared by the dialer, handlers and scheduler.

use std::time::Duration;

/// Every fallible path in the engine funnels into one of these variants.
///
/// The scheduler only ever turns `Outcome::Success` into a [`crate::model::ScanResult`] —
/// every other variant here is logged and the scan continues.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid target {target:?}: {reason}")]
    Ingestion { target: String, reason: String },

    #[error("transport error: {0}")]
    Transport(#[source] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("cancelled")]
    Cancelled,
}

impl From<std::io::Error> for ScanError {
    fn from(e: std::io::Error) -> Self {
        ScanError::Transport(e)
    }
}

impl ScanError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        ScanError::Protocol(msg.into())
    }

    pub fn tls(msg: impl Into<String>) -> Self {
        ScanError::Tls(msg.into())
    }
}
