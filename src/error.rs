//! Error types for coap-heartbeat
//!
//! This module defines the crate-level error type. Layer-specific errors
//! (`HeartbeatError` for the CBOR codec, `TransportError` for the CoAP
//! transport) live next to the code that raises them and convert into
//! [`HeartbeatSimError`] via `From`. Uses `thiserror` for ergonomic error
//! handling with automatic `Display` and `Error` trait implementations.
//!
//! Failures during an exchange never surface through this type: the
//! coordinator folds them into an [`ExchangeOutcome`](crate::exchange::ExchangeOutcome).
//! `HeartbeatSimError` covers everything around the exchange (configuration,
//! file I/O).

use thiserror::Error;

use crate::heartbeat::HeartbeatError;
use crate::transport::TransportError;

/// The primary error type for coap-heartbeat operations.
#[derive(Error, Debug)]
pub enum HeartbeatSimError {
    /// Configuration-related errors (invalid env override, unreadable file, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON errors from the config file
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CBOR encode/decode errors
    #[error("Heartbeat codec error: {0}")]
    Heartbeat(#[from] HeartbeatError),

    /// CoAP transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// A specialized `Result` type for coap-heartbeat operations.
pub type Result<T> = std::result::Result<T, HeartbeatSimError>;
