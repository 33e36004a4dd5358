//! Error types for telemetry ingestion.
//!
//! Two families of errors exist in the crate:
//!
//! - [`IngestError`] covers the process and connection level: binding the
//!   listener, accepting connections, reading from a transport and loading
//!   configuration.
//! - [`ParseError`] is the rejection reason for a single telemetry line. It is
//!   never fatal to a session; the session handler reports it and moves on.
//!
//! ## Session locality
//!
//! Only startup failures are meant to reach the caller. Everything else is
//! absorbed by the session or dispatcher it happened in:
//!
//! ```rust
//! use fuelwatch::IngestError;
//!
//! let error = IngestError::accept_failed(std::io::Error::other("reset"));
//! assert!(error.is_session_local());
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ingest operations.
pub type Result<T, E = IngestError> = std::result::Result<T, E>;

/// Main error type for ingest operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum IngestError {
    #[error("Failed to bind telemetry listener on {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to accept telemetry connection")]
    Accept {
        #[source]
        source: std::io::Error,
    },

    #[error("Transport read failed for {peer}")]
    Read {
        peer: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration in {context}: {details}")]
    Config { context: String, details: String },

    #[error("Failed to read configuration file {}", path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// Returns whether this error is contained to a single connection.
    ///
    /// Session-local errors are reported and the connection is abandoned; the
    /// process keeps accepting. Anything else is a startup failure.
    pub fn is_session_local(&self) -> bool {
        match self {
            IngestError::Accept { .. } => true,
            IngestError::Read { .. } => true,
            IngestError::Io(_) => true,
            IngestError::Bind { .. } => false,
            IngestError::Config { .. } => false,
            IngestError::ConfigFile { .. } => false,
        }
    }

    /// Helper constructor for listener bind failures.
    pub fn bind_failed(addr: SocketAddr, source: std::io::Error) -> Self {
        IngestError::Bind { addr: addr.to_string(), source }
    }

    /// Helper constructor for accept failures.
    pub fn accept_failed(source: std::io::Error) -> Self {
        IngestError::Accept { source }
    }

    /// Helper constructor for transport read failures.
    pub fn read_failed(peer: impl Into<String>, source: std::io::Error) -> Self {
        IngestError::Read { peer: peer.into(), source }
    }

    /// Helper constructor for configuration errors.
    pub fn config(context: impl Into<String>, details: impl Into<String>) -> Self {
        IngestError::Config { context: context.into(), details: details.into() }
    }
}

/// Reason a telemetry line was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ParseError {
    #[error("missing {field} field")]
    MissingField { field: &'static str },

    #[error("expected 2 fields, found {found}")]
    TooManyFields { found: usize },

    #[error("invalid timestamp '{value}'")]
    InvalidTimestamp { value: String },

    #[error("invalid fuel value '{value}'")]
    InvalidFuel { value: String },

    #[error("fuel value {value} is not a non-negative finite number")]
    FuelOutOfRange { value: f64 },
}
