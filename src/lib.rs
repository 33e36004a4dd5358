//! Concurrent TCP ingest endpoint for line-oriented fuel telemetry.
//!
//! Fuelwatch accepts any number of simultaneous sender connections. Each
//! sender identifies itself with one line, then streams timestamped
//! fuel-remaining readings. For every reading after the first, the session
//! reports the instantaneous fuel consumption rate; when the sender
//! disconnects it reports the average rate over the whole session.
//!
//! # Pipeline
//!
//! ```text
//! Server ─▶ Dispatcher ─▶ SessionHandler ─▶ LineCodec ─▶ parse_line ─▶ FlightState
//!                                │
//!                                └────────────▶ ReportSink (shared)
//! ```
//!
//! - [`framer`]: newline framing tolerant of arbitrary read fragmentation
//! - [`parser`]: `D_M_YYYY H:M:S,FUEL` records into [`Sample`]s
//! - [`flight`]: running state and the consumption rate algorithm
//! - [`session`]: per-connection state machine
//! - [`dispatcher`]: one detached task per connection
//! - [`sink`]: synchronized destinations for status records
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fuelwatch::{Server, ServerConfig, WriterSink};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> fuelwatch::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     let server = Server::bind(&config).await?;
//!     server.run(Arc::new(WriterSink::stdout()), CancellationToken::new()).await;
//!     Ok(())
//! }
//! ```

mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

pub mod config;
pub mod dispatcher;
pub mod flight;
pub mod framer;
pub mod parser;
pub mod server;
pub mod session;
pub mod sink;

// Core exports
pub use error::*;
pub use types::{Report, Sample};

// Pipeline exports
pub use config::ServerConfig;
pub use dispatcher::{DispatchStats, Dispatcher};
pub use flight::FlightState;
pub use framer::{LineCodec, LineFramer};
pub use parser::parse_line;
pub use server::Server;
pub use session::{SessionHandler, SessionOutcome, SessionSummary, run_session};
pub use sink::{MemorySink, ReportSink, SharedSink, TracingSink, WriterSink};
