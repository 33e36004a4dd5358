//! Connection dispatcher
//!
//! Takes accepted connections from any source and starts one detached tokio
//! task per connection. Sessions are never joined, capped or timed out; each
//! one releases its connection when it reaches the end of its stream.

use std::io;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::io::AsyncRead;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::error::IngestError;
use crate::session::{DEFAULT_READ_BUFFER_SIZE, SessionHandler, SessionOutcome};
use crate::sink::SharedSink;

/// Counters for one dispatcher run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Connections handed to a session.
    pub dispatched: u64,
    /// Accept attempts that failed.
    pub failed: u64,
}

/// Starts a session task for every accepted connection.
#[derive(Clone)]
pub struct Dispatcher {
    sink: SharedSink,
    read_buffer_size: usize,
}

impl Dispatcher {
    /// Create a dispatcher whose sessions report to `sink`
    pub fn new(sink: SharedSink) -> Self {
        Self { sink, read_buffer_size: DEFAULT_READ_BUFFER_SIZE }
    }

    /// Initial read buffer capacity for each session.
    pub fn with_read_buffer_size(mut self, read_buffer_size: usize) -> Self {
        self.read_buffer_size = read_buffer_size;
        self
    }

    /// Start one detached session over `stream`.
    ///
    /// The returned handle may be dropped; the session keeps running.
    pub fn dispatch<S>(&self, stream: S, peer: impl Into<String>) -> JoinHandle<SessionOutcome>
    where
        S: AsyncRead + Unpin + Send + 'static,
    {
        let peer = peer.into();
        let span = info_span!("session", peer = %peer);
        let handler =
            SessionHandler::with_capacity(stream, self.sink.clone(), self.read_buffer_size)
                .with_peer(peer);
        tokio::spawn(handler.run().instrument(span))
    }

    /// Dispatch every connection from `connections` until it ends or `cancel` fires.
    ///
    /// Accept failures are logged and skipped with a short backoff. Sessions
    /// already running are left alone when this returns.
    pub async fn run<C, S>(&self, connections: C, cancel: CancellationToken) -> DispatchStats
    where
        C: Stream<Item = io::Result<(S, String)>>,
        S: AsyncRead + Unpin + Send + 'static,
    {
        let mut connections = std::pin::pin!(connections);
        let mut stats = DispatchStats::default();
        let mut consecutive_failures = 0u32;

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Dispatcher cancelled");
                    break;
                }
                next = connections.next() => next,
            };

            match next {
                Some(Ok((stream, peer))) => {
                    consecutive_failures = 0;
                    stats.dispatched += 1;
                    debug!("Accepted connection from {}", peer);
                    drop(self.dispatch(stream, peer));
                }
                Some(Err(e)) => {
                    consecutive_failures += 1;
                    stats.failed += 1;
                    let error = IngestError::accept_failed(e);
                    match std::error::Error::source(&error) {
                        Some(source) => warn!("{}: {}", error, source),
                        None => warn!("{}", error),
                    }

                    // Exponential backoff: 50ms, 100ms, 200ms, ... capped at 1.6s
                    let backoff = Duration::from_millis(50 * (1 << consecutive_failures.min(5)));
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            info!("Dispatcher cancelled");
                            break;
                        }
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
                None => {
                    info!("Connection source closed");
                    break;
                }
            }
        }

        info!(
            "Dispatcher stopped ({} dispatched, {} failed)",
            stats.dispatched, stats.failed
        );
        stats
    }
}
