//! Per-connection session pipeline
//!
//! A session walks through three phases:
//!
//! 1. **Awaiting identifier**: the first complete line is the sender ID,
//!    taken as-is. If the stream ends first the session closes silently.
//! 2. **Streaming telemetry**: every further line is parsed; valid samples
//!    update the [`FlightState`] and, from the second one on, produce a
//!    consumption record. Rejected lines produce a rejection record and are
//!    otherwise ignored.
//! 3. **Closed**: on end of stream or a transport error the average rate is
//!    computed and a summary record written.
//!
//! Nothing that happens inside a session is returned as an error. Transport
//! failures end the session the same way a clean disconnect does.

use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, trace, warn};

use crate::error::IngestError;
use crate::flight::FlightState;
use crate::framer::LineCodec;
use crate::parser::parse_line;
use crate::sink::SharedSink;
use crate::types::Report;

/// Default initial capacity of the per-session read buffer, in bytes.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 128;

/// Final figures of a session that identified itself.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub sender: String,
    /// Valid samples absorbed.
    pub samples: u64,
    /// Lines rejected by the parser.
    pub rejected: u64,
    /// Average consumption between the first and last sample, fuel/sec.
    pub average: f64,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// The stream closed before a sender identifier was complete.
    NoIdentifier,
    /// The sender identified itself and the session ran to end of stream.
    Completed(SessionSummary),
}

/// Drives one accepted connection from identifier to summary.
pub struct SessionHandler<S> {
    lines: FramedRead<S, LineCodec>,
    sink: SharedSink,
    peer: String,
}

impl<S> SessionHandler<S>
where
    S: AsyncRead + Unpin,
{
    /// Create a handler over `stream` reporting to `sink`
    pub fn new(stream: S, sink: SharedSink) -> Self {
        Self::with_capacity(stream, sink, DEFAULT_READ_BUFFER_SIZE)
    }

    /// Create a handler with a specific initial read buffer size
    pub fn with_capacity(stream: S, sink: SharedSink, read_buffer_size: usize) -> Self {
        Self {
            lines: FramedRead::with_capacity(stream, LineCodec::new(), read_buffer_size.max(1)),
            sink,
            peer: String::from("<unknown>"),
        }
    }

    /// Label used for this connection in logs.
    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peer = peer.into();
        self
    }

    /// Run the session to completion.
    pub async fn run(mut self) -> SessionOutcome {
        let Some(identifier) = self.next_line().await else {
            debug!("Connection from {} closed before sending an identifier", self.peer);
            return SessionOutcome::NoIdentifier;
        };
        let sender = identifier.trim_end_matches('\r').to_string();

        info!("Sender {} connected from {}", sender, self.peer);
        self.sink.write(&Report::Connected { sender: sender.clone() }).await;

        let mut flight = FlightState::new();
        let mut rejected = 0u64;

        while let Some(line) = self.next_line().await {
            match parse_line(&line) {
                Ok(None) => trace!("Skipping blank line from {}", sender),
                Ok(Some(sample)) => {
                    if let Some(rate) = flight.absorb(sample) {
                        self.sink
                            .write(&Report::Consumption {
                                sender: sender.clone(),
                                timestamp: sample.timestamp(),
                                fuel_remaining: sample.fuel_remaining(),
                                rate,
                            })
                            .await;
                    } else {
                        debug!("First sample from {}: {}", sender, sample.to_line());
                    }
                }
                Err(e) => {
                    rejected += 1;
                    debug!("Rejected line from {}: {}", sender, e);
                    self.sink
                        .write(&Report::Rejected {
                            sender: sender.clone(),
                            line: line.clone(),
                            reason: e.to_string(),
                        })
                        .await;
                }
            }
        }

        let average = flight.finalize();
        self.sink.write(&Report::Summary { sender: sender.clone(), average }).await;
        info!(
            "Sender {} disconnected after {} samples ({} rejected)",
            sender,
            flight.samples(),
            rejected
        );

        SessionOutcome::Completed(SessionSummary {
            sender,
            samples: flight.samples(),
            rejected,
            average,
        })
    }

    /// Next complete line, or `None` once the transport is gone.
    async fn next_line(&mut self) -> Option<String> {
        match self.lines.next().await {
            Some(Ok(line)) => Some(line),
            Some(Err(e)) => {
                let error = IngestError::read_failed(self.peer.clone(), e);
                match std::error::Error::source(&error) {
                    Some(source) => warn!("{}: {}", error, source),
                    None => warn!("{}", error),
                }
                None
            }
            None => None,
        }
    }
}

/// Run one session over `stream` with default settings.
pub async fn run_session<S>(stream: S, sink: SharedSink) -> SessionOutcome
where
    S: AsyncRead + Unpin,
{
    SessionHandler::new(stream, sink).run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use crate::test_utils::{ChunkedReader, at_offset, split_at_points, telemetry_line};
    use proptest::prelude::*;
    use std::sync::Arc;

    async fn run_chunks(
        chunks: Vec<Vec<u8>>,
        error: Option<std::io::ErrorKind>,
    ) -> (SessionOutcome, Vec<Report>) {
        let sink = Arc::new(MemorySink::new());
        let reader = ChunkedReader::new(chunks, error);
        let outcome = SessionHandler::new(reader, sink.clone()).run().await;
        (outcome, sink.reports())
    }

    fn rate_of(report: &Report) -> f64 {
        match report {
            Report::Consumption { rate, .. } => *rate,
            other => panic!("expected consumption record, got {other:?}"),
        }
    }

    fn average_of(report: &Report) -> f64 {
        match report {
            Report::Summary { average, .. } => *average,
            other => panic!("expected summary record, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reports_rates_and_summary_in_order() {
        let payload = format!(
            "PLANE-7\n{}\n{}\n{}\n",
            telemetry_line(100, 50.0),
            telemetry_line(160, 44.0),
            telemetry_line(160, 46.0)
        );
        let (outcome, reports) = run_chunks(vec![payload.into_bytes()], None).await;

        assert_eq!(reports.len(), 4);
        assert_eq!(reports[0], Report::Connected { sender: "PLANE-7".to_string() });
        assert!((rate_of(&reports[1]) - 0.1).abs() < 1e-12);
        assert_eq!(rate_of(&reports[2]), 0.0);
        assert!((average_of(&reports[3]) - 4.0 / 60.0).abs() < 1e-12);

        match &reports[1] {
            Report::Consumption { timestamp, fuel_remaining, .. } => {
                assert_eq!(*timestamp, at_offset(160));
                assert_eq!(*fuel_remaining, 44.0);
            }
            other => panic!("unexpected record {other:?}"),
        }

        match outcome {
            SessionOutcome::Completed(summary) => {
                assert_eq!(summary.sender, "PLANE-7");
                assert_eq!(summary.samples, 3);
                assert_eq!(summary.rejected, 0);
            }
            SessionOutcome::NoIdentifier => panic!("session should have completed"),
        }
    }

    #[tokio::test]
    async fn stream_closed_before_identifier_reports_nothing() {
        let (outcome, reports) = run_chunks(vec![b"PLANE-".to_vec()], None).await;
        assert_eq!(outcome, SessionOutcome::NoIdentifier);
        assert!(reports.is_empty());

        let (outcome, reports) = run_chunks(Vec::new(), None).await;
        assert_eq!(outcome, SessionOutcome::NoIdentifier);
        assert!(reports.is_empty());
    }

    #[tokio::test]
    async fn identifier_only_session_averages_zero() {
        let (outcome, reports) = run_chunks(vec![b"LONELY\n".to_vec()], None).await;
        assert_eq!(
            reports,
            vec![
                Report::Connected { sender: "LONELY".to_string() },
                Report::Summary { sender: "LONELY".to_string(), average: 0.0 },
            ]
        );
        assert!(matches!(outcome, SessionOutcome::Completed(SessionSummary { samples: 0, .. })));
    }

    #[tokio::test]
    async fn single_sample_is_silent_and_averages_zero() {
        let payload = format!("ONE\n{}\n", telemetry_line(100, 50.0));
        let (_, reports) = run_chunks(vec![payload.into_bytes()], None).await;
        assert_eq!(reports.len(), 2);
        assert_eq!(average_of(&reports[1]), 0.0);
    }

    #[tokio::test]
    async fn malformed_lines_are_reported_and_skipped() {
        let payload = format!(
            "P\n{}\nnot telemetry\n\n   \n{}\n",
            telemetry_line(0, 10.0),
            telemetry_line(10, 9.0)
        );
        let (outcome, reports) = run_chunks(vec![payload.into_bytes()], None).await;

        assert_eq!(reports.len(), 4);
        match &reports[1] {
            Report::Rejected { sender, line, .. } => {
                assert_eq!(sender, "P");
                assert_eq!(line, "not telemetry");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert!((rate_of(&reports[2]) - 0.1).abs() < 1e-12);
        assert!((average_of(&reports[3]) - 0.1).abs() < 1e-12);
        assert!(matches!(outcome, SessionOutcome::Completed(SessionSummary { rejected: 1, .. })));
    }

    #[tokio::test]
    async fn unterminated_tail_is_not_telemetry() {
        let payload = format!("P\n{}\n{}", telemetry_line(0, 10.0), telemetry_line(10, 0.0));
        let (outcome, reports) = run_chunks(vec![payload.into_bytes()], None).await;
        assert_eq!(reports.len(), 2);
        assert!(matches!(outcome, SessionOutcome::Completed(SessionSummary { samples: 1, .. })));
    }

    #[tokio::test]
    async fn transport_error_closes_with_summary() {
        let payload = format!("P\n{}\n{}\n", telemetry_line(0, 10.0), telemetry_line(20, 8.0));
        let (outcome, reports) =
            run_chunks(vec![payload.into_bytes()], Some(std::io::ErrorKind::ConnectionReset)).await;

        assert_eq!(reports.len(), 3);
        assert!((average_of(&reports[2]) - 0.1).abs() < 1e-12);
        assert!(matches!(outcome, SessionOutcome::Completed(_)));
    }

    #[tokio::test]
    async fn crlf_sender_identifier_is_cleaned() {
        let payload = format!("PLANE-9\r\n{}\r\n", telemetry_line(0, 1.0));
        let (_, reports) = run_chunks(vec![payload.into_bytes()], None).await;
        assert_eq!(reports[0], Report::Connected { sender: "PLANE-9".to_string() });
        assert_eq!(reports.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_fragmentation_does_not_change_reports(
            samples in prop::collection::vec((0i64..3_600, 0.0f64..1_000.0), 0..10),
            cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..24)
        ) {
            let mut payload = String::from("FRAG-1\n");
            for (secs, fuel) in &samples {
                payload.push_str(&telemetry_line(*secs, *fuel));
                payload.push('\n');
            }
            let bytes = payload.into_bytes();

            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let (whole_outcome, whole) = runtime.block_on(run_chunks(vec![bytes.clone()], None));
            let chunks = split_at_points(&bytes, &cuts).into_iter().map(<[u8]>::to_vec).collect();
            let (split_outcome, split) = runtime.block_on(run_chunks(chunks, None));

            prop_assert_eq!(whole.len(), samples.len().saturating_sub(1) + 2);
            prop_assert_eq!(whole, split);
            prop_assert_eq!(whole_outcome, split_outcome);
        }
    }
}
