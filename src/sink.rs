//! Synchronized destinations for status records
//!
//! All sessions share one sink through an `Arc<dyn ReportSink>`. The only
//! guarantee a sink gives is that each `write` lands as one unbroken record;
//! records from different sessions may interleave in any order.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

use crate::types::Report;

/// Shared handle to a sink.
pub type SharedSink = Arc<dyn ReportSink>;

/// Destination for status records.
#[async_trait::async_trait]
pub trait ReportSink: Send + Sync + 'static {
    /// Write one record atomically with respect to every other caller.
    ///
    /// Failures to deliver are the sink's own concern; callers never see them.
    async fn write(&self, report: &Report);
}

/// Sink that renders each record as a line on an async writer.
///
/// The writer lock is held across the whole write and flush, so a record is
/// never split by another session's output.
pub struct WriterSink<W> {
    writer: tokio::sync::Mutex<W>,
}

impl<W> WriterSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Create a sink over `writer`
    pub fn new(writer: W) -> Self {
        Self { writer: tokio::sync::Mutex::new(writer) }
    }

    /// Recover the writer once no session holds the sink any more.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl WriterSink<tokio::io::Stdout> {
    /// Sink over the process standard output.
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait::async_trait]
impl<W> ReportSink for WriterSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn write(&self, report: &Report) {
        let mut line = report.to_string();
        line.push('\n');

        let mut writer = self.writer.lock().await;
        if let Err(e) = write_record(&mut *writer, line.as_bytes()).await {
            warn!("Failed to write status record for {}: {}", report.sender(), e);
        }
    }
}

async fn write_record<W>(writer: &mut W, record: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(record).await?;
    writer.flush().await
}

/// Sink that emits each record as one `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait::async_trait]
impl ReportSink for TracingSink {
    async fn write(&self, report: &Report) {
        info!(target: "fuelwatch::report", sender = report.sender(), "{}", report);
    }
}

/// Sink that keeps every record in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Mutex<Vec<Report>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records written so far.
    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    /// Records belonging to one sender, in the order they were written.
    pub fn reports_for(&self, sender: &str) -> Vec<Report> {
        self.reports().into_iter().filter(|report| report.sender() == sender).collect()
    }
}

#[async_trait::async_trait]
impl ReportSink for MemorySink {
    async fn write(&self, report: &Report) {
        self.reports.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push(report.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn writer_sink_terminates_each_record() {
        let sink = WriterSink::new(Vec::new());
        sink.write(&Report::Connected { sender: "A".to_string() }).await;
        sink.write(&Report::Summary { sender: "A".to_string(), average: 0.0 }).await;

        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            output,
            "Connected client, sender ID: A\nFlight for sender A ended. Average Fuel Consumption: 0 fuel/sec\n"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_never_tear_records() {
        const UNITS: usize = 16;
        const RECORDS: usize = 50;

        // A duplex pipe with a tiny buffer forces every write_all into many
        // partial writes, which is where tearing would show.
        let (writer, mut reader) = tokio::io::duplex(7);
        let sink: Arc<WriterSink<tokio::io::DuplexStream>> = Arc::new(WriterSink::new(writer));

        let collector = tokio::spawn(async move {
            let mut out = Vec::new();
            tokio::io::AsyncReadExt::read_to_end(&mut reader, &mut out).await.unwrap();
            String::from_utf8(out).unwrap()
        });

        let mut handles = Vec::new();
        for unit in 0..UNITS {
            let sink = Arc::clone(&sink);
            handles.push(tokio::spawn(async move {
                for record in 0..RECORDS {
                    let report = Report::Rejected {
                        sender: format!("unit-{unit}"),
                        line: format!("record {record} token-a token-b token-c"),
                        reason: format!("unit {unit} record {record}"),
                    };
                    sink.write(&report).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        sink.writer.lock().await.shutdown().await.unwrap();

        let output = collector.await.unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), UNITS * RECORDS);

        let mut seen = HashSet::new();
        for line in lines {
            let expected_prefix = "Failed to parse telemetry data from unit-";
            assert!(line.starts_with(expected_prefix), "torn record: {line:?}");
            let unit: usize = line[expected_prefix.len()..].split(':').next().unwrap().parse().unwrap();
            let record: usize =
                line.split("record ").nth(1).unwrap().split(' ').next().unwrap().parse().unwrap();
            assert_eq!(
                line,
                format!(
                    "Failed to parse telemetry data from unit-{unit}: record {record} token-a token-b token-c (unit {unit} record {record})"
                )
            );
            assert!(seen.insert((unit, record)), "duplicate record {unit}/{record}");
        }
        assert_eq!(seen.len(), UNITS * RECORDS);
    }

    #[tokio::test]
    async fn memory_sink_filters_by_sender() {
        let sink = MemorySink::new();
        sink.write(&Report::Connected { sender: "A".to_string() }).await;
        sink.write(&Report::Connected { sender: "B".to_string() }).await;
        sink.write(&Report::Summary { sender: "A".to_string(), average: 1.0 }).await;

        assert_eq!(sink.reports().len(), 3);
        assert_eq!(
            sink.reports_for("A"),
            vec![
                Report::Connected { sender: "A".to_string() },
                Report::Summary { sender: "A".to_string(), average: 1.0 },
            ]
        );
    }

    #[tokio::test]
    async fn tracing_sink_accepts_records() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        TracingSink.write(&Report::Connected { sender: "A".to_string() }).await;
    }
}
