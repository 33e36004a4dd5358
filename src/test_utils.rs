//! Test utilities for building telemetry payloads and fragmented streams
//!
//! These helpers are shared by unit tests and benchmarks. They produce wire
//! lines in the export layout and simulate a transport that delivers bytes in
//! arbitrary fragments.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use tokio::io::{AsyncRead, ReadBuf};

use crate::types::Sample;

/// Reference instant that test offsets are measured from.
pub fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 3, 3)
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// `base_time()` plus `seconds`.
pub fn at_offset(seconds: i64) -> NaiveDateTime {
    base_time() + TimeDelta::seconds(seconds)
}

/// One telemetry line in the export layout, without terminator.
///
/// Uses the leading space and trailing record delimiter real exports carry.
pub fn telemetry_line(seconds: i64, fuel: f64) -> String {
    format!(" {},", Sample::new(at_offset(seconds), fuel).to_line())
}

/// A complete session payload: identifier followed by one line per sample.
pub fn session_payload(sender: &str, samples: &[(i64, f64)]) -> String {
    let mut payload = format!("{sender}\n");
    for (seconds, fuel) in samples {
        payload.push_str(&telemetry_line(*seconds, *fuel));
        payload.push('\n');
    }
    payload
}

/// Split `bytes` at the positions chosen by `cuts`, dropping empty pieces.
#[cfg(test)]
pub fn split_at_points<'a>(bytes: &'a [u8], cuts: &[proptest::sample::Index]) -> Vec<&'a [u8]> {
    let mut points: Vec<usize> = cuts.iter().map(|cut| cut.index(bytes.len() + 1)).collect();
    points.push(0);
    points.push(bytes.len());
    points.sort_unstable();
    points.dedup();

    points.windows(2).map(|pair| &bytes[pair[0]..pair[1]]).filter(|c| !c.is_empty()).collect()
}

/// Reader that hands out one pre-cut chunk per read.
///
/// After the last chunk it reports end of stream, or the configured error.
#[derive(Debug)]
pub struct ChunkedReader {
    chunks: VecDeque<Vec<u8>>,
    error: Option<io::ErrorKind>,
}

impl ChunkedReader {
    /// Empty chunks are dropped since a zero-length read means end of stream.
    pub fn new(chunks: Vec<Vec<u8>>, error: Option<io::ErrorKind>) -> Self {
        Self { chunks: chunks.into_iter().filter(|c| !c.is_empty()).collect(), error }
    }
}

impl AsyncRead for ChunkedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.chunks.pop_front() {
            Some(chunk) => {
                let n = chunk.len().min(buf.remaining());
                buf.put_slice(&chunk[..n]);
                if n < chunk.len() {
                    self.chunks.push_front(chunk[n..].to_vec());
                }
                Poll::Ready(Ok(()))
            }
            None => match self.error.take() {
                Some(kind) => Poll::Ready(Err(io::Error::new(kind, "simulated transport failure"))),
                None => Poll::Ready(Ok(())),
            },
        }
    }
}
