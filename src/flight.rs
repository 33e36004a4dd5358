//! Per-session running state and the fuel consumption algorithm
//!
//! A [`FlightState`] remembers the first and the most recent valid sample of a
//! session. Each new sample is compared against the most recent one to give
//! an instantaneous rate; at session end the first and last samples give the
//! average rate.
//!
//! Rates are in fuel units per second. Positive means fuel went down. A fuel
//! increase yields a negative rate and is reported unclamped. When the
//! elapsed time is not positive the rate is defined as `0`.

use crate::types::Sample;

/// Fuel consumed per second between two samples.
///
/// Elapsed time is calendar-time subtraction in whole seconds, so month and
/// year rollovers are handled. Returns `0.0` when `later` is not strictly
/// after `earlier`.
///
/// ```rust
/// use chrono::NaiveDate;
/// use fuelwatch::flight::consumption_rate;
/// use fuelwatch::types::Sample;
///
/// let day = NaiveDate::from_ymd_opt(2023, 3, 3).unwrap();
/// let a = Sample::new(day.and_hms_opt(10, 0, 0).unwrap(), 50.0);
/// let b = Sample::new(day.and_hms_opt(10, 1, 0).unwrap(), 44.0);
/// assert!((consumption_rate(&a, &b) - 0.1).abs() < 1e-12);
/// assert_eq!(consumption_rate(&b, &a), 0.0);
/// ```
pub fn consumption_rate(earlier: &Sample, later: &Sample) -> f64 {
    let elapsed = (later.timestamp() - earlier.timestamp()).num_seconds();
    if elapsed > 0 {
        (earlier.fuel_remaining() - later.fuel_remaining()) / elapsed as f64
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Span {
    start: Sample,
    last: Sample,
}

/// Running state of one session.
///
/// Owned by exactly one session handler; never shared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlightState {
    span: Option<Span>,
    samples: u64,
}

impl FlightState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb the next valid sample.
    ///
    /// The first sample only seeds the state and yields `None`. Every later
    /// sample yields the rate since the previous one and becomes the new
    /// last snapshot. The start snapshot is written once.
    pub fn absorb(&mut self, sample: Sample) -> Option<f64> {
        self.samples += 1;
        match &mut self.span {
            None => {
                self.span = Some(Span { start: sample, last: sample });
                None
            }
            Some(span) => {
                let rate = consumption_rate(&span.last, &sample);
                span.last = sample;
                Some(rate)
            }
        }
    }

    /// Average rate between the first and last absorbed samples.
    ///
    /// `0.0` when fewer than two samples span a positive interval, including
    /// a session that never absorbed a sample.
    pub fn finalize(&self) -> f64 {
        match &self.span {
            Some(span) => consumption_rate(&span.start, &span.last),
            None => 0.0,
        }
    }

    /// Whether at least one sample has been absorbed.
    pub fn is_started(&self) -> bool {
        self.span.is_some()
    }

    pub fn start(&self) -> Option<&Sample> {
        self.span.as_ref().map(|span| &span.start)
    }

    pub fn last(&self) -> Option<&Sample> {
        self.span.as_ref().map(|span| &span.last)
    }

    /// Number of samples absorbed so far.
    pub fn samples(&self) -> u64 {
        self.samples
    }
}
