//! Telemetry sample type

use chrono::NaiveDateTime;

/// Wire layout of a sample timestamp: day, month, year, then wall-clock time.
///
/// Leading zeros are optional when parsing (`3_3_2023 9:05:01` is accepted)
/// and always emitted when formatting.
pub const TIMESTAMP_FORMAT: &str = "%d_%m_%Y %H:%M:%S";

/// Human-readable timestamp layout used in status records.
pub const DISPLAY_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// One parsed telemetry reading.
///
/// Samples are immutable once constructed; the fields are only reachable
/// through accessors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    timestamp: NaiveDateTime,
    fuel_remaining: f64,
}

impl Sample {
    /// Create a new sample
    pub fn new(timestamp: NaiveDateTime, fuel_remaining: f64) -> Self {
        Self { timestamp, fuel_remaining }
    }

    /// Calendar time of the reading, second resolution.
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Fuel remaining, in fuel units.
    pub fn fuel_remaining(&self) -> f64 {
        self.fuel_remaining
    }

    /// Serialize to the canonical telemetry line layout (without terminator).
    pub fn to_line(&self) -> String {
        format!("{},{}", self.timestamp.format(TIMESTAMP_FORMAT), self.fuel_remaining)
    }
}
