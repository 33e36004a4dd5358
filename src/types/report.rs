//! Status records emitted by sessions

use std::fmt;

use chrono::NaiveDateTime;

use super::sample::DISPLAY_FORMAT;

/// One human-readable status record.
///
/// Every session event that is visible to an operator becomes exactly one
/// `Report`, rendered to a single line by its `Display` impl.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// A sender identified itself.
    Connected { sender: String },

    /// A telemetry line could not be parsed.
    Rejected { sender: String, line: String, reason: String },

    /// A valid sample after the first, with the rate since the previous one.
    Consumption { sender: String, timestamp: NaiveDateTime, fuel_remaining: f64, rate: f64 },

    /// The sender disconnected.
    Summary { sender: String, average: f64 },
}

impl Report {
    /// Sender identifier the record belongs to.
    pub fn sender(&self) -> &str {
        match self {
            Report::Connected { sender }
            | Report::Rejected { sender, .. }
            | Report::Consumption { sender, .. }
            | Report::Summary { sender, .. } => sender,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Connected { sender } => write!(f, "Connected client, sender ID: {sender}"),
            Report::Rejected { sender, line, reason } => {
                write!(f, "Failed to parse telemetry data from {sender}: {line} ({reason})")
            }
            Report::Consumption { sender, timestamp, fuel_remaining, rate } => write!(
                f,
                "Sender {sender} | {} | Fuel Remaining: {fuel_remaining} | Current Consumption: {rate} fuel/sec",
                timestamp.format(DISPLAY_FORMAT)
            ),
            Report::Summary { sender, average } => write!(
                f,
                "Flight for sender {sender} ended. Average Fuel Consumption: {average} fuel/sec"
            ),
        }
    }
}
