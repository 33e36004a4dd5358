//! Core types for telemetry ingestion.
//!
//! - [`Sample`] is one parsed reading: a calendar timestamp and the fuel
//!   remaining at that instant.
//! - [`Report`] is one status record produced by a session, rendered to a
//!   single human-readable line.
//!
//! ## Usage Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use fuelwatch::types::{Report, Sample};
//!
//! let timestamp = NaiveDate::from_ymd_opt(2023, 3, 3)
//!     .unwrap()
//!     .and_hms_opt(14, 53, 21)
//!     .unwrap();
//! let sample = Sample::new(timestamp, 4564.5);
//! assert_eq!(sample.to_line(), "03_03_2023 14:53:21,4564.5");
//!
//! let report = Report::Summary { sender: "PLANE-7".to_string(), average: 0.25 };
//! assert_eq!(
//!     report.to_string(),
//!     "Flight for sender PLANE-7 ended. Average Fuel Consumption: 0.25 fuel/sec"
//! );
//! ```

mod report;
mod sample;

pub use report::Report;
pub use sample::{DISPLAY_FORMAT, Sample, TIMESTAMP_FORMAT};
