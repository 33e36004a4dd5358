//! Telemetry line parser
//!
//! Every telemetry line after the sender identifier has the flat layout
//!
//! ```text
//! D_M_YYYY H:M:S,FUEL[,]
//! ```
//!
//! - the timestamp follows [`TIMESTAMP_FORMAT`]; leading zeros are optional
//! - `FUEL` is a non-negative decimal number
//! - a trailing `,` record delimiter is tolerated
//! - telemetry exports prefix their first record with `FUEL TOTAL QUANTITY,`,
//!   which is stripped when present
//!
//! Surrounding whitespace is ignored on the line and on each field. A line
//! that is blank after trimming is not a record and parses to `Ok(None)`.

use chrono::NaiveDateTime;

use crate::error::ParseError;
use crate::types::{Sample, TIMESTAMP_FORMAT};

/// Separator between the timestamp and fuel fields.
pub const FIELD_DELIMITER: char = ',';

/// Header carried by the first record of a telemetry export.
pub const EXPORT_HEADER: &str = "FUEL TOTAL QUANTITY,";

/// Parse one telemetry line.
///
/// Returns `Ok(None)` for blank lines, `Ok(Some(sample))` for a valid record
/// and `Err` describing why anything else was rejected.
///
/// ```rust
/// use fuelwatch::parser::parse_line;
///
/// let sample = parse_line(" 3_3_2023 14:53:21,4564.466309, ").unwrap().unwrap();
/// assert_eq!(sample.fuel_remaining(), 4564.466309);
/// assert!(parse_line("   ").unwrap().is_none());
/// assert!(parse_line("3_3_2023 14:53:21").is_err());
/// ```
pub fn parse_line(line: &str) -> Result<Option<Sample>, ParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let body = trimmed.strip_prefix(EXPORT_HEADER).unwrap_or(trimmed);
    let body = body.strip_suffix(FIELD_DELIMITER).unwrap_or(body);
    let fields: Vec<&str> = body.split(FIELD_DELIMITER).map(str::trim).collect();

    match fields.as_slice() {
        [timestamp, fuel] => {
            let timestamp = parse_timestamp(timestamp)?;
            let fuel = parse_fuel(fuel)?;
            Ok(Some(Sample::new(timestamp, fuel)))
        }
        [_] => Err(ParseError::MissingField { field: "fuel" }),
        fields => Err(ParseError::TooManyFields { found: fields.len() }),
    }
}

fn parse_timestamp(value: &str) -> Result<NaiveDateTime, ParseError> {
    if value.is_empty() {
        return Err(ParseError::MissingField { field: "timestamp" });
    }
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map_err(|_| ParseError::InvalidTimestamp { value: value.to_string() })
}

fn parse_fuel(value: &str) -> Result<f64, ParseError> {
    if value.is_empty() {
        return Err(ParseError::MissingField { field: "fuel" });
    }
    let fuel: f64 =
        value.parse().map_err(|_| ParseError::InvalidFuel { value: value.to_string() })?;
    if !fuel.is_finite() || fuel < 0.0 {
        return Err(ParseError::FuelOutOfRange { value: fuel });
    }
    Ok(fuel)
}
