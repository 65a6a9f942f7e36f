//! Time and timestamp helpers.

use chrono::{DateTime, Utc};

use crate::error::ValidationError;

/// UTC timestamp used for event times and device registration.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Parse a caller-supplied RFC 3339 timestamp (e.g. the `from` query of
/// event lookups).
///
/// # Errors
///
/// Returns [`ValidationError::Invalid`] naming `field` when `value` is not a
/// valid RFC 3339 timestamp.
pub fn parse_rfc3339(field: &'static str, value: &str) -> Result<Timestamp, ValidationError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.to_utc())
        .map_err(|err| ValidationError::Invalid {
            field,
            reason: err.to_string(),
        })
}

/// Microseconds since the Unix epoch; the sortable form used by stores.
#[must_use]
pub fn to_micros(ts: Timestamp) -> i64 {
    ts.timestamp_micros()
}

/// Inverse of [`to_micros`]. Out-of-range values clamp to the epoch.
#[must_use]
pub fn from_micros(micros: i64) -> Timestamp {
    DateTime::from_timestamp_micros(micros).unwrap_or_default()
}
