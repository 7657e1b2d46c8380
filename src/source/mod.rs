//! Ingestion adapters for blood pressure readings.
//!
//! This module provides a trait-based abstraction for fetching
//! measurement readings from different backends (CSV files, the
//! Withings web API).

mod csv;

#[cfg(feature = "withings")]
mod withings;

pub use csv::CsvSource;

#[cfg(feature = "withings")]
pub use withings::{WithingsCredentials, WithingsSource};

use std::fmt::Debug;

use thiserror::Error;

use crate::data::Reading;

/// Errors that can occur while fetching readings from a source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Reading the input failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input could not be parsed.
    #[error("Failed to parse input: {0}")]
    Parse(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Authentication or authorization failed.
    #[error("Authorization failed: {0}")]
    Auth(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timed out waiting for a response or callback.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The source is not usable in this build or configuration.
    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

#[cfg(feature = "withings")]
impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout(err.to_string())
        } else if err.is_connect() {
            SourceError::Connection(err.to_string())
        } else {
            SourceError::Http(err.to_string())
        }
    }
}

/// Trait for fetching blood pressure readings from a backend.
///
/// Implementations return readings as the backend delivered them;
/// sorting and range filtering happen afterwards in the classifier.
///
/// # Example
///
/// ```no_run
/// use blutdruck::data::parse_utc_offset;
/// use blutdruck::source::{CsvSource, ReadingSource};
///
/// # fn main() -> anyhow::Result<()> {
/// let offset = parse_utc_offset("+02:00")?;
/// let mut source = CsvSource::new("readings.csv", offset);
/// let readings = source.fetch()?;
/// println!("{} readings from {}", readings.len(), source.description());
/// # Ok(())
/// # }
/// ```
pub trait ReadingSource: Debug {
    /// Fetch all available readings from the backend.
    fn fetch(&mut self) -> Result<Vec<Reading>, SourceError>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;
}
