//! Data model and processing for blood pressure readings.
//!
//! This module holds the measurement record type and the pure
//! transformations applied to it before rendering.
//!
//! ## Submodules
//!
//! - [`reading`]: The [`Reading`] record and timestamp/offset parsing
//! - [`cohort`]: Sorting, range filtering, and morning/evening classification
//! - [`stats`]: Per-channel mean and population standard deviation
//!
//! ## Data Flow
//!
//! ```text
//! Vec<Reading> (from a source)
//!       │
//!       ▼
//! Cohorts::classify(readings, start, end)
//!       │
//!       ├──▶ complete / morning / evening cohorts
//!       │
//!       └──▶ CohortSummary::compute() (means and deviations)
//! ```

pub mod cohort;
pub mod reading;
pub mod stats;

pub use cohort::{evening_readings, filter_range, morning_readings, sort_by_time, Cohorts};
pub use reading::{parse_timestamp, parse_utc_offset, Reading, MINUTE_FORMAT, SECOND_FORMAT};
pub use stats::{ChannelStats, CohortSummary};
