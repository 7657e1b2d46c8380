// Library crate: public API items may not be used by the binary
#![allow(unused)]

//! # blutdruck
//!
//! Blood pressure analysis and reporting.
//!
//! This crate reads timestamped blood pressure measurements (systolic,
//! diastolic, pulse) from a CSV export or from the Withings API,
//! classifies them into morning and evening cohorts per calendar day,
//! computes per-channel statistics, and renders SVG charts plus a
//! printable multi page PDF report.
//!
//! ## Architecture
//!
//! The crate is organized into four main modules:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                         Pipeline                           │
//! │  ┌─────────┐   ┌──────────┐   ┌──────────┐   ┌─────────┐  │
//! │  │ source  │──▶│   data   │──▶│  render  │──▶│ report  │  │
//! │  │ (fetch) │   │(cohorts) │   │ (canvas) │   │ (files) │  │
//! │  └────┬────┘   └──────────┘   └──────────┘   └─────────┘  │
//! │       │                                                    │
//! │       └── CsvSource | WithingsSource                       │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: Input abstraction ([`ReadingSource`] trait) with a CSV
//!   file reader and an OAuth2-backed Withings API client
//! - **[`data`]**: The [`Reading`] record, chronological sorting and range
//!   filtering, morning/evening classification, and per-channel mean and
//!   standard deviation
//! - **[`render`]**: Backend-neutral drawing canvas rendered to SVG and to
//!   PDF pages
//! - **[`report`]**: Assembles the chart SVGs and the PDF report on disk
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Analyze a CSV export (Date,SYS,DIA,BPM)
//! blutdruck readings.csv
//!
//! # Fetch from the Withings API for a date range
//! blutdruck --withings -s "2024-03-01 00:00:00" -e "2024-03-31 23:59:59"
//! ```
//!
//! ### Reading a CSV file
//!
//! ```no_run
//! use blutdruck::data::{parse_utc_offset, Cohorts};
//! use blutdruck::{CsvSource, ReadingSource};
//!
//! let offset = parse_utc_offset("+02:00")?;
//! let mut source = CsvSource::new("readings.csv", offset);
//! let readings = source.fetch()?;
//! let cohorts = Cohorts::classify(readings, None, None);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ### Classifying readings directly
//!
//! ```
//! use blutdruck::data::{parse_timestamp, parse_utc_offset, Cohorts, Reading};
//!
//! let offset = parse_utc_offset("+02:00").unwrap();
//! let timestamp = parse_timestamp("2024-03-15 07:30:00", offset).unwrap();
//! let readings = vec![Reading::new(timestamp, 120, 80, 60)];
//!
//! let cohorts = Cohorts::classify(readings, None, None);
//! assert_eq!(cohorts.morning.len(), 1);
//! ```
//!
//! ### Generating the report files
//!
//! ```no_run
//! use std::path::PathBuf;
//!
//! use blutdruck::data::Cohorts;
//! use blutdruck::report::{generate, ReportOptions, DEFAULT_TITLE};
//!
//! # let cohorts = Cohorts::classify(Vec::new(), None, None);
//! let options = ReportOptions {
//!     output_dir: PathBuf::from("."),
//!     title: DEFAULT_TITLE.to_string(),
//!     start: None,
//!     end: None,
//! };
//! let files = generate(&cohorts, &options)?;
//! println!("report at {}", files.pdf.display());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod data;
pub mod render;
pub mod report;
pub mod source;

// Re-export main types for convenience
pub use data::{Cohorts, Reading};
pub use render::{render_pdf, render_svg, Canvas};
pub use report::{ReportFiles, ReportOptions};
pub use source::{CsvSource, ReadingSource, SourceError};

#[cfg(feature = "withings")]
pub use source::{WithingsCredentials, WithingsSource};
