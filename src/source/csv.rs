//! CSV file data source.
//!
//! Reads blood pressure readings from a CSV export with a
//! `Date,SYS,DIA,BPM` header line.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use tracing::debug;

use super::{ReadingSource, SourceError};
use crate::data::{parse_timestamp, Reading};

/// A data source that reads blood pressure values from a CSV file.
///
/// The expected format is one header line followed by one reading per
/// line:
///
/// ```text
/// Date,SYS,DIA,BPM
/// 2024-03-01T07:30:00,120,80,60
/// 2024-03-01T21:15:00,135,85,70
/// ```
///
/// Timestamps without a UTC offset are interpreted in the configured
/// default offset. Blank lines are skipped.
#[derive(Debug)]
pub struct CsvSource {
    path: PathBuf,
    description: String,
    default_offset: FixedOffset,
}

impl CsvSource {
    /// Create a new CSV source for the given path.
    ///
    /// `default_offset` is applied to timestamps that do not carry
    /// their own UTC offset.
    pub fn new<P: AsRef<Path>>(path: P, default_offset: FixedOffset) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self {
            path,
            description,
            default_offset,
        }
    }

    /// Returns the path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse one data line into a reading.
    fn parse_line(&self, line: &str, line_no: usize) -> Result<Reading, SourceError> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 4 {
            return Err(SourceError::Parse(format!(
                "line {}: expected 4 fields (Date,SYS,DIA,BPM), got {}",
                line_no,
                fields.len()
            )));
        }

        let timestamp = parse_timestamp(fields[0], self.default_offset)
            .map_err(|e| SourceError::Parse(format!("line {}: {}", line_no, e)))?;
        let systolic = parse_channel(fields[1], "SYS", line_no)?;
        let diastolic = parse_channel(fields[2], "DIA", line_no)?;
        let pulse = parse_channel(fields[3], "BPM", line_no)?;

        Ok(Reading::new(timestamp, systolic, diastolic, pulse))
    }
}

fn parse_channel(field: &str, name: &str, line_no: usize) -> Result<i32, SourceError> {
    field.parse().map_err(|_| {
        SourceError::Parse(format!(
            "line {}: invalid {} value {:?}",
            line_no, name, field
        ))
    })
}

impl ReadingSource for CsvSource {
    fn fetch(&mut self) -> Result<Vec<Reading>, SourceError> {
        let content = fs::read_to_string(&self.path)?;

        let mut readings = Vec::new();
        // Line numbers are 1-based; line 1 is the header.
        for (idx, line) in content.lines().enumerate() {
            let line_no = idx + 1;
            if line_no == 1 || line.trim().is_empty() {
                continue;
            }
            readings.push(self.parse_line(line, line_no)?);
        }

        debug!(count = readings.len(), path = %self.path.display(), "read CSV readings");
        Ok(readings)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(2 * 3600).unwrap()
    }

    fn sample_csv() -> &'static str {
        "Date,SYS,DIA,BPM\n\
         2024-03-01T07:30:00,120,80,60\n\
         2024-03-01T21:15:00,135,85,70\n"
    }

    #[test]
    fn test_csv_source_new() {
        let source = CsvSource::new("/tmp/test.csv", offset());
        assert_eq!(source.path(), Path::new("/tmp/test.csv"));
        assert_eq!(source.description(), "file: /tmp/test.csv");
    }

    #[test]
    fn test_csv_source_fetch() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", sample_csv()).unwrap();

        let mut source = CsvSource::new(file.path(), offset());
        let readings = source.fetch().unwrap();

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].systolic, 120);
        assert_eq!(readings[0].diastolic, 80);
        assert_eq!(readings[0].pulse, 60);
        assert_eq!(readings[1].systolic, 135);
        // Naive timestamps carry the configured offset.
        assert_eq!(readings[0].timestamp.offset(), &offset());
    }

    #[test]
    fn test_csv_source_skips_blank_lines() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "Date,SYS,DIA,BPM\n\n2024-03-01T07:30:00,120,80,60\n\n"
        )
        .unwrap();

        let mut source = CsvSource::new(file.path(), offset());
        let readings = source.fetch().unwrap();
        assert_eq!(readings.len(), 1);
    }

    #[test]
    fn test_csv_source_missing_file() {
        let mut source = CsvSource::new("/nonexistent/path/readings.csv", offset());
        let err = source.fetch().unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
    }

    #[test]
    fn test_csv_source_bad_field_count() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "Date,SYS,DIA,BPM\n2024-03-01T07:30:00,120,80\n").unwrap();

        let mut source = CsvSource::new(file.path(), offset());
        let err = source.fetch().unwrap_err();
        match err {
            SourceError::Parse(msg) => {
                assert!(msg.contains("line 2"));
                assert!(msg.contains("expected 4 fields"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_csv_source_bad_value() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "Date,SYS,DIA,BPM\n2024-03-01T07:30:00,120,eighty,60\n").unwrap();

        let mut source = CsvSource::new(file.path(), offset());
        let err = source.fetch().unwrap_err();
        match err {
            SourceError::Parse(msg) => {
                assert!(msg.contains("line 2"));
                assert!(msg.contains("DIA"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_csv_source_bad_timestamp() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "Date,SYS,DIA,BPM\nnot-a-date,120,80,60\n").unwrap();

        let mut source = CsvSource::new(file.path(), offset());
        let err = source.fetch().unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[test]
    fn test_csv_source_explicit_offset_preserved() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "Date,SYS,DIA,BPM\n2024-03-01T07:30:00+05:00,120,80,60\n"
        )
        .unwrap();

        let mut source = CsvSource::new(file.path(), offset());
        let readings = source.fetch().unwrap();
        assert_eq!(
            readings[0].timestamp.offset(),
            &FixedOffset::east_opt(5 * 3600).unwrap()
        );
    }
}
