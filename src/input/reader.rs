//! CSV session log reader.
//!
//! A session log has a header row. The timestamp column is `timestamp` or
//! `client timestamp`; `x`, `y` and `state` are required. Any other column
//! (`record timestamp`, `button`, ...) is ignored.

use crate::input::types::{Sample, SampleState};
use std::io::Read;
use std::path::Path;

/// Accepted names for the timestamp column, in lookup order.
const TIMESTAMP_COLUMNS: [&str; 2] = ["timestamp", "client timestamp"];

/// Errors raised while reading a session log.
#[derive(Debug)]
pub enum ReadError {
    IoError(String),
    CsvError(String),
    MissingColumn(&'static str),
    InvalidValue {
        line: u64,
        column: &'static str,
        value: String,
    },
    TimestampDecreased {
        line: u64,
        previous: f64,
        found: f64,
    },
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::IoError(e) => write!(f, "IO error: {e}"),
            ReadError::CsvError(e) => write!(f, "CSV error: {e}"),
            ReadError::MissingColumn(c) => write!(f, "missing required column '{c}'"),
            ReadError::InvalidValue {
                line,
                column,
                value,
            } => write!(f, "line {line}: invalid {column} value '{value}'"),
            ReadError::TimestampDecreased {
                line,
                previous,
                found,
            } => write!(
                f,
                "line {line}: timestamp went backwards ({previous} -> {found})"
            ),
        }
    }
}

impl std::error::Error for ReadError {}

impl From<csv::Error> for ReadError {
    fn from(e: csv::Error) -> Self {
        ReadError::CsvError(e.to_string())
    }
}

/// Column positions resolved from the header row.
struct ColumnLayout {
    timestamp: usize,
    x: usize,
    y: usize,
    state: usize,
}

impl ColumnLayout {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, ReadError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        let timestamp = TIMESTAMP_COLUMNS
            .iter()
            .find_map(|&name| find(name))
            .ok_or(ReadError::MissingColumn("timestamp"))?;

        Ok(Self {
            timestamp,
            x: find("x").ok_or(ReadError::MissingColumn("x"))?,
            y: find("y").ok_or(ReadError::MissingColumn("y"))?,
            state: find("state").ok_or(ReadError::MissingColumn("state"))?,
        })
    }
}

/// Read a session log from disk.
pub fn read_session_file(path: &Path) -> Result<Vec<Sample>, ReadError> {
    let file = std::fs::File::open(path).map_err(|e| ReadError::IoError(e.to_string()))?;
    read_samples(file)
}

/// Read samples from any CSV source.
pub fn read_samples<R: Read>(source: R) -> Result<Vec<Sample>, ReadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(source);

    let layout = ColumnLayout::from_headers(reader.headers()?)?;

    let mut samples = Vec::new();
    let mut previous: Option<f64> = None;

    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let timestamp = parse_number(&record, layout.timestamp, "timestamp", line)?;
        let x = parse_number(&record, layout.x, "x", line)?;
        let y = parse_number(&record, layout.y, "y", line)?;
        let state = record
            .get(layout.state)
            .map(SampleState::from_label)
            .ok_or(ReadError::InvalidValue {
                line,
                column: "state",
                value: String::new(),
            })?;

        // Ties are fine, going backwards is not
        if let Some(prev) = previous {
            if timestamp < prev {
                return Err(ReadError::TimestampDecreased {
                    line,
                    previous: prev,
                    found: timestamp,
                });
            }
        }
        previous = Some(timestamp);

        samples.push(Sample::new(timestamp, x, y, state));
    }

    Ok(samples)
}

fn parse_number(
    record: &csv::StringRecord,
    index: usize,
    column: &'static str,
    line: u64,
) -> Result<f64, ReadError> {
    let raw = record.get(index).unwrap_or("");
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ReadError::InvalidValue {
            line,
            column,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_dataset_layout() {
        let log = "record timestamp,client timestamp,button,state,x,y\n\
                   0.0,0.0,NoButton,Move,10,20\n\
                   0.1,0.016,NoButton,Move,12,22\n\
                   0.2,0.016,Left,Pressed,12,22\n";

        let samples = read_samples(log.as_bytes()).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[1].timestamp, 0.016);
        assert_eq!(samples[1].point(), (12.0, 22.0));
        assert_eq!(samples[2].state, SampleState::Pressed);
    }

    #[test]
    fn test_plain_timestamp_column() {
        let log = "timestamp,x,y,state\n1.5,3,4,move\n";
        let samples = read_samples(log.as_bytes()).unwrap();
        assert_eq!(samples[0].timestamp, 1.5);
        assert!(samples[0].state.is_move());
    }

    #[test]
    fn test_missing_column() {
        let log = "timestamp,x,state\n1.0,3,Move\n";
        let err = read_samples(log.as_bytes()).unwrap_err();
        assert!(matches!(err, ReadError::MissingColumn("y")));
    }

    #[test]
    fn test_invalid_number_reports_line() {
        let log = "timestamp,x,y,state\n0.0,1,1,Move\n0.1,abc,1,Move\n";
        match read_samples(log.as_bytes()).unwrap_err() {
            ReadError::InvalidValue { line, column, value } => {
                assert_eq!(line, 3);
                assert_eq!(column, "x");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_timestamp_ties_allowed_but_not_decrease() {
        let ties = "timestamp,x,y,state\n1.0,0,0,Move\n1.0,1,1,Move\n";
        assert_eq!(read_samples(ties.as_bytes()).unwrap().len(), 2);

        let backwards = "timestamp,x,y,state\n1.0,0,0,Move\n0.5,1,1,Move\n";
        assert!(matches!(
            read_samples(backwards.as_bytes()).unwrap_err(),
            ReadError::TimestampDecreased { .. }
        ));
    }

    #[test]
    fn test_empty_log_has_no_samples() {
        let log = "timestamp,x,y,state\n";
        assert!(read_samples(log.as_bytes()).unwrap().is_empty());
    }
}
