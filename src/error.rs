//src/error.rs

use thiserror::Error;

/// Every failure the statistics engine and its loaders can report.
#[derive(Error, Debug)]
pub enum StatsError {
    /// The operation needs at least one alignment record.
    #[error("{operation} requires at least one alignment record, table is empty")]
    EmptyInput { operation: &'static str },

    /// A required scalar from the run metadata is missing, zero or not a number.
    #[error("invalid metadata field '{field}': {reason}")]
    InvalidMetadata { field: &'static str, reason: String },

    /// A line of the alignment table is not a 12-field record.
    #[error("malformed alignment record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("invalid percentile {value}: {reason}")]
    InvalidPercentile { value: f64, reason: String },

    /// A record points at a reference sequence missing from the lengths table.
    #[error("reference '{0}' not found in sequence lengths")]
    UnknownReference(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl StatsError {
    pub fn empty_input(operation: &'static str) -> Self {
        Self::EmptyInput { operation }
    }

    pub fn invalid_metadata(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidMetadata {
            field,
            reason: reason.into(),
        }
    }

    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }

    pub fn invalid_percentile(value: f64, reason: impl Into<String>) -> Self {
        Self::InvalidPercentile {
            value,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StatsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_problem() {
        let e = StatsError::malformed(7, "expected 12 fields, found 3");
        assert_eq!(
            e.to_string(),
            "malformed alignment record at line 7: expected 12 fields, found 3"
        );

        let e = StatsError::invalid_metadata("base_count", "must be positive");
        assert!(e.to_string().contains("base_count"));

        let e = StatsError::empty_input("percentile thresholds");
        assert!(e.to_string().starts_with("percentile thresholds"));
    }

    #[test]
    fn test_io_errors_convert() {
        fn open() -> Result<()> {
            std::fs::File::open("/definitely/not/here.tsv")?;
            Ok(())
        }
        assert!(matches!(open(), Err(StatsError::Io(_))));
    }
}
