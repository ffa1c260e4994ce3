//! Error types for loading, aligning and decomposing chlorophyll series.
//!
//! Load, align and config errors are fatal for a run. Decomposition and
//! trend-fit errors are recovered per region by the pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Failure reading one of the input tables.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed table {source_name}: {source}")]
    Csv {
        source_name: String,
        #[source]
        source: csv::Error,
    },

    #[error("{source_name} is missing required column '{column}'")]
    MissingColumn {
        source_name: String,
        column: &'static str,
    },

    #[error("{source_name} row {row}: month {month} is outside 1-12")]
    InvalidMonth {
        source_name: String,
        row: usize,
        month: u32,
    },
}

/// Failure building the per-region monthly index.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AlignError {
    #[error("duplicate observation for region '{region}' at {year}-{month:02}")]
    DuplicateTimestamp {
        region: String,
        year: i32,
        month: u32,
    },
}

/// Reasons an additive decomposition cannot be computed for a series.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecompositionError {
    #[error("invalid period {0}: must be at least 2")]
    InvalidPeriod(usize),

    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("non-finite value at index {index}")]
    NonFiniteValue { index: usize },
}

/// Reasons an ordinary least-squares trend line cannot be fitted.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrendFitError {
    #[error("insufficient data: need at least 2 finite points, got {0}")]
    InsufficientData(usize),

    #[error("all x values are identical")]
    ConstantX,
}

/// Invalid analysis configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = DecompositionError::InsufficientData { needed: 10, got: 4 };
        assert_eq!(err.to_string(), "insufficient data: need at least 10, got 4");

        let err = AlignError::DuplicateTimestamp {
            region: "Jones".to_string(),
            year: 2005,
            month: 3,
        };
        assert_eq!(
            err.to_string(),
            "duplicate observation for region 'Jones' at 2005-03"
        );

        let err = LoadError::MissingColumn {
            source_name: "chl.csv".to_string(),
            column: "MeanChl",
        };
        assert_eq!(err.to_string(), "chl.csv is missing required column 'MeanChl'");
    }
}
