//! Error types.

use crate::aggregate::GroupKey;

/// Failure to turn range text into a `NumericRange`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid range '{0}': expected two numbers such as 5.000-10.000")]
    InvalidFormat(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    #[error("No population recorded for {key} in {year}")]
    EmptyGroup { key: GroupKey, year: i32 },
}

#[derive(thiserror::Error, Debug)]
pub enum NufusError {
    #[error("Wrapped anyhow error: {0}")]
    AnyhowError(#[from] anyhow::Error),
    #[error("Missing column in population table: {0}")]
    MissingColumn(String),
    #[error("No '<YEAR> {}' columns found in population table", crate::COL::YEAR_COLUMN_SUFFIX)]
    NoYearColumns,
    #[error("Year {0} is not present in the population table")]
    UnknownYear(i32),
    #[error("Negative population {value} in column '{column}' at row {row}")]
    NegativePopulation {
        column: String,
        row: usize,
        value: f64,
    },
    #[error("Unsupported dataset format: {0}")]
    UnsupportedFormat(String),
    #[error("Invalid boundary file: {0}")]
    InvalidBoundaries(String),
    #[error("Wrapped polars error: {0}")]
    PolarsError(#[from] polars::error::PolarsError),
    #[error("Wrapped geojson error: {0}")]
    GeoJsonError(#[from] geojson::Error),
    #[error("std IO error: {0}")]
    IOError(#[from] std::io::Error),
}

pub type NufusResult<T> = Result<T, NufusError>;

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn test_anyhow() {
        let anyhow_error = anyhow!("An anyhow error");
        let nufus_error: NufusError = anyhow_error.into();
        assert_eq!(nufus_error.to_string(), "Wrapped anyhow error: An anyhow error");
    }
}
