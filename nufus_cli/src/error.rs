use nufus::error::{NufusError, ParseError};
use polars::error::PolarsError;

#[derive(thiserror::Error, Debug)]
pub enum NufusCliError {
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
    #[error("serde JSON error: {0}")]
    SerdeJSONError(#[from] serde_json::Error),
    #[error("polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("nufus error: {0}")]
    NufusError(#[from] NufusError),
    #[error(transparent)]
    ParseError(#[from] ParseError),
    #[error("std IO error: {0}")]
    IOError(#[from] std::io::Error),
}

pub type NufusCliResult<T> = Result<T, NufusCliError>;
