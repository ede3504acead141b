//! ## Custom Errors for the Taxi Trip Analysis
//!
//! This module defines the error type shared by every stage of the analysis.
//! It uses the `thiserror` crate to derive the `Error` trait.
//! Engine errors (DataFusion, Arrow, Parquet) and I/O errors are wrapped so that `?` works
//! across the whole crate, while the remaining variants describe problems with the input data
//! or with the parameters handed to a transformer.
//!
//! The `TaxiEdaResult` type alias is the result type returned throughout the library.
//!
//! ### Example
//!
//! ```rust
//! use nyc_taxi_eda::exceptions::{TaxiEdaError, TaxiEdaResult};
//!
//! fn check_column(name: &str) -> TaxiEdaResult<()> {
//!     Err(TaxiEdaError::MissingColumn(name.into()))
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, enriching, filtering or summarizing trip data.
#[derive(Debug, Error)]
pub enum TaxiEdaError {
    /// Wraps underlying I/O errors.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Wraps errors from DataFusion.
    #[error("DataFusion error: {0}")]
    DataFusionError(#[from] datafusion::error::DataFusionError),

    /// Wraps errors from Arrow.
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// Wraps errors from Parquet.
    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    /// The configured input file does not exist. Fatal for a run.
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Indicates that an invalid parameter was provided (e.g., an empty bounding box or a wrong column type).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Indicates that the specified column does not exist in the DataFrame.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A query that should produce exactly one summary row produced none.
    #[error("Empty result: {0}")]
    EmptyResult(String),
}

/// A convenient result type for the analysis.
pub type TaxiEdaResult<T> = std::result::Result<T, TaxiEdaError>;
