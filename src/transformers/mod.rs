//! # Transformer Implementations
//!
//! The submodules contain the steps of the trip pipeline.

pub mod datetime_features;
pub mod feature_creation;
pub mod outlier_handling;

use crate::exceptions::{TaxiEdaError, TaxiEdaResult};
use datafusion::arrow::datatypes::DataType;
use datafusion::prelude::DataFrame;

/// Returns the data type of `col_name`, or `MissingColumn` if it is absent.
pub(crate) fn column_type(df: &DataFrame, col_name: &str) -> TaxiEdaResult<DataType> {
    df.schema()
        .field_with_name(None, col_name)
        .map(|field| field.data_type().clone())
        .map_err(|_| TaxiEdaError::MissingColumn(format!("Column '{}' not found", col_name)))
}

/// Validates that `col_name` exists and holds numbers.
pub(crate) fn validate_numeric_column(df: &DataFrame, col_name: &str) -> TaxiEdaResult<()> {
    let dt = column_type(df, col_name)?;
    if dt.is_numeric() {
        Ok(())
    } else {
        Err(TaxiEdaError::InvalidParameter(format!(
            "Column '{}' must be numeric, but found {:?}",
            col_name, dt
        )))
    }
}
