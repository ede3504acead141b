//! ## Trip Data Loader
//!
//! Reads the trip CSV into a DataFusion [`DataFrame`] using a fixed schema.
//!
//! Timestamps are loaded as strings and parsed later by
//! [`TimestampParser`](crate::transformers::datetime_features::TimestampParser), so one
//! malformed timestamp only nulls that value instead of failing the whole read.
//! Empty numeric fields load as null.

use crate::exceptions::{TaxiEdaError, TaxiEdaResult};
use datafusion::arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use datafusion::prelude::{CsvReadOptions, DataFrame, SessionContext};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub const ID: &str = "id";
pub const VENDOR_ID: &str = "vendor_id";
pub const PICKUP_DATETIME: &str = "pickup_datetime";
pub const DROPOFF_DATETIME: &str = "dropoff_datetime";
pub const PASSENGER_COUNT: &str = "passenger_count";
pub const PICKUP_LONGITUDE: &str = "pickup_longitude";
pub const PICKUP_LATITUDE: &str = "pickup_latitude";
pub const DROPOFF_LONGITUDE: &str = "dropoff_longitude";
pub const DROPOFF_LATITUDE: &str = "dropoff_latitude";
pub const STORE_AND_FWD_FLAG: &str = "store_and_fwd_flag";
pub const TRIP_DURATION: &str = "trip_duration";

// Derived columns.
pub const DISTANCE: &str = "distance";
pub const LOG_DURATION: &str = "log_duration";
pub const WEEKDAY: &str = "weekday";
pub const HOUR_OF_DAY: &str = "hour_of_day";
pub const ZERO_DISTANCE: &str = "zero_distance";

/// Schema of the raw trip CSV, in file column order.
pub fn trip_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(ID, DataType::Utf8, true),
        Field::new(VENDOR_ID, DataType::Int64, true),
        Field::new(PICKUP_DATETIME, DataType::Utf8, true),
        Field::new(DROPOFF_DATETIME, DataType::Utf8, true),
        Field::new(PASSENGER_COUNT, DataType::Int64, true),
        Field::new(PICKUP_LONGITUDE, DataType::Float64, true),
        Field::new(PICKUP_LATITUDE, DataType::Float64, true),
        Field::new(DROPOFF_LONGITUDE, DataType::Float64, true),
        Field::new(DROPOFF_LATITUDE, DataType::Float64, true),
        Field::new(STORE_AND_FWD_FLAG, DataType::Utf8, true),
        Field::new(TRIP_DURATION, DataType::Int64, true),
    ]))
}

/// Loads the trip CSV at `path` with [`trip_schema`].
///
/// Returns [`TaxiEdaError::InputNotFound`] when the path is not an existing file.
pub async fn load_trips(ctx: &SessionContext, path: &Path) -> TaxiEdaResult<DataFrame> {
    if !path.is_file() {
        return Err(TaxiEdaError::InputNotFound(path.to_path_buf()));
    }
    let path_str = path.to_str().ok_or_else(|| {
        TaxiEdaError::InvalidParameter(format!("Input path {} is not valid UTF-8", path.display()))
    })?;

    let schema = trip_schema();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();
    let options = CsvReadOptions::new()
        .has_header(true)
        .schema(schema.as_ref())
        .file_extension(&extension);

    debug!(path = %path.display(), "Loading trip data");
    let df = ctx.read_csv(path_str, options).await?;
    Ok(df)
}
