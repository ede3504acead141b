//! ## Great-circle Distance
//!
//! Surface distance between two latitude/longitude points on a spherical Earth.
//!
//! [`great_circle_km`] is the pure row-level function. [`great_circle_udf`] exposes it to
//! DataFusion as a scalar UDF so a DataFrame column can be derived from four coordinate
//! columns, one call per row.
//!
//! The formula is the spherical special case of Vincenty's formula (the `atan2` of the cross
//! and dot products of the two unit vectors). It is well conditioned for both very small and
//! antipodal separations.

use datafusion::arrow::array::{Array, ArrayRef, Float64Array};
use datafusion::arrow::datatypes::DataType;
use datafusion::common::cast::as_float64_array;
use datafusion::error::DataFusionError;
use datafusion::logical_expr::{create_udf, ColumnarValue, ScalarUDF, Volatility};
use std::sync::Arc;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.009;

/// Name under which the distance UDF is registered.
pub const GREAT_CIRCLE_UDF_NAME: &str = "great_circle_km";

/// A point given in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Great-circle distance in kilometers between two points.
///
/// Returns exactly `0.0` for identical points.
pub fn great_circle_km(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let (sin_lat1, cos_lat1) = lat1.sin_cos();
    let (sin_lat2, cos_lat2) = lat2.sin_cos();
    let (sin_dlon, cos_dlon) = delta_lon.sin_cos();

    let cross_x = cos_lat2 * sin_dlon;
    let cross_y = cos_lat1 * sin_lat2 - sin_lat1 * cos_lat2 * cos_dlon;
    let dot = sin_lat1 * sin_lat2 + cos_lat1 * cos_lat2 * cos_dlon;

    let central_angle = cross_x.hypot(cross_y).atan2(dot);
    EARTH_RADIUS_KM * central_angle
}

/// Column kernel: `(from_lat, from_lon, to_lat, to_lon) -> km`. Null in, null out.
fn great_circle_kernel(args: &[ColumnarValue]) -> datafusion::error::Result<ColumnarValue> {
    let arrays = ColumnarValue::values_to_arrays(args)?;
    let [from_lat, from_lon, to_lat, to_lon] = arrays.as_slice() else {
        return Err(DataFusionError::Execution(format!(
            "{} expects 4 arguments, got {}",
            GREAT_CIRCLE_UDF_NAME,
            arrays.len()
        )));
    };
    let from_lat = as_float64_array(from_lat)?;
    let from_lon = as_float64_array(from_lon)?;
    let to_lat = as_float64_array(to_lat)?;
    let to_lon = as_float64_array(to_lon)?;

    let distances: Float64Array = (0..from_lat.len())
        .map(|i| {
            if from_lat.is_null(i) || from_lon.is_null(i) || to_lat.is_null(i) || to_lon.is_null(i)
            {
                return None;
            }
            Some(great_circle_km(
                Coordinate::new(from_lat.value(i), from_lon.value(i)),
                Coordinate::new(to_lat.value(i), to_lon.value(i)),
            ))
        })
        .collect();

    Ok(ColumnarValue::Array(Arc::new(distances) as ArrayRef))
}

/// Builds the `great_circle_km(from_lat, from_lon, to_lat, to_lon)` scalar UDF.
/// All four arguments must be `Float64`; the result is `Float64` kilometers.
pub fn great_circle_udf() -> ScalarUDF {
    create_udf(
        GREAT_CIRCLE_UDF_NAME,
        vec![DataType::Float64; 4],
        DataType::Float64,
        Volatility::Immutable,
        Arc::new(great_circle_kernel),
    )
}
