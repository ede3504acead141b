//! ## Transformers for removing implausible trips
//!
//! This module provides row filters that drop outlying trips.
//!
//! Currently, the following transformers are implemented:
//!
//! - **BoundingBoxFilter:** Keep trips whose pickup and dropoff points both fall strictly inside
//!   a latitude/longitude box.
//! - **UpperBoundTrimmer:** Keep rows whose value in a column is strictly below a ceiling
//!   (e.g., trip durations under 50,000 seconds).
//!
//! Both are stateless: `fit` only validates the schema. The returned DataFrame is a new working
//! set; the input DataFrame is left as it was.

use crate::exceptions::{TaxiEdaError, TaxiEdaResult};
use crate::impl_transformer;
use crate::loader::{DROPOFF_LATITUDE, DROPOFF_LONGITUDE, PICKUP_LATITUDE, PICKUP_LONGITUDE};
use crate::settings::BoundingBox;
use crate::transformers::validate_numeric_column;
use datafusion::arrow::datatypes::DataType;
use datafusion::logical_expr::{cast, col, lit, Expr};
use datafusion::prelude::*;

/// Strict open-interval predicate `lower < column < upper`.
fn open_interval(col_name: &str, lower: f64, upper: f64) -> Expr {
    col(col_name)
        .gt(lit(lower))
        .and(col(col_name).lt(lit(upper)))
}

/// Names of the four coordinate columns checked by [`BoundingBoxFilter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinateColumns {
    pub pickup_latitude: String,
    pub pickup_longitude: String,
    pub dropoff_latitude: String,
    pub dropoff_longitude: String,
}

impl CoordinateColumns {
    pub fn trips() -> Self {
        Self {
            pickup_latitude: PICKUP_LATITUDE.to_string(),
            pickup_longitude: PICKUP_LONGITUDE.to_string(),
            dropoff_latitude: DROPOFF_LATITUDE.to_string(),
            dropoff_longitude: DROPOFF_LONGITUDE.to_string(),
        }
    }

    fn latitudes(&self) -> [&str; 2] {
        [self.pickup_latitude.as_str(), self.dropoff_latitude.as_str()]
    }

    fn longitudes(&self) -> [&str; 2] {
        [self.pickup_longitude.as_str(), self.dropoff_longitude.as_str()]
    }
}

/// Keeps a row iff all four coordinates lie strictly inside the box.
///
/// The four conditions are combined with AND, so failing any one drops the row. A null
/// coordinate makes the predicate null and the row is dropped as well.
pub struct BoundingBoxFilter {
    pub bbox: BoundingBox,
    pub columns: CoordinateColumns,
}

impl BoundingBoxFilter {
    pub fn new(bbox: BoundingBox, columns: CoordinateColumns) -> Self {
        Self { bbox, columns }
    }

    /// Filter over the pickup and dropoff columns of the trip schema.
    pub fn trips(bbox: BoundingBox) -> Self {
        Self::new(bbox, CoordinateColumns::trips())
    }

    fn validate(&self, df: &DataFrame) -> TaxiEdaResult<()> {
        self.bbox.validate()?;
        for col_name in self.columns.latitudes().into_iter().chain(self.columns.longitudes()) {
            validate_numeric_column(df, col_name)?;
        }
        Ok(())
    }

    /// The combined filter predicate.
    pub fn predicate(&self) -> Expr {
        let latitude_checks = self
            .columns
            .latitudes()
            .map(|name| open_interval(name, self.bbox.min_latitude, self.bbox.max_latitude));
        let longitude_checks = self
            .columns
            .longitudes()
            .map(|name| open_interval(name, self.bbox.min_longitude, self.bbox.max_longitude));
        let [pickup_lat, dropoff_lat] = latitude_checks;
        let [pickup_lon, dropoff_lon] = longitude_checks;
        pickup_lat.and(dropoff_lat).and(pickup_lon).and(dropoff_lon)
    }

    pub async fn fit(&mut self, df: &DataFrame) -> TaxiEdaResult<()> {
        self.validate(df)
    }

    pub fn transform(&self, df: DataFrame) -> TaxiEdaResult<DataFrame> {
        self.validate(&df)?;
        df.filter(self.predicate()).map_err(TaxiEdaError::from)
    }
}

/// Keeps rows with `column < bound`. Rows with a null value are dropped.
pub struct UpperBoundTrimmer {
    pub column: String,
    pub bound: f64,
}

impl UpperBoundTrimmer {
    pub fn new(column: impl Into<String>, bound: f64) -> Self {
        Self {
            column: column.into(),
            bound,
        }
    }

    fn validate(&self, df: &DataFrame) -> TaxiEdaResult<()> {
        if !self.bound.is_finite() {
            return Err(TaxiEdaError::InvalidParameter(format!(
                "UpperBoundTrimmer bound must be finite, got {}",
                self.bound
            )));
        }
        validate_numeric_column(df, &self.column)
    }

    pub async fn fit(&mut self, df: &DataFrame) -> TaxiEdaResult<()> {
        self.validate(df)
    }

    pub fn transform(&self, df: DataFrame) -> TaxiEdaResult<DataFrame> {
        self.validate(&df)?;
        let predicate = cast(col(&self.column), DataType::Float64).lt(lit(self.bound));
        df.filter(predicate).map_err(TaxiEdaError::from)
    }
}

impl_transformer!(BoundingBoxFilter);
impl_transformer!(UpperBoundTrimmer);
