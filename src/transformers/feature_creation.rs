//! ## Transformers for creating trip features
//!
//! This module provides transformers that derive new per-trip columns from existing ones.
//!
//! Currently, the following transformers are implemented:
//!
//! - **GreatCircleDistance:** Distance in kilometers between the pickup and dropoff points,
//!   computed row by row with [`great_circle_km`](crate::geo::great_circle_km).
//! - **LogDuration:** `ln(x + 1)` of a non-negative numeric column, used to compress the long
//!   right tail of trip durations for plotting.
//! - **ZeroDistanceFlag:** Boolean flag marking trips whose distance is exactly zero.
//!
//! Each transformer provides a constructor, an (async) `fit` method that validates the input
//! schema, and a `transform` method that returns a new DataFrame with the feature appended.

use crate::exceptions::{TaxiEdaError, TaxiEdaResult};
use crate::geo::great_circle_udf;
use crate::impl_transformer;
use crate::loader::{
    DISTANCE, DROPOFF_LATITUDE, DROPOFF_LONGITUDE, LOG_DURATION, PICKUP_LATITUDE,
    PICKUP_LONGITUDE, TRIP_DURATION, ZERO_DISTANCE,
};
use crate::transformers::validate_numeric_column;
use datafusion::arrow::datatypes::DataType;
use datafusion::prelude::*;
use datafusion_expr::{cast, col, lit, Expr};
use datafusion_functions::math;

/// Copies of all columns currently in the DataFrame.
fn passthrough(df: &DataFrame) -> Vec<Expr> {
    df.schema()
        .fields()
        .iter()
        .map(|field| col(field.name()))
        .collect()
}

fn validate_alias(alias: &str, transformer: &str) -> TaxiEdaResult<()> {
    if alias.trim().is_empty() {
        return Err(TaxiEdaError::InvalidParameter(format!(
            "{}: feature name cannot be empty",
            transformer
        )));
    }
    Ok(())
}

/// Appends the great-circle distance between two coordinate pairs.
/// A null in any of the four coordinates gives a null distance.
pub struct GreatCircleDistance {
    pub alias: String,
    pub pickup_latitude: String,
    pub pickup_longitude: String,
    pub dropoff_latitude: String,
    pub dropoff_longitude: String,
}

impl GreatCircleDistance {
    pub fn new(
        alias: impl Into<String>,
        pickup_latitude: impl Into<String>,
        pickup_longitude: impl Into<String>,
        dropoff_latitude: impl Into<String>,
        dropoff_longitude: impl Into<String>,
    ) -> Self {
        Self {
            alias: alias.into(),
            pickup_latitude: pickup_latitude.into(),
            pickup_longitude: pickup_longitude.into(),
            dropoff_latitude: dropoff_latitude.into(),
            dropoff_longitude: dropoff_longitude.into(),
        }
    }

    /// `distance` from the pickup and dropoff columns of the trip schema.
    pub fn trips() -> Self {
        Self::new(
            DISTANCE,
            PICKUP_LATITUDE,
            PICKUP_LONGITUDE,
            DROPOFF_LATITUDE,
            DROPOFF_LONGITUDE,
        )
    }

    fn coordinate_columns(&self) -> [&str; 4] {
        [
            self.pickup_latitude.as_str(),
            self.pickup_longitude.as_str(),
            self.dropoff_latitude.as_str(),
            self.dropoff_longitude.as_str(),
        ]
    }

    fn validate(&self, df: &DataFrame) -> TaxiEdaResult<()> {
        validate_alias(&self.alias, "GreatCircleDistance")?;
        for col_name in self.coordinate_columns() {
            validate_numeric_column(df, col_name)?;
        }
        Ok(())
    }

    pub async fn fit(&mut self, df: &DataFrame) -> TaxiEdaResult<()> {
        self.validate(df)
    }

    pub fn transform(&self, df: DataFrame) -> TaxiEdaResult<DataFrame> {
        self.validate(&df)?;
        let args: Vec<Expr> = self
            .coordinate_columns()
            .iter()
            .map(|name| cast(col(*name), DataType::Float64))
            .collect();
        let mut exprs = passthrough(&df);
        exprs.push(great_circle_udf().call(args).alias(&self.alias));
        df.select(exprs).map_err(TaxiEdaError::from)
    }
}

/// Appends `ln(source + 1)` as a `Float64` column.
///
/// The shift by one keeps zero durations finite (`ln(1) = 0`), and the result grows
/// monotonically with the source.
pub struct LogDuration {
    pub source: String,
    pub alias: String,
}

impl LogDuration {
    pub fn new(source: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            alias: alias.into(),
        }
    }

    /// `log_duration` from `trip_duration`.
    pub fn trips() -> Self {
        Self::new(TRIP_DURATION, LOG_DURATION)
    }

    pub async fn fit(&mut self, df: &DataFrame) -> TaxiEdaResult<()> {
        validate_alias(&self.alias, "LogDuration")?;
        validate_numeric_column(df, &self.source)
    }

    pub fn transform(&self, df: DataFrame) -> TaxiEdaResult<DataFrame> {
        validate_alias(&self.alias, "LogDuration")?;
        validate_numeric_column(&df, &self.source)?;
        let shifted = cast(col(&self.source), DataType::Float64) + lit(1.0);
        let mut exprs = passthrough(&df);
        exprs.push(math::ln().call(vec![shifted]).alias(&self.alias));
        df.select(exprs).map_err(TaxiEdaError::from)
    }
}

/// Appends a boolean column that is true where `source == 0`.
pub struct ZeroDistanceFlag {
    pub source: String,
    pub alias: String,
}

impl ZeroDistanceFlag {
    pub fn new(source: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            alias: alias.into(),
        }
    }

    /// `zero_distance` from `distance`.
    pub fn trips() -> Self {
        Self::new(DISTANCE, ZERO_DISTANCE)
    }

    pub async fn fit(&mut self, df: &DataFrame) -> TaxiEdaResult<()> {
        validate_alias(&self.alias, "ZeroDistanceFlag")?;
        validate_numeric_column(df, &self.source)
    }

    pub fn transform(&self, df: DataFrame) -> TaxiEdaResult<DataFrame> {
        validate_numeric_column(&df, &self.source)?;
        let flag = cast(col(&self.source), DataType::Float64).eq(lit(0.0));
        let mut exprs = passthrough(&df);
        exprs.push(flag.alias(&self.alias));
        df.select(exprs).map_err(TaxiEdaError::from)
    }
}

impl_transformer!(GreatCircleDistance);
impl_transformer!(LogDuration);
impl_transformer!(ZeroDistanceFlag);
