//! ## Descriptive Reports
//!
//! Tables and summaries consumed by the reporting side of the analysis (charts are drawn
//! elsewhere from these values):
//!
//! - [`null_counts`]: missing values per column.
//! - [`DurationSummary`]: count, mean, standard deviation, extremes and median of a duration column.
//! - [`QualityReport`]: zero-distance, very short and timestamp-less trips.
//! - [`value_counts`]: frequency table of one column (count-plot input).
//! - [`grouped_duration_stats`]: five-number summary of a target per key (box-plot input).
//! - [`correlation_matrix`]: pairwise Pearson correlation of numeric columns (heatmap input).

use crate::exceptions::{TaxiEdaError, TaxiEdaResult};
use crate::loader::{
    DISTANCE, DROPOFF_LATITUDE, DROPOFF_LONGITUDE, HOUR_OF_DAY, PASSENGER_COUNT,
    PICKUP_DATETIME, PICKUP_LATITUDE, PICKUP_LONGITUDE, TRIP_DURATION, VENDOR_ID, WEEKDAY,
};
use crate::transformers::{column_type, validate_numeric_column};
use datafusion::arrow::datatypes::DataType;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::functions_aggregate::expr_fn::{
    approx_percentile_cont, avg, corr, count, max, median, min, stddev,
};
use datafusion::logical_expr::{cast, col, lit, Expr};
use datafusion::prelude::DataFrame;
use datafusion::scalar::ScalarValue;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Name of the frequency column produced by [`value_counts`].
pub const COUNT: &str = "count";

/// Numeric trip columns compared in the correlation heatmap.
pub const CORRELATION_COLUMNS: [&str; 10] = [
    VENDOR_ID,
    PASSENGER_COUNT,
    PICKUP_LONGITUDE,
    PICKUP_LATITUDE,
    DROPOFF_LONGITUDE,
    DROPOFF_LATITUDE,
    TRIP_DURATION,
    DISTANCE,
    WEEKDAY,
    HOUR_OF_DAY,
];

fn as_float(expr: Expr) -> Expr {
    cast(expr, DataType::Float64)
}

/// Runs an aggregate without grouping and returns its single row.
async fn single_row(df: DataFrame, what: &str) -> TaxiEdaResult<RecordBatch> {
    let batches = df.collect().await?;
    batches
        .into_iter()
        .find(|batch| batch.num_rows() > 0)
        .ok_or_else(|| TaxiEdaError::EmptyResult(what.to_string()))
}

/// Reads row 0 of column `idx` as a float. Null gives `None`.
fn float_at(batch: &RecordBatch, idx: usize) -> TaxiEdaResult<Option<f64>> {
    let scalar = ScalarValue::try_from_array(batch.column(idx), 0)?;
    let value = match scalar {
        ScalarValue::Float64(v) => v,
        ScalarValue::Float32(v) => v.map(f64::from),
        ScalarValue::Int64(v) => v.map(|v| v as f64),
        ScalarValue::Int32(v) => v.map(f64::from),
        ScalarValue::UInt64(v) => v.map(|v| v as f64),
        other => {
            return Err(TaxiEdaError::InvalidParameter(format!(
                "expected a numeric value in column {}, found {:?}",
                batch.schema().field(idx).name(),
                other
            )))
        }
    };
    Ok(value)
}

/// Reads row 0 of column `idx` as a row count. Null gives 0.
fn count_at(batch: &RecordBatch, idx: usize) -> TaxiEdaResult<u64> {
    match ScalarValue::try_from_array(batch.column(idx), 0)? {
        ScalarValue::Int64(v) => Ok(v.map_or(0, |v| v.max(0) as u64)),
        ScalarValue::UInt64(v) => Ok(v.unwrap_or(0)),
        other => Err(TaxiEdaError::InvalidParameter(format!(
            "expected an integer count in column {}, found {:?}",
            batch.schema().field(idx).name(),
            other
        ))),
    }
}

/// Number of null values per column, in schema order.
pub async fn null_counts(df: &DataFrame) -> TaxiEdaResult<Vec<(String, u64)>> {
    let names: Vec<String> = df
        .schema()
        .fields()
        .iter()
        .map(|field| field.name().clone())
        .collect();
    let mut aggregates = vec![count(lit(1)).alias("__rows")];
    aggregates.extend(
        names
            .iter()
            .enumerate()
            .map(|(i, name)| count(col(name)).alias(format!("__non_null_{}", i))),
    );
    let row = single_row(df.clone().aggregate(vec![], aggregates)?, "null counts").await?;
    let rows = count_at(&row, 0)?;
    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| -> TaxiEdaResult<(String, u64)> {
            let non_null = count_at(&row, i + 1)?;
            Ok((name, rows.saturating_sub(non_null)))
        })
        .collect()
}

/// Central tendency and spread of a duration column, in seconds unless converted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationSummary {
    pub count: u64,
    pub mean: Option<f64>,
    /// Sample standard deviation.
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub median: Option<f64>,
}

impl DurationSummary {
    pub async fn compute(df: &DataFrame, column: &str) -> TaxiEdaResult<Self> {
        validate_numeric_column(df, column)?;
        let value = || as_float(col(column));
        let summary_df = df.clone().aggregate(
            vec![],
            vec![
                count(col(column)).alias("count"),
                avg(value()).alias("mean"),
                stddev(value()).alias("std"),
                min(value()).alias("min"),
                max(value()).alias("max"),
                median(value()).alias("median"),
            ],
        )?;
        let row = single_row(summary_df, "duration summary").await?;
        Ok(Self {
            count: count_at(&row, 0)?,
            mean: float_at(&row, 1)?,
            std: float_at(&row, 2)?,
            min: float_at(&row, 3)?,
            max: float_at(&row, 4)?,
            median: float_at(&row, 5)?,
        })
    }

    /// The same summary with every statistic converted from seconds to hours.
    pub fn in_hours(&self) -> Self {
        let hours = |v: Option<f64>| v.map(|s| s / SECONDS_PER_HOUR);
        Self {
            count: self.count,
            mean: hours(self.mean),
            std: hours(self.std),
            min: hours(self.min),
            max: hours(self.max),
            median: hours(self.median),
        }
    }
}

/// Data-quality counters over an enriched trip DataFrame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityReport {
    pub total_trips: usize,
    /// Trips whose pickup and dropoff points coincide.
    pub zero_distance_trips: usize,
    /// Trips shorter than the configured threshold.
    pub short_trips: usize,
    /// Trips whose pickup timestamp is missing or did not parse.
    pub missing_pickup_timestamps: usize,
}

impl QualityReport {
    /// Needs the `distance`, `trip_duration` and parsed `pickup_datetime` columns.
    pub async fn compute(df: &DataFrame, short_trip_seconds: i64) -> TaxiEdaResult<Self> {
        validate_numeric_column(df, DISTANCE)?;
        validate_numeric_column(df, TRIP_DURATION)?;
        column_type(df, PICKUP_DATETIME)?;

        let total_trips = df.clone().count().await?;
        let zero_distance_trips = df
            .clone()
            .filter(as_float(col(DISTANCE)).eq(lit(0.0)))?
            .count()
            .await?;
        let short_trips = df
            .clone()
            .filter(col(TRIP_DURATION).lt(lit(short_trip_seconds)))?
            .count()
            .await?;
        let missing_pickup_timestamps = df
            .clone()
            .filter(col(PICKUP_DATETIME).is_null())?
            .count()
            .await?;
        Ok(Self {
            total_trips,
            zero_distance_trips,
            short_trips,
            missing_pickup_timestamps,
        })
    }
}

/// Frequency of each distinct value of `column` (nulls included), sorted by value.
/// Output columns: `<column>` and `count`.
pub fn value_counts(df: DataFrame, column: &str) -> TaxiEdaResult<DataFrame> {
    column_type(&df, column)?;
    df.aggregate(vec![col(column)], vec![count(lit(1)).alias(COUNT)])?
        .sort(vec![col(column).sort(true, true)])
        .map_err(TaxiEdaError::from)
}

/// Per-key distribution of `target`: `min`, `q1`, `median`, `q3`, `max` and `count`.
/// Quartiles are approximate (t-digest); the median is exact.
pub fn grouped_duration_stats(df: DataFrame, key: &str, target: &str) -> TaxiEdaResult<DataFrame> {
    column_type(&df, key)?;
    validate_numeric_column(&df, target)?;
    let value = || as_float(col(target));
    df.filter(col(key).is_not_null())?
        .aggregate(
            vec![col(key)],
            vec![
                min(value()).alias("min"),
                approx_percentile_cont(value(), lit(0.25), None).alias("q1"),
                median(value()).alias("median"),
                approx_percentile_cont(value(), lit(0.75), None).alias("q3"),
                max(value()).alias("max"),
                count(col(target)).alias(COUNT),
            ],
        )?
        .sort(vec![col(key).sort(true, false)])
        .map_err(TaxiEdaError::from)
}

/// Symmetric matrix of Pearson correlations. `None` where a correlation is undefined
/// (e.g. a constant column).
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

/// Pearson correlation between every pair of `columns`.
pub async fn correlation_matrix(
    df: &DataFrame,
    columns: &[&str],
) -> TaxiEdaResult<CorrelationMatrix> {
    if columns.len() < 2 {
        return Err(TaxiEdaError::InvalidParameter(
            "correlation matrix needs at least two columns".to_string(),
        ));
    }
    for column in columns {
        validate_numeric_column(df, column)?;
    }

    let pairs: Vec<(usize, usize)> = (0..columns.len())
        .flat_map(|i| (i + 1..columns.len()).map(move |j| (i, j)))
        .collect();
    let aggregates: Vec<Expr> = pairs
        .iter()
        .map(|&(i, j)| {
            corr(as_float(col(columns[i])), as_float(col(columns[j])))
                .alias(format!("corr_{}_{}", i, j))
        })
        .collect();
    let row = single_row(df.clone().aggregate(vec![], aggregates)?, "correlation").await?;

    let n = columns.len();
    let mut values = vec![vec![None; n]; n];
    for (i, row_values) in values.iter_mut().enumerate() {
        row_values[i] = Some(1.0);
    }
    for (idx, &(i, j)) in pairs.iter().enumerate() {
        let value = float_at(&row, idx)?.filter(|v| v.is_finite());
        values[i][j] = value;
        values[j][i] = value;
    }
    Ok(CorrelationMatrix {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        values,
    })
}
