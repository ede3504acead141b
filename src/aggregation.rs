//! ## Group-median Aggregation
//!
//! Reduces a trip DataFrame to one row per distinct key value holding the median of a target
//! column, e.g. the median `trip_duration` per `weekday` or per `hour_of_day`.
//!
//! Rows whose key or target is null (an unparseable pickup timestamp, for instance) are left out
//! of every group. The median is exact: for an even-sized group it is the average of the two
//! middle values.

use crate::exceptions::{TaxiEdaError, TaxiEdaResult};
use crate::transformers::validate_numeric_column;
use datafusion::arrow::array::Array;
use datafusion::arrow::datatypes::DataType;
use datafusion::common::cast::{as_float64_array, as_int64_array};
use datafusion::functions_aggregate::expr_fn::{count, median};
use datafusion::logical_expr::{cast, col, lit};
use datafusion::prelude::DataFrame;
use tracing::debug;

/// Name of the per-group row count column.
pub const TRIP_COUNT: &str = "trip_count";

/// Name of the median column produced for `target`.
pub fn median_column_name(target: &str) -> String {
    format!("median_{}", target)
}

/// One row of a group-median table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupMedian {
    pub key: i64,
    pub median: f64,
    pub trip_count: i64,
}

/// Statistical median of `values`, or `None` if empty.
///
/// NaN values sort last under `f64::total_cmp`; callers pass finite data.
pub fn median_of(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Builds the group-median plan.
///
/// Output columns: `<key>` (Int64), `median_<target>` (Float64) and `trip_count` (Int64),
/// one row per distinct non-null key, sorted by key.
pub fn group_median(df: DataFrame, key: &str, target: &str) -> TaxiEdaResult<DataFrame> {
    validate_numeric_column(&df, key)?;
    validate_numeric_column(&df, target)?;
    if key == target {
        return Err(TaxiEdaError::InvalidParameter(format!(
            "group key and target must differ, both are '{}'",
            key
        )));
    }
    debug!(key, target, "Building group-median plan");

    df.filter(col(key).is_not_null().and(col(target).is_not_null()))?
        .select(vec![
            cast(col(key), DataType::Int64).alias(key),
            cast(col(target), DataType::Float64).alias(target),
        ])?
        .aggregate(
            vec![col(key)],
            vec![
                median(col(target)).alias(median_column_name(target)),
                count(lit(1)).alias(TRIP_COUNT),
            ],
        )?
        .sort(vec![col(key).sort(true, false)])
        .map_err(TaxiEdaError::from)
}

/// Runs [`group_median`] and returns the rows in key order.
pub async fn collect_group_medians(
    df: DataFrame,
    key: &str,
    target: &str,
) -> TaxiEdaResult<Vec<GroupMedian>> {
    let batches = group_median(df, key, target)?.collect().await?;
    let mut groups = Vec::new();
    for batch in &batches {
        let keys = as_int64_array(batch.column(0))?;
        let medians = as_float64_array(batch.column(1))?;
        let counts = as_int64_array(batch.column(2))?;
        for i in 0..batch.num_rows() {
            if medians.is_null(i) {
                continue;
            }
            groups.push(GroupMedian {
                key: keys.value(i),
                median: medians.value(i),
                trip_count: counts.value(i),
            });
        }
    }
    debug!(key, groups = groups.len(), "Collected group medians");
    Ok(groups)
}
