//! ## Transformers for datetime columns
//!
//! - **TimestampParser:** Parse string columns into timestamps. Values that do not parse become null.
//! - **DatetimeFeatures:** Extract calendar parts (weekday, hour, ...) from a timestamp column.
//!
//! Each transformer returns a new DataFrame; errors are returned as `TaxiEdaError`.

use crate::exceptions::{TaxiEdaError, TaxiEdaResult};
use crate::impl_transformer;
use crate::loader::{DROPOFF_DATETIME, HOUR_OF_DAY, PICKUP_DATETIME, WEEKDAY};
use crate::transformers::column_type;
use datafusion::arrow::datatypes::{DataType, TimeUnit};
use datafusion::dataframe::DataFrame;
use datafusion_expr::{cast, col, lit, try_cast, Expr};
use datafusion_functions::datetime::date_part;
use tracing::debug;

/// Type every parsed timestamp column ends up with.
pub fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Nanosecond, None)
}

/// Validates that a column exists and is of a datetime type (Timestamp, Date32, or Date64).
fn validate_datetime_column(df: &DataFrame, col_name: &str) -> TaxiEdaResult<()> {
    match column_type(df, col_name)? {
        DataType::Timestamp(_, _) | DataType::Date32 | DataType::Date64 => Ok(()),
        dt => Err(TaxiEdaError::InvalidParameter(format!(
            "Column '{}' must be a datetime type (Timestamp, Date32, or Date64), but found {:?}",
            col_name, dt
        ))),
    }
}

/// Converts string columns to `Timestamp(Nanosecond)`.
///
/// Parsing uses `TRY_CAST`, so an unparseable value becomes null rather than failing the
/// query. Timestamps are naive: no timezone conversion is applied. Columns that already hold
/// a datetime type are left untouched.
pub struct TimestampParser {
    pub columns: Vec<String>,
}

impl TimestampParser {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// Parser for the pickup and dropoff columns of the trip schema.
    pub fn trips() -> Self {
        Self::new(vec![PICKUP_DATETIME.to_string(), DROPOFF_DATETIME.to_string()])
    }

    fn validate(&self, df: &DataFrame) -> TaxiEdaResult<()> {
        for col_name in &self.columns {
            match column_type(df, col_name)? {
                DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {}
                _ => validate_datetime_column(df, col_name)?,
            }
        }
        Ok(())
    }

    pub async fn fit(&mut self, df: &DataFrame) -> TaxiEdaResult<()> {
        self.validate(df)
    }

    pub fn transform(&self, df: DataFrame) -> TaxiEdaResult<DataFrame> {
        self.validate(&df)?;
        let exprs: Vec<Expr> = df
            .schema()
            .fields()
            .iter()
            .map(|field| {
                let name = field.name();
                let is_string = matches!(
                    field.data_type(),
                    DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View
                );
                if is_string && self.columns.contains(name) {
                    debug!(column = %name, "Parsing timestamps");
                    try_cast(col(name), timestamp_type()).alias(name)
                } else {
                    col(name)
                }
            })
            .collect();
        df.select(exprs).map_err(TaxiEdaError::from)
    }
}

/// A calendar component of a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatetimePart {
    Year,
    Month,
    Day,
    /// Day of week, Monday = 0 through Sunday = 6.
    Weekday,
    Hour,
    Minute,
    Second,
}

impl DatetimePart {
    /// The `date_part` field name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DatetimePart::Year => "year",
            DatetimePart::Month => "month",
            DatetimePart::Day => "day",
            DatetimePart::Weekday => "isodow",
            DatetimePart::Hour => "hour",
            DatetimePart::Minute => "minute",
            DatetimePart::Second => "second",
        }
    }
}

/// Extracts calendar parts from one datetime column.
/// Each `(part, alias)` pair adds an `Int32` column named `alias`; a null timestamp gives null parts.
pub struct DatetimeFeatures {
    pub column: String,
    pub parts: Vec<(DatetimePart, String)>,
}

impl DatetimeFeatures {
    pub fn new(column: impl Into<String>, parts: Vec<(DatetimePart, String)>) -> Self {
        Self {
            column: column.into(),
            parts,
        }
    }

    /// `weekday` and `hour_of_day` from the pickup timestamp.
    pub fn pickup_calendar() -> Self {
        Self::new(
            PICKUP_DATETIME,
            vec![
                (DatetimePart::Weekday, WEEKDAY.to_string()),
                (DatetimePart::Hour, HOUR_OF_DAY.to_string()),
            ],
        )
    }

    pub async fn fit(&mut self, df: &DataFrame) -> TaxiEdaResult<()> {
        validate_datetime_column(df, &self.column)
    }

    pub fn transform(&self, df: DataFrame) -> TaxiEdaResult<DataFrame> {
        validate_datetime_column(&df, &self.column)?;
        if self.parts.is_empty() {
            return Err(TaxiEdaError::InvalidParameter(
                "DatetimeFeatures needs at least one part to extract".to_string(),
            ));
        }
        // Retain all original columns.
        let mut exprs: Vec<Expr> = df.schema().fields().iter().map(|f| col(f.name())).collect();
        let base = col(&self.column);
        for (part, alias) in &self.parts {
            let part_expr = date_part().call(vec![lit(part.as_str()), base.clone()]);
            exprs.push(cast(part_expr, DataType::Int32).alias(alias));
        }
        df.select(exprs).map_err(TaxiEdaError::from)
    }
}

impl_transformer!(TimestampParser);
impl_transformer!(DatetimeFeatures);
