use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use approx::assert_abs_diff_eq;
use arrow::array::{ArrayRef, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::prelude::{DataFrame, SessionContext};
use nyc_taxi_eda::exceptions::{TaxiEdaError, TaxiEdaResult};
use nyc_taxi_eda::make_pipeline;
use nyc_taxi_eda::pipeline::{Pipeline, Transformer};
use nyc_taxi_eda::settings::BoundingBox;
use nyc_taxi_eda::transformers::datetime_features::{DatetimeFeatures, TimestampParser};
use nyc_taxi_eda::transformers::feature_creation::{GreatCircleDistance, LogDuration};
use nyc_taxi_eda::transformers::outlier_handling::BoundingBoxFilter;
use tracing::Level;

async fn create_trips_df() -> TaxiEdaResult<DataFrame> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("pickup_datetime", DataType::Utf8, true),
        Field::new("dropoff_datetime", DataType::Utf8, true),
        Field::new("pickup_longitude", DataType::Float64, true),
        Field::new("pickup_latitude", DataType::Float64, true),
        Field::new("dropoff_longitude", DataType::Float64, true),
        Field::new("dropoff_latitude", DataType::Float64, true),
        Field::new("trip_duration", DataType::Int64, true),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(vec![
                "2016-03-14 17:24:55",
                "2016-03-15 08:00:00",
            ])) as ArrayRef,
            Arc::new(StringArray::from(vec![
                "2016-03-14 17:32:30",
                "2016-03-15 08:05:00",
            ])) as ArrayRef,
            Arc::new(Float64Array::from(vec![-73.982155, -73.95])) as ArrayRef,
            Arc::new(Float64Array::from(vec![40.767937, 40.95])) as ArrayRef,
            Arc::new(Float64Array::from(vec![-73.964630, -73.96])) as ArrayRef,
            Arc::new(Float64Array::from(vec![40.765602, 40.75])) as ArrayRef,
            Arc::new(Int64Array::from(vec![455, 300])) as ArrayRef,
        ],
    )?;
    let mem_table = MemTable::try_new(schema, vec![vec![batch]])?;
    let ctx = SessionContext::new();
    ctx.register_table("trips", Arc::new(mem_table))?;
    Ok(ctx.table("trips").await?)
}

#[tokio::test]
async fn test_pipeline_enriches_and_filters_trips() -> TaxiEdaResult<()> {
    let df = create_trips_df().await?;

    let mut pipeline = Pipeline::new(
        vec![
            (
                "parse_timestamps".to_string(),
                Box::new(TimestampParser::trips()) as Box<dyn Transformer + Send + Sync>,
            ),
            (
                "distance".to_string(),
                Box::new(GreatCircleDistance::trips()) as Box<dyn Transformer + Send + Sync>,
            ),
            (
                "log_duration".to_string(),
                Box::new(LogDuration::trips()) as Box<dyn Transformer + Send + Sync>,
            ),
            (
                "pickup_calendar".to_string(),
                Box::new(DatetimeFeatures::pickup_calendar()) as Box<dyn Transformer + Send + Sync>,
            ),
            (
                "bounding_box".to_string(),
                Box::new(BoundingBoxFilter::trips(BoundingBox::nyc()))
                    as Box<dyn Transformer + Send + Sync>,
            ),
        ],
        false,
    );

    let transformed_df: DataFrame = pipeline.fit_transform(&df).await?;
    let results = transformed_df.collect().await?;
    let rows: usize = results.iter().map(|b| b.num_rows()).sum();
    // The second trip starts at latitude 40.95 and is dropped.
    assert_eq!(rows, 1);

    let batch = results
        .iter()
        .find(|b| b.num_rows() > 0)
        .expect("one non-empty batch");
    let distance = batch
        .column(batch.schema().index_of("distance")?)
        .as_any()
        .downcast_ref::<Float64Array>()
        .expect("Failed to downcast column 'distance'");
    let log_duration = batch
        .column(batch.schema().index_of("log_duration")?)
        .as_any()
        .downcast_ref::<Float64Array>()
        .expect("Failed to downcast column 'log_duration'");
    let weekday = batch
        .column(batch.schema().index_of("weekday")?)
        .as_any()
        .downcast_ref::<Int32Array>()
        .expect("Failed to downcast column 'weekday'");
    let hour = batch
        .column(batch.schema().index_of("hour_of_day")?)
        .as_any()
        .downcast_ref::<Int32Array>()
        .expect("Failed to downcast column 'hour_of_day'");

    assert_abs_diff_eq!(distance.value(0), 1.4986, epsilon = 1e-3);
    assert_abs_diff_eq!(log_duration.value(0), 456f64.ln(), epsilon = 1e-9);
    assert_eq!(weekday.value(0), 0);
    assert_eq!(hour.value(0), 17);
    Ok(())
}

#[tokio::test]
async fn test_make_pipeline_macro_and_transform() -> TaxiEdaResult<()> {
    let df = create_trips_df().await?;
    let pipeline = make_pipeline!(false,
        ("parse_timestamps", TimestampParser::trips()),
        ("distance", GreatCircleDistance::trips()),
    );
    assert_eq!(pipeline.step_names(), vec!["parse_timestamps", "distance"]);

    let transformed = pipeline.transform(df)?;
    assert!(transformed
        .schema()
        .field_with_name(None, "distance")
        .is_ok());
    assert_eq!(transformed.count().await?, 2);
    Ok(())
}

#[tokio::test]
async fn test_pipeline_reports_failing_step() -> TaxiEdaResult<()> {
    let df = create_trips_df().await?;
    // Calendar features need parsed timestamps; the raw column is still a string.
    let mut pipeline = make_pipeline!(false,
        ("pickup_calendar", DatetimeFeatures::pickup_calendar()),
    );
    match pipeline.fit_transform(&df).await {
        Err(TaxiEdaError::InvalidParameter(message)) => {
            assert!(message.contains("pickup_calendar"), "{}", message)
        }
        other => panic!("expected a step error, got {:?}", other.map(|_| ())),
    }
    Ok(())
}

#[tokio::test]
async fn test_empty_pipeline_is_rejected() -> TaxiEdaResult<()> {
    let df = create_trips_df().await?;
    let mut pipeline = Pipeline::new(vec![], true);
    assert!(matches!(
        pipeline.fit(&df).await,
        Err(TaxiEdaError::InvalidParameter(_))
    ));
    assert!(matches!(
        pipeline.transform(df),
        Err(TaxiEdaError::InvalidParameter(_))
    ));
    Ok(())
}

/// Collects formatted log output in memory.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

/// Runs `fit` and `transform` on a two-step pipeline and returns what was logged at INFO.
async fn info_logs_of_pipeline(verbose: bool) -> String {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    // The test runtime polls on the current thread, so a thread-local default captures everything.
    let _guard = tracing::subscriber::set_default(subscriber);

    let df = create_trips_df().await.unwrap();
    let mut pipeline = make_pipeline!(verbose,
        ("parse_timestamps", TimestampParser::trips()),
        ("distance", GreatCircleDistance::trips()),
    );
    pipeline.fit(&df).await.unwrap();
    pipeline.transform(df).unwrap();
    buffer.contents()
}

#[tokio::test]
async fn test_verbose_pipeline_logs_steps_at_info() {
    let logs = info_logs_of_pipeline(true).await;
    assert_eq!(logs.matches("Step completed").count(), 2, "{}", logs);
    assert_eq!(logs.matches("Applying step").count(), 2, "{}", logs);
    assert!(logs.contains("parse_timestamps"));
    assert!(logs.contains("distance"));
}

#[tokio::test]
async fn test_quiet_pipeline_keeps_steps_below_info() {
    let logs = info_logs_of_pipeline(false).await;
    assert!(!logs.contains("Step completed"), "{}", logs);
    assert!(!logs.contains("Applying step"), "{}", logs);
}
