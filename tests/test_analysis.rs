use std::path::PathBuf;

use approx::assert_abs_diff_eq;
use arrow::array::{Array, Int64Array, StringArray};
use datafusion::prelude::{SessionConfig, SessionContext};
use nyc_taxi_eda::aggregation::GroupMedian;
use nyc_taxi_eda::analysis::{AnalysisOutput, TripAnalysis};
use nyc_taxi_eda::exceptions::TaxiEdaError;
use nyc_taxi_eda::settings::AnalysisSettings;

fn sample_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/testdata/nyc_taxi_sample.csv")
}

fn sample_analysis() -> TripAnalysis {
    let ctx = SessionContext::new_with_config(SessionConfig::new().with_target_partitions(1));
    TripAnalysis::with_context(AnalysisSettings::with_input(sample_path()), ctx)
}

async fn run_sample() -> (TripAnalysis, AnalysisOutput) {
    let analysis = sample_analysis();
    let output = analysis.run().await.unwrap();
    (analysis, output)
}

fn group(key: i64, median: f64, trip_count: i64) -> GroupMedian {
    GroupMedian {
        key,
        median,
        trip_count,
    }
}

#[tokio::test]
async fn test_missing_input_file() {
    let analysis = TripAnalysis::new(AnalysisSettings::with_input("no/such/trips.csv"));
    match analysis.run().await {
        Err(TaxiEdaError::InputNotFound(path)) => {
            assert_eq!(path, PathBuf::from("no/such/trips.csv"))
        }
        other => panic!("expected InputNotFound, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn test_filtered_trips_are_inside_the_box() {
    let (_, output) = run_sample().await;
    let batches = output
        .filtered
        .clone()
        .select_columns(&["id"])
        .unwrap()
        .collect()
        .await
        .unwrap();
    let mut ids = Vec::new();
    for batch in &batches {
        let array = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("Expected StringArray");
        ids.extend((0..array.len()).map(|i| array.value(i).to_string()));
    }
    ids.sort();
    let expected: Vec<String> = [1, 2, 3, 4, 5, 6, 9, 12]
        .iter()
        .map(|i| format!("id{:07}", i))
        .collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_weekday_and_hour_medians() {
    let (_, output) = run_sample().await;
    assert_eq!(
        output.weekday_medians,
        vec![group(0, 600.0, 3), group(1, 500.0, 3), group(2, 0.0, 1)]
    );
    // The trip without a parseable pickup timestamp is in no group.
    let grouped: i64 = output.weekday_medians.iter().map(|g| g.trip_count).sum();
    assert_eq!(grouped, 7);

    assert_eq!(
        output.hour_medians,
        vec![
            group(8, 400.0, 2),
            group(9, 900.0, 1),
            group(14, 1100.0, 1),
            group(17, 527.5, 2),
            group(23, 0.0, 1),
        ]
    );
}

#[tokio::test]
async fn test_report() {
    let (analysis, output) = run_sample().await;
    let report = analysis.report(&output).await.unwrap();

    for (column, nulls) in &report.null_counts {
        let expected = if column == "pickup_longitude" { 1 } else { 0 };
        assert_eq!(*nulls, expected, "null count of {}", column);
    }
    assert_eq!(report.null_counts.len(), 11);

    assert_eq!(report.duration.count, 12);
    assert_abs_diff_eq!(report.duration.mean.unwrap(), 633.75, epsilon = 1e-9);
    assert_eq!(report.duration.min, Some(0.0));
    assert_eq!(report.duration.max, Some(1200.0));
    assert_eq!(report.duration.median, Some(625.0));
    assert_abs_diff_eq!(
        report.duration.in_hours().max.unwrap(),
        1200.0 / 3600.0,
        epsilon = 1e-12
    );

    assert_eq!(report.quality.total_trips, 12);
    assert_eq!(report.quality.zero_distance_trips, 1);
    assert_eq!(report.quality.short_trips, 1);
    assert_eq!(report.quality.missing_pickup_timestamps, 1);
    assert_eq!(report.filtered_trips, 8);

    let corr = &report.correlation;
    assert_eq!(corr.get("distance", "distance"), Some(1.0));
    let value = corr
        .get("distance", "trip_duration")
        .expect("distance and duration both vary");
    assert!((-1.0..=1.0).contains(&value));
    assert_eq!(corr.get("trip_duration", "distance"), Some(value));
}

#[tokio::test]
async fn test_count_tables_and_duration_views() {
    let (analysis, output) = run_sample().await;
    let tables = analysis.count_tables(&output).unwrap();
    let (column, vendor_counts) = tables
        .into_iter()
        .find(|(column, _)| column == "vendor_id")
        .expect("vendor_id count table");
    assert_eq!(column, "vendor_id");
    let batches = vendor_counts.collect().await.unwrap();
    let batch = &batches[0];
    let vendors = batch
        .column(0)
        .as_any()
        .downcast_ref::<Int64Array>()
        .expect("Expected Int64Array");
    let counts = batch
        .column(1)
        .as_any()
        .downcast_ref::<Int64Array>()
        .expect("Expected Int64Array");
    assert_eq!(vendors.values().to_vec(), vec![1, 2]);
    assert_eq!(counts.values().to_vec(), vec![5, 7]);

    let view = analysis.vendor_duration_view(&output).unwrap();
    let batches = view.collect().await.unwrap();
    let batch = &batches[0];
    let count_column = batch
        .column(batch.schema().index_of("count").unwrap())
        .as_any()
        .downcast_ref::<Int64Array>()
        .expect("Expected Int64Array");
    assert_eq!(count_column.values().to_vec(), vec![3, 5]);

    let view = analysis.passenger_duration_view(&output).unwrap();
    assert_eq!(view.count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_export_writes_tables() {
    let (analysis, output) = run_sample().await;
    let dir = std::env::temp_dir().join(format!("nyc_taxi_eda_export_{}", std::process::id()));
    let paths = analysis.export(&output, &dir).await.unwrap();

    assert_eq!(paths.len(), 11);
    for path in &paths {
        assert!(path.is_file(), "{} was not written", path.display());
    }
    let weekday_csv = std::fs::read_to_string(dir.join("median_duration_by_weekday.csv")).unwrap();
    let mut lines = weekday_csv.lines();
    assert_eq!(
        lines.next(),
        Some("weekday,median_trip_duration,trip_count")
    );
    assert_eq!(lines.count(), 3);
    assert!(dir.join("filtered_trips.parquet").is_file());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_run_rejects_invalid_settings() {
    let mut settings = AnalysisSettings::with_input(sample_path());
    settings.short_trip_seconds = -1;
    let result = TripAnalysis::new(settings).run().await;
    assert!(matches!(result, Err(TaxiEdaError::InvalidParameter(_))));
}
