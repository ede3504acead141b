//! Command-line entry point: runs the trip analysis with settings taken from the environment.
//!
//! - `NYC_TAXI_EDA_INPUT`: trip CSV path (default `data/nyc_taxi_trip_duration.csv`).
//! - `NYC_TAXI_EDA_OUTPUT_DIR`: when set, result tables are exported there.
//! - `DEBUG_NYC_TAXI_EDA`: enables debug logging.

use nyc_taxi_eda::analysis::TripAnalysis;
use nyc_taxi_eda::exceptions::TaxiEdaResult;
use nyc_taxi_eda::settings::AnalysisSettings;
use tracing::{error, info, Level};

async fn run(settings: AnalysisSettings) -> TaxiEdaResult<()> {
    let output_dir = settings.output_dir.clone();
    let analysis = TripAnalysis::new(settings).verbose(true);
    let output = analysis.run().await?;
    let report = analysis.report(&output).await?;

    for (column, nulls) in &report.null_counts {
        info!(column = %column, nulls, "Null count");
    }
    let hours = report.duration.in_hours();
    info!(
        count = report.duration.count,
        mean_hours = ?hours.mean,
        std_hours = ?hours.std,
        max_hours = ?hours.max,
        median_hours = ?hours.median,
        "Trip duration"
    );
    info!(
        zero_distance_trips = report.quality.zero_distance_trips,
        short_trips = report.quality.short_trips,
        missing_pickup_timestamps = report.quality.missing_pickup_timestamps,
        "Data quality"
    );
    for group in &output.weekday_medians {
        info!(weekday = group.key, median = group.median, trips = group.trip_count, "Median duration by weekday");
    }
    for group in &output.hour_medians {
        info!(hour = group.key, median = group.median, trips = group.trip_count, "Median duration by hour");
    }

    output.enriched.clone().describe().await?.show().await?;

    if let Some(dir) = output_dir {
        analysis.export(&output, &dir).await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    // No-op when debug logging was already installed at startup.
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .try_init();

    let settings = AnalysisSettings::from_env();
    if let Err(e) = run(settings).await {
        error!(error = %e, "Analysis failed");
        std::process::exit(1);
    }
}
