//! ## Trip Analysis Driver
//!
//! [`TripAnalysis`] runs the whole analysis for one [`AnalysisSettings`]:
//!
//! 1. load the trip CSV,
//! 2. parse timestamps and derive `distance`, `zero_distance`, `log_duration`, `weekday` and
//!    `hour_of_day` (the enriched frame is cached in memory),
//! 3. keep the trips inside the bounding box,
//! 4. compute the median trip duration per weekday and per hour of day.
//!
//! Reports and exports build on the resulting [`AnalysisOutput`].

use crate::aggregation::{collect_group_medians, group_median, GroupMedian};
use crate::exceptions::TaxiEdaResult;
use crate::export::{export_frame, ExportFormat};
use crate::loader::{
    load_trips, HOUR_OF_DAY, PASSENGER_COUNT, STORE_AND_FWD_FLAG, TRIP_DURATION, VENDOR_ID,
    WEEKDAY,
};
use crate::make_pipeline;
use crate::pipeline::Pipeline;
use crate::report::{
    correlation_matrix, grouped_duration_stats, null_counts, value_counts, CorrelationMatrix,
    DurationSummary, QualityReport, CORRELATION_COLUMNS,
};
use crate::settings::AnalysisSettings;
use crate::transformers::datetime_features::{DatetimeFeatures, TimestampParser};
use crate::transformers::feature_creation::{GreatCircleDistance, LogDuration, ZeroDistanceFlag};
use crate::transformers::outlier_handling::{BoundingBoxFilter, UpperBoundTrimmer};
use datafusion::prelude::{DataFrame, SessionContext};
use std::path::{Path, PathBuf};
use tracing::info;

/// Columns whose frequencies feed the count plots.
pub const COUNT_PLOT_COLUMNS: [&str; 5] = [
    PASSENGER_COUNT,
    VENDOR_ID,
    STORE_AND_FWD_FLAG,
    WEEKDAY,
    HOUR_OF_DAY,
];

/// Everything one run produces.
pub struct AnalysisOutput {
    /// The trips as loaded, before any derivation.
    pub trips: DataFrame,
    /// Parsed timestamps plus derived features, cached in memory.
    pub enriched: DataFrame,
    /// Enriched trips inside the bounding box.
    pub filtered: DataFrame,
    pub weekday_medians: Vec<GroupMedian>,
    pub hour_medians: Vec<GroupMedian>,
}

/// Descriptive statistics of a run.
#[derive(Debug, Clone)]
pub struct TripReport {
    pub null_counts: Vec<(String, u64)>,
    /// `trip_duration` over all enriched trips, in seconds.
    pub duration: DurationSummary,
    pub quality: QualityReport,
    pub filtered_trips: usize,
    /// Correlations over the filtered trips.
    pub correlation: CorrelationMatrix,
}

pub struct TripAnalysis {
    settings: AnalysisSettings,
    ctx: SessionContext,
    verbose: bool,
}

impl TripAnalysis {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self::with_context(settings, SessionContext::new())
    }

    pub fn with_context(settings: AnalysisSettings, ctx: SessionContext) -> Self {
        Self {
            settings,
            ctx,
            verbose: false,
        }
    }

    /// Logs pipeline step timings at info level.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// The enrichment pipeline: timestamp parsing followed by feature derivation.
    pub fn enrichment_pipeline(&self) -> Pipeline {
        make_pipeline!(self.verbose,
            ("parse_timestamps", TimestampParser::trips()),
            ("distance", GreatCircleDistance::trips()),
            ("zero_distance", ZeroDistanceFlag::trips()),
            ("log_duration", LogDuration::trips()),
            ("pickup_calendar", DatetimeFeatures::pickup_calendar()),
        )
    }

    pub async fn load(&self) -> TaxiEdaResult<DataFrame> {
        load_trips(&self.ctx, &self.settings.input_path).await
    }

    /// Runs the enrichment pipeline and caches the result in memory.
    pub async fn enrich(&self, trips: &DataFrame) -> TaxiEdaResult<DataFrame> {
        let mut pipeline = self.enrichment_pipeline();
        let enriched = pipeline.fit_transform(trips).await?;
        Ok(enriched.cache().await?)
    }

    /// Trips of `enriched` inside the configured bounding box.
    pub fn filter(&self, enriched: DataFrame) -> TaxiEdaResult<DataFrame> {
        BoundingBoxFilter::trips(self.settings.bounding_box).transform(enriched)
    }

    /// Loads the configured input and runs the analysis on it.
    pub async fn run(&self) -> TaxiEdaResult<AnalysisOutput> {
        self.settings.validate()?;
        let trips = self.load().await?;
        self.run_on(trips).await
    }

    /// Runs the analysis on an already loaded trip DataFrame.
    pub async fn run_on(&self, trips: DataFrame) -> TaxiEdaResult<AnalysisOutput> {
        let enriched = self.enrich(&trips).await?;
        let filtered = self.filter(enriched.clone())?;

        let weekday_medians =
            collect_group_medians(filtered.clone(), WEEKDAY, TRIP_DURATION).await?;
        let hour_medians =
            collect_group_medians(filtered.clone(), HOUR_OF_DAY, TRIP_DURATION).await?;
        info!(
            weekday_groups = weekday_medians.len(),
            hour_groups = hour_medians.len(),
            "Analysis finished"
        );

        Ok(AnalysisOutput {
            trips,
            enriched,
            filtered,
            weekday_medians,
            hour_medians,
        })
    }

    /// Descriptive statistics and data-quality counters of a run.
    pub async fn report(&self, output: &AnalysisOutput) -> TaxiEdaResult<TripReport> {
        let null_counts = null_counts(&output.trips).await?;
        let duration = DurationSummary::compute(&output.enriched, TRIP_DURATION).await?;
        let quality =
            QualityReport::compute(&output.enriched, self.settings.short_trip_seconds).await?;
        let filtered_trips = output.filtered.clone().count().await?;
        let correlation = correlation_matrix(&output.filtered, &CORRELATION_COLUMNS).await?;
        info!(
            total_trips = quality.total_trips,
            filtered_trips,
            zero_distance_trips = quality.zero_distance_trips,
            short_trips = quality.short_trips,
            "Report computed"
        );
        Ok(TripReport {
            null_counts,
            duration,
            quality,
            filtered_trips,
            correlation,
        })
    }

    /// Frequency tables of [`COUNT_PLOT_COLUMNS`] over the enriched trips.
    pub fn count_tables(&self, output: &AnalysisOutput) -> TaxiEdaResult<Vec<(String, DataFrame)>> {
        COUNT_PLOT_COLUMNS
            .iter()
            .map(|column| -> TaxiEdaResult<(String, DataFrame)> {
                Ok((column.to_string(), value_counts(output.enriched.clone(), column)?))
            })
            .collect()
    }

    /// Duration distribution per vendor, over filtered trips below the vendor view ceiling.
    pub fn vendor_duration_view(&self, output: &AnalysisOutput) -> TaxiEdaResult<DataFrame> {
        let trimmed = UpperBoundTrimmer::new(
            TRIP_DURATION,
            self.settings.vendor_view_max_duration as f64,
        )
        .transform(output.filtered.clone())?;
        grouped_duration_stats(trimmed, VENDOR_ID, TRIP_DURATION)
    }

    /// Duration distribution per passenger count, over filtered trips below the passenger view ceiling.
    pub fn passenger_duration_view(&self, output: &AnalysisOutput) -> TaxiEdaResult<DataFrame> {
        let trimmed = UpperBoundTrimmer::new(
            TRIP_DURATION,
            self.settings.passenger_view_max_duration as f64,
        )
        .transform(output.filtered.clone())?;
        grouped_duration_stats(trimmed, PASSENGER_COUNT, TRIP_DURATION)
    }

    /// Writes the result tables of a run to `dir` and returns the written paths.
    ///
    /// The enriched and filtered trips are written as Parquet, every other table as CSV.
    pub async fn export(&self, output: &AnalysisOutput, dir: &Path) -> TaxiEdaResult<Vec<PathBuf>> {
        let mut tables: Vec<(String, DataFrame, ExportFormat)> = vec![
            ("enriched_trips".to_string(), output.enriched.clone(), ExportFormat::Parquet),
            ("filtered_trips".to_string(), output.filtered.clone(), ExportFormat::Parquet),
            (
                "median_duration_by_weekday".to_string(),
                group_median(output.filtered.clone(), WEEKDAY, TRIP_DURATION)?,
                ExportFormat::Csv,
            ),
            (
                "median_duration_by_hour".to_string(),
                group_median(output.filtered.clone(), HOUR_OF_DAY, TRIP_DURATION)?,
                ExportFormat::Csv,
            ),
            (
                "duration_by_vendor".to_string(),
                self.vendor_duration_view(output)?,
                ExportFormat::Csv,
            ),
            (
                "duration_by_passenger_count".to_string(),
                self.passenger_duration_view(output)?,
                ExportFormat::Csv,
            ),
        ];
        for (column, table) in self.count_tables(output)? {
            tables.push((format!("{}_counts", column), table, ExportFormat::Csv));
        }

        let mut paths = Vec::with_capacity(tables.len());
        for (name, table, format) in tables {
            paths.push(export_frame(table, dir, &name, format).await?);
        }
        info!(dir = %dir.display(), files = paths.len(), "Exported analysis tables");
        Ok(paths)
    }
}
