//! ## Analysis Settings
//!
//! Named configuration values for a run: where the trip CSV lives, where exported tables go,
//! the geographic bounding box used to drop implausible coordinates, and the thresholds used
//! by the data-quality and box-plot views.
//!
//! Defaults reproduce the New York City analysis. [`AnalysisSettings::from_env`] overrides the
//! input path and the output directory from `NYC_TAXI_EDA_INPUT` and `NYC_TAXI_EDA_OUTPUT_DIR`.

use crate::exceptions::{TaxiEdaError, TaxiEdaResult};
use std::path::PathBuf;

/// Environment variable overriding the input CSV path.
pub const INPUT_ENV_VAR: &str = "NYC_TAXI_EDA_INPUT";
/// Environment variable enabling table exports to the given directory.
pub const OUTPUT_DIR_ENV_VAR: &str = "NYC_TAXI_EDA_OUTPUT_DIR";

/// Default location of the trip dataset.
pub const DEFAULT_INPUT_PATH: &str = "data/nyc_taxi_trip_duration.csv";

/// Latitude bounds of the New York City box (exclusive).
pub const NYC_MIN_LATITUDE: f64 = 40.6;
pub const NYC_MAX_LATITUDE: f64 = 40.9;
/// Longitude bounds of the New York City box (exclusive).
pub const NYC_MIN_LONGITUDE: f64 = -74.05;
pub const NYC_MAX_LONGITUDE: f64 = -73.7;

/// Trips shorter than this many seconds are counted as suspicious.
pub const DEFAULT_SHORT_TRIP_SECONDS: i64 = 10;
/// Duration ceiling of the per-vendor view.
pub const DEFAULT_VENDOR_VIEW_MAX_DURATION: i64 = 50_000;
/// Duration ceiling of the per-passenger-count view.
pub const DEFAULT_PASSENGER_VIEW_MAX_DURATION: i64 = 10_000;

/// A latitude/longitude rectangle with open (exclusive) bounds on both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    /// Creates a bounding box, checking that each axis is a non-empty finite interval.
    pub fn new(
        min_latitude: f64,
        max_latitude: f64,
        min_longitude: f64,
        max_longitude: f64,
    ) -> TaxiEdaResult<Self> {
        let bbox = Self {
            min_latitude,
            max_latitude,
            min_longitude,
            max_longitude,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    /// The fixed New York City box.
    pub const fn nyc() -> Self {
        Self {
            min_latitude: NYC_MIN_LATITUDE,
            max_latitude: NYC_MAX_LATITUDE,
            min_longitude: NYC_MIN_LONGITUDE,
            max_longitude: NYC_MAX_LONGITUDE,
        }
    }

    pub fn validate(&self) -> TaxiEdaResult<()> {
        let bounds = [
            self.min_latitude,
            self.max_latitude,
            self.min_longitude,
            self.max_longitude,
        ];
        if bounds.iter().any(|b| !b.is_finite()) {
            return Err(TaxiEdaError::InvalidParameter(format!(
                "bounding box bounds must be finite, got {:?}",
                self
            )));
        }
        if self.min_latitude >= self.max_latitude {
            return Err(TaxiEdaError::InvalidParameter(format!(
                "min_latitude {} must be less than max_latitude {}",
                self.min_latitude, self.max_latitude
            )));
        }
        if self.min_longitude >= self.max_longitude {
            return Err(TaxiEdaError::InvalidParameter(format!(
                "min_longitude {} must be less than max_longitude {}",
                self.min_longitude, self.max_longitude
            )));
        }
        Ok(())
    }

    pub fn contains_latitude(&self, latitude: f64) -> bool {
        latitude > self.min_latitude && latitude < self.max_latitude
    }

    pub fn contains_longitude(&self, longitude: f64) -> bool {
        longitude > self.min_longitude && longitude < self.max_longitude
    }

    /// True if the point lies strictly inside the box. Boundary values are outside.
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        self.contains_latitude(latitude) && self.contains_longitude(longitude)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::nyc()
    }
}

/// Settings for one run of the analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    pub input_path: PathBuf,
    /// Exports are written here when set.
    pub output_dir: Option<PathBuf>,
    pub bounding_box: BoundingBox,
    pub short_trip_seconds: i64,
    pub vendor_view_max_duration: i64,
    pub passenger_view_max_duration: i64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            output_dir: None,
            bounding_box: BoundingBox::nyc(),
            short_trip_seconds: DEFAULT_SHORT_TRIP_SECONDS,
            vendor_view_max_duration: DEFAULT_VENDOR_VIEW_MAX_DURATION,
            passenger_view_max_duration: DEFAULT_PASSENGER_VIEW_MAX_DURATION,
        }
    }
}

impl AnalysisSettings {
    /// Default settings reading the given input file.
    pub fn with_input(path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: path.into(),
            ..Self::default()
        }
    }

    /// Default settings with the input path and output directory taken from the environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        if let Some(input) = lookup(INPUT_ENV_VAR).filter(|v| !v.trim().is_empty()) {
            settings.input_path = PathBuf::from(input);
        }
        settings.output_dir = lookup(OUTPUT_DIR_ENV_VAR)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        settings
    }

    pub fn validate(&self) -> TaxiEdaResult<()> {
        self.bounding_box.validate()?;
        if self.short_trip_seconds < 0 {
            return Err(TaxiEdaError::InvalidParameter(format!(
                "short_trip_seconds must be non-negative, got {}",
                self.short_trip_seconds
            )));
        }
        if self.vendor_view_max_duration <= 0 || self.passenger_view_max_duration <= 0 {
            return Err(TaxiEdaError::InvalidParameter(
                "duration view ceilings must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
