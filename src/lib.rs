//! # NYC Taxi Trip Analysis
//!
//! Exploratory analysis of New York City taxi trip durations on top of Apache DataFusion.
//!
//! A run loads the trip CSV ([`loader`]), parses its timestamps and derives per-trip features
//! such as the great-circle distance ([`geo`], [`transformers`]), keeps the trips inside a fixed
//! bounding box, and reduces trip duration to its median per weekday and per hour of day
//! ([`aggregation`]). [`report`] and [`export`] produce the tables the charts are drawn from.
//! [`analysis::TripAnalysis`] ties the steps together.
//!
//! ```rust,no_run
//! use nyc_taxi_eda::analysis::TripAnalysis;
//! use nyc_taxi_eda::settings::AnalysisSettings;
//!
//! # async fn demo() -> nyc_taxi_eda::exceptions::TaxiEdaResult<()> {
//! let analysis = TripAnalysis::new(AnalysisSettings::with_input("nyc_taxi_trip_duration.csv"));
//! let output = analysis.run().await?;
//! for group in &output.weekday_medians {
//!     println!("weekday {}: {} s", group.key, group.median);
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregation;
pub mod analysis;
pub mod exceptions;
pub mod export;
pub mod geo;
pub mod loader;
mod logging;
pub mod pipeline;
pub mod report;
pub mod settings;
pub mod transformers;
