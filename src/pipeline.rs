//! ## Trip Transformation Pipeline
//!
//! Core abstractions for chaining the enrichment and filtering steps of the analysis.
//!
//! ### Overview
//!
//! - The [`Transformer`] trait is the common interface of every step: `fit` validates the step
//!   against the incoming schema and `transform` extends the DataFrame's logical plan.
//! - The [`Pipeline`] struct runs a sequence of named transformers, feeding each step's output
//!   to the next one.
//! - Macros [`crate::impl_transformer`] and [`crate::make_pipeline`] remove the boilerplate of
//!   implementing the trait and of boxing the steps.
//!
//! Nothing is executed until a terminal action (such as `collect` or `cache`) is called on the
//! resulting DataFrame.

use crate::exceptions::{TaxiEdaError, TaxiEdaResult};
use async_trait::async_trait;
use datafusion::prelude::*;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Trait for the steps of the trip pipeline.
#[async_trait]
pub trait Transformer {
    /// Validate the step against the input DataFrame.
    ///
    /// # Arguments
    ///
    /// * `df` - The input DataFrame.
    async fn fit(&mut self, df: &DataFrame) -> TaxiEdaResult<()>;

    /// Return a new DataFrame with the step applied. Does not trigger execution.
    ///
    /// # Arguments
    ///
    /// * `df` - The input DataFrame.
    fn transform(&self, df: DataFrame) -> TaxiEdaResult<DataFrame>;
}

/// Macro to implement the [`Transformer`] trait for a step type.
///
/// The type must already have inherent methods:
/// - `async fn fit(&mut self, &DataFrame) -> TaxiEdaResult<()>`
/// - `fn transform(&self, DataFrame) -> TaxiEdaResult<DataFrame>`
///
/// # Example
///
/// ```rust,no_run
/// use nyc_taxi_eda::exceptions::TaxiEdaResult;
/// use datafusion::prelude::DataFrame;
/// use nyc_taxi_eda::impl_transformer;
///
/// pub struct KeepAll;
///
/// impl KeepAll {
///     pub async fn fit(&mut self, _df: &DataFrame) -> TaxiEdaResult<()> {
///         Ok(())
///     }
///
///     pub fn transform(&self, df: DataFrame) -> TaxiEdaResult<DataFrame> {
///         Ok(df)
///     }
/// }
///
/// impl_transformer!(KeepAll);
/// ```
#[macro_export]
macro_rules! impl_transformer {
    ($ty:ty) => {
        #[async_trait::async_trait]
        impl $crate::pipeline::Transformer for $ty {
            async fn fit(
                &mut self,
                df: &datafusion::prelude::DataFrame,
            ) -> $crate::exceptions::TaxiEdaResult<()> {
                <$ty>::fit(self, df).await
            }
            fn transform(
                &self,
                df: datafusion::prelude::DataFrame,
            ) -> $crate::exceptions::TaxiEdaResult<datafusion::prelude::DataFrame> {
                <$ty>::transform(self, df)
            }
        }
    };
}

/// A pipeline that chains a sequence of transformers.
pub struct Pipeline {
    steps: Vec<(String, Box<dyn Transformer + Send + Sync>)>,
    verbose: bool,
}

impl Pipeline {
    /// Creates a new pipeline.
    ///
    /// # Arguments
    ///
    /// * `steps` - A vector of (name, transformer) pairs (each transformer is already boxed).
    /// * `verbose` - If true, logs step timings at info level instead of debug.
    pub fn new(steps: Vec<(String, Box<dyn Transformer + Send + Sync>)>, verbose: bool) -> Self {
        Self { steps, verbose }
    }

    /// Step names in execution order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Info level when verbose, debug otherwise.
    fn log_step(verbose: bool, name: &str, message: &str, elapsed: Option<Duration>) {
        if verbose {
            info!(step = name, elapsed = ?elapsed, "{}", message);
        } else {
            debug!(step = name, elapsed = ?elapsed, "{}", message);
        }
    }

    /// Fits each transformer (sequentially) against the output of the previous step and
    /// returns the final DataFrame.
    pub async fn fit(&mut self, df: &DataFrame) -> TaxiEdaResult<DataFrame> {
        if self.steps.is_empty() {
            return Err(TaxiEdaError::InvalidParameter(
                "Pipeline must have at least one transformer.".to_string(),
            ));
        }
        let verbose = self.verbose;
        let mut current_df = df.clone();
        for (name, step) in self.steps.iter_mut() {
            let start = Instant::now();
            step.fit(&current_df).await.map_err(|e| {
                TaxiEdaError::InvalidParameter(format!("Error fitting step '{}': {}", name, e))
            })?;
            current_df = step.transform(current_df).map_err(|e| {
                TaxiEdaError::InvalidParameter(format!("Error transforming in '{}': {}", name, e))
            })?;
            Self::log_step(verbose, name.as_str(), "Step completed", Some(start.elapsed()));
        }
        Ok(current_df)
    }

    /// Applies the `transform` method of each transformer (without fitting).
    pub fn transform(&self, df: DataFrame) -> TaxiEdaResult<DataFrame> {
        if self.steps.is_empty() {
            return Err(TaxiEdaError::InvalidParameter(
                "Pipeline must have at least one transformer.".to_string(),
            ));
        }
        let mut current_df = df;
        for (name, step) in self.steps.iter() {
            Self::log_step(self.verbose, name, "Applying step", None);
            current_df = step.transform(current_df).map_err(|e| {
                TaxiEdaError::InvalidParameter(format!("Error in step '{}': {}", name, e))
            })?;
        }
        Ok(current_df)
    }

    /// Convenience method to call `fit` and then return the final transformed DataFrame.
    pub async fn fit_transform(&mut self, df: &DataFrame) -> TaxiEdaResult<DataFrame> {
        self.fit(df).await
    }
}

/// Macro to simplify pipeline creation by automatically boxing transformers.
///
/// # Example
///
/// ```rust,no_run
/// use nyc_taxi_eda::make_pipeline;
/// use nyc_taxi_eda::transformers::feature_creation::GreatCircleDistance;
///
/// let pipeline = make_pipeline!(false,
///     ("distance", GreatCircleDistance::trips()),
/// );
/// ```
#[macro_export]
macro_rules! make_pipeline {
    ($verbose:expr, $(($name:expr, $transformer:expr)),+ $(,)?) => {
        {
            let steps: Vec<(String, Box<dyn $crate::pipeline::Transformer + Send + Sync>)> = vec![
                $(
                    ($name.to_string(), Box::new($transformer)),
                )+
            ];
            $crate::pipeline::Pipeline::new(steps, $verbose)
        }
    };
}
