//! Pipeline module.
//!
//! This module provides the cleaning pipeline and its steps.

mod builder;
mod executor;
pub mod features;
pub mod integrity;
pub mod outliers;
pub mod progress;
pub mod time_series;

pub use builder::{Pipeline, PipelineBuilder};
pub use executor::{CleaningExecutor, StepLog};
pub use features::{FeatureBuilder, Standardizer};
pub use integrity::IntegrityChecker;
pub use outliers::OutlierFilter;
pub use progress::{ClosureProgressReporter, PipelineStep, ProgressReporter, ProgressUpdate};
pub use time_series::{TimeSeriesHandler, parse_timestamp};

use crate::config::OperationSpec;
use crate::error::Result;
use crate::types::CleaningOutcome;
use polars::prelude::DataFrame;

/// Clean `df` according to `spec`.
///
/// Fails only when `spec` is invalid. Step failures are reported in the
/// returned outcome.
pub fn clean(df: DataFrame, spec: &OperationSpec) -> Result<CleaningOutcome> {
    let pipeline = Pipeline::builder().spec(spec.clone()).build()?;
    Ok(pipeline.run(df))
}
