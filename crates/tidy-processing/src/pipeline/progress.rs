//! Progress reporting for the cleaning pipeline.
//!
//! The pipeline reports each step it starts to an optional
//! [`ProgressReporter`], so a frontend can show where a run is.
//!
//! # Example
//!
//! ```rust,ignore
//! use tidy_processing::Pipeline;
//!
//! let outcome = Pipeline::builder()
//!     .spec(spec)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run(df);
//! ```

use crate::config::OperationSpec;
use serde::{Deserialize, Serialize};

/// Steps of the cleaning pipeline, in execution order, plus the two terminal
/// states used in progress updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    DropColumns,
    RemoveNullRows,
    FillNulls,
    RetypeColumns,
    ColumnFilters,
    RemoveDuplicates,
    RemoveOutliers,
    CleanText,
    FeatureEngineering,
    IntegrityChecks,
    Scaling,
    TimeSeries,
    /// Pipeline completed
    Complete,
    /// Pipeline aborted by a failing step
    Failed,
}

impl PipelineStep {
    /// The twelve cleaning steps in the order they run. Reordering changes results.
    pub const ORDERED: [PipelineStep; 12] = [
        Self::DropColumns,
        Self::RemoveNullRows,
        Self::FillNulls,
        Self::RetypeColumns,
        Self::ColumnFilters,
        Self::RemoveDuplicates,
        Self::RemoveOutliers,
        Self::CleanText,
        Self::FeatureEngineering,
        Self::IntegrityChecks,
        Self::Scaling,
        Self::TimeSeries,
    ];

    /// Returns a human-readable name for the step.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::DropColumns => "Drop Columns",
            Self::RemoveNullRows => "Remove Null Rows",
            Self::FillNulls => "Fill Null Values",
            Self::RetypeColumns => "Change Column Types",
            Self::ColumnFilters => "Column Filters",
            Self::RemoveDuplicates => "Remove Duplicates",
            Self::RemoveOutliers => "Remove Outliers",
            Self::CleanText => "Clean Text",
            Self::FeatureEngineering => "Feature Engineering",
            Self::IntegrityChecks => "Data Integrity Checks",
            Self::Scaling => "Scaling",
            Self::TimeSeries => "Time Series Handling",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Position of the step in [`PipelineStep::ORDERED`].
    pub fn index(&self) -> Option<usize> {
        Self::ORDERED.iter().position(|step| step == self)
    }

    /// Whether `spec` asks for this step to run.
    pub fn is_enabled(&self, spec: &OperationSpec) -> bool {
        match self {
            Self::DropColumns => !spec.drop_columns.is_empty(),
            Self::RemoveNullRows => spec.remove_null,
            Self::FillNulls => spec.fill_null && spec.fill_value.is_some(),
            Self::RetypeColumns => !spec.data_types.is_empty(),
            Self::ColumnFilters => spec.column_filters.values().any(|values| !values.is_empty()),
            Self::RemoveDuplicates => spec.remove_duplicates,
            Self::RemoveOutliers => spec.remove_outliers,
            Self::CleanText => spec.clean_text,
            Self::FeatureEngineering => spec.feature_engineering,
            Self::IntegrityChecks => spec.data_integrity_checks,
            Self::Scaling => spec.scaling,
            Self::TimeSeries => spec.time_series,
            Self::Complete | Self::Failed => false,
        }
    }

    /// Overall progress (0.0 - 1.0) at the start of this step.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Complete => 1.0,
            Self::Failed => 0.0,
            step => step.index().unwrap_or(0) as f32 / Self::ORDERED.len() as f32,
        }
    }
}

/// Progress update emitted when a step starts or the run ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub step: PipelineStep,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Human-readable message describing current activity
    pub message: String,
}

impl ProgressUpdate {
    /// Creates a progress update for a step.
    pub fn new(step: PipelineStep, message: impl Into<String>) -> Self {
        Self {
            step,
            progress: step.base_progress().clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    /// Creates a completion progress update.
    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(PipelineStep::Complete, message)
    }

    /// Creates a failed progress update.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(PipelineStep::Failed, message)
    }
}

/// Trait for receiving progress updates during cleaning.
///
/// Implementations must be `Send + Sync` so a pipeline can be moved to a
/// worker thread by the caller.
pub trait ProgressReporter: Send + Sync {
    /// Called when a step starts and when the run ends.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    /// Creates a new closure-based progress reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}
