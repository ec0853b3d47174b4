//! Tabular Data Cleaning Library
//!
//! A configurable, ordered cleaning pipeline for tabular datasets built with
//! Rust and Polars.
//!
//! # Overview
//!
//! This library provides:
//!
//! - **Cleaning Pipeline**: twelve optional steps run in a fixed order, driven
//!   by an [`OperationSpec`]
//! - **Diagnostics**: non-fatal messages collected in emission order, some
//!   carrying the offending rows
//! - **Dataset I/O**: Latin-1 and UTF-8 CSV loading, CSV export and a
//!   download link
//! - **Dataset Overview**: dtypes, `describe`-style summaries, null counts
//! - **Chart Preparation**: chart descriptions for thirteen plot kinds
//! - **Progress Reporting**: per-step progress updates
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tidy_processing::{OperationSpec, TargetType, clean, io};
//!
//! let df = io::read_csv_latin1("data.csv")?;
//!
//! let spec = OperationSpec::builder()
//!     .drop_columns(["notes"])
//!     .cast("age", TargetType::Int)
//!     .remove_duplicates(Vec::<String>::new())
//!     .new_features(["price,tax"])
//!     .build()?;
//!
//! let outcome = clean(df, &spec)?;
//! for diagnostic in &outcome.diagnostics {
//!     println!("[{}] {}", diagnostic.kind.label(), diagnostic.message);
//! }
//! io::write_csv_file(&outcome.data, "cleaned_data.csv")?;
//! ```
//!
//! # Configuration
//!
//! An [`OperationSpec`] can also be read from JSON. Missing fields take their
//! defaults, so `{}` is the identity spec:
//!
//! ```rust,ignore
//! let spec = OperationSpec::from_json(r#"{
//!     "remove_outliers": true,
//!     "outlier_columns": ["price"],
//!     "outlier_threshold": 2.5
//! }"#)?;
//! ```
//!
//! # Progress Reporting
//!
//! ```rust,ignore
//! use tidy_processing::Pipeline;
//!
//! let outcome = Pipeline::builder()
//!     .spec(spec)
//!     .on_progress(|update| {
//!         println!("[{:?}] {}", update.step, update.message);
//!     })
//!     .build()?
//!     .run(df);
//!
//! if let Some(failure) = &outcome.failure {
//!     println!("Stopped at {}: {}", failure.step.display_name(), failure.error);
//! }
//! ```

pub mod chart;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod profiler;
pub mod reporting;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use chart::{ChartData, ChartOutcome, ChartRequest, ChartSpec, PlotKind, prepare_chart};
pub use cleaner::TypeCaster;
pub use config::{
    ConfigValidationError, DEFAULT_OUTLIER_THRESHOLD, OperationSpec, OperationSpecBuilder,
    TargetType,
};
pub use error::{CleaningError, Result as CleaningResult, ResultExt};
pub use pipeline::{
    ClosureProgressReporter, Pipeline, PipelineBuilder, PipelineStep, ProgressReporter,
    ProgressUpdate, clean,
};
pub use profiler::{ColumnDescription, ColumnNulls};
pub use reporting::{CleaningReport, ReportGenerator};
pub use types::{
    ActionType, CleaningAction, CleaningOutcome, CleaningSummary, Diagnostic, DiagnosticKind,
    StepFailure,
};
pub use utils::{is_numeric_dtype, python_str_values};
