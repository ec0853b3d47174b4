//! Main cleaning pipeline module.
//!
//! This module provides the `Pipeline` struct and its builder, which run the
//! enabled steps of an [`OperationSpec`] in their fixed order.

use crate::config::{ConfigValidationError, OperationSpec};
use crate::pipeline::executor::{CleaningExecutor, StepLog};
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStep, ProgressReporter, ProgressUpdate,
};
use crate::types::{CleaningOutcome, CleaningSummary, Diagnostic, StepFailure};
use polars::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// The cleaning pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use tidy_processing::{OperationSpec, Pipeline};
///
/// let spec = OperationSpec::builder()
///     .remove_duplicates(Vec::<String>::new())
///     .standardize(["price"])
///     .build()?;
///
/// let outcome = Pipeline::builder()
///     .spec(spec)
///     .on_progress(|update| println!("{}", update.message))
///     .build()?
///     .run(df);
///
/// for diagnostic in &outcome.diagnostics {
///     println!("{}: {}", diagnostic.kind.label(), diagnostic.message);
/// }
/// ```
pub struct Pipeline {
    spec: OperationSpec,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

// Pipeline can be moved to another thread
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// The operation spec this pipeline runs.
    pub fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    /// Run every enabled step on `df`.
    ///
    /// Never fails: a failing step stops the run and is recorded in
    /// [`CleaningOutcome::failure`], with the data as of the last step that
    /// succeeded.
    pub fn run(&self, df: DataFrame) -> CleaningOutcome {
        let start_time = Instant::now();
        info!("Starting cleaning pipeline...");

        let mut summary = CleaningSummary::new();
        summary.rows_before = df.height();
        summary.columns_before = df.width();

        let mut data = df;
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut failure: Option<StepFailure> = None;

        for step in PipelineStep::ORDERED {
            if !step.is_enabled(&self.spec) {
                continue;
            }

            self.report_progress(ProgressUpdate::new(
                step,
                format!("{}...", step.display_name()),
            ));

            let mut log = StepLog::new();
            match CleaningExecutor::run_step(step, &data, &self.spec, &mut log) {
                Ok(next) => {
                    debug!(
                        "{} done: {} rows x {} columns",
                        step.display_name(),
                        next.height(),
                        next.width()
                    );
                    data = next;
                    diagnostics.append(&mut log.diagnostics);
                    summary.actions.append(&mut log.actions);
                    summary.steps_applied.push(step);
                }
                Err(e) => {
                    error!("Step '{}' failed: {}", step.display_name(), e);
                    diagnostics.push(
                        Diagnostic::error(format!(
                            "Step '{}' failed: {}",
                            step.display_name(),
                            e
                        ))
                        .with_code(e.error_code()),
                    );
                    self.report_progress(ProgressUpdate::failed(e.to_string()));
                    failure = Some(StepFailure { step, error: e });
                    break;
                }
            }
        }

        summary.rows_after = data.height();
        summary.columns_after = data.width();
        summary.rows_removed = summary.rows_before.saturating_sub(summary.rows_after);
        summary.duration_ms = start_time.elapsed().as_millis() as u64;

        if failure.is_none() {
            self.report_progress(ProgressUpdate::complete("Cleaning completed successfully"));
        }
        info!(
            "Cleaning finished in {}ms: {} -> {} rows, {} -> {} columns",
            summary.duration_ms,
            summary.rows_before,
            summary.rows_after,
            summary.columns_before,
            summary.columns_after
        );

        CleaningOutcome {
            data,
            diagnostics,
            summary,
            failure,
        }
    }
}

/// Builder for creating a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    spec: Option<OperationSpec>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the operation spec. Defaults to a spec with every step disabled.
    pub fn spec(mut self, spec: OperationSpec) -> Self {
        self.spec = Some(spec);
        self
    }

    /// Set a progress reporter for receiving updates during a run.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let pipeline = Pipeline::builder()
    ///     .on_progress(|update| {
    ///         println!("[{:.0}%] {:?}: {}", update.progress * 100.0, update.step, update.message);
    ///     })
    ///     .build()?;
    /// ```
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the spec is invalid.
    pub fn build(self) -> Result<Pipeline, ConfigValidationError> {
        let spec = self.spec.unwrap_or_default();
        spec.validate()?;

        Ok(Pipeline {
            spec,
            progress_reporter: self.progress_reporter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample() -> DataFrame {
        df!(
            "a" => [1i64, 2, 2],
            "b" => ["x", "y", "y"]
        )
        .unwrap()
    }

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert!(pipeline.spec().is_noop());
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let spec = OperationSpec {
            remove_outliers: true,
            outlier_threshold: -1.0,
            ..OperationSpec::default()
        };
        assert!(Pipeline::builder().spec(spec).build().is_err());
    }

    #[test]
    fn test_noop_run_is_identity() {
        let df = sample();
        let outcome = Pipeline::builder().build().unwrap().run(df.clone());
        assert!(outcome.data.equals(&df));
        assert!(outcome.diagnostics.is_empty());
        assert!(outcome.summary.steps_applied.is_empty());
        assert!(outcome.is_complete());
    }

    #[test]
    fn test_progress_reported_per_enabled_step() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let steps = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&steps);

        let spec = OperationSpec::builder()
            .remove_duplicates(Vec::<String>::new())
            .data_integrity_checks(true)
            .build()
            .unwrap();

        let outcome = Pipeline::builder()
            .spec(spec)
            .on_progress(move |update| {
                counter.fetch_add(1, Ordering::SeqCst);
                seen.lock().unwrap().push(update.step);
            })
            .build()
            .unwrap()
            .run(sample());

        assert_eq!(outcome.data.height(), 2);
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(
            *steps.lock().unwrap(),
            vec![
                PipelineStep::RemoveDuplicates,
                PipelineStep::IntegrityChecks,
                PipelineStep::Complete
            ]
        );
        assert_eq!(outcome.summary.rows_removed, 1);
    }

    #[test]
    fn test_failing_step_keeps_previous_data() {
        let spec = OperationSpec::builder()
            .remove_duplicates(Vec::<String>::new())
            .remove_outliers(["b"], 3.0)
            .standardize(["a"])
            .build()
            .unwrap();

        let outcome = Pipeline::builder().spec(spec).build().unwrap().run(sample());

        assert_eq!(outcome.data.height(), 2);
        assert_eq!(outcome.data.width(), 2);
        let failure = outcome.failure.as_ref().unwrap();
        assert_eq!(failure.step, PipelineStep::RemoveOutliers);
        assert_eq!(failure.error.error_code(), "NOT_NUMERIC");

        let last = outcome.diagnostics.last().unwrap();
        assert!(last.is_error());
        assert!(last.message.starts_with("Step 'Remove Outliers' failed:"));
        assert_eq!(last.code, Some("NOT_NUMERIC"));
        assert_eq!(outcome.summary.steps_applied, vec![PipelineStep::RemoveDuplicates]);
    }
}
