//! Step executor.
//!
//! Runs one cleaning step against the current frame and returns the new frame.
//! Steps never mutate the caller's frame, so a failing step leaves the previous
//! result intact.

use crate::cleaner::{TypeCaster, clean_text_columns, fill_missing};
use crate::config::OperationSpec;
use crate::error::Result;
use crate::pipeline::features::{FeatureBuilder, Standardizer};
use crate::pipeline::integrity::IntegrityChecker;
use crate::pipeline::outliers::OutlierFilter;
use crate::pipeline::progress::PipelineStep;
use crate::pipeline::time_series::TimeSeriesHandler;
use crate::types::{ActionType, CleaningAction, Diagnostic};
use crate::utils::{filter_rows, missing_mask, python_str_values, require_column};
use polars::prelude::*;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// Diagnostics and actions produced by a single step.
///
/// Kept apart from the outcome until the step succeeds.
#[derive(Debug, Default)]
pub struct StepLog {
    pub diagnostics: Vec<Diagnostic>,
    pub actions: Vec<CleaningAction>,
}

impl StepLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn action(
        &mut self,
        action_type: ActionType,
        target: impl Into<String>,
        description: impl Into<String>,
    ) {
        self.actions
            .push(CleaningAction::new(action_type, target, description));
    }
}

/// Executes cleaning steps on a DataFrame.
pub struct CleaningExecutor;

impl CleaningExecutor {
    /// Run one step of `spec` on `df`.
    pub fn run_step(
        step: PipelineStep,
        df: &DataFrame,
        spec: &OperationSpec,
        log: &mut StepLog,
    ) -> Result<DataFrame> {
        info!("Running step: {}", step.display_name());

        match step {
            PipelineStep::DropColumns => Self::drop_columns(df, &spec.drop_columns, log),
            PipelineStep::RemoveNullRows => Self::remove_null_rows(df, log),
            PipelineStep::FillNulls => match &spec.fill_value {
                Some(literal) => Self::fill_nulls(df, literal, log),
                None => Ok(df.clone()),
            },
            PipelineStep::RetypeColumns => Ok(Self::retype_columns(df, spec, log)),
            PipelineStep::ColumnFilters => Self::apply_filters(df, &spec.column_filters, log),
            PipelineStep::RemoveDuplicates => {
                Self::remove_duplicates(df, &spec.dedup_columns, log)
            }
            PipelineStep::RemoveOutliers => OutlierFilter::remove_outliers(
                df,
                &spec.outlier_columns,
                spec.outlier_threshold,
                log,
            ),
            PipelineStep::CleanText => {
                let mut out = df.clone();
                clean_text_columns(&mut out, &spec.text_columns);
                Ok(out)
            }
            PipelineStep::FeatureEngineering => {
                FeatureBuilder::add_sum_features(df, &spec.new_features, log)
            }
            PipelineStep::IntegrityChecks => {
                IntegrityChecker::check(df, log)?;
                Ok(df.clone())
            }
            PipelineStep::Scaling => Standardizer::standardize(df, &spec.numeric_columns, log),
            PipelineStep::TimeSeries => {
                TimeSeriesHandler::apply(df, &spec.timestamp_column, log)
            }
            PipelineStep::Complete | PipelineStep::Failed => Ok(df.clone()),
        }
    }

    /// Step 1: drop the named columns. Every name must exist.
    fn drop_columns(df: &DataFrame, columns: &[String], log: &mut StepLog) -> Result<DataFrame> {
        for column in columns {
            require_column(df, column)?;
        }

        let out = df.drop_many(columns.iter().map(String::as_str));
        for column in columns {
            log.action(ActionType::ColumnRemoved, column, "Dropped on request");
        }
        debug!("Dropped {} columns", columns.len());
        Ok(out)
    }

    /// Step 2: drop rows holding a missing value in any column.
    fn remove_null_rows(df: &DataFrame, log: &mut StepLog) -> Result<DataFrame> {
        let mut keep = vec![true; df.height()];
        for column in df.get_columns() {
            let missing = missing_mask(column.as_materialized_series())?;
            for (flag, is_missing) in keep.iter_mut().zip(missing) {
                *flag &= !is_missing;
            }
        }

        let out = filter_rows(df, &keep)?;
        let removed = df.height() - out.height();
        if removed > 0 {
            log.action(
                ActionType::RowsRemoved,
                "dataset",
                format!("Removed {} rows with missing values", removed),
            );
        }
        debug!("Removed {} rows with missing values", removed);
        Ok(out)
    }

    /// Step 3: fill every missing value with the literal.
    fn fill_nulls(df: &DataFrame, literal: &str, log: &mut StepLog) -> Result<DataFrame> {
        let mut out = df.clone();
        for column in df.get_columns() {
            let series = column.as_materialized_series();
            let Some(filled) = fill_missing(series, literal)? else {
                continue;
            };
            let filled_count = missing_mask(series)?.into_iter().filter(|m| *m).count();
            out.replace(series.name().as_str(), filled)?;
            log.action(
                ActionType::ValuesFilled,
                series.name().as_str(),
                format!("Filled missing values with '{}' ({} nulls)", literal, filled_count),
            );
        }
        Ok(out)
    }

    /// Step 4: apply requested casts. Failures become error diagnostics.
    fn retype_columns(df: &DataFrame, spec: &OperationSpec, log: &mut StepLog) -> DataFrame {
        let mut out = df.clone();
        let converted = TypeCaster::cast_columns(&mut out, &spec.data_types, &mut log.diagnostics);
        for column in converted {
            if let Some(target) = spec.data_types.get(&column) {
                log.action(
                    ActionType::TypeCast,
                    &column,
                    format!("Converted to {}", target),
                );
            }
        }
        out
    }

    /// Step 5: keep rows whose rendered value is among the allowed values.
    fn apply_filters(
        df: &DataFrame,
        filters: &BTreeMap<String, Vec<String>>,
        log: &mut StepLog,
    ) -> Result<DataFrame> {
        let mut out = df.clone();
        for (column, values) in filters {
            if values.is_empty() {
                continue;
            }

            let rendered = python_str_values(require_column(&out, column)?)?;
            let allowed: HashSet<&str> = values.iter().map(String::as_str).collect();
            let mask: Vec<bool> = rendered
                .iter()
                .map(|value| allowed.contains(value.as_str()))
                .collect();

            let before = out.height();
            out = filter_rows(&out, &mask)?;
            debug!("Filter on '{}' kept {} of {} rows", column, out.height(), before);
            log.action(
                ActionType::RowsFiltered,
                column,
                format!("Kept {} of {} rows matching {:?}", out.height(), before, values),
            );
        }
        Ok(out)
    }

    /// Step 6: drop repeated rows, keeping the first occurrence in order.
    /// Missing values compare equal.
    fn remove_duplicates(
        df: &DataFrame,
        subset: &[String],
        log: &mut StepLog,
    ) -> Result<DataFrame> {
        for column in subset {
            require_column(df, column)?;
        }
        let subset = (!subset.is_empty()).then_some(subset);

        let out = df.unique_stable(subset, UniqueKeepStrategy::First, None)?;
        let removed = df.height() - out.height();
        if removed > 0 {
            log.action(
                ActionType::DuplicatesRemoved,
                "dataset",
                format!("Removed {} duplicate rows", removed),
            );
        }
        debug!("Removed {} duplicate rows", removed);
        Ok(out)
    }
}
