//! Outlier removal module.
//!
//! Drops rows whose value lies `threshold` standard deviations or more away
//! from the column mean.

use crate::error::Result;
use crate::pipeline::executor::StepLog;
use crate::types::ActionType;
use crate::utils::{filter_rows, mean_and_sample_std, numeric_values, require_column};
use polars::prelude::*;
use tracing::debug;

/// Z-score row filter.
pub struct OutlierFilter;

impl OutlierFilter {
    /// Filter rows column by column.
    ///
    /// Each column's mean and sample standard deviation are computed over the
    /// rows left by the previous column. A row survives when
    /// `|v - mean| < threshold * std`; missing values and an undefined
    /// deviation never satisfy the comparison.
    pub fn remove_outliers(
        df: &DataFrame,
        columns: &[String],
        threshold: f64,
        log: &mut StepLog,
    ) -> Result<DataFrame> {
        let mut out = df.clone();

        for column in columns {
            let values = numeric_values(require_column(&out, column)?)?;
            let mask = Self::within_bounds(&values, threshold);

            let before = out.height();
            out = filter_rows(&out, &mask)?;
            let removed = before - out.height();

            debug!(
                "Removed {} outliers from '{}' (threshold {})",
                removed, column, threshold
            );
            if removed > 0 {
                log.action(
                    ActionType::OutliersRemoved,
                    column,
                    format!("Removed {} rows beyond {} standard deviations", removed, threshold),
                );
            }
        }

        Ok(out)
    }

    fn within_bounds(values: &[Option<f64>], threshold: f64) -> Vec<bool> {
        let (mean, std) = mean_and_sample_std(values);
        values
            .iter()
            .map(|value| match (value, mean, std) {
                (Some(v), Some(m), Some(s)) => (v - m).abs() < threshold * s,
                _ => false,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x_values(df: &DataFrame) -> Vec<Option<f64>> {
        let cast = df.column("x").unwrap().cast(&DataType::Float64).unwrap();
        cast.f64().unwrap().into_iter().collect()
    }

    #[test]
    fn test_removes_far_value() {
        let df = df!("x" => [1i64, 2, 3, 4, 5, 6, 7, 8, 9, 100]).unwrap();
        let mut log = StepLog::new();
        let out = OutlierFilter::remove_outliers(&df, &["x".to_string()], 2.0, &mut log).unwrap();

        assert_eq!(out.height(), 9);
        assert!(!x_values(&out).contains(&Some(100.0)));
        assert_eq!(log.actions.len(), 1);
    }

    #[test]
    fn test_missing_values_are_dropped() {
        let df = df!("x" => [Some(1.0f64), None, Some(2.0), Some(3.0)]).unwrap();
        let mut log = StepLog::new();
        let out = OutlierFilter::remove_outliers(&df, &["x".to_string()], 3.0, &mut log).unwrap();
        assert_eq!(x_values(&out), vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_single_row_is_dropped() {
        let df = df!("x" => [5.0f64]).unwrap();
        let mut log = StepLog::new();
        let out = OutlierFilter::remove_outliers(&df, &["x".to_string()], 3.0, &mut log).unwrap();
        assert_eq!(out.height(), 0);
    }

    #[test]
    fn test_sequential_columns_use_remaining_rows() {
        let df = df!(
            "x" => [1.0f64, 2.0, 3.0, 4.0, 100.0],
            "y" => [10.0f64, 11.0, 12.0, 13.0, 14.0]
        )
        .unwrap();
        let columns = vec!["x".to_string(), "y".to_string()];
        let mut log = StepLog::new();
        let out = OutlierFilter::remove_outliers(&df, &columns, 1.5, &mut log).unwrap();

        // y's statistics come from the four rows left after filtering x
        assert_eq!(x_values(&out), vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_rejects_text_column() {
        let df = df!("name" => ["a", "b"]).unwrap();
        let mut log = StepLog::new();
        let err =
            OutlierFilter::remove_outliers(&df, &["name".to_string()], 3.0, &mut log).unwrap_err();
        assert_eq!(err.error_code(), "NOT_NUMERIC");
    }
}
