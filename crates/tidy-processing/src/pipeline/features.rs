//! Derived columns: pairwise sum features and standardized copies.

use crate::error::{CleaningError, Result};
use crate::pipeline::executor::StepLog;
use crate::types::{ActionType, Diagnostic};
use crate::utils::{
    has_column, is_numeric_dtype, mean_and_sample_std, numeric_values, require_column,
};
use polars::prelude::*;
use tracing::{debug, warn};

/// Builds `<a>_<b>_sum` columns from `"a,b"` entries.
pub struct FeatureBuilder;

impl FeatureBuilder {
    /// Split an entry into exactly two column names. Names are not trimmed.
    pub fn parse_pair(entry: &str) -> Option<(&str, &str)> {
        let mut parts = entry.split(',');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(left), Some(right), None) => Some((left, right)),
            _ => None,
        }
    }

    /// Add one sum column per well-formed entry, in entry order.
    pub fn add_sum_features(
        df: &DataFrame,
        entries: &[String],
        log: &mut StepLog,
    ) -> Result<DataFrame> {
        let mut out = df.clone();

        for entry in entries {
            let Some((left, right)) = Self::parse_pair(entry) else {
                debug!("Skipping feature entry '{}'", entry);
                continue;
            };

            let name = format!("{}_{}_sum", left, right);
            let mut sum = Self::sum(require_column(&out, left)?, require_column(&out, right)?)?;
            sum.rename(name.as_str().into());
            out.with_column(sum)?;

            log.diagnostic(Diagnostic::success(format!(
                "New feature '{}' created successfully.",
                name
            )));
            log.action(
                ActionType::FeatureCreated,
                &name,
                format!("Sum of '{}' and '{}'", left, right),
            );
        }

        Ok(out)
    }

    fn sum(left: &Series, right: &Series) -> Result<Series> {
        let (l, r) = (left.dtype(), right.dtype());

        if matches!(l, DataType::String) && matches!(r, DataType::String) {
            return Ok((left + right)?);
        }

        if Self::is_addable(l) && Self::is_addable(r) {
            let left = Self::widen_bool(left)?;
            let right = Self::widen_bool(right)?;
            return Ok((&left + &right)?);
        }

        Err(CleaningError::IncompatibleColumns {
            left: left.name().to_string(),
            right: right.name().to_string(),
            reason: format!("cannot add {} and {}", l, r),
        })
    }

    fn is_addable(dtype: &DataType) -> bool {
        is_numeric_dtype(dtype) || matches!(dtype, DataType::Boolean)
    }

    fn widen_bool(series: &Series) -> Result<Series> {
        if matches!(series.dtype(), DataType::Boolean) {
            Ok(series.cast(&DataType::Int64)?)
        } else {
            Ok(series.clone())
        }
    }
}

/// Adds `<column>_standardized` copies with zero mean and unit variance.
pub struct Standardizer;

impl Standardizer {
    pub fn standardize(
        df: &DataFrame,
        columns: &[String],
        log: &mut StepLog,
    ) -> Result<DataFrame> {
        let mut out = df.clone();

        for column in columns {
            if !has_column(&out, column) {
                warn!("Column '{}' not found, skipping standardization", column);
                log.diagnostic(Diagnostic::warning(format!(
                    "Column '{}' not found; skipped standardization.",
                    column
                )));
                continue;
            }

            let values = numeric_values(require_column(&out, column)?)?;
            let scaled = Self::z_scores(&values);
            let name = format!("{}_standardized", column);
            out.with_column(Series::new(name.as_str().into(), scaled))?;

            log.diagnostic(Diagnostic::success(format!(
                "Column '{}' standardized successfully.",
                column
            )));
            log.action(
                ActionType::ColumnStandardized,
                column,
                format!("Added '{}'", name),
            );
        }

        Ok(out)
    }

    /// Zero or undefined deviation maps every present value to 0.0.
    fn z_scores(values: &[Option<f64>]) -> Vec<Option<f64>> {
        let (mean, std) = mean_and_sample_std(values);
        values
            .iter()
            .map(|value| {
                value.map(|v| match (mean, std) {
                    (Some(m), Some(s)) if s > 0.0 => (v - m) / s,
                    _ => 0.0,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DiagnosticKind;
    use pretty_assertions::assert_eq;

    fn features(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_parse_pair() {
        assert_eq!(FeatureBuilder::parse_pair("a,b"), Some(("a", "b")));
        assert_eq!(FeatureBuilder::parse_pair("a, b"), Some(("a", " b")));
        assert_eq!(FeatureBuilder::parse_pair("a"), None);
        assert_eq!(FeatureBuilder::parse_pair("a,b,c"), None);
    }

    #[test]
    fn test_numeric_sum_feature() {
        let df = df!("a" => [1i64, 2], "b" => [3i64, 4]).unwrap();
        let mut log = StepLog::new();
        let out = FeatureBuilder::add_sum_features(&df, &features(&["a,b"]), &mut log).unwrap();

        let sums: Vec<Option<i64>> = out.column("a_b_sum").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(sums, vec![Some(4), Some(6)]);
        assert_eq!(log.diagnostics.len(), 1);
        assert_eq!(log.diagnostics[0].kind, DiagnosticKind::Success);
        assert_eq!(log.diagnostics[0].message, "New feature 'a_b_sum' created successfully.");
    }

    #[test]
    fn test_string_concatenation_feature() {
        let df = df!("first" => ["ab", "c"], "last" => ["x", "yz"]).unwrap();
        let mut log = StepLog::new();
        let out =
            FeatureBuilder::add_sum_features(&df, &features(&["first,last"]), &mut log).unwrap();

        let joined: Vec<Option<&str>> = out
            .column("first_last_sum")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(joined, vec![Some("abx"), Some("cyz")]);
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let df = df!("a" => [1i64], "b" => [2i64]).unwrap();
        let mut log = StepLog::new();
        let out =
            FeatureBuilder::add_sum_features(&df, &features(&["a", "a,b,c"]), &mut log).unwrap();
        assert_eq!(out.width(), 2);
        assert!(log.diagnostics.is_empty());
    }

    #[test]
    fn test_incompatible_columns() {
        let df = df!("n" => [1i64], "s" => ["x"]).unwrap();
        let mut log = StepLog::new();
        let err =
            FeatureBuilder::add_sum_features(&df, &features(&["n,s"]), &mut log).unwrap_err();
        assert_eq!(err.error_code(), "INCOMPATIBLE_COLUMNS");
    }

    #[test]
    fn test_untrimmed_name_is_not_found() {
        let df = df!("a" => [1i64], "b" => [2i64]).unwrap();
        let mut log = StepLog::new();
        let err =
            FeatureBuilder::add_sum_features(&df, &features(&["a, b"]), &mut log).unwrap_err();
        assert!(err.is_column_not_found());
    }

    #[test]
    fn test_standardize_zero_mean_unit_variance() {
        let df = df!("x" => [2.0f64, 4.0, 6.0, 8.0]).unwrap();
        let mut log = StepLog::new();
        let out = Standardizer::standardize(&df, &["x".to_string()], &mut log).unwrap();

        let values: Vec<f64> = out
            .column("x_standardized")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        let (mean, std) = mean_and_sample_std(&values.iter().copied().map(Some).collect::<Vec<_>>());
        assert!(mean.unwrap().abs() < 1e-12);
        assert!((std.unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(log.diagnostics[0].message, "Column 'x' standardized successfully.");
    }

    #[test]
    fn test_standardize_constant_and_missing() {
        let df = df!("x" => [Some(3.0f64), None, Some(3.0)]).unwrap();
        let mut log = StepLog::new();
        let out = Standardizer::standardize(&df, &["x".to_string()], &mut log).unwrap();
        let values: Vec<Option<f64>> = out
            .column("x_standardized")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, vec![Some(0.0), None, Some(0.0)]);
    }

    #[test]
    fn test_standardize_skips_absent_column() {
        let df = df!("x" => [1.0f64]).unwrap();
        let mut log = StepLog::new();
        let out = Standardizer::standardize(&df, &["y".to_string()], &mut log).unwrap();
        assert_eq!(out.width(), 1);
        assert_eq!(log.diagnostics[0].kind, DiagnosticKind::Warning);
    }
}
