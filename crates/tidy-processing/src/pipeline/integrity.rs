//! Observational data integrity checks.
//!
//! Checks never change the data. Violations are reported as warnings carrying
//! the offending rows.

use crate::error::Result;
use crate::pipeline::executor::StepLog;
use crate::types::Diagnostic;
use crate::utils::{
    filter_rows, has_column, is_numeric_dtype, missing_mask, numeric_values, python_str_values, require_column,
};
use polars::prelude::*;
use tracing::{debug, warn};

const START_DATE: &str = "start_date";
const END_DATE: &str = "end_date";
const QUANTITY: &str = "quantity";

/// Row-level consistency rules on well-known column names.
pub struct IntegrityChecker;

impl IntegrityChecker {
    /// Run every rule whose columns are present.
    pub fn check(df: &DataFrame, log: &mut StepLog) -> Result<()> {
        if has_column(df, START_DATE) && has_column(df, END_DATE) {
            let violations = Self::date_order_violations(
                require_column(df, START_DATE)?,
                require_column(df, END_DATE)?,
            )?;
            Self::report(
                df,
                &violations,
                "Data integrity check failed: 'start_date' should be earlier than 'end_date'",
                log,
            )?;
        }

        if has_column(df, QUANTITY) {
            let quantity = require_column(df, QUANTITY)?;
            if is_numeric_dtype(quantity.dtype()) {
                let violations: Vec<bool> = numeric_values(quantity)?
                    .into_iter()
                    .map(|v| v.is_some_and(|q| q < 0.0))
                    .collect();
                Self::report(
                    df,
                    &violations,
                    "Data integrity check failed: 'quantity' should be non-negative",
                    log,
                )?;
            } else {
                warn!("'quantity' is {}, skipping sign check", quantity.dtype());
                log.diagnostic(Diagnostic::warning(
                    "Data integrity check skipped: 'quantity' is not numeric",
                ));
            }
        }

        Ok(())
    }

    fn report(df: &DataFrame, violations: &[bool], message: &str, log: &mut StepLog) -> Result<()> {
        let count = violations.iter().filter(|v| **v).count();
        debug!("{} rows violate: {}", count, message);
        if count > 0 {
            let rows = filter_rows(df, violations)?;
            log.diagnostic(Diagnostic::warning(message).with_table(rows));
        }
        Ok(())
    }

    /// Rows where start is after end. Missing values never violate.
    fn date_order_violations(start: &Series, end: &Series) -> Result<Vec<bool>> {
        if let (Some(s), Some(e)) = (Self::orderable_numbers(start)?, Self::orderable_numbers(end)?) {
            return Ok(s
                .into_iter()
                .zip(e)
                .map(|pair| matches!(pair, (Some(a), Some(b)) if a > b))
                .collect());
        }

        let start_missing = missing_mask(start)?;
        let end_missing = missing_mask(end)?;
        let start_text = python_str_values(start)?;
        let end_text = python_str_values(end)?;

        Ok((0..start_text.len())
            .map(|i| !start_missing[i] && !end_missing[i] && start_text[i] > end_text[i])
            .collect())
    }

    /// Numeric view of a numeric or temporal column, `None` for anything else.
    fn orderable_numbers(series: &Series) -> Result<Option<Vec<Option<f64>>>> {
        let dtype = series.dtype();
        if is_numeric_dtype(dtype) {
            return Ok(Some(numeric_values(series)?));
        }
        if matches!(dtype, DataType::Date | DataType::Datetime(_, _)) {
            let millis = series
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
                .cast(&DataType::Int64)?;
            return Ok(Some(
                millis.i64()?.into_iter().map(|v| v.map(|ms| ms as f64)).collect(),
            ));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DiagnosticKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_date_order_string_comparison() {
        let df = df!(
            "start_date" => [Some("2024-01-01"), Some("2024-05-01"), None],
            "end_date" => [Some("2024-02-01"), Some("2024-04-01"), Some("2024-01-01")]
        )
        .unwrap();
        let mut log = StepLog::new();
        IntegrityChecker::check(&df, &mut log).unwrap();

        assert_eq!(log.diagnostics.len(), 1);
        let diagnostic = &log.diagnostics[0];
        assert_eq!(diagnostic.kind, DiagnosticKind::Warning);
        assert_eq!(
            diagnostic.message,
            "Data integrity check failed: 'start_date' should be earlier than 'end_date'"
        );
        assert_eq!(diagnostic.table.as_ref().unwrap().height(), 1);
    }

    #[test]
    fn test_date_order_numeric_comparison() {
        let df = df!("start_date" => [9i64, 10], "end_date" => [10i64, 9]).unwrap();
        let mut log = StepLog::new();
        IntegrityChecker::check(&df, &mut log).unwrap();
        let table = log.diagnostics[0].table.as_ref().unwrap();
        let start: Vec<Option<i64>> = table.column("start_date").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(start, vec![Some(10)]);
    }

    #[test]
    fn test_negative_quantity_checked_without_dates() {
        let df = df!("quantity" => [3i64, -1, 0, -5]).unwrap();
        let mut log = StepLog::new();
        IntegrityChecker::check(&df, &mut log).unwrap();

        assert_eq!(log.diagnostics.len(), 1);
        assert_eq!(
            log.diagnostics[0].message,
            "Data integrity check failed: 'quantity' should be non-negative"
        );
        assert_eq!(log.diagnostics[0].table.as_ref().unwrap().height(), 2);
    }

    #[test]
    fn test_clean_data_reports_nothing() {
        let df = df!(
            "start_date" => ["2024-01-01"],
            "end_date" => ["2024-01-02"],
            "quantity" => [1i64]
        )
        .unwrap();
        let mut log = StepLog::new();
        IntegrityChecker::check(&df, &mut log).unwrap();
        assert!(log.diagnostics.is_empty());
    }

    #[test]
    fn test_text_quantity_is_skipped() {
        let df = df!("quantity" => ["-1"]).unwrap();
        let mut log = StepLog::new();
        IntegrityChecker::check(&df, &mut log).unwrap();
        assert_eq!(log.diagnostics.len(), 1);
        assert!(log.diagnostics[0].table.is_none());
        assert!(log.diagnostics[0].message.contains("skipped"));
    }
}
