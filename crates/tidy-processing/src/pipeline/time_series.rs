//! Time series handling: timestamp parsing, chronological sort, lag features.

use crate::error::{CleaningError, Result};
use crate::pipeline::executor::StepLog;
use crate::types::{ActionType, Diagnostic};
use crate::utils::{has_column, is_float_dtype, is_integer_dtype, require_column};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use tracing::{debug, warn};

/// Column the lag features are taken from.
const VALUE_COLUMN: &str = "value";

/// Number of lag columns added.
const LAGS: i64 = 3;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"];

pub struct TimeSeriesHandler;

impl TimeSeriesHandler {
    pub fn apply(df: &DataFrame, timestamp_column: &str, log: &mut StepLog) -> Result<DataFrame> {
        if !has_column(df, timestamp_column) {
            warn!("Timestamp column '{}' not found", timestamp_column);
            log.diagnostic(Diagnostic::warning(format!(
                "Timestamp column '{}' not found; skipped time series handling.",
                timestamp_column
            )));
            return Ok(df.clone());
        }

        let millis = Self::timestamp_millis(require_column(df, timestamp_column)?)?;
        let timestamps = Series::new(timestamp_column.into(), millis.clone())
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;

        let mut out = df.clone();
        out.replace(timestamp_column, timestamps)?;
        out = out.take(&Self::chronological_order(&millis))?;
        log.action(
            ActionType::RowsSorted,
            timestamp_column,
            format!("Sorted {} rows by '{}'", out.height(), timestamp_column),
        );

        let value = if has_column(&out, VALUE_COLUMN) {
            Some(require_column(&out, VALUE_COLUMN)?.clone())
        } else {
            warn!("No '{}' column, lag features will be empty", VALUE_COLUMN);
            log.diagnostic(Diagnostic::warning(format!(
                "Column '{}' not found; lag features are empty.",
                VALUE_COLUMN
            )));
            None
        };

        for lag in 1..=LAGS {
            let name = format!("{}_lag_{}", VALUE_COLUMN, lag);
            let lagged = match &value {
                Some(series) => {
                    let mut shifted = series.shift(lag);
                    shifted.rename(name.as_str().into());
                    shifted
                }
                None => Series::full_null(name.as_str().into(), out.height(), &DataType::Float64),
            };
            out.with_column(lagged)?;
        }
        log.action(
            ActionType::LagFeaturesCreated,
            VALUE_COLUMN,
            format!("Added {} lag columns", LAGS),
        );

        log.diagnostic(Diagnostic::success(
            "Time series handling logic applied successfully.",
        ));
        Ok(out)
    }

    /// Stable ascending order, missing timestamps last.
    fn chronological_order(millis: &[Option<i64>]) -> IdxCa {
        let mut order: Vec<usize> = (0..millis.len()).collect();
        order.sort_by_key(|&i| (millis[i].is_none(), millis[i]));
        IdxCa::from_vec(
            "idx".into(),
            order.into_iter().map(|i| i as IdxSize).collect(),
        )
    }

    /// Epoch milliseconds for every value of the timestamp column.
    fn timestamp_millis(series: &Series) -> Result<Vec<Option<i64>>> {
        let dtype = series.dtype();
        let name = series.name().to_string();

        match dtype {
            DataType::Datetime(_, _) | DataType::Date => {
                let cast = series
                    .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
                    .cast(&DataType::Int64)?;
                Ok(cast.i64()?.into_iter().collect())
            }
            // Plain numbers are epoch nanoseconds
            dt if is_integer_dtype(dt) => {
                let cast = series.cast(&DataType::Int64)?;
                Ok(cast
                    .i64()?
                    .into_iter()
                    .map(|v| v.map(|ns| ns.div_euclid(1_000_000)))
                    .collect())
            }
            dt if is_float_dtype(dt) => {
                let cast = series.cast(&DataType::Float64)?;
                Ok(cast
                    .f64()?
                    .into_iter()
                    .map(|v| v.filter(|x| x.is_finite()).map(|ns| (ns / 1e6).floor() as i64))
                    .collect())
            }
            DataType::String => series
                .str()?
                .into_iter()
                .map(|v| match v.map(str::trim) {
                    None | Some("") => Ok(None),
                    Some(text) => parse_timestamp(text)
                        .map(Some)
                        .ok_or_else(|| CleaningError::DatetimeParse {
                            column: name.clone(),
                            value: text.to_string(),
                        }),
                })
                .collect(),
            other => Err(CleaningError::DatetimeParse {
                column: name,
                value: format!("<{}>", other),
            }),
        }
    }
}

/// Parse a timestamp string to epoch milliseconds.
///
/// Accepts RFC 3339, ISO-like date-times with optional fractional seconds, and
/// a few common date layouts.
pub fn parse_timestamp(text: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            debug!("Parsed '{}' with {}", text, format);
            return date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp_millis());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DiagnosticKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(parse_timestamp("1970-01-02"), Some(86_400_000));
        assert_eq!(parse_timestamp("1970-01-01 00:00:01"), Some(1_000));
        assert_eq!(parse_timestamp("1970-01-01T00:00:01.5"), Some(1_500));
        assert_eq!(parse_timestamp("1970-01-01T00:00:01Z"), Some(1_000));
        assert_eq!(parse_timestamp("01/02/1970"), Some(86_400_000));
        assert_eq!(parse_timestamp("02.01.1970"), Some(86_400_000));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_sorts_and_adds_lags() {
        let df = df!(
            "ts" => ["2024-01-03", "2024-01-01", "2024-01-02", "2024-01-04"],
            "value" => [30i64, 10, 20, 40]
        )
        .unwrap();
        let mut log = StepLog::new();
        let out = TimeSeriesHandler::apply(&df, "ts", &mut log).unwrap();

        assert_eq!(
            out.column("ts").unwrap().dtype(),
            &DataType::Datetime(TimeUnit::Milliseconds, None)
        );
        let values: Vec<Option<i64>> = out.column("value").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(10), Some(20), Some(30), Some(40)]);

        let lag1: Vec<Option<i64>> = out.column("value_lag_1").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(lag1, vec![None, Some(10), Some(20), Some(30)]);
        let lag3: Vec<Option<i64>> = out.column("value_lag_3").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(lag3, vec![None, None, None, Some(10)]);

        let last = log.diagnostics.last().unwrap();
        assert_eq!(last.kind, DiagnosticKind::Success);
        assert_eq!(last.message, "Time series handling logic applied successfully.");
    }

    #[test]
    fn test_missing_timestamps_sort_last() {
        let df = df!(
            "ts" => [None, Some("2024-01-02"), Some("2024-01-01")],
            "value" => [1i64, 2, 3]
        )
        .unwrap();
        let mut log = StepLog::new();
        let out = TimeSeriesHandler::apply(&df, "ts", &mut log).unwrap();
        let values: Vec<Option<i64>> = out.column("value").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(3), Some(2), Some(1)]);
    }

    #[test]
    fn test_without_value_column_lags_are_empty() {
        let df = df!("ts" => ["2024-01-01", "2024-01-02"]).unwrap();
        let mut log = StepLog::new();
        let out = TimeSeriesHandler::apply(&df, "ts", &mut log).unwrap();

        assert_eq!(out.width(), 4);
        assert_eq!(out.column("value_lag_2").unwrap().null_count(), 2);
        assert_eq!(log.diagnostics[0].kind, DiagnosticKind::Warning);
    }

    #[test]
    fn test_absent_timestamp_column_is_skipped() {
        let df = df!("value" => [1i64]).unwrap();
        let mut log = StepLog::new();
        let out = TimeSeriesHandler::apply(&df, "ts", &mut log).unwrap();
        assert!(out.equals(&df));
        assert_eq!(log.diagnostics.len(), 1);
    }

    #[test]
    fn test_unparsable_timestamp_fails() {
        let df = df!("ts" => ["2024-01-01", "not a date"]).unwrap();
        let mut log = StepLog::new();
        let err = TimeSeriesHandler::apply(&df, "ts", &mut log).unwrap_err();
        assert_eq!(err.error_code(), "DATETIME_PARSE");
    }

    #[test]
    fn test_integer_timestamps_are_nanoseconds() {
        let df = df!("ts" => [2_000_000_000i64, 1_000_000_000]).unwrap();
        let mut log = StepLog::new();
        let out = TimeSeriesHandler::apply(&df, "ts", &mut log).unwrap();
        let ms: Vec<Option<i64>> = out
            .column("ts")
            .unwrap()
            .cast(&DataType::Int64)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(ms, vec![Some(1_000), Some(2_000)]);
    }
}
