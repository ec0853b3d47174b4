//! Shared utilities for the cleaning pipeline.
//!
//! This module contains the column helpers used across the pipeline steps,
//! the profiler and the chart preparation, so every part of the crate renders,
//! compares and extracts values the same way.

use crate::error::{CleaningError, Result};
use polars::prelude::*;
use serde_json::{Map, Value};

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is an integer type.
#[inline]
pub fn is_integer_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Check if a DataType is a float type.
#[inline]
pub fn is_float_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    is_integer_dtype(dtype) || is_float_dtype(dtype)
}

// =============================================================================
// Column Access
// =============================================================================

/// Check if a DataFrame has a column.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Look up a column, mapping absence to [`CleaningError::ColumnNotFound`].
pub fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    if !has_column(df, name) {
        return Err(CleaningError::ColumnNotFound(name.to_string()));
    }
    Ok(df.column(name)?.as_materialized_series())
}

/// Keep the rows where `mask` is true.
pub fn filter_rows(df: &DataFrame, mask: &[bool]) -> Result<DataFrame> {
    let mask = BooleanChunked::from_slice("mask".into(), mask);
    Ok(df.filter(&mask)?)
}

// =============================================================================
// Value Rendering
// =============================================================================

/// Rendering used for missing values, matching pandas' `astype(str)`.
pub const MISSING_REPR: &str = "nan";

/// Render a float the way Python's `str(float)` does.
///
/// Shortest round-trip digits, positional inside `[1e-4, 1e16)` and exponent
/// notation (`1e-05`, `1.5e+16`) outside it.
///
/// ```rust,ignore
/// assert_eq!(python_float_repr(1.0), "1.0");
/// assert_eq!(python_float_repr(0.00001), "1e-05");
/// ```
pub fn python_float_repr(value: f64) -> String {
    if value.is_nan() {
        return MISSING_REPR.to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let scientific = format!("{:e}", value);
        return match scientific.split_once('e') {
            Some((mantissa, exponent)) => {
                let (sign, digits) = match exponent.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exponent),
                };
                format!("{}e{}{:0>2}", mantissa, sign, digits)
            }
            None => scientific,
        };
    }

    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Render every value of a Series as a string, Python-style.
///
/// Missing values render as `"nan"`, booleans as `True`/`False`, whole floats
/// keep their `.0`. Used wherever values are compared as strings.
pub fn python_str_values(series: &Series) -> Result<Vec<String>> {
    let dtype = series.dtype();
    let values = if matches!(dtype, DataType::String) {
        series
            .str()?
            .into_iter()
            .map(|v| v.map_or_else(|| MISSING_REPR.to_string(), str::to_string))
            .collect()
    } else if matches!(dtype, DataType::Boolean) {
        series
            .bool()?
            .into_iter()
            .map(|v| match v {
                Some(true) => "True".to_string(),
                Some(false) => "False".to_string(),
                None => MISSING_REPR.to_string(),
            })
            .collect()
    } else if is_integer_dtype(dtype) {
        let cast = series.cast(&DataType::Int64)?;
        cast.i64()?
            .into_iter()
            .map(|v| v.map_or_else(|| MISSING_REPR.to_string(), |n| n.to_string()))
            .collect()
    } else if is_float_dtype(dtype) {
        let cast = series.cast(&DataType::Float64)?;
        cast.f64()?
            .into_iter()
            .map(|v| v.map_or_else(|| MISSING_REPR.to_string(), python_float_repr))
            .collect()
    } else {
        let cast = series.cast(&DataType::String)?;
        cast.str()?
            .into_iter()
            .map(|v| v.map_or_else(|| MISSING_REPR.to_string(), str::to_string))
            .collect()
    };
    Ok(values)
}

// =============================================================================
// Numeric Utilities
// =============================================================================

/// Extract a numeric or boolean Series as `f64`; missing and NaN become `None`.
pub fn numeric_values(series: &Series) -> Result<Vec<Option<f64>>> {
    let dtype = series.dtype();
    if !is_numeric_dtype(dtype) && !matches!(dtype, DataType::Boolean) {
        return Err(CleaningError::NotNumeric(series.name().to_string()));
    }
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Per-row missing flags: null, or NaN in a float column.
pub fn missing_mask(series: &Series) -> Result<Vec<bool>> {
    if is_float_dtype(series.dtype()) {
        let cast = series.cast(&DataType::Float64)?;
        Ok(cast
            .f64()?
            .into_iter()
            .map(|v| v.is_none_or(f64::is_nan))
            .collect())
    } else {
        Ok(series.is_null().into_iter().map(|v| v.unwrap_or(true)).collect())
    }
}

/// Mean and sample standard deviation (n - 1) of the present values.
///
/// The mean is `None` for no values, the deviation `None` for fewer than two.
pub fn mean_and_sample_std(values: &[Option<f64>]) -> (Option<f64>, Option<f64>) {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let n = present.len();
    if n == 0 {
        return (None, None);
    }

    let mean = present.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (Some(mean), None);
    }

    let variance = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    (Some(mean), Some(variance.sqrt()))
}

/// Linear-interpolated quantile of sorted values (pandas' default method).
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let lo = *sorted.get(lower)?;
    let hi = *sorted.get(upper)?;
    Some(lo + (hi - lo) * (pos - lower as f64))
}

// =============================================================================
// JSON Conversion
// =============================================================================

fn float_json(value: Option<f64>) -> Value {
    value
        .and_then(serde_json::Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

/// Convert every value of a Series to JSON, missing as `null`.
pub fn json_values(series: &Series) -> Result<Vec<Value>> {
    let dtype = series.dtype();
    let values = if matches!(dtype, DataType::String) {
        series
            .str()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, |s| Value::String(s.to_string())))
            .collect()
    } else if matches!(dtype, DataType::Boolean) {
        series
            .bool()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, Value::Bool))
            .collect()
    } else if is_integer_dtype(dtype) {
        let cast = series.cast(&DataType::Int64)?;
        cast.i64()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, Value::from))
            .collect()
    } else if is_float_dtype(dtype) {
        let cast = series.cast(&DataType::Float64)?;
        cast.f64()?.into_iter().map(float_json).collect()
    } else {
        let cast = series.cast(&DataType::String)?;
        cast.str()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, |s| Value::String(s.to_string())))
            .collect()
    };
    Ok(values)
}

/// Convert a DataFrame to a list of `{column: value}` records.
pub fn frame_to_records(df: &DataFrame) -> Result<Vec<Map<String, Value>>> {
    let mut records: Vec<Map<String, Value>> = (0..df.height()).map(|_| Map::new()).collect();

    for column in df.get_columns() {
        let series = column.as_materialized_series();
        let name = series.name().to_string();
        for (record, value) in records.iter_mut().zip(json_values(series)?) {
            record.insert(name.clone(), value);
        }
    }

    Ok(records)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_python_float_repr() {
        assert_eq!(python_float_repr(1.0), "1.0");
        assert_eq!(python_float_repr(-3.0), "-3.0");
        assert_eq!(python_float_repr(2.5), "2.5");
        assert_eq!(python_float_repr(f64::NAN), "nan");
        assert_eq!(python_float_repr(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn test_python_float_repr_exponent_ranges() {
        assert_eq!(python_float_repr(0.00001), "1e-05");
        assert_eq!(python_float_repr(-0.000015), "-1.5e-05");
        assert_eq!(python_float_repr(1.5e-10), "1.5e-10");
        assert_eq!(python_float_repr(1e-120), "1e-120");
        assert_eq!(python_float_repr(0.0001), "0.0001");
        assert_eq!(python_float_repr(1e16), "1e+16");
        assert_eq!(python_float_repr(2.5e20), "2.5e+20");
        assert_eq!(python_float_repr(9999999999999998.0), "9999999999999998.0");
        assert_eq!(python_float_repr(1e15), "1000000000000000.0");
        assert_eq!(python_float_repr(0.0), "0.0");
    }

    #[test]
    fn test_python_str_values() {
        let ints = Series::new("a".into(), &[Some(1i64), None, Some(3)]);
        assert_eq!(python_str_values(&ints).unwrap(), vec!["1", "nan", "3"]);

        let floats = Series::new("b".into(), &[1.0f64, 2.5]);
        assert_eq!(python_str_values(&floats).unwrap(), vec!["1.0", "2.5"]);

        let bools = Series::new("c".into(), &[true, false]);
        assert_eq!(python_str_values(&bools).unwrap(), vec!["True", "False"]);

        let strings = Series::new("d".into(), &[Some("x"), None]);
        assert_eq!(python_str_values(&strings).unwrap(), vec!["x", "nan"]);
    }

    #[test]
    fn test_numeric_values_rejects_strings() {
        let strings = Series::new("name".into(), &["a", "b"]);
        let err = numeric_values(&strings).unwrap_err();
        assert!(matches!(err, CleaningError::NotNumeric(ref c) if c == "name"));
    }

    #[test]
    fn test_missing_mask_counts_nan() {
        let floats = Series::new("x".into(), &[Some(1.0f64), None, Some(f64::NAN)]);
        assert_eq!(missing_mask(&floats).unwrap(), vec![false, true, true]);

        let strings = Series::new("s".into(), &[Some("a"), None]);
        assert_eq!(missing_mask(&strings).unwrap(), vec![false, true]);
    }

    #[test]
    fn test_mean_and_sample_std() {
        let values = [Some(2.0), Some(4.0), Some(4.0), Some(4.0), Some(5.0), Some(5.0), Some(7.0), Some(9.0)];
        let (mean, std) = mean_and_sample_std(&values);
        assert_eq!(mean, Some(5.0));
        assert!((std.unwrap() - 2.138_089_935).abs() < 1e-6);

        assert_eq!(mean_and_sample_std(&[Some(1.0), None]), (Some(1.0), None));
        assert_eq!(mean_and_sample_std(&[None]), (None, None));
    }

    #[test]
    fn test_quantile_sorted() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&sorted, 0.5), Some(2.5));
        assert_eq!(quantile_sorted(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile_sorted(&sorted, 1.0), Some(4.0));
        assert_eq!(quantile_sorted(&[], 0.5), None);
    }

    #[test]
    fn test_require_column() {
        let df = df!("a" => [1i64]).unwrap();
        assert!(require_column(&df, "a").is_ok());
        assert!(require_column(&df, "b").unwrap_err().is_column_not_found());
    }

    #[test]
    fn test_frame_to_records() {
        let df = df!("a" => [1i64, 2], "b" => [Some("x"), None]).unwrap();
        let records = frame_to_records(&df).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["a"], 1);
        assert_eq!(records[0]["b"], "x");
        assert!(records[1]["b"].is_null());
    }
}
