//! Type conversion functions for data cleaning.

use crate::config::TargetType;
use crate::error::{CleaningError, Result};
use crate::utils::{is_float_dtype, is_integer_dtype, is_numeric_dtype, missing_mask, python_str_values};
use polars::prelude::*;

fn cast_failure(series: &Series, target: TargetType, reason: impl Into<String>) -> CleaningError {
    CleaningError::TypeCastFailure {
        column: series.name().to_string(),
        target_type: target.to_string(),
        reason: reason.into(),
    }
}

const NON_FINITE_TO_INT: &str = "cannot convert non-finite values (NA or inf) to integer";

/// Cast a Series to the requested target type.
///
/// Fails with [`CleaningError::TypeCastFailure`] naming the column when a value
/// cannot be represented in the target type.
pub(crate) fn cast_series(series: &Series, target: TargetType) -> Result<Series> {
    match target {
        TargetType::Int => to_int(series),
        TargetType::Float => to_float(series),
        TargetType::Str => Ok(Series::new(
            series.name().clone(),
            python_str_values(series)?,
        )),
    }
}

/// Convert to Int64. Floats truncate toward zero, booleans become 0/1,
/// strings must be base-10 integer literals. Missing values fail the cast.
fn to_int(series: &Series) -> Result<Series> {
    let dtype = series.dtype();
    let mut result_vec: Vec<i64> = Vec::with_capacity(series.len());

    if is_integer_dtype(dtype) {
        let cast = series.cast(&DataType::Int64)?;
        for opt_val in cast.i64()?.into_iter() {
            match opt_val {
                Some(val) => result_vec.push(val),
                None => return Err(cast_failure(series, TargetType::Int, NON_FINITE_TO_INT)),
            }
        }
    } else if is_float_dtype(dtype) {
        let cast = series.cast(&DataType::Float64)?;
        for opt_val in cast.f64()?.into_iter() {
            match opt_val {
                Some(val) if val.is_finite() => result_vec.push(val.trunc() as i64),
                _ => return Err(cast_failure(series, TargetType::Int, NON_FINITE_TO_INT)),
            }
        }
    } else if matches!(dtype, DataType::Boolean) {
        for opt_val in series.bool()?.into_iter() {
            match opt_val {
                Some(val) => result_vec.push(i64::from(val)),
                None => return Err(cast_failure(series, TargetType::Int, NON_FINITE_TO_INT)),
            }
        }
    } else if matches!(dtype, DataType::String) {
        for opt_val in series.str()?.into_iter() {
            let Some(val) = opt_val else {
                return Err(cast_failure(series, TargetType::Int, NON_FINITE_TO_INT));
            };
            match val.trim().parse::<i64>() {
                Ok(parsed) => result_vec.push(parsed),
                Err(_) => {
                    return Err(cast_failure(
                        series,
                        TargetType::Int,
                        format!("invalid literal for int() with base 10: '{}'", val),
                    ));
                }
            }
        }
    } else {
        return Err(cast_failure(
            series,
            TargetType::Int,
            format!("unsupported source type {}", dtype),
        ));
    }

    Ok(Series::new(series.name().clone(), result_vec))
}

/// Convert to Float64. Missing values stay missing.
fn to_float(series: &Series) -> Result<Series> {
    let dtype = series.dtype();

    if is_numeric_dtype(dtype) || matches!(dtype, DataType::Boolean) {
        return Ok(series.cast(&DataType::Float64)?);
    }

    if !matches!(dtype, DataType::String) {
        return Err(cast_failure(
            series,
            TargetType::Float,
            format!("unsupported source type {}", dtype),
        ));
    }

    let mut result_vec: Vec<Option<f64>> = Vec::with_capacity(series.len());
    for opt_val in series.str()?.into_iter() {
        match opt_val {
            Some(val) => match val.trim().parse::<f64>() {
                Ok(parsed) => result_vec.push(Some(parsed)),
                Err(_) => {
                    return Err(cast_failure(
                        series,
                        TargetType::Float,
                        format!("could not convert string to float: '{}'", val),
                    ));
                }
            },
            None => result_vec.push(None),
        }
    }

    Ok(Series::new(series.name().clone(), result_vec))
}

/// Replace missing values with a literal.
///
/// The literal is used as-is in every column, so a column with holes becomes
/// a string column: present values rendered Python-style, the literal in the
/// holes. Integer columns with holes render as floats, the way they load in
/// pandas. Returns `None` when the column has nothing to fill.
pub(crate) fn fill_missing(series: &Series, literal: &str) -> Result<Option<Series>> {
    let mask = missing_mask(series)?;
    if !mask.iter().any(|missing| *missing) {
        return Ok(None);
    }

    let rendered = if is_integer_dtype(series.dtype()) {
        python_str_values(&series.cast(&DataType::Float64)?)?
    } else {
        python_str_values(series)?
    };

    let values: Vec<String> = rendered
        .into_iter()
        .zip(mask)
        .map(|(value, missing)| if missing { literal.to_string() } else { value })
        .collect();

    Ok(Some(Series::new(series.name().clone(), values)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i64_values(series: &Series) -> Vec<Option<i64>> {
        series.i64().unwrap().into_iter().collect()
    }

    #[test]
    fn test_float_to_int_truncates() {
        let series = Series::new("x".into(), &[1.9f64, -2.7, 3.0]);
        let cast = cast_series(&series, TargetType::Int).unwrap();
        assert_eq!(i64_values(&cast), vec![Some(1), Some(-2), Some(3)]);
    }

    #[test]
    fn test_int_cast_rejects_missing() {
        let series = Series::new("x".into(), &[Some(1.0f64), None]);
        let err = cast_series(&series, TargetType::Int).unwrap_err();
        assert_eq!(err.error_code(), "TYPE_CAST_FAILURE");
        assert!(err.to_string().contains("'x'"));
    }

    #[test]
    fn test_string_to_int() {
        let series = Series::new("age".into(), &[" 42", "7"]);
        let cast = cast_series(&series, TargetType::Int).unwrap();
        assert_eq!(i64_values(&cast), vec![Some(42), Some(7)]);

        let bad = Series::new("age".into(), &["42", "4.5"]);
        let err = cast_series(&bad, TargetType::Int).unwrap_err();
        assert!(err.to_string().contains("invalid literal"));
    }

    #[test]
    fn test_string_to_float_keeps_missing() {
        let series = Series::new("p".into(), &[Some("1.5"), None, Some("2")]);
        let cast = cast_series(&series, TargetType::Float).unwrap();
        let values: Vec<Option<f64>> = cast.f64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(1.5), None, Some(2.0)]);

        let bad = Series::new("p".into(), &["abc"]);
        assert!(cast_series(&bad, TargetType::Float).is_err());
    }

    #[test]
    fn test_to_str_renders_python_style() {
        let series = Series::new("v".into(), &[Some(1.0f64), None]);
        let cast = cast_series(&series, TargetType::Str).unwrap();
        let values: Vec<Option<&str>> = cast.str().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some("1.0"), Some("nan")]);
    }

    #[test]
    fn test_fill_missing_string_column() {
        let series = Series::new("s".into(), &[Some("a"), None]);
        let filled = fill_missing(&series, "zz").unwrap().unwrap();
        let values: Vec<Option<&str>> = filled.str().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some("a"), Some("zz")]);
    }

    fn str_values(series: &Series) -> Vec<Option<&str>> {
        series.str().unwrap().into_iter().collect()
    }

    #[test]
    fn test_fill_missing_uses_literal_verbatim_in_float_column() {
        let series = Series::new("x".into(), &[Some(1.5f64), None]);
        let filled = fill_missing(&series, "0").unwrap().unwrap();
        assert_eq!(filled.dtype(), &DataType::String);
        assert_eq!(str_values(&filled), vec![Some("1.5"), Some("0")]);

        let filled = fill_missing(&series, "unknown").unwrap().unwrap();
        assert_eq!(str_values(&filled), vec![Some("1.5"), Some("unknown")]);
    }

    #[test]
    fn test_fill_missing_integer_column_renders_as_floats() {
        let ints = Series::new("n".into(), &[Some(1i64), None]);
        let filled = fill_missing(&ints, "0").unwrap().unwrap();
        assert_eq!(str_values(&filled), vec![Some("1.0"), Some("0")]);
    }

    #[test]
    fn test_fill_missing_boolean_column() {
        let series = Series::new("b".into(), &[Some(true), None]);
        let filled = fill_missing(&series, "False").unwrap().unwrap();
        assert_eq!(str_values(&filled), vec![Some("True"), Some("False")]);
    }

    #[test]
    fn test_fill_missing_untouched_without_holes() {
        let series = Series::new("n".into(), &[1i64, 2]);
        assert!(fill_missing(&series, "0").unwrap().is_none());
    }
}
