//! Column-level cleaning operations.
//!
//! This module provides:
//! - Casting columns to `int`, `float` or `str` ([`TypeCaster`])
//! - Filling missing values with a literal
//! - The text-cleaning hook, which is currently a no-op

mod converters;

pub(crate) use converters::fill_missing;

use crate::config::TargetType;
use crate::error::{CleaningError, Result};
use crate::types::Diagnostic;
use crate::utils::has_column;
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Casts columns to the types requested in an operation spec.
pub struct TypeCaster;

impl TypeCaster {
    /// Cast one column in place.
    ///
    /// An absent column is reported as a [`CleaningError::TypeCastFailure`]
    /// naming it, like any other failed cast.
    pub fn cast_column(df: &mut DataFrame, column: &str, target: TargetType) -> Result<()> {
        if !has_column(df, column) {
            return Err(CleaningError::TypeCastFailure {
                column: column.to_string(),
                target_type: target.to_string(),
                reason: format!("column '{}' not found in dataset", column),
            });
        }

        let series = df.column(column)?.as_materialized_series();
        let converted = converters::cast_series(series, target)?;
        df.replace(column, converted)?;
        Ok(())
    }

    /// Apply every requested cast, independently.
    ///
    /// A failed cast leaves its column as it was and yields one error
    /// diagnostic; the remaining casts still run. Returns the columns that
    /// were converted.
    pub fn cast_columns(
        df: &mut DataFrame,
        data_types: &BTreeMap<String, TargetType>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<String> {
        let mut converted = Vec::new();

        for (column, target) in data_types {
            match Self::cast_column(df, column, *target) {
                Ok(()) => {
                    debug!("Converted '{}' to {}", column, target);
                    converted.push(column.clone());
                }
                Err(e) => {
                    warn!("Failed to convert '{}' to {}: {}", column, target, e);
                    diagnostics.push(Diagnostic::from_error(&e));
                }
            }
        }

        converted
    }
}

/// Text-cleaning hook for the selected columns.
///
/// No cleaning rules are defined yet, so this leaves the data untouched.
pub fn clean_text_columns(_df: &mut DataFrame, columns: &[String]) {
    for column in columns {
        debug!("No text cleaning rules defined for '{}'", column);
    }
}
