//! Dataset overview module.
//!
//! This module provides the tables shown around a cleaning run:
//! - Column dtypes
//! - A `describe`-style per-column summary
//! - Missing-value counts per column

mod statistics;

use crate::error::Result;
use crate::utils::{is_numeric_dtype, missing_mask, numeric_values, python_float_repr, python_str_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use statistics::{frequency_summary, numeric_summary};

/// Statistic rows of the [`describe`] table, in order.
pub const DESCRIBE_STATISTICS: [&str; 12] = [
    "count", "null_count", "unique", "top", "freq", "mean", "std", "min", "25%", "50%", "75%",
    "max",
];

/// Per-column summary. Numeric columns fill the moment and quantile fields,
/// other columns the frequency fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnDescription {
    pub name: String,
    pub dtype: String,
    pub count: usize,
    pub null_count: usize,

    pub unique: Option<usize>,
    pub top: Option<String>,
    pub freq: Option<usize>,

    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub q50: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnDescription {
    /// Rendered value for one of [`DESCRIBE_STATISTICS`].
    fn statistic(&self, statistic: &str) -> Option<String> {
        let float = |v: Option<f64>| v.map(python_float_repr);
        match statistic {
            "count" => Some(self.count.to_string()),
            "null_count" => Some(self.null_count.to_string()),
            "unique" => self.unique.map(|v| v.to_string()),
            "top" => self.top.clone(),
            "freq" => self.freq.map(|v| v.to_string()),
            "mean" => float(self.mean),
            "std" => float(self.std),
            "min" => float(self.min),
            "25%" => float(self.q25),
            "50%" => float(self.q50),
            "75%" => float(self.q75),
            "max" => float(self.max),
            _ => None,
        }
    }
}

/// Missing-value count of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNulls {
    pub column: String,
    pub nulls: usize,
}

/// Table of column names and their dtypes.
pub fn column_dtypes(df: &DataFrame) -> Result<DataFrame> {
    let names: Vec<String> = df
        .get_columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    let dtypes: Vec<String> = df.get_columns().iter().map(|c| c.dtype().to_string()).collect();

    Ok(DataFrame::new(vec![
        Series::new("Column".into(), names).into(),
        Series::new("Dtype".into(), dtypes).into(),
    ])?)
}

/// Describe every column.
pub fn describe_columns(df: &DataFrame) -> Result<Vec<ColumnDescription>> {
    df.get_columns()
        .iter()
        .map(|column| describe_series(column.as_materialized_series()))
        .collect()
}

fn describe_series(series: &Series) -> Result<ColumnDescription> {
    let missing = missing_mask(series)?;
    let null_count = missing.iter().filter(|m| **m).count();

    let mut description = ColumnDescription {
        name: series.name().to_string(),
        dtype: series.dtype().to_string(),
        count: series.len() - null_count,
        null_count,
        ..ColumnDescription::default()
    };

    if is_numeric_dtype(series.dtype()) {
        let summary = numeric_summary(&numeric_values(series)?);
        description.mean = summary.mean;
        description.std = summary.std;
        description.min = summary.min;
        description.q25 = summary.q25;
        description.q50 = summary.q50;
        description.q75 = summary.q75;
        description.max = summary.max;
    } else {
        let rendered = python_str_values(series)?;
        let present = rendered
            .iter()
            .zip(&missing)
            .filter(|(_, is_missing)| !**is_missing)
            .map(|(value, _)| value.as_str());
        let (unique, top) = frequency_summary(present);
        description.unique = Some(unique);
        if let Some((value, freq)) = top {
            description.top = Some(value);
            description.freq = Some(freq);
        }
    }

    Ok(description)
}

/// `describe`-style table: a `statistic` column, then one string column per
/// dataset column. Statistics that do not apply are missing.
pub fn describe(df: &DataFrame) -> Result<DataFrame> {
    let descriptions = describe_columns(df)?;

    let mut columns: Vec<Column> = Vec::with_capacity(descriptions.len() + 1);
    columns.push(Series::new("statistic".into(), DESCRIBE_STATISTICS.to_vec()).into());
    for description in &descriptions {
        let values: Vec<Option<String>> = DESCRIBE_STATISTICS
            .iter()
            .map(|stat| description.statistic(stat))
            .collect();
        columns.push(Series::new(description.name.as_str().into(), values).into());
    }

    Ok(DataFrame::new(columns)?)
}

/// Missing values per column, in column order. NaN counts as missing.
pub fn null_counts(df: &DataFrame) -> Result<Vec<ColumnNulls>> {
    df.get_columns()
        .iter()
        .map(|column| {
            let series = column.as_materialized_series();
            Ok(ColumnNulls {
                column: series.name().to_string(),
                nulls: missing_mask(series)?.into_iter().filter(|m| *m).count(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> DataFrame {
        df!(
            "city" => [Some("Oslo"), Some("Rome"), Some("Oslo"), None],
            "price" => [Some(1.0f64), Some(2.0), None, Some(3.0)]
        )
        .unwrap()
    }

    #[test]
    fn test_column_dtypes() {
        let table = column_dtypes(&sample()).unwrap();
        assert_eq!(table.shape(), (2, 2));
        let dtypes: Vec<Option<&str>> = table.column("Dtype").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(dtypes, vec![Some("str"), Some("f64")]);
    }

    #[test]
    fn test_describe_columns() {
        let descriptions = describe_columns(&sample()).unwrap();

        let city = &descriptions[0];
        assert_eq!(city.count, 3);
        assert_eq!(city.null_count, 1);
        assert_eq!(city.unique, Some(2));
        assert_eq!(city.top.as_deref(), Some("Oslo"));
        assert_eq!(city.freq, Some(2));
        assert_eq!(city.mean, None);

        let price = &descriptions[1];
        assert_eq!(price.count, 3);
        assert_eq!(price.mean, Some(2.0));
        assert_eq!(price.q50, Some(2.0));
        assert_eq!(price.unique, None);
    }

    #[test]
    fn test_describe_table_layout() {
        let table = describe(&sample()).unwrap();
        assert_eq!(table.shape(), (DESCRIBE_STATISTICS.len(), 3));
        let price: Vec<Option<&str>> = table.column("price").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(price[0], Some("3"));
        assert_eq!(price[5], Some("2.0"));
        assert_eq!(price[3], None);
    }

    #[test]
    fn test_null_counts() {
        let counts = null_counts(&sample()).unwrap();
        assert_eq!(
            counts,
            vec![
                ColumnNulls { column: "city".to_string(), nulls: 1 },
                ColumnNulls { column: "price".to_string(), nulls: 1 },
            ]
        );
    }
}
