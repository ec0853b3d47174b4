//! Operation spec for the cleaning pipeline.
//!
//! An [`OperationSpec`] selects which of the twelve cleaning steps run and with
//! what parameters. It is built once per invocation, either from JSON produced
//! by a frontend or with [`OperationSpec::builder()`], and never changes while
//! the pipeline runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Default z-score threshold for outlier removal.
pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 3.0;

/// Target type of a column cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetType {
    /// 64-bit signed integers
    #[serde(rename = "int")]
    Int,
    /// 64-bit floats
    #[serde(rename = "float")]
    Float,
    /// Strings, rendered the way pandas `astype(str)` renders values
    #[serde(rename = "str", alias = "string")]
    Str,
}

impl TargetType {
    /// Short name used in diagnostics and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TargetType {
    type Err = ConfigValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" => Ok(Self::Int),
            "float" => Ok(Self::Float),
            "str" | "string" => Ok(Self::Str),
            other => Err(ConfigValidationError::UnknownTargetType(other.to_string())),
        }
    }
}

/// Configuration of one cleaning run.
///
/// Field names match the JSON a frontend sends, so a spec can be loaded with
/// `serde_json::from_str` directly. Every field is optional in JSON; the
/// default spec enables nothing and leaves a dataset untouched.
///
/// # Example
///
/// ```rust,ignore
/// use tidy_processing::config::{OperationSpec, TargetType};
///
/// let spec = OperationSpec::builder()
///     .drop_columns(["notes"])
///     .cast("age", TargetType::Int)
///     .remove_outliers(["price"], 2.5)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationSpec {
    /// Columns removed before anything else runs.
    pub drop_columns: Vec<String>,

    /// Drop every row holding a missing value.
    pub remove_null: bool,

    /// Replace missing values with `fill_value`.
    pub fill_null: bool,
    pub fill_value: Option<String>,

    /// Per-column casts, attempted independently.
    pub data_types: BTreeMap<String, TargetType>,

    /// Per-column allowed values, compared against the string rendering.
    pub column_filters: BTreeMap<String, Vec<String>>,

    /// Drop repeated rows, judged over `dedup_columns` (all when empty).
    pub remove_duplicates: bool,
    pub dedup_columns: Vec<String>,

    /// Drop rows further than `outlier_threshold` standard deviations from the mean.
    /// Default: 3.0
    pub remove_outliers: bool,
    pub outlier_columns: Vec<String>,
    pub outlier_threshold: f64,

    /// Text-cleaning hook. Currently a no-op.
    pub clean_text: bool,
    pub text_columns: Vec<String>,

    /// `"a,b"` entries produce `a_b_sum` columns.
    pub feature_engineering: bool,
    pub new_features: Vec<String>,

    /// Observational start/end date and quantity checks.
    pub data_integrity_checks: bool,

    /// Add `<column>_standardized` z-score columns.
    pub scaling: bool,
    pub numeric_columns: Vec<String>,

    /// Sort by `timestamp_column` and add `value_lag_1..3`.
    pub time_series: bool,
    pub timestamp_column: String,
}

impl Default for OperationSpec {
    fn default() -> Self {
        Self {
            drop_columns: Vec::new(),
            remove_null: false,
            fill_null: false,
            fill_value: None,
            data_types: BTreeMap::new(),
            column_filters: BTreeMap::new(),
            remove_duplicates: false,
            dedup_columns: Vec::new(),
            remove_outliers: false,
            outlier_columns: Vec::new(),
            outlier_threshold: DEFAULT_OUTLIER_THRESHOLD,
            clean_text: false,
            text_columns: Vec::new(),
            feature_engineering: false,
            new_features: Vec::new(),
            data_integrity_checks: false,
            scaling: false,
            numeric_columns: Vec::new(),
            time_series: false,
            timestamp_column: String::new(),
        }
    }
}

impl OperationSpec {
    /// Create a new spec builder.
    pub fn builder() -> OperationSpecBuilder {
        OperationSpecBuilder::default()
    }

    /// Parse a spec from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigValidationError> {
        let spec: OperationSpec = serde_json::from_str(json)
            .map_err(|e| ConfigValidationError::Malformed(e.to_string()))?;
        spec.validate()?;
        Ok(spec)
    }

    /// Read a JSON spec file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigValidationError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigValidationError::Malformed(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    /// Validate the spec and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !self.outlier_threshold.is_finite() || self.outlier_threshold < 0.0 {
            return Err(ConfigValidationError::InvalidThreshold(self.outlier_threshold));
        }
        Ok(())
    }

    /// True when no step would run.
    pub fn is_noop(&self) -> bool {
        self.drop_columns.is_empty()
            && !self.remove_null
            && !(self.fill_null && self.fill_value.is_some())
            && self.data_types.is_empty()
            && self.column_filters.values().all(|values| values.is_empty())
            && !self.remove_duplicates
            && !self.remove_outliers
            && !self.clean_text
            && !self.feature_engineering
            && !self.data_integrity_checks
            && !self.scaling
            && !self.time_series
    }
}

/// Errors that can occur during spec validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid outlier threshold: {0} (must be finite and non-negative)")]
    InvalidThreshold(f64),

    #[error("Unknown target type '{0}' (expected int, float or str)")]
    UnknownTargetType(String),

    #[error("Malformed operation spec: {0}")]
    Malformed(String),
}

impl From<ConfigValidationError> for crate::error::CleaningError {
    fn from(e: ConfigValidationError) -> Self {
        crate::error::CleaningError::InvalidConfig(e.to_string())
    }
}

/// Builder for [`OperationSpec`] with fluent API.
#[derive(Debug, Default)]
pub struct OperationSpecBuilder {
    spec: OperationSpec,
}

fn owned<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl OperationSpecBuilder {
    /// Remove these columns first.
    pub fn drop_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.drop_columns = owned(columns);
        self
    }

    /// Drop rows containing any missing value.
    pub fn remove_null(mut self, enable: bool) -> Self {
        self.spec.remove_null = enable;
        self
    }

    /// Replace missing values with a literal.
    pub fn fill_null(mut self, value: impl Into<String>) -> Self {
        self.spec.fill_null = true;
        self.spec.fill_value = Some(value.into());
        self
    }

    /// Cast a column. Later calls for the same column replace earlier ones.
    pub fn cast(mut self, column: impl Into<String>, target: TargetType) -> Self {
        self.spec.data_types.insert(column.into(), target);
        self
    }

    /// Keep only rows whose `column` renders to one of `values`.
    pub fn filter<I, S>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.column_filters.insert(column.into(), owned(values));
        self
    }

    /// Drop duplicate rows over a column subset (empty = all columns).
    pub fn remove_duplicates<I, S>(mut self, subset: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.remove_duplicates = true;
        self.spec.dedup_columns = owned(subset);
        self
    }

    /// Remove outliers over the given columns, in order.
    pub fn remove_outliers<I, S>(mut self, columns: I, threshold: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.remove_outliers = true;
        self.spec.outlier_columns = owned(columns);
        self.spec.outlier_threshold = threshold;
        self
    }

    /// Enable the text-cleaning hook for these columns.
    pub fn clean_text<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.clean_text = true;
        self.spec.text_columns = owned(columns);
        self
    }

    /// Add `"a,b"` sum features.
    pub fn new_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.feature_engineering = true;
        self.spec.new_features = owned(features);
        self
    }

    /// Enable the date-order and quantity checks.
    pub fn data_integrity_checks(mut self, enable: bool) -> Self {
        self.spec.data_integrity_checks = enable;
        self
    }

    /// Standardize these columns into `<column>_standardized`.
    pub fn standardize<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.scaling = true;
        self.spec.numeric_columns = owned(columns);
        self
    }

    /// Sort by a timestamp column and add lag features of `value`.
    pub fn time_series(mut self, timestamp_column: impl Into<String>) -> Self {
        self.spec.time_series = true;
        self.spec.timestamp_column = timestamp_column.into();
        self
    }

    /// Build the spec.
    ///
    /// Returns a validated `OperationSpec` or an error if validation fails.
    pub fn build(self) -> Result<OperationSpec, ConfigValidationError> {
        self.spec.validate()?;
        Ok(self.spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_spec() {
        let spec = OperationSpec::default();
        assert_eq!(spec.outlier_threshold, 3.0);
        assert!(spec.timestamp_column.is_empty());
        assert!(spec.is_noop());
    }

    #[test]
    fn test_builder_custom_values() {
        let spec = OperationSpec::builder()
            .drop_columns(["notes"])
            .fill_null("0")
            .cast("age", TargetType::Int)
            .remove_outliers(["price"], 2.0)
            .build()
            .unwrap();

        assert_eq!(spec.drop_columns, vec!["notes".to_string()]);
        assert!(spec.fill_null);
        assert_eq!(spec.fill_value.as_deref(), Some("0"));
        assert_eq!(spec.data_types.get("age"), Some(&TargetType::Int));
        assert!(spec.remove_outliers);
        assert_eq!(spec.outlier_threshold, 2.0);
        assert!(!spec.is_noop());
    }

    #[test]
    fn test_validation_invalid_threshold() {
        let result = OperationSpec::builder().remove_outliers(["x"], -1.0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidThreshold(_)
        ));

        let result = OperationSpec::builder()
            .remove_outliers(["x"], f64::NAN)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_target_type_from_str() {
        assert_eq!("int".parse::<TargetType>().unwrap(), TargetType::Int);
        assert_eq!("Float".parse::<TargetType>().unwrap(), TargetType::Float);
        assert_eq!("string".parse::<TargetType>().unwrap(), TargetType::Str);
        assert!("date".parse::<TargetType>().is_err());
    }

    #[test]
    fn test_spec_from_frontend_json() {
        let json = r#"{
            "drop_columns": ["notes"],
            "remove_null": false,
            "fill_null": true,
            "fill_value": "unknown",
            "data_types": {"age": "int", "score": "float", "zip": "str"},
            "column_filters": {"city": ["Paris", "Lyon"]},
            "remove_duplicates": true,
            "dedup_columns": [],
            "remove_outliers": true,
            "outlier_columns": ["score"],
            "outlier_threshold": 2.5,
            "clean_text": false,
            "text_columns": [],
            "feature_engineering": true,
            "new_features": ["a,b"],
            "data_integrity_checks": true,
            "scaling": true,
            "numeric_columns": ["score"],
            "time_series": false,
            "timestamp_column": ""
        }"#;

        let spec = OperationSpec::from_json(json).expect("Should deserialize from frontend JSON");

        assert_eq!(spec.drop_columns, vec!["notes".to_string()]);
        assert_eq!(spec.fill_value.as_deref(), Some("unknown"));
        assert_eq!(spec.data_types.get("zip"), Some(&TargetType::Str));
        assert_eq!(
            spec.column_filters.get("city"),
            Some(&vec!["Paris".to_string(), "Lyon".to_string()])
        );
        assert_eq!(spec.outlier_threshold, 2.5);
        assert_eq!(spec.new_features, vec!["a,b".to_string()]);
        assert!(spec.data_integrity_checks);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let spec = OperationSpec::from_json(r#"{"remove_duplicates": true}"#).unwrap();
        assert!(spec.remove_duplicates);
        assert_eq!(spec.outlier_threshold, DEFAULT_OUTLIER_THRESHOLD);
        assert!(spec.dedup_columns.is_empty());
    }

    #[test]
    fn test_malformed_json() {
        let err = OperationSpec::from_json(r#"{"data_types": {"age": "date"}}"#).unwrap_err();
        assert!(matches!(err, ConfigValidationError::Malformed(_)));
    }
}
