use crate::error::CleaningError;
use crate::pipeline::PipelineStep;
use crate::utils::frame_to_records;
use polars::prelude::*;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};

// ============================================================================
// Diagnostics
// ============================================================================

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    Info,
    /// Info-level confirmation that an operation produced its output.
    Success,
    Warning,
    Error,
}

impl DiagnosticKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// A non-fatal message collected while cleaning or preparing a chart.
///
/// Diagnostics are kept in emission order. A diagnostic may carry a sub-table,
/// e.g. the rows that violate an integrity rule.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    /// Error code of the underlying [`CleaningError`], for error diagnostics.
    pub code: Option<&'static str>,
    pub table: Option<DataFrame>,
}

impl Diagnostic {
    fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            table: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Error, message)
    }

    /// An error diagnostic built from a [`CleaningError`], keeping its code.
    pub fn from_error(error: &CleaningError) -> Self {
        Self::error(error.to_string()).with_code(error.error_code())
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach the offending rows.
    pub fn with_table(mut self, table: DataFrame) -> Self {
        self.table = Some(table);
        self
    }

    pub fn is_error(&self) -> bool {
        self.kind == DiagnosticKind::Error
    }
}

/// The attached table is serialized as a list of row records.
impl Serialize for Diagnostic {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let rows = match &self.table {
            Some(table) => Some(frame_to_records(table).map_err(serde::ser::Error::custom)?),
            None => None,
        };

        let mut state = serializer.serialize_struct("Diagnostic", 4)?;
        state.serialize_field("kind", &self.kind)?;
        state.serialize_field("message", &self.message)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("rows", &rows)?;
        state.end()
    }
}

// ============================================================================
// Pipeline Outcome
// ============================================================================

/// The step that aborted a run and why.
#[derive(Debug)]
pub struct StepFailure {
    pub step: PipelineStep,
    pub error: CleaningError,
}

impl Serialize for StepFailure {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("StepFailure", 2)?;
        state.serialize_field("step", &self.step)?;
        state.serialize_field("error", &self.error)?;
        state.end()
    }
}

/// Everything a cleaning run produces.
#[derive(Debug)]
pub struct CleaningOutcome {
    /// The transformed dataset. When a step failed, the data as of the last
    /// successful step.
    pub data: DataFrame,
    pub diagnostics: Vec<Diagnostic>,
    pub summary: CleaningSummary,
    /// Set when a step aborted the run.
    pub failure: Option<StepFailure>,
}

impl CleaningOutcome {
    /// True when every enabled step ran.
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// Diagnostics of one kind, in emission order.
    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }
}

// ============================================================================
// Cleaning Summary
// ============================================================================

/// Human-readable summary of what the pipeline did.
///
/// # Example
///
/// ```rust,ignore
/// let summary = &outcome.summary;
/// println!("Rows: {} -> {} in {}ms", summary.rows_before, summary.rows_after, summary.duration_ms);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningSummary {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,

    pub rows_before: usize,
    pub rows_after: usize,
    pub rows_removed: usize,

    pub columns_before: usize,
    pub columns_after: usize,

    /// Steps that ran to completion, in order.
    pub steps_applied: Vec<PipelineStep>,

    /// Audit trail of the changes made.
    pub actions: Vec<CleaningAction>,
}

impl CleaningSummary {
    /// Create a new empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculate the percentage of rows removed.
    pub fn rows_removed_percentage(&self) -> f32 {
        if self.rows_before == 0 {
            0.0
        } else {
            (self.rows_removed as f32 / self.rows_before as f32) * 100.0
        }
    }
}

/// A single change made during cleaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningAction {
    pub action_type: ActionType,
    /// Column name or "dataset".
    pub target: String,
    pub description: String,
}

impl CleaningAction {
    pub fn new(
        action_type: ActionType,
        target: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            target: target.into(),
            description: description.into(),
        }
    }
}

/// Types of actions that can be taken during cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    ColumnRemoved,
    RowsRemoved,
    ValuesFilled,
    TypeCast,
    RowsFiltered,
    DuplicatesRemoved,
    OutliersRemoved,
    FeatureCreated,
    ColumnStandardized,
    RowsSorted,
    LagFeaturesCreated,
}

impl ActionType {
    /// Get a human-readable display name for the action type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ColumnRemoved => "Column Removed",
            Self::RowsRemoved => "Rows Removed",
            Self::ValuesFilled => "Values Filled",
            Self::TypeCast => "Type Cast",
            Self::RowsFiltered => "Rows Filtered",
            Self::DuplicatesRemoved => "Duplicates Removed",
            Self::OutliersRemoved => "Outliers Removed",
            Self::FeatureCreated => "Feature Created",
            Self::ColumnStandardized => "Column Standardized",
            Self::RowsSorted => "Rows Sorted",
            Self::LagFeaturesCreated => "Lag Features Created",
        }
    }
}
