use crate::error::Result;
use crate::pipeline::PipelineStep;
use crate::profiler::{ColumnNulls, null_counts};
use crate::types::{CleaningOutcome, CleaningSummary, Diagnostic};
use chrono::Local;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Everything a cleaning run produced, ready for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct CleaningReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// Path to the input file
    pub input_file: String,
    /// Path to the output file (if written)
    pub output_file: Option<String>,

    pub summary: CleaningSummary,
    pub rows_removed_percent: f32,

    /// Set when a step aborted the run.
    pub failure: Option<FailureReport>,

    pub diagnostics: Vec<Diagnostic>,

    /// Missing values per column of the cleaned data.
    pub null_counts: Vec<ColumnNulls>,
}

/// The aborting step and its error.
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub step: PipelineStep,
    pub code: String,
    pub message: String,
}

/// Builds and saves run reports.
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn build_report(
        &self,
        input_file: &str,
        output_file: Option<&str>,
        outcome: &CleaningOutcome,
    ) -> Result<CleaningReport> {
        let failure = outcome.failure.as_ref().map(|f| FailureReport {
            step: f.step,
            code: f.error.error_code().to_string(),
            message: f.error.to_string(),
        });

        Ok(CleaningReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: input_file.to_string(),
            output_file: output_file.map(str::to_string),
            summary: outcome.summary.clone(),
            rows_removed_percent: outcome.summary.rows_removed_percentage(),
            failure,
            diagnostics: outcome.diagnostics.clone(),
            null_counts: null_counts(&outcome.data)?,
        })
    }

    /// Write the report as pretty JSON to `<output_dir>/<base_name>_report.json`.
    pub fn write_report_to_file(
        &self,
        report: &CleaningReport,
        report_base_name: &str,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let report_path = self
            .output_dir
            .join(format!("{}_report.json", report_base_name));
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());

        Ok(report_path)
    }
}
