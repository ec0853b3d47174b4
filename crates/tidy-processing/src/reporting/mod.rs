//! Report generation module.
//!
//! A [`CleaningReport`] gathers everything a cleaning run produced, for:
//! - JSON output to stdout (`--json` CLI flag)
//! - JSON file output (`--emit-report` CLI flag)
//! - Programmatic access in library mode
//!
//! # Example
//!
//! ```rust,ignore
//! use tidy_processing::reporting::ReportGenerator;
//!
//! let generator = ReportGenerator::new(PathBuf::from("output"));
//! let report = generator.build_report("data/sales.csv", Some("output/cleaned_data.csv"), &outcome)?;
//!
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! generator.write_report_to_file(&report, "sales")?;
//! ```

mod generator;

pub use generator::{CleaningReport, FailureReport, ReportGenerator};
