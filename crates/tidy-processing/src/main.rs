//! CLI entry point for the tabular cleaning pipeline.

use anyhow::{Context, Result, anyhow};
use clap::{Args as ClapArgs, Parser, Subcommand};
use dotenv::dotenv;
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};
use tidy_processing::io::{self, DEFAULT_DOWNLOAD_NAME};
use tidy_processing::profiler;
use tidy_processing::{
    ChartRequest, CleaningOutcome, CleaningReport, Diagnostic, OperationSpec, Pipeline, PlotKind,
    ReportGenerator, TargetType, prepare_chart,
};
use tracing::{debug, error, info, warn};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Configurable cleaning pipeline for CSV datasets",
    long_about = "Cleans CSV datasets with an ordered set of optional steps, \
                  summarizes datasets and prepares chart data.\n\n\
                  EXAMPLES:\n  \
                  # Drop a column and remove duplicate rows\n  \
                  tidy-processing clean -i data.csv --drop notes --dedup\n\n  \
                  # Run a JSON operation spec and print the report\n  \
                  tidy-processing clean -i data.csv --spec spec.json --json\n\n  \
                  # Summarize a dataset\n  \
                  tidy-processing describe -i data.csv\n\n  \
                  # Prepare a scatter plot\n  \
                  tidy-processing chart -i data.csv -x age -y income --kind \"Scatter Plot\""
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Suppress progress output (only show warnings and errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the cleaning pipeline on a Latin-1 encoded CSV file
    Clean(CleanArgs),
    /// Print dtypes, a describe table and null counts
    Describe(DescribeArgs),
    /// Prepare chart data for two columns
    Chart(ChartArgs),
}

#[derive(ClapArgs, Debug)]
struct CleanArgs {
    /// Path to the CSV file to clean
    #[arg(short, long)]
    input: String,

    /// Output directory for results
    #[arg(short, long, default_value = "./outputs")]
    output: String,

    /// File name of the cleaned CSV
    #[arg(long, default_value = DEFAULT_DOWNLOAD_NAME)]
    output_name: String,

    /// JSON operation spec; flags below are applied on top of it
    #[arg(long)]
    spec: Option<PathBuf>,

    /// Column to drop (repeatable)
    #[arg(long = "drop", value_name = "COLUMN")]
    drop_columns: Vec<String>,

    /// Drop rows holding any missing value
    #[arg(long)]
    remove_null: bool,

    /// Fill missing values with this literal
    #[arg(long)]
    fill_value: Option<String>,

    /// Cast a column, e.g. `age=int` (int, float, str; repeatable)
    #[arg(long = "cast", value_name = "COLUMN=TYPE", value_parser = parse_cast)]
    casts: Vec<(String, TargetType)>,

    /// Keep rows whose value is listed, e.g. `city=Oslo,Rome` (repeatable)
    #[arg(long = "filter", value_name = "COLUMN=V1,V2", value_parser = parse_filter)]
    filters: Vec<(String, Vec<String>)>,

    /// Remove duplicate rows
    #[arg(long)]
    dedup: bool,

    /// Column considered when removing duplicates (repeatable, implies --dedup)
    #[arg(long = "dedup-column", value_name = "COLUMN")]
    dedup_columns: Vec<String>,

    /// Remove outliers from this column (repeatable)
    #[arg(long = "outliers", value_name = "COLUMN")]
    outlier_columns: Vec<String>,

    /// Outlier threshold in standard deviations
    #[arg(long)]
    outlier_threshold: Option<f64>,

    /// Text column to clean (repeatable)
    #[arg(long = "clean-text", value_name = "COLUMN")]
    text_columns: Vec<String>,

    /// Sum feature as `a,b` (repeatable)
    #[arg(long = "feature", value_name = "A,B")]
    features: Vec<String>,

    /// Run the data integrity checks
    #[arg(long)]
    integrity: bool,

    /// Add a standardized copy of this column (repeatable)
    #[arg(long = "standardize", value_name = "COLUMN")]
    numeric_columns: Vec<String>,

    /// Sort by this timestamp column and add lag features
    #[arg(long)]
    timestamp: Option<String>,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,

    /// Write a detailed JSON report to the output directory
    ///
    /// The report will be saved as <input_name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Write an HTML download link for the cleaned CSV
    #[arg(long)]
    html_link: bool,
}

#[derive(ClapArgs, Debug)]
struct DescribeArgs {
    /// Path to the CSV file
    #[arg(short, long)]
    input: String,

    /// Read the file as UTF-8 instead of Latin-1
    #[arg(long)]
    utf8: bool,
}

#[derive(ClapArgs, Debug)]
struct ChartArgs {
    /// Path to the UTF-8 CSV file
    #[arg(short, long)]
    input: String,

    /// X-axis column
    #[arg(short)]
    x: String,

    /// Y-axis column
    #[arg(short)]
    y: String,

    /// Plot kind, e.g. "Scatter Plot" or "bar_graph"
    #[arg(long, default_value = "Scatter Plot")]
    kind: PlotKind,

    /// Write the chart JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn parse_cast(s: &str) -> std::result::Result<(String, TargetType), String> {
    let (column, target) = s
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=TYPE, got '{}'", s))?;
    let target = target.parse::<TargetType>().map_err(|e| e.to_string())?;
    Ok((column.to_string(), target))
}

fn parse_filter(s: &str) -> std::result::Result<(String, Vec<String>), String> {
    let (column, values) = s
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=V1,V2, got '{}'", s))?;
    Ok((
        column.to_string(),
        values.split(',').map(|v| v.trim().to_string()).collect(),
    ))
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled so stdout only
/// carries the JSON report.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    // Load environment variables (RUST_LOG) before logging is set up
    dotenv().ok();

    let cli = Cli::parse();
    let json_output = matches!(&cli.command, Command::Clean(args) if args.json);
    init_logging(&cli.log_level, cli.quiet, json_output);

    match &cli.command {
        Command::Clean(args) => run_clean(args, cli.quiet),
        Command::Describe(args) => run_describe(args),
        Command::Chart(args) => run_chart(args),
    }
}

/// Merge the JSON spec (if any) with the command-line flags.
fn build_spec(args: &CleanArgs) -> Result<OperationSpec> {
    let mut spec = match &args.spec {
        Some(path) => OperationSpec::from_json_file(path)?,
        None => OperationSpec::default(),
    };

    spec.drop_columns.extend(args.drop_columns.iter().cloned());
    spec.remove_null |= args.remove_null;
    if let Some(value) = &args.fill_value {
        spec.fill_null = true;
        spec.fill_value = Some(value.clone());
    }
    for (column, target) in &args.casts {
        spec.data_types.insert(column.clone(), *target);
    }
    for (column, values) in &args.filters {
        spec.column_filters.insert(column.clone(), values.clone());
    }
    if args.dedup || !args.dedup_columns.is_empty() {
        spec.remove_duplicates = true;
        spec.dedup_columns.extend(args.dedup_columns.iter().cloned());
    }
    if !args.outlier_columns.is_empty() {
        spec.remove_outliers = true;
        spec.outlier_columns.extend(args.outlier_columns.iter().cloned());
    }
    if let Some(threshold) = args.outlier_threshold {
        spec.outlier_threshold = threshold;
    }
    if !args.text_columns.is_empty() {
        spec.clean_text = true;
        spec.text_columns.extend(args.text_columns.iter().cloned());
    }
    if !args.features.is_empty() {
        spec.feature_engineering = true;
        spec.new_features.extend(args.features.iter().cloned());
    }
    spec.data_integrity_checks |= args.integrity;
    if !args.numeric_columns.is_empty() {
        spec.scaling = true;
        spec.numeric_columns.extend(args.numeric_columns.iter().cloned());
    }
    if let Some(column) = &args.timestamp {
        spec.time_series = true;
        spec.timestamp_column = column.clone();
    }

    spec.validate()?;
    Ok(spec)
}

fn run_clean(args: &CleanArgs, quiet: bool) -> Result<()> {
    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let spec = build_spec(args)?;
    debug!("Operation spec: {:?}", spec);
    if spec.is_noop() {
        warn!("No cleaning operation selected; the data is written unchanged");
    }

    info!("Loading dataset from: {}", args.input);
    let data = io::read_csv_latin1(&args.input)?;
    info!("Dataset loaded successfully: {:?}", data.shape());

    let mut builder = Pipeline::builder().spec(spec);
    if !quiet {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.step.display_name(),
                update.message
            );
        });
    }
    let outcome = builder.build()?.run(data);

    let output_dir = PathBuf::from(&args.output);
    let output_path = output_dir.join(&args.output_name);
    io::write_csv_file(&outcome.data, &output_path)?;

    if args.html_link {
        let link_path = output_dir.join(format!("{}_download.html", extract_file_stem(&args.output_name)));
        std::fs::write(&link_path, io::download_link(&outcome.data, &args.output_name)?)
            .with_context(|| format!("Failed to write {}", link_path.display()))?;
        info!("Download link written to: {}", link_path.display());
    }

    let generator = ReportGenerator::new(output_dir);
    let output_file = output_path.to_string_lossy().into_owned();
    let report = generator.build_report(&args.input, Some(&output_file), &outcome)?;

    if args.emit_report {
        let report_path =
            generator.write_report_to_file(&report, &extract_file_stem(&args.input))?;
        info!("Report written to: {}", report_path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_human_readable_summary(&report, &outcome);
    }

    match &outcome.failure {
        Some(failure) => {
            error!("Cleaning stopped at '{}'", failure.step.display_name());
            Err(anyhow!(
                "Step '{}' failed: {}",
                failure.step.display_name(),
                failure.error
            ))
        }
        None => Ok(()),
    }
}

/// Print the run summary and diagnostics.
///
/// Uses `println!` on purpose: this is the command's output, not logging.
fn print_human_readable_summary(report: &CleaningReport, outcome: &CleaningOutcome) {
    let summary = &report.summary;

    println!("\n{}", "=".repeat(80));
    println!("CLEANING SUMMARY");
    println!("{}\n", "=".repeat(80));
    println!("  Input:    {}", report.input_file);
    if let Some(output) = &report.output_file {
        println!("  Output:   {}", output);
    }
    println!(
        "  Rows:     {} -> {} ({:.1}% removed)",
        summary.rows_before, summary.rows_after, report.rows_removed_percent
    );
    println!(
        "  Columns:  {} -> {}",
        summary.columns_before, summary.columns_after
    );
    println!("  Duration: {}ms", summary.duration_ms);
    println!();

    if !summary.actions.is_empty() {
        println!("ACTIONS");
        println!("{}", "-".repeat(40));
        for action in &summary.actions {
            println!(
                "  {:<20} {:<20} {}",
                action.action_type.display_name(),
                action.target,
                action.description
            );
        }
        println!();
    }

    if !outcome.diagnostics.is_empty() {
        println!("DIAGNOSTICS");
        println!("{}", "-".repeat(40));
        for diagnostic in &outcome.diagnostics {
            print_diagnostic(diagnostic);
        }
        println!();
    }

    println!("MISSING VALUES AFTER CLEANING");
    println!("{}", "-".repeat(40));
    for nulls in &report.null_counts {
        println!("  {:<30} {}", nulls.column, nulls.nulls);
    }
    println!("{}", "=".repeat(80));
}

fn print_diagnostic(diagnostic: &Diagnostic) {
    println!(
        "  [{}] {}",
        diagnostic.kind.label().to_uppercase(),
        diagnostic.message
    );
    if let Some(table) = &diagnostic.table {
        println!("{}", table);
    }
}

fn load(input: &str, utf8: bool) -> Result<DataFrame> {
    if !Path::new(input).exists() {
        return Err(anyhow!("Input file not found: {}", input));
    }
    let df = if utf8 {
        io::read_csv(input)?
    } else {
        io::read_csv_latin1(input)?
    };
    info!("Dataset loaded successfully: {:?}", df.shape());
    Ok(df)
}

fn run_describe(args: &DescribeArgs) -> Result<()> {
    let df = load(&args.input, args.utf8)?;

    println!("DTYPES");
    println!("{}", profiler::column_dtypes(&df)?);
    println!("SUMMARY");
    println!("{}", profiler::describe(&df)?);
    println!("MISSING VALUES");
    for nulls in profiler::null_counts(&df)? {
        println!("  {:<30} {}", nulls.column, nulls.nulls);
    }
    Ok(())
}

fn run_chart(args: &ChartArgs) -> Result<()> {
    let df = load(&args.input, true)?;
    let request = ChartRequest::new(args.kind, &args.x, &args.y);
    let outcome = prepare_chart(&df, &request);

    for diagnostic in &outcome.diagnostics {
        if diagnostic.is_error() {
            error!("{}", diagnostic.message);
        } else {
            warn!("{}", diagnostic.message);
        }
    }

    let json = serde_json::to_string_pretty(&outcome)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Chart written to: {}", path.display());
        }
        None => println!("{}", json),
    }

    if outcome.diagnostics.iter().any(Diagnostic::is_error) {
        return Err(anyhow!("Chart could not be prepared"));
    }
    Ok(())
}

/// Extract the file stem (name without extension) from a path.
fn extract_file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}
