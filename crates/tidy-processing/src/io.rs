//! Reading and writing datasets.
//!
//! The cleaning tool reads its uploads as ISO-8859-1 text, the chart tool as
//! UTF-8. Both parse a header row and infer the schema over every row.

use crate::error::{Result, ResultExt};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use polars::io::csv::read::{CsvParseOptions, CsvReadOptions, NullValues};
use polars::prelude::*;
use std::fs::{self, File};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

/// File name offered by the download link.
pub const DEFAULT_DOWNLOAD_NAME: &str = "cleaned_data.csv";

/// Field values read as missing, in addition to empty fields. Same list as
/// pandas' `read_csv` defaults.
pub const MISSING_TOKENS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Decode ISO-8859-1 bytes. Every byte maps to the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Parse CSV text with a header row. Empty fields and [`MISSING_TOKENS`]
/// become missing values.
pub fn parse_csv(text: String) -> Result<DataFrame> {
    let null_values = NullValues::AllColumns(MISSING_TOKENS.iter().map(|t| (*t).into()).collect());
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_parse_options(
            CsvParseOptions::default()
                .with_missing_is_null(true)
                .with_null_values(Some(null_values)),
        )
        .into_reader_with_file_handle(Cursor::new(text.into_bytes()))
        .finish()
        .context("Failed to parse CSV")?;
    debug!("Parsed CSV: {} rows x {} columns", df.height(), df.width());
    Ok(df)
}

/// Read a Latin-1 encoded CSV file.
pub fn read_csv_latin1(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    info!("Loaded {} ({} bytes, ISO-8859-1)", path.display(), bytes.len());
    parse_csv(decode_latin1(&bytes))
}

/// Read a UTF-8 CSV file.
pub fn read_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    info!("Loaded {} ({} bytes)", path.display(), text.len());
    parse_csv(text)
}

/// Serialize a dataset to CSV text: header row, no index, empty missing fields.
pub fn write_csv(df: &DataFrame) -> Result<String> {
    let mut df = df.clone();
    let mut buf: Vec<u8> = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .with_separator(b',')
        .finish(&mut df)
        .context("Failed to write CSV")?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Write a dataset to a CSV file, creating parent directories.
pub fn write_csv_file(df: &DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut df = df.clone();
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(&mut df)
        .context("Failed to write CSV")?;

    info!("Dataset saved: {}", path.display());
    Ok(())
}

/// HTML anchor that downloads the dataset as CSV through a base64 `data:` URI.
pub fn download_link(df: &DataFrame, filename: &str) -> Result<String> {
    let encoded = STANDARD.encode(write_csv(df)?);
    Ok(format!(
        "<a href=\"data:file/csv;base64,{}\" download=\"{}\">Download Cleaned Data</a>",
        encoded, filename
    ))
}
