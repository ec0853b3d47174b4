//! Chart preparation.
//!
//! Turns a dataset, two column names and a plot kind into a [`ChartSpec`]: the
//! data a plotting frontend needs, serializable to JSON. Nothing is drawn here.
//! Failures never escape [`prepare_chart`]; they come back as diagnostics.

use crate::error::{CleaningError, Result};
use crate::types::Diagnostic;
use crate::utils::{json_values, missing_mask, numeric_values, python_str_values, require_column};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

const HISTOGRAM_BINS: usize = 10;
const PIE_START_ANGLE: f64 = 140.0;

/// The supported plot kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotKind {
    Scatter,
    Line,
    Bar,
    Count,
    Box,
    Violin,
    Strip,
    Swarm,
    Heatmap,
    Pair,
    Histogram,
    BarGraph,
    Pie,
}

impl PlotKind {
    /// Every kind, in menu order.
    pub const ALL: [PlotKind; 13] = [
        Self::Scatter,
        Self::Line,
        Self::Bar,
        Self::Count,
        Self::Box,
        Self::Violin,
        Self::Strip,
        Self::Swarm,
        Self::Heatmap,
        Self::Pair,
        Self::Histogram,
        Self::BarGraph,
        Self::Pie,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Scatter => "Scatter Plot",
            Self::Line => "Line Plot",
            Self::Bar => "Bar Plot",
            Self::Count => "Count Plot",
            Self::Box => "Box Plot",
            Self::Violin => "Violin Plot",
            Self::Strip => "Strip Plot",
            Self::Swarm => "Swarm Plot",
            Self::Heatmap => "Heatmap",
            Self::Pair => "Pair Plot",
            Self::Histogram => "Histogram",
            Self::BarGraph => "Bar Graph",
            Self::Pie => "Pie Chart",
        }
    }
}

impl fmt::Display for PlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for PlotKind {
    type Err = CleaningError;

    /// Accepts display names ("Scatter Plot") and snake_case names ("bar_graph"),
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        Self::ALL
            .into_iter()
            .find(|kind| {
                let display = kind.display_name().to_ascii_lowercase();
                display == wanted
                    || serde_json::to_value(kind)
                        .ok()
                        .and_then(|v| v.as_str().map(|n| n.replace('_', " ")))
                        .is_some_and(|name| name == wanted)
            })
            .ok_or_else(|| CleaningError::InvalidConfig(format!("unknown plot kind '{}'", s)))
    }
}

/// What to plot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartRequest {
    pub kind: PlotKind,
    pub x: String,
    pub y: String,
}

impl ChartRequest {
    pub fn new(kind: PlotKind, x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            kind,
            x: x.into(),
            y: y.into(),
        }
    }

    /// Chart title, `"<kind> - <x> vs <y>"`.
    pub fn title(&self) -> String {
        format!("{} - {} vs {}", self.kind, self.x, self.y)
    }
}

/// Data behind a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartData {
    /// Paired x/y values, colored by `hue`.
    Points {
        x: Vec<Value>,
        y: Vec<Value>,
        hue: Vec<Value>,
        jitter: bool,
    },
    /// Row counts per `(x, hue)` pair, in first-appearance order.
    PairCounts {
        x: Vec<String>,
        hue: Vec<String>,
        count: Vec<usize>,
    },
    /// Pearson correlation matrix. Undefined coefficients are `null`.
    Correlation {
        labels: Vec<String>,
        matrix: Vec<Vec<Option<f64>>>,
    },
    /// `edges` has one more entry than `counts`.
    Histogram { edges: Vec<f64>, counts: Vec<usize> },
    /// Value counts, most frequent first.
    ValueCounts { labels: Vec<String>, counts: Vec<usize> },
    Pie {
        labels: Vec<String>,
        counts: Vec<usize>,
        percentages: Vec<String>,
        start_angle: f64,
    },
}

/// A renderable chart description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: PlotKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub data: ChartData,
}

/// Result of [`prepare_chart`]: maybe a chart, plus messages for the user.
#[derive(Debug, Clone, Serialize)]
pub struct ChartOutcome {
    pub chart: Option<ChartSpec>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Prepare a chart. Any failure becomes an `An error occurred: ...` error
/// diagnostic and no chart.
pub fn prepare_chart(df: &DataFrame, request: &ChartRequest) -> ChartOutcome {
    debug!("Preparing {}", request.title());
    let mut diagnostics = Vec::new();

    let chart = match build_chart(df, request, &mut diagnostics) {
        Ok(chart) => chart,
        Err(e) => {
            warn!("Chart preparation failed: {}", e);
            let failure = CleaningError::RenderFailure(e.to_string());
            diagnostics.push(
                Diagnostic::error(format!("An error occurred: {}", e))
                    .with_code(failure.error_code()),
            );
            None
        }
    };

    ChartOutcome { chart, diagnostics }
}

fn build_chart(
    df: &DataFrame,
    request: &ChartRequest,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Option<ChartSpec>> {
    let data = match request.kind {
        PlotKind::Scatter
        | PlotKind::Line
        | PlotKind::Bar
        | PlotKind::Box
        | PlotKind::Violin
        | PlotKind::Strip
        | PlotKind::Swarm => {
            let x = json_values(require_column(df, &request.x)?)?;
            let y = json_values(require_column(df, &request.y)?)?;
            ChartData::Points {
                hue: y.clone(),
                x,
                y,
                jitter: request.kind == PlotKind::Strip,
            }
        }
        PlotKind::Count => pair_counts(
            require_column(df, &request.x)?,
            require_column(df, &request.y)?,
        )?,
        PlotKind::Heatmap => {
            diagnostics.push(Diagnostic::warning(
                "Heatmap visualization requires a matrix-like dataset. Please select appropriate columns.",
            ));
            diagnostics.push(Diagnostic::warning(
                "Displaying correlation heatmap for selected columns.",
            ));
            correlation(df, &request.x, &request.y)?
        }
        PlotKind::Pair => {
            diagnostics.push(Diagnostic::warning(
                "Pair Plot visualization is not supported. Choose another plot type.",
            ));
            return Ok(None);
        }
        PlotKind::Histogram => histogram(require_column(df, &request.x)?)?,
        PlotKind::BarGraph => {
            let (labels, counts) = value_counts(require_column(df, &request.x)?)?;
            ChartData::ValueCounts { labels, counts }
        }
        PlotKind::Pie => {
            diagnostics.push(Diagnostic::warning(
                "Pie Chart visualization requires a single categorical column. Please select an appropriate column.",
            ));
            let (labels, counts) = value_counts(require_column(df, &request.x)?)?;
            let total: usize = counts.iter().sum();
            let percentages = counts
                .iter()
                .map(|c| format!("{:.1}%", *c as f64 * 100.0 / total as f64))
                .collect();
            ChartData::Pie {
                labels,
                counts,
                percentages,
                start_angle: PIE_START_ANGLE,
            }
        }
    };

    Ok(Some(ChartSpec {
        kind: request.kind,
        title: request.title(),
        x_label: request.x.clone(),
        y_label: request.y.clone(),
        data,
    }))
}

/// Present values rendered as strings, in row order.
fn present_strings(series: &Series) -> Result<Vec<Option<String>>> {
    let missing = missing_mask(series)?;
    Ok(python_str_values(series)?
        .into_iter()
        .zip(missing)
        .map(|(value, is_missing)| (!is_missing).then_some(value))
        .collect())
}

fn pair_counts(x: &Series, hue: &Series) -> Result<ChartData> {
    let mut order: Vec<(String, String)> = Vec::new();
    let mut counts: HashMap<(String, String), usize> = HashMap::new();

    for pair in present_strings(x)?.into_iter().zip(present_strings(hue)?) {
        if let (Some(a), Some(b)) = pair {
            let key = (a, b);
            let count = counts.entry(key.clone()).or_insert(0);
            if *count == 0 {
                order.push(key);
            }
            *count += 1;
        }
    }

    let count = order.iter().map(|key| counts[key]).collect();
    let (x, hue) = order.into_iter().unzip();
    Ok(ChartData::PairCounts { x, hue, count })
}

/// Non-missing values of `series` counted, most frequent first. Ties keep
/// first-appearance order.
fn value_counts(series: &Series) -> Result<(Vec<String>, Vec<usize>)> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for value in present_strings(series)?.into_iter().flatten() {
        let count = counts.entry(value.clone()).or_insert(0);
        if *count == 0 {
            order.push(value);
        }
        *count += 1;
    }

    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    let tallies = order.iter().map(|label| counts[label]).collect();
    Ok((order, tallies))
}

fn histogram(series: &Series) -> Result<ChartData> {
    let values: Vec<f64> = numeric_values(series)?.into_iter().flatten().collect();
    let (Some(min), Some(max)) = (
        values.iter().copied().reduce(f64::min),
        values.iter().copied().reduce(f64::max),
    ) else {
        return Err(CleaningError::RenderFailure(format!(
            "column '{}' has no values to plot",
            series.name()
        )));
    };

    let (low, high) = if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };
    let width = (high - low) / HISTOGRAM_BINS as f64;
    let edges: Vec<f64> = (0..=HISTOGRAM_BINS)
        .map(|i| low + width * i as f64)
        .collect();

    let mut counts = vec![0usize; HISTOGRAM_BINS];
    for value in values {
        let bin = (((value - low) / width).floor() as usize).min(HISTOGRAM_BINS - 1);
        counts[bin] += 1;
    }

    Ok(ChartData::Histogram { edges, counts })
}

fn correlation(df: &DataFrame, x: &str, y: &str) -> Result<ChartData> {
    let xs = numeric_values(require_column(df, x)?)?;
    let ys = numeric_values(require_column(df, y)?)?;
    let r = pearson(&xs, &ys);

    Ok(ChartData::Correlation {
        labels: vec![x.to_string(), y.to_string()],
        matrix: vec![
            vec![pearson(&xs, &xs), r],
            vec![r, pearson(&ys, &ys)],
        ],
    })
}

/// Pearson correlation over rows where both values are present.
fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in &pairs {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a).powi(2);
        var_b += (y - mean_b).powi(2);
    }

    let denominator = (var_a * var_b).sqrt();
    (denominator > 0.0).then(|| cov / denominator)
}
