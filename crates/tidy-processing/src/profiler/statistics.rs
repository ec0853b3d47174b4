//! Summary statistics for column descriptions.

use crate::utils::{mean_and_sample_std, quantile_sorted};
use std::collections::HashMap;

/// Numeric summary over the present values of a column.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct NumericSummary {
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub q50: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

pub(crate) fn numeric_summary(values: &[Option<f64>]) -> NumericSummary {
    let (mean, std) = mean_and_sample_std(values);

    let mut sorted: Vec<f64> = values.iter().flatten().copied().collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    NumericSummary {
        mean,
        std,
        min: sorted.first().copied(),
        q25: quantile_sorted(&sorted, 0.25),
        q50: quantile_sorted(&sorted, 0.5),
        q75: quantile_sorted(&sorted, 0.75),
        max: sorted.last().copied(),
    }
}

/// Distinct count and the most frequent value with its count.
///
/// Ties go to the value seen first.
pub(crate) fn frequency_summary<'a>(
    values: impl IntoIterator<Item = &'a str>,
) -> (usize, Option<(String, usize)>) {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, value) in values.into_iter().enumerate() {
        counts.entry(value).or_insert((0, position)).0 += 1;
    }

    let top = counts
        .iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(value, (count, _))| (value.to_string(), *count));

    (counts.len(), top)
}
