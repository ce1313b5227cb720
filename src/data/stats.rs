use std::collections::BTreeMap;

use serde::Serialize;

use super::model::{Dataset, Indicator};

/// Per-region statistics of one indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionStats {
    pub region: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Number of neighbourhoods in the region.
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionTotal {
    pub region: String,
    pub total: f64,
}

/// Descriptive summary of one indicator, every figure rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` below two values.
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

// ---------------------------------------------------------------------------
// Rounding
// ---------------------------------------------------------------------------

/// Round half to even at `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Presentation rounding of a statistic: whole numbers for population,
/// two decimals for the income indicators.
pub fn round_stat(indicator: Indicator, value: f64) -> f64 {
    if indicator.is_integral() {
        round_to(value, 0)
    } else {
        round_to(value, 2)
    }
}

fn group_by_region(dataset: &Dataset, indicator: Indicator) -> BTreeMap<&str, Vec<f64>> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for rec in dataset {
        groups
            .entry(rec.region.as_str())
            .or_default()
            .push(indicator.value(rec));
    }
    groups
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Mean, min, max and count of `indicator` per region, alphabetically by region.
///
/// Meant for the full dataset: a region absent from `dataset` has no row.
pub fn aggregate_by_region(dataset: &Dataset, indicator: Indicator) -> Vec<RegionStats> {
    group_by_region(dataset, indicator)
        .into_iter()
        .map(|(region, values)| {
            let count = values.len();
            let mean = values.iter().sum::<f64>() / count as f64;
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            RegionStats {
                region: region.to_string(),
                mean: round_stat(indicator, mean),
                min: round_stat(indicator, min),
                max: round_stat(indicator, max),
                count,
            }
        })
        .collect()
}

/// Sum of `indicator` per region, alphabetically by region.
pub fn total_by_region(dataset: &Dataset, indicator: Indicator) -> Vec<RegionTotal> {
    group_by_region(dataset, indicator)
        .into_iter()
        .map(|(region, values)| RegionTotal {
            region: region.to_string(),
            total: values.iter().sum(),
        })
        .collect()
}

/// Smallest and largest value of `indicator`, or `None` for an empty dataset.
pub fn indicator_bounds(dataset: &Dataset, indicator: Indicator) -> Option<(f64, f64)> {
    dataset.iter().map(|r| indicator.value(r)).fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Count, mean, sample std, min, quartiles and max. `None` when empty.
pub fn describe(dataset: &Dataset, indicator: Indicator) -> Option<Summary> {
    let mut values = dataset.values(indicator);
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let std = (count > 1).then(|| {
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (count - 1) as f64).sqrt()
    });

    Some(Summary {
        count,
        mean: round_to(mean, 2),
        std: std.map(|s| round_to(s, 2)),
        min: round_to(values[0], 2),
        q25: round_to(quantile(&values, 0.25), 2),
        median: round_to(quantile(&values, 0.5), 2),
        q75: round_to(quantile(&values, 0.75), 2),
        max: round_to(values[count - 1], 2),
    })
}

/// Linear interpolation between closest ranks; `sorted` must be non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
