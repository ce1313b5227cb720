use std::cmp::Ordering;

use super::model::{Dataset, Indicator};

/// Region value that disables the region filter.
pub const ALL_REGIONS: &str = "all";

/// Label the Portuguese dashboards use for the same sentinel.
const ALL_REGIONS_PT: &str = "todas";

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// Keep the records of one region.
///
/// `None`, `"all"` (or `"Todas"`) returns the whole dataset. Matching is
/// case-insensitive; an unknown region gives an empty view.
pub fn filter_by_region(dataset: &Dataset, region: Option<&str>) -> Dataset {
    let wanted = match region.map(|r| r.trim().to_lowercase()) {
        None => return dataset.clone(),
        Some(r) if r == ALL_REGIONS || r == ALL_REGIONS_PT => return dataset.clone(),
        Some(r) => r,
    };
    dataset
        .iter()
        .filter(|rec| rec.region == wanted)
        .cloned()
        .collect()
}

/// Keep the records whose indicator lies in `[low, high]`, both ends inclusive.
///
/// An inverted (or NaN) range is valid and empty.
pub fn filter_by_range(dataset: &Dataset, indicator: Indicator, low: f64, high: f64) -> Dataset {
    if low.is_nan() || high.is_nan() || low > high {
        return Dataset::default();
    }
    dataset
        .iter()
        .filter(|rec| {
            let v = indicator.value(rec);
            low <= v && v <= high
        })
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Options and orderings offered to the host
// ---------------------------------------------------------------------------

/// Choices for a region selector: `"all"` followed by the regions, sorted.
pub fn region_options(dataset: &Dataset) -> Vec<String> {
    std::iter::once(ALL_REGIONS.to_string())
        .chain(dataset.regions().iter().cloned())
        .collect()
}

/// Records ordered by indicator, largest first. Ties keep dataset order.
pub fn sorted_by(dataset: &Dataset, indicator: Indicator) -> Dataset {
    let mut records = dataset.records().to_vec();
    records.sort_by(|a, b| {
        indicator
            .value(b)
            .partial_cmp(&indicator.value(a))
            .unwrap_or(Ordering::Equal)
    });
    Dataset::from_records(records)
}

/// The `n` records with the largest indicator values.
pub fn top_n(dataset: &Dataset, indicator: Indicator, n: usize) -> Dataset {
    sorted_by(dataset, indicator)
        .iter()
        .take(n)
        .cloned()
        .collect()
}
