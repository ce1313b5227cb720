use serde::Serialize;

use crate::color::{to_hex, RegionPalette};
use crate::data::filter::sorted_by;
use crate::data::model::{Dataset, Indicator};
use crate::data::stats::RegionStats;

/// One bar of the per-neighbourhood chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub label: String,
    pub region: String,
    pub value: f64,
    pub color: String,
}

/// Bars per neighbourhood, tallest first, coloured by region.
pub fn neighborhood_bars(dataset: &Dataset, indicator: Indicator, palette: &RegionPalette) -> Vec<Bar> {
    sorted_by(dataset, indicator)
        .iter()
        .map(|r| Bar {
            label: r.name.clone(),
            region: r.region.clone(),
            value: indicator.value(r),
            color: to_hex(palette.color_for(&r.region)),
        })
        .collect()
}

/// Bars of the regional mean, in the order of `stats`.
pub fn region_mean_bars(stats: &[RegionStats], palette: &RegionPalette) -> Vec<Bar> {
    stats
        .iter()
        .map(|s| Bar {
            label: super::capitalize(&s.region),
            region: s.region.clone(),
            value: s.mean,
            color: to_hex(palette.color_for(&s.region)),
        })
        .collect()
}
