use serde::Serialize;

use super::capitalize;
use crate::color::{to_hex, RegionPalette};
use crate::data::model::{Dataset, Indicator};

/// One neighbourhood on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpatialPoint {
    pub name: String,
    pub x_km: f64,
    pub y_km: f64,
    /// Raw indicator value, for hover text.
    pub value: f64,
    pub marker_size: f64,
}

/// All points of one region, drawn as one trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpatialSeries {
    pub region: String,
    /// Legend label.
    pub label: String,
    pub color: String,
    pub points: Vec<SpatialPoint>,
}

/// Group a view into per-region scatter series, alphabetically by region.
///
/// Marker sizes follow [`Indicator::marker_size`]. Build `palette` from the
/// full dataset so colours do not shift as filters change.
pub fn spatial_series(
    dataset: &Dataset,
    indicator: Indicator,
    palette: &RegionPalette,
) -> Vec<SpatialSeries> {
    dataset
        .regions()
        .iter()
        .map(|region| {
            let points = dataset
                .iter()
                .filter(|r| &r.region == region)
                .map(|r| {
                    let value = indicator.value(r);
                    SpatialPoint {
                        name: r.name.clone(),
                        x_km: r.x_km(),
                        y_km: r.y_km(),
                        value,
                        marker_size: indicator.marker_size(value),
                    }
                })
                .collect();
            SpatialSeries {
                region: region.clone(),
                label: capitalize(region),
                color: to_hex(palette.color_for(region)),
                points,
            }
        })
        .collect()
}
