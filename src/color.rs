use std::collections::{BTreeMap, BTreeSet};

use palette::{Hsl, IntoColor, Srgb};

/// 8-bit sRGB colour.
pub type Rgb = Srgb<u8>;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Rgb> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            rgb.into_format::<u8>()
        })
        .collect()
}

/// `#rrggbb` form, as chart libraries expect.
pub fn to_hex(color: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

/// Colours the dashboards always use for the four city regions.
fn fixed_color(region: &str) -> Option<Rgb> {
    match region {
        "norte" => Some(Srgb::new(0, 0, 255)),
        "sul" => Some(Srgb::new(0, 128, 0)),
        "leste" => Some(Srgb::new(255, 165, 0)),
        "oeste" => Some(Srgb::new(255, 0, 0)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Region → colour mapping
// ---------------------------------------------------------------------------

/// Maps region labels to colours: fixed ones for the known regions, generated
/// hues for anything else.
#[derive(Debug, Clone)]
pub struct RegionPalette {
    mapping: BTreeMap<String, Rgb>,
    default_color: Rgb,
}

impl RegionPalette {
    pub fn new(regions: &BTreeSet<String>) -> Self {
        let unknown: Vec<&String> = regions
            .iter()
            .filter(|r| fixed_color(r).is_none())
            .collect();
        let generated = generate_palette(unknown.len());

        let mut mapping: BTreeMap<String, Rgb> = regions
            .iter()
            .filter_map(|r| fixed_color(r).map(|c| (r.clone(), c)))
            .collect();
        mapping.extend(unknown.into_iter().cloned().zip(generated));

        RegionPalette {
            mapping,
            default_color: Srgb::new(128, 128, 128),
        }
    }

    /// Look up the colour for a region; gray when unmapped.
    pub fn color_for(&self, region: &str) -> Rgb {
        self.mapping
            .get(region)
            .copied()
            .unwrap_or(self.default_color)
    }

    /// Return the legend entries (region → colour), alphabetically.
    pub fn legend_entries(&self) -> Vec<(String, Rgb)> {
        self.mapping
            .iter()
            .map(|(r, c)| (r.clone(), *c))
            .collect()
    }
}
