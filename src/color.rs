use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.45);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Zone colours
// ---------------------------------------------------------------------------

/// Maps each zone label to a distinct marker colour.
#[derive(Debug, Clone, Default)]
pub struct ZoneColors {
    mapping: BTreeMap<String, Color32>,
}

impl ZoneColors {
    pub fn new(zones: &BTreeSet<String>) -> Self {
        let mapping = zones
            .iter()
            .cloned()
            .zip(generate_palette(zones.len()))
            .collect();
        Self { mapping }
    }

    /// Colour for a zone; unknown zones are grey.
    pub fn color_for(&self, zone: &str) -> Color32 {
        self.mapping.get(zone).copied().unwrap_or(Color32::GRAY)
    }

    /// Legend entries (zone → colour) for the UI.
    pub fn legend_entries(&self) -> impl Iterator<Item = (&str, Color32)> {
        self.mapping.iter().map(|(z, c)| (z.as_str(), *c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_is_distinct() {
        let p = generate_palette(6);
        assert_eq!(p.len(), 6);
        let unique: BTreeSet<_> = p.iter().map(|c| c.to_array()).collect();
        assert_eq!(unique.len(), 6);
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn unknown_zone_is_grey() {
        let zones: BTreeSet<String> = ["Север".to_string(), "Юг".to_string()].into();
        let colors = ZoneColors::new(&zones);
        assert_ne!(colors.color_for("Север"), colors.color_for("Юг"));
        assert_eq!(colors.color_for("Запад"), Color32::GRAY);
        assert_eq!(colors.legend_entries().count(), 2);
    }
}
