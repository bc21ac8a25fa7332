use std::collections::BTreeMap;

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
            let hsl = Hsl::new(hue, 0.75, 0.55);
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
// Trace colours: parameter name → Color32
// ---------------------------------------------------------------------------

/// Fixed colour per S-parameter, so a trace keeps its colour across
/// projections and visibility toggles.
#[derive(Debug, Clone)]
pub struct TraceColors {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl TraceColors {
    pub fn new(parameter_names: &[String]) -> Self {
        let palette = generate_palette(parameter_names.len());
        let mapping = parameter_names
            .iter()
            .cloned()
            .zip(palette)
            .collect();

        TraceColors {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    pub fn color_for(&self, trace: &str) -> Color32 {
        self.mapping
            .get(trace)
            .copied()
            .unwrap_or(self.default_color)
    }
}
