use num_complex::Complex64;

use crate::data::error::InvalidParameterError;
use crate::data::filter::masked_indices;
use crate::data::model::{SParameterDataset, SampleInfo};
use crate::view::{Projection, ViewportConfig};

/// Half-width of the fixed Smith chart window (unit circle plus margin).
pub const SMITH_LIMIT: f64 = 1.1;

// ---------------------------------------------------------------------------
// Renderable series
// ---------------------------------------------------------------------------

/// One trace ready for drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSeries {
    pub trace: String,
    pub points: Vec<[f64; 2]>,
    /// Absolute dataset sample index of each entry in `points`.
    pub sample_indices: Vec<usize>,
}

/// Everything the drawing layer needs for one frame, plus the index mapping
/// that picks on this frame resolve through.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPlot {
    pub projection: Projection,
    pub series: Vec<RenderSeries>,
    pub x_window: Option<(f64, f64)>,
    pub y_window: Option<(f64, f64)>,
    pub equal_aspect: bool,
    pub x_label: &'static str,
    pub y_label: &'static str,
}

impl RenderedPlot {
    pub fn series(&self, trace: &str) -> Option<&RenderSeries> {
        self.series.iter().find(|s| s.trace == trace)
    }

    /// `(min, max)` corners to frame, or `None` for automatic bounds.
    ///
    /// Without a fixed y window the y range covers the points inside the x
    /// window, padded by 5% (1 unit when flat).
    pub fn view_bounds(&self) -> Option<([f64; 2], [f64; 2])> {
        let (x0, x1) = self.x_window?;
        let (y0, y1) = match self.y_window {
            Some(window) => window,
            None => {
                let (lo, hi) = self
                    .series
                    .iter()
                    .flat_map(|s| s.points.iter())
                    .filter(|p| x0 <= p[0] && p[0] <= x1 && p[1].is_finite())
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                        (lo.min(p[1]), hi.max(p[1]))
                    });
                if lo > hi {
                    (-1.0, 1.0)
                } else if lo == hi {
                    (lo - 1.0, hi + 1.0)
                } else {
                    let pad = (hi - lo) * 0.05;
                    (lo - pad, hi + pad)
                }
            }
        };
        Some(([x0, y0], [x1, y1]))
    }
}

/// Build the per-trace series for the config's projection.
///
/// Magnitude and phase keep every sample and only narrow the x window; the
/// Smith chart has no frequency axis, so out-of-window samples are masked out.
pub fn compute_render_series(
    dataset: &SParameterDataset,
    config: &ViewportConfig,
) -> Result<RenderedPlot, InvalidParameterError> {
    let projection = config.projection();
    let all: Vec<usize> = (0..dataset.sample_count()).collect();
    let indices = match projection {
        Projection::Smith => masked_indices(dataset.frequencies(), config),
        Projection::MagnitudeDb | Projection::PhaseDeg => all,
    };

    let mut series = Vec::new();
    for name in dataset.parameter_names() {
        if !config.is_trace_visible(name) {
            continue;
        }
        let (freqs, values) = match projection {
            Projection::MagnitudeDb => dataset.magnitude_db_series(name)?,
            Projection::PhaseDeg => dataset.phase_deg_series(name)?,
            Projection::Smith => {
                let (_, z) = dataset.complex_series(name)?;
                let points = indices.iter().map(|&k| [z[k].re, z[k].im]).collect();
                series.push(RenderSeries {
                    trace: name.clone(),
                    points,
                    sample_indices: indices.clone(),
                });
                continue;
            }
        };
        let points = indices.iter().map(|&k| [freqs[k], values[k]]).collect();
        series.push(RenderSeries {
            trace: name.clone(),
            points,
            sample_indices: indices.clone(),
        });
    }

    let (x_window, y_window, equal_aspect) = match projection {
        Projection::Smith => (
            Some((-SMITH_LIMIT, SMITH_LIMIT)),
            Some((-SMITH_LIMIT, SMITH_LIMIT)),
            true,
        ),
        _ => (config.frequency_filter(), None, false),
    };
    let (x_label, y_label) = match projection {
        Projection::MagnitudeDb => ("Frequency (Hz)", "Magnitude (dB)"),
        Projection::PhaseDeg => ("Frequency (Hz)", "Phase (deg)"),
        Projection::Smith => ("Re(S)", "Im(S)"),
    };

    Ok(RenderedPlot {
        projection,
        series,
        x_window,
        y_window,
        equal_aspect,
        x_label,
        y_label,
    })
}

// ---------------------------------------------------------------------------
// Picking
// ---------------------------------------------------------------------------

/// A rendered point selected by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct PickTarget {
    pub trace: String,
    pub point_index: usize,
}

/// Find the rendered point closest to `pointer` in screen space.
///
/// `pixels_per_unit` converts plot units to pixels on each axis; only points
/// within `radius_px` qualify. Ties go to the earlier series, then the earlier point.
pub fn hit_test(
    rendered: &RenderedPlot,
    pointer: [f64; 2],
    pixels_per_unit: [f64; 2],
    radius_px: f64,
) -> Option<PickTarget> {
    let mut best: Option<(f64, PickTarget)> = None;
    for series in &rendered.series {
        for (i, p) in series.points.iter().enumerate() {
            let dx = (p[0] - pointer[0]) * pixels_per_unit[0];
            let dy = (p[1] - pointer[1]) * pixels_per_unit[1];
            let dist = dx.hypot(dy);
            if !(dist <= radius_px) {
                continue;
            }
            if best.as_ref().map_or(true, |(d, _)| dist < *d) {
                best = Some((
                    dist,
                    PickTarget {
                        trace: series.trace.clone(),
                        point_index: i,
                    },
                ));
            }
        }
    }
    best.map(|(_, target)| target)
}

/// A resolved pick: where to anchor the annotation and the sample it shows.
#[derive(Debug, Clone, PartialEq)]
pub struct PickResult {
    pub trace: String,
    pub projection: Projection,
    pub anchor: [f64; 2],
    pub sample: SampleInfo,
}

impl PickResult {
    pub fn tooltip_text(&self) -> String {
        self.sample.tooltip_text(&self.trace, self.projection)
    }
}

/// Map a picked rendered point back to its dataset sample.
///
/// Resolution goes through the `sample_indices` captured when `rendered` was
/// built, so a config change between draw and pick cannot shift the result.
pub fn resolve_pick(
    dataset: &SParameterDataset,
    rendered: &RenderedPlot,
    target: &PickTarget,
) -> Result<PickResult, InvalidParameterError> {
    let series = rendered
        .series(&target.trace)
        .ok_or_else(|| InvalidParameterError::new(&target.trace, "trace is not in the rendered plot"))?;
    let (anchor, absolute) = series
        .points
        .get(target.point_index)
        .zip(series.sample_indices.get(target.point_index))
        .ok_or_else(|| {
            InvalidParameterError::new(
                &target.trace,
                format!("point {} is outside the rendered series", target.point_index),
            )
        })?;

    let frequency = match rendered.projection {
        // x already is the frequency
        Projection::MagnitudeDb | Projection::PhaseDeg => anchor[0],
        Projection::Smith => *dataset.frequencies().get(*absolute).ok_or_else(|| {
            InvalidParameterError::new(&target.trace, format!("sample {absolute} is not in the dataset"))
        })?,
    };
    let sample = dataset.nearest_sample(&target.trace, frequency)?;
    log::debug!(
        "Pick {}[{}] → sample {} at {} Hz",
        target.trace,
        target.point_index,
        sample.index,
        sample.frequency
    );

    Ok(PickResult {
        trace: target.trace.clone(),
        projection: rendered.projection,
        anchor: *anchor,
        sample,
    })
}

// ---------------------------------------------------------------------------
// Markers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub frequency_hz: f64,
    pub trace: String,
}

/// Append-only marker list owned by one tab.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerList {
    markers: Vec<Marker>,
}

impl MarkerList {
    /// No de-duplication: the same point clicked twice yields two markers.
    pub fn add(&mut self, trace: &str, frequency_hz: f64) {
        self.markers.push(Marker {
            frequency_hz,
            trace: trace.to_string(),
        });
    }

    pub fn clear(&mut self) {
        self.markers.clear();
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter()
    }
}

/// A marker placed in the current projection's coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerAnnotation {
    pub trace: String,
    pub position: [f64; 2],
    pub label: String,
}

/// Recompute marker positions for the current projection.
///
/// Markers on hidden traces are skipped (they reappear when the trace is
/// shown again); markers naming a trace this dataset does not have are
/// skipped with a warning.
pub fn marker_annotations(
    dataset: &SParameterDataset,
    config: &ViewportConfig,
    markers: &MarkerList,
) -> Vec<MarkerAnnotation> {
    markers
        .iter()
        .filter(|m| config.is_trace_visible(&m.trace))
        .filter_map(|m| match dataset.nearest_sample(&m.trace, m.frequency_hz) {
            Ok(sample) => Some(MarkerAnnotation {
                trace: m.trace.clone(),
                position: sample.position(config.projection()),
                label: format!("{} @ {:.3} GHz", m.trace, sample.frequency / 1e9),
            }),
            Err(e) => {
                log::warn!("Skipping stale marker: {e}");
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Smith chart grid
// ---------------------------------------------------------------------------

const GRID_RESISTANCES: [f64; 5] = [0.2, 0.5, 1.0, 2.0, 5.0];
const GRID_REACTANCES: [f64; 5] = [0.2, 0.5, 1.0, 2.0, 5.0];
const GRID_STEPS: usize = 128;

/// Polylines for the Smith chart background: unit circle, real axis,
/// constant-resistance circles and constant-reactance arcs (normalised).
pub fn smith_grid() -> Vec<Vec<[f64; 2]>> {
    let circle = |cx: f64, radius: f64| -> Vec<[f64; 2]> {
        (0..=GRID_STEPS)
            .map(|i| {
                let t = i as f64 / GRID_STEPS as f64 * std::f64::consts::TAU;
                [cx + radius * t.cos(), radius * t.sin()]
            })
            .collect()
    };
    // Γ = (z - 1) / (z + 1) along z = r + jx with r running 0 → ∞
    let reactance_arc = |x: f64| -> Vec<[f64; 2]> {
        let mut arc: Vec<[f64; 2]> = (0..GRID_STEPS)
            .map(|i| {
                let t = i as f64 / GRID_STEPS as f64;
                let z = Complex64::new(t / (1.0 - t), x);
                let gamma = (z - 1.0) / (z + 1.0);
                [gamma.re, gamma.im]
            })
            .collect();
        arc.push([1.0, 0.0]);
        arc
    };

    let mut lines = vec![circle(0.0, 1.0), vec![[-1.0, 0.0], [1.0, 0.0]]];
    lines.extend(GRID_RESISTANCES.iter().map(|&r| circle(r / (1.0 + r), 1.0 / (1.0 + r))));
    for &x in &GRID_REACTANCES {
        lines.push(reactance_arc(x));
        lines.push(reactance_arc(-x));
    }
    lines
}
