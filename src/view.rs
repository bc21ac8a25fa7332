use std::collections::BTreeSet;
use std::fmt;

use crate::data::error::RangeError;
use crate::data::model::SParameterDataset;

// ---------------------------------------------------------------------------
// Projection – which plot is active
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Projection {
    #[default]
    MagnitudeDb,
    PhaseDeg,
    Smith,
}

impl Projection {
    pub const ALL: [Projection; 3] = [Projection::MagnitudeDb, Projection::PhaseDeg, Projection::Smith];
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Projection::MagnitudeDb => write!(f, "Magnitude (dB)"),
            Projection::PhaseDeg => write!(f, "Phase (deg)"),
            Projection::Smith => write!(f, "Smith Chart"),
        }
    }
}

// ---------------------------------------------------------------------------
// ViewportConfig – per-tab visualisation state
// ---------------------------------------------------------------------------

/// Visualisation state of one open tab. All mutation goes through the named
/// setters so each call site maps to exactly one redraw.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewportConfig {
    projection: Projection,
    /// Empty means "show all".
    visible_traces: BTreeSet<String>,
    /// 0 means unset; see [`ViewportConfig::frequency_filter`].
    freq_min: f64,
    freq_max: f64,
}

impl ViewportConfig {
    /// Defaults for a freshly opened dataset: magnitude view, every trace
    /// visible, bounds spanning the whole sweep.
    pub fn for_dataset(dataset: &SParameterDataset) -> Self {
        let (freq_min, freq_max) = dataset.frequency_span();
        Self {
            projection: Projection::MagnitudeDb,
            visible_traces: dataset.parameter_names().iter().cloned().collect(),
            freq_min,
            freq_max,
        }
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn visible_traces(&self) -> &BTreeSet<String> {
        &self.visible_traces
    }

    pub fn freq_min(&self) -> f64 {
        self.freq_min
    }

    pub fn freq_max(&self) -> f64 {
        self.freq_max
    }

    /// A trace is drawn when the visible set is empty or contains it.
    pub fn is_trace_visible(&self, name: &str) -> bool {
        self.visible_traces.is_empty() || self.visible_traces.contains(name)
    }

    /// Active bounds, only when `freq_min > 0 && freq_max > freq_min`.
    pub fn frequency_filter(&self) -> Option<(f64, f64)> {
        (self.freq_min > 0.0 && self.freq_max > self.freq_min).then_some((self.freq_min, self.freq_max))
    }

    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
    }

    pub fn set_trace_visible(&mut self, name: &str, visible: bool) {
        if visible {
            self.visible_traces.insert(name.to_string());
        } else {
            self.visible_traces.remove(name);
        }
    }

    pub fn show_all_traces(&mut self, names: &[String]) {
        self.visible_traces = names.iter().cloned().collect();
    }

    /// Clears the visible set, which by the empty-set rule renders everything.
    pub fn hide_all_traces(&mut self) {
        self.visible_traces.clear();
    }

    /// Replace both bounds. On error the config is left untouched.
    pub fn set_frequency_range(&mut self, min: f64, max: f64) -> Result<(), RangeError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(RangeError::NotFinite);
        }
        if min >= max {
            return Err(RangeError::Inverted);
        }
        if min < 0.0 {
            return Err(RangeError::Negative);
        }
        self.freq_min = min;
        self.freq_max = max;
        Ok(())
    }

    /// Parse the Min/Max text fields and apply them.
    pub fn parse_frequency_range(&mut self, min_text: &str, max_text: &str) -> Result<(), RangeError> {
        let parse = |s: &str| {
            s.trim()
                .parse::<f64>()
                .map_err(|_| RangeError::NotANumber(s.to_string()))
        };
        let min = parse(min_text)?;
        let max = parse(max_text)?;
        self.set_frequency_range(min, max)
    }
}
