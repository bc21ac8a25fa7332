use std::path::Path;

use crate::color::TraceColors;
use crate::data::error::{InvalidParameterError, RangeError};
use crate::data::loader::load_file;
use crate::data::model::SParameterDataset;
use crate::render::{
    MarkerAnnotation, MarkerList, PickResult, PickTarget, RenderedPlot, compute_render_series,
    marker_annotations, resolve_pick,
};
use crate::view::{Projection, ViewportConfig};

// ---------------------------------------------------------------------------
// One open file
// ---------------------------------------------------------------------------

/// Everything owned by a single tab. Nothing here is shared between tabs.
pub struct FileTab {
    pub dataset: SParameterDataset,
    pub config: ViewportConfig,
    pub markers: MarkerList,

    /// Series produced by the most recent redraw (cached for picking).
    pub rendered: Option<RenderedPlot>,

    /// Point selected by the last click, shown as an annotation.
    pub selection: Option<PickResult>,

    /// Set by every recompute; the plot re-frames its bounds once and clears it.
    pub reset_bounds: bool,

    /// Contents of the Min/Max text fields (applied on demand).
    pub freq_min_text: String,
    pub freq_max_text: String,

    pub colors: TraceColors,

    /// Why the last recompute produced nothing, until the status line takes it.
    pub render_error: Option<String>,
}

impl FileTab {
    pub fn new(dataset: SParameterDataset) -> Self {
        let config = ViewportConfig::for_dataset(&dataset);
        let colors = TraceColors::new(dataset.parameter_names());
        let mut tab = Self {
            freq_min_text: config.freq_min().to_string(),
            freq_max_text: config.freq_max().to_string(),
            dataset,
            config,
            markers: MarkerList::default(),
            rendered: None,
            selection: None,
            reset_bounds: true,
            colors,
            render_error: None,
        };
        tab.refresh();
        tab
    }

    /// Recompute the rendered series from (dataset, config).
    pub fn refresh(&mut self) {
        self.selection = None;
        self.reset_bounds = true;
        self.rendered = match compute_render_series(&self.dataset, &self.config) {
            Ok(plot) => {
                self.render_error = None;
                Some(plot)
            }
            Err(e) => {
                log::error!("Failed to render {}: {e}", self.dataset.filename);
                self.render_error = Some(format!("Cannot plot {}: {e}", self.dataset.filename));
                None
            }
        };
    }

    pub fn set_projection(&mut self, projection: Projection) {
        if self.config.projection() != projection {
            log::info!("{}: projection → {projection}", self.dataset.filename);
            self.config.set_projection(projection);
            self.refresh();
        }
    }

    pub fn set_trace_visible(&mut self, trace: &str, visible: bool) {
        self.config.set_trace_visible(trace, visible);
        self.refresh();
    }

    pub fn show_all_traces(&mut self) {
        self.config.show_all_traces(self.dataset.parameter_names());
        self.refresh();
    }

    pub fn hide_all_traces(&mut self) {
        self.config.hide_all_traces();
        self.refresh();
    }

    /// Apply the Min/Max text fields. On error the fields are reset to the
    /// current config values and the config is unchanged.
    pub fn apply_frequency_text(&mut self) -> Result<(), RangeError> {
        match self
            .config
            .parse_frequency_range(&self.freq_min_text, &self.freq_max_text)
        {
            Ok(()) => {
                log::info!(
                    "{}: frequency range {} – {} Hz",
                    self.dataset.filename,
                    self.config.freq_min(),
                    self.config.freq_max()
                );
                self.refresh();
                Ok(())
            }
            Err(e) => {
                log::warn!("Rejected frequency range: {e}");
                self.freq_min_text = self.config.freq_min().to_string();
                self.freq_max_text = self.config.freq_max().to_string();
                Err(e)
            }
        }
    }

    /// Resolve a click on the last rendered frame: show it and drop a marker.
    pub fn select(&mut self, target: &PickTarget) -> Result<(), InvalidParameterError> {
        let rendered = self
            .rendered
            .as_ref()
            .ok_or_else(|| InvalidParameterError::new(&target.trace, "nothing rendered yet"))?;
        let pick = resolve_pick(&self.dataset, rendered, target)?;
        self.markers.add(&pick.trace, pick.sample.frequency);
        log::info!(
            "Marker {} at {} Hz ({} total)",
            pick.trace,
            pick.sample.frequency,
            self.markers.len()
        );
        self.selection = Some(pick);
        Ok(())
    }

    pub fn clear_markers(&mut self) {
        self.markers.clear();
        self.selection = None;
        log::info!("{}: markers cleared", self.dataset.filename);
    }

    pub fn marker_annotations(&self) -> Vec<MarkerAnnotation> {
        marker_annotations(&self.dataset, &self.config, &self.markers)
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
#[derive(Default)]
pub struct AppState {
    /// Open files, one tab each.
    pub tabs: Vec<FileTab>,

    /// Index into `tabs` of the tab being shown.
    pub active: usize,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    /// Load `path` into a new tab. Failures leave the existing tabs untouched.
    pub fn open_path(&mut self, path: &Path) {
        match load_file(path) {
            Ok(dataset) => {
                log::info!(
                    "Loaded {}: {} port(s), {} samples",
                    dataset.filename,
                    dataset.port_count(),
                    dataset.sample_count()
                );
                self.tabs.push(FileTab::new(dataset));
                self.active = self.tabs.len() - 1;
                self.status_message = None;
                self.surface_render_error();
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    pub fn close_tab(&mut self, index: usize) {
        if index >= self.tabs.len() {
            return;
        }
        let tab = self.tabs.remove(index);
        log::info!("Closed {}", tab.dataset.filename);
        if self.active > index || self.active >= self.tabs.len() {
            self.active = self.active.saturating_sub(1);
        }
    }

    /// Move the active tab's pending render failure onto the status line.
    pub fn surface_render_error(&mut self) {
        if let Some(msg) = self.tabs.get_mut(self.active).and_then(|t| t.render_error.take()) {
            self.status_message = Some(msg);
        }
    }

    pub fn active_tab(&self) -> Option<&FileTab> {
        self.tabs.get(self.active)
    }

    pub fn active_tab_mut(&mut self) -> Option<&mut FileTab> {
        self.tabs.get_mut(self.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::two_port_dataset;

    fn state_with_tabs(n: usize) -> AppState {
        AppState {
            tabs: (0..n).map(|_| FileTab::new(two_port_dataset())).collect(),
            active: 0,
            status_message: None,
        }
    }

    #[test]
    fn new_tab_is_rendered_with_defaults() {
        let tab = FileTab::new(two_port_dataset());
        assert_eq!(tab.config.projection(), Projection::MagnitudeDb);
        assert_eq!(tab.freq_min_text, "1000000000");
        assert_eq!(tab.rendered.as_ref().unwrap().series.len(), 4);
        assert!(tab.markers.is_empty());
    }

    #[test]
    fn bad_frequency_text_is_rolled_back() {
        let mut tab = FileTab::new(two_port_dataset());
        tab.freq_min_text = "3e9".to_string();
        tab.freq_max_text = "1e9".to_string();
        assert_eq!(tab.apply_frequency_text(), Err(RangeError::Inverted));
        assert_eq!(tab.freq_min_text, "1000000000");
        assert_eq!(tab.config.freq_max(), 3e9);

        tab.freq_min_text = "1.5e9".to_string();
        tab.freq_max_text = "2.5e9".to_string();
        tab.set_projection(Projection::Smith);
        tab.apply_frequency_text().unwrap();
        assert_eq!(tab.rendered.as_ref().unwrap().series[0].points.len(), 1);
    }

    #[test]
    fn select_adds_marker_and_selection() {
        let mut tab = FileTab::new(two_port_dataset());
        tab.set_projection(Projection::PhaseDeg);
        let target = PickTarget {
            trace: "S21".to_string(),
            point_index: 1,
        };
        tab.select(&target).unwrap();
        tab.select(&target).unwrap();
        assert_eq!(tab.markers.len(), 2);
        assert_eq!(tab.selection.as_ref().unwrap().sample.frequency, 2e9);

        let bad = PickTarget {
            trace: "S77".to_string(),
            point_index: 0,
        };
        assert!(tab.select(&bad).is_err());
        assert_eq!(tab.markers.len(), 2);

        tab.clear_markers();
        tab.clear_markers();
        assert!(tab.markers.is_empty());
        assert!(tab.selection.is_none());
    }

    #[test]
    fn toggling_traces_rerenders() {
        let mut tab = FileTab::new(two_port_dataset());
        tab.set_trace_visible("S11", false);
        assert_eq!(tab.rendered.as_ref().unwrap().series.len(), 3);
        tab.hide_all_traces();
        assert_eq!(tab.rendered.as_ref().unwrap().series.len(), 4);
        tab.set_trace_visible("S22", true);
        assert_eq!(tab.rendered.as_ref().unwrap().series.len(), 1);
        tab.show_all_traces();
        assert_eq!(tab.config.visible_traces().len(), 4);
    }

    #[test]
    fn closing_tabs_keeps_active_in_range() {
        let mut state = state_with_tabs(3);
        state.active = 2;
        state.close_tab(2);
        assert_eq!(state.active, 1);
        state.close_tab(0);
        assert_eq!(state.active, 0);
        state.close_tab(5);
        assert_eq!(state.tabs.len(), 1);
        state.close_tab(0);
        assert!(state.active_tab().is_none());
    }

    #[test]
    fn render_failure_reaches_status_line() {
        use crate::data::model::NetworkMeasurement;
        use num_complex::Complex64;
        use std::path::PathBuf;

        let network =
            NetworkMeasurement::new(vec![1e9], 10, vec![Complex64::new(0.0, 0.0); 100]).unwrap();
        let dataset = SParameterDataset::new(network, "big.s10p", &PathBuf::from("/tmp/big.s10p"));
        let tab = FileTab::new(dataset);
        assert!(tab.rendered.is_none());

        let mut state = AppState {
            tabs: vec![tab],
            active: 0,
            status_message: None,
        };
        state.surface_render_error();
        let msg = state.status_message.clone().unwrap();
        assert!(msg.contains("S110"), "{msg}");
        assert!(state.tabs[0].render_error.is_none());

        state.status_message = None;
        state.surface_render_error();
        assert!(state.status_message.is_none());
    }

    #[test]
    fn failed_open_reports_and_keeps_tabs() {
        let mut state = state_with_tabs(1);
        state.open_path(Path::new("/no/such/file.s2p"));
        assert_eq!(state.tabs.len(), 1);
        assert!(state.status_message.as_deref().unwrap().contains("File not found"));
    }
}
