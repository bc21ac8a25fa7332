use eframe::egui::{Align2, Color32, Ui};
use egui_plot::{Legend, Line, MarkerShape, Plot, PlotBounds, PlotPoint, PlotPoints, Points, Text};

use crate::data::error::InvalidParameterError;
use crate::render::{hit_test, resolve_pick, smith_grid};
use crate::state::FileTab;
use crate::view::Projection;

/// How close (in pixels) a click must land to a rendered sample.
pub const PICK_RADIUS_PX: f64 = 8.0;

// ---------------------------------------------------------------------------
// S-parameter plot (central panel)
// ---------------------------------------------------------------------------

/// Render the active tab's plot and handle point picking.
///
/// Primary click on a sample selects it and adds a marker, secondary click
/// clears all markers, hovering shows the sample without changing anything.
pub fn sparam_plot(ui: &mut Ui, tab: &mut FileTab) -> Result<(), InvalidParameterError> {
    let Some(rendered) = tab.rendered.clone() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.label("Nothing to plot.");
        });
        return Ok(());
    };

    let annotations = tab.marker_annotations();
    let selection = tab.selection.clone();
    let reset = std::mem::take(&mut tab.reset_bounds);
    let bounds = rendered.view_bounds();
    let colors = tab.colors.clone();

    let mut plot = Plot::new(("sparam_plot", &tab.dataset.filepath, rendered.projection))
        .legend(Legend::default())
        .x_axis_label(rendered.x_label)
        .y_axis_label(rendered.y_label)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true);
    if rendered.equal_aspect {
        plot = plot.data_aspect(1.0);
    }
    if reset {
        plot = plot.reset();
    }

    let response = plot.show(ui, |plot_ui| {
        if rendered.projection == Projection::Smith {
            for line in smith_grid() {
                plot_ui.line(
                    Line::new(PlotPoints::from(line))
                        .color(Color32::from_gray(90))
                        .width(0.5),
                );
            }
        }

        if reset {
            if let Some((min, max)) = bounds {
                plot_ui.set_plot_bounds(PlotBounds::from_min_max(min, max));
            }
        }

        for series in &rendered.series {
            let points: PlotPoints = series.points.iter().copied().collect();
            let line = Line::new(points)
                .name(&series.trace)
                .color(colors.color_for(&series.trace))
                .width(1.5);
            plot_ui.line(line);
        }

        for ann in &annotations {
            plot_ui.points(
                Points::new(vec![ann.position])
                    .color(colors.color_for(&ann.trace))
                    .radius(4.0)
                    .shape(MarkerShape::Diamond),
            );
            plot_ui.text(
                Text::new(PlotPoint::new(ann.position[0], ann.position[1]), ann.label.clone())
                    .color(colors.color_for(&ann.trace))
                    .anchor(Align2::LEFT_BOTTOM),
            );
        }

        if let Some(sel) = &selection {
            plot_ui.points(
                Points::new(vec![sel.anchor])
                    .color(Color32::WHITE)
                    .radius(6.0)
                    .filled(false),
            );
            plot_ui.text(
                Text::new(PlotPoint::new(sel.anchor[0], sel.anchor[1]), sel.tooltip_text())
                    .anchor(Align2::LEFT_TOP),
            );
        }
    });

    // Map the pointer back onto the frame that was just drawn.
    let dvalue = response.transform.dvalue_dpos();
    let pixels_per_unit = [1.0 / dvalue[0].abs(), 1.0 / dvalue[1].abs()];
    let hit = response.response.hover_pos().and_then(|pos| {
        let value = response.transform.value_from_position(pos);
        hit_test(&rendered, [value.x, value.y], pixels_per_unit, PICK_RADIUS_PX)
    });

    if response.response.secondary_clicked() {
        tab.clear_markers();
    } else if response.response.clicked() {
        if let Some(target) = &hit {
            tab.select(target)?;
        }
    }

    if let Some(target) = hit {
        let pick = resolve_pick(&tab.dataset, &rendered, &target)?;
        response.response.on_hover_text(pick.tooltip_text());
    }
    Ok(())
}
