//! GUI panels for the metasweep dashboard, plus the widgets they share.

pub mod geometry;
pub mod materials;
pub mod results;
pub mod sweep;

use egui::Ui;
use metasweep_core::view::{ColorRange, Colormap};
use metasweep_core::{Axis, AxisKind, ConfigurationError};

/// Number of colour levels a heat map is binned into.
pub const COLOUR_LEVELS: usize = 16;

/// An editable axis: `points` values from `min` to `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
    pub points: usize,
}

impl AxisRange {
    pub fn fixed(value: f64) -> Self {
        Self { min: value, max: value, points: 1 }
    }

    pub fn to_axis(&self, kind: AxisKind) -> Result<Axis, ConfigurationError> {
        Axis::linspace(kind, self.min, self.max, self.points)
    }

    pub fn ui(&mut self, ui: &mut Ui, label: &str) {
        ui.horizontal(|ui| {
            ui.label(label);
            ui.add(egui::DragValue::new(&mut self.min).speed(1.0).prefix("from "));
            ui.add_enabled(
                self.points > 1,
                egui::DragValue::new(&mut self.max).speed(1.0).prefix("to "),
            );
            ui.add(egui::DragValue::new(&mut self.points).range(0..=1000).suffix(" pts"));
        });
    }
}

/// Group positions by the colour level of their value within `range`.
pub fn heat_map_bins(
    samples: impl IntoIterator<Item = ([f64; 2], f64)>,
    range: ColorRange,
) -> Vec<Vec<[f64; 2]>> {
    let mut bins = vec![Vec::new(); COLOUR_LEVELS];
    for (position, value) in samples {
        let level = (range.normalize(value) * (COLOUR_LEVELS - 1) as f64).round() as usize;
        bins[level.min(COLOUR_LEVELS - 1)].push(position);
    }
    bins
}

pub fn level_colour(colormap: Colormap, level: usize) -> egui::Color32 {
    let [r, g, b] = colormap.sample(level as f64 / (COLOUR_LEVELS - 1) as f64);
    egui::Color32::from_rgb(r, g, b)
}

/// Draw binned samples as coloured points.
pub fn heat_map(
    ui: &mut Ui,
    id: &str,
    bins: &[Vec<[f64; 2]>],
    colormap: Colormap,
    labels: (&str, &str),
    equal_aspect: bool,
) {
    let mut plot = egui_plot::Plot::new(id)
        .height(350.0)
        .x_axis_label(labels.0)
        .y_axis_label(labels.1);
    if equal_aspect {
        plot = plot.data_aspect(1.0);
    }
    plot.show(ui, |plot_ui| {
        for (level, positions) in bins.iter().enumerate() {
            if positions.is_empty() {
                continue;
            }
            let points: egui_plot::PlotPoints = positions.iter().copied().collect();
            plot_ui.points(
                egui_plot::Points::new(points)
                    .radius(4.0)
                    .color(level_colour(colormap, level)),
            );
        }
    });
}
