//! Geometry panel: meta-atom kind, shape parameter ranges and a rasterised
//! preview of the unit cell.

use std::collections::BTreeMap;

use egui::Ui;
use metasweep_core::{Axis, AxisKind, ConfigurationError};
use metasweep_geometry::{GeometryError, GeometryKind, Shape, ShapeParameter, UnitCell};

use super::AxisRange;

const PREVIEW_RESOLUTION: usize = 80;

/// State for the geometry configuration panel.
#[derive(Debug)]
pub struct GeometryPanel {
    pub kind: GeometryKind,
    /// One range per parameter; only those of `kind` are used.
    pub ranges: BTreeMap<ShapeParameter, AxisRange>,
    /// Occupied sample positions of the last preview, and its period.
    preview: Option<(f64, Vec<[f64; 2]>)>,
    error_message: Option<String>,
}

impl Default for GeometryPanel {
    fn default() -> Self {
        let ranges = ShapeParameter::ALL
            .into_iter()
            .map(|p| {
                let default = match p {
                    ShapeParameter::Theta => 0.0,
                    ShapeParameter::HollowW | ShapeParameter::HollowR => 100.0,
                    _ => 200.0,
                };
                (p, AxisRange::fixed(default))
            })
            .collect();
        Self {
            kind: GeometryKind::Rectangle,
            ranges,
            preview: None,
            error_message: None,
        }
    }
}

impl GeometryPanel {
    /// Shape axes in the order the kind declares them.
    pub fn shape_axes(&self) -> Result<Vec<Axis>, ConfigurationError> {
        self.kind
            .parameters()
            .iter()
            .map(|&p| self.range(p).to_axis(AxisKind::Shape(p)))
            .collect()
    }

    /// The shape at the first value of every range.
    pub fn first_shape(&self) -> Result<Shape, GeometryError> {
        let values: Vec<f64> = self.kind.parameters().iter().map(|&p| self.range(p).min).collect();
        Shape::from_parameters(self.kind, &values)
    }

    fn range(&self, parameter: ShapeParameter) -> AxisRange {
        self.ranges.get(&parameter).copied().unwrap_or(AxisRange::fixed(0.0))
    }

    /// `period` is the lattice period used for the preview.
    pub fn ui(&mut self, ui: &mut Ui, period: f64) {
        ui.heading("Geometry");
        ui.separator();

        let previous = self.kind;
        ui.horizontal_wrapped(|ui| {
            ui.label("Meta-atom:");
            for kind in GeometryKind::ALL {
                ui.selectable_value(&mut self.kind, kind, kind.as_str());
            }
        });
        if previous != self.kind {
            self.preview = None;
        }

        ui.add_space(8.0);
        for &parameter in self.kind.parameters() {
            if let Some(range) = self.ranges.get_mut(&parameter) {
                range.ui(ui, parameter.label(self.kind));
            }
        }

        ui.add_space(8.0);
        if ui.button("Show structure").clicked() {
            self.refresh_preview(period);
        }

        if let Some(err) = &self.error_message {
            ui.colored_label(egui::Color32::RED, format!("Error: {err}"));
        }

        if let Some((period, occupied)) = &self.preview {
            let cell = UnitCell::with_resolution(*period, PREVIEW_RESOLUTION, PREVIEW_RESOLUTION);
            ui.label(format!(
                "Fill fraction: {:.3} (period {period} nm)",
                occupied.len() as f64 / (cell.nx * cell.ny) as f64
            ));
            let points: egui_plot::PlotPoints = occupied.iter().copied().collect();
            egui_plot::Plot::new("unit_cell_plot")
                .height(350.0)
                .data_aspect(1.0)
                .include_x(0.0)
                .include_x(*period)
                .include_y(0.0)
                .include_y(*period)
                .x_axis_label("x (nm)")
                .y_axis_label("y (nm)")
                .show(ui, |plot_ui| {
                    plot_ui.points(
                        egui_plot::Points::new(points)
                            .radius(2.0)
                            .color(egui::Color32::from_rgb(50, 120, 220)),
                    );
                });
        }
    }

    fn refresh_preview(&mut self, period: f64) {
        match self.first_shape() {
            Ok(shape) => {
                let cell = UnitCell::with_resolution(period, PREVIEW_RESOLUTION, PREVIEW_RESOLUTION);
                let (xs, ys) = (cell.x_axis(), cell.y_axis());
                let occupied = cell
                    .rasterise(&shape)
                    .indexed_iter()
                    .filter(|(_, v)| **v > 0.5)
                    .map(|((ix, iy), _)| [xs[ix], ys[iy]])
                    .collect();
                self.preview = Some((period, occupied));
                self.error_message = None;
            }
            Err(e) => {
                self.preview = None;
                self.error_message = Some(e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_axes_follow_the_kind() {
        let mut panel = GeometryPanel { kind: GeometryKind::HollowSquare, ..Default::default() };
        panel.ranges.insert(ShapeParameter::Wx, AxisRange { min: 200.0, max: 300.0, points: 2 });
        let axes = panel.shape_axes().unwrap();
        let kinds: Vec<AxisKind> = axes.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            [
                AxisKind::Shape(ShapeParameter::Wx),
                AxisKind::Shape(ShapeParameter::HollowW),
                AxisKind::Shape(ShapeParameter::Theta)
            ]
        );
        assert_eq!(axes[0].count(), 2);
    }

    #[test]
    fn test_preview_counts_occupied_samples() {
        let mut panel = GeometryPanel { kind: GeometryKind::Square, ..Default::default() };
        panel.refresh_preview(400.0);
        let (_, occupied) = panel.preview.as_ref().unwrap();
        // A 200 nm square in a 400 nm cell covers a quarter of it.
        assert_eq!(occupied.len(), PREVIEW_RESOLUTION * PREVIEW_RESOLUTION / 4);
    }
}
