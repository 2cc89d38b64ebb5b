//! Materials panel: the layer stack, the material library and the
//! refractive index of the selected material.

use std::path::Path;

use egui::Ui;
use metasweep_core::LayerStack;
use metasweep_materials::{MaterialLibrary, MaterialProvider};

/// State for the materials configuration panel.
#[derive(Debug)]
pub struct MaterialsPanel {
    pub stack: LayerStack,
    pub library: MaterialLibrary,
    /// Directory of tabulated `*.txt` files to add to the library.
    pub material_dir: String,
    /// Material whose index is plotted.
    pub selected: String,
    status: Option<Result<String, String>>,
    /// Cached `[λ, n, k]` samples of `selected`.
    index_cache: Option<(String, Vec<[f64; 3]>)>,
}

impl Default for MaterialsPanel {
    fn default() -> Self {
        let stack = LayerStack::default();
        Self {
            selected: stack.metasurface_material.clone(),
            stack,
            library: MaterialLibrary::builtin(),
            material_dir: "Materials_data".into(),
            status: None,
            index_cache: None,
        }
    }
}

impl MaterialsPanel {
    pub fn ui(&mut self, ui: &mut Ui) {
        ui.heading("Materials");
        ui.separator();

        ui.label("Layer stack (light enters from the substrate):");
        egui::Grid::new("stack_grid").num_columns(3).spacing([12.0, 4.0]).show(ui, |ui| {
            layer_row(ui, "Output", &mut self.stack.output, None);
            layer_row(
                ui,
                "Filling / cap",
                &mut self.stack.filling_material,
                Some(&mut self.stack.filling_thickness),
            );
            layer_row(ui, "Metasurface", &mut self.stack.metasurface_material, None);
            layer_row(
                ui,
                "Slab",
                &mut self.stack.slab_material,
                Some(&mut self.stack.slab_thickness),
            );
            layer_row(ui, "Substrate", &mut self.stack.substrate, None);
        });

        let missing: Vec<&str> = self
            .stack
            .materials()
            .into_iter()
            .map(|(_, name)| name)
            .filter(|name| !self.library.contains(name))
            .collect();
        if !missing.is_empty() {
            ui.colored_label(
                egui::Color32::from_rgb(220, 150, 30),
                format!("Not in the library: {}", missing.join(", ")),
            );
        }

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.label("Material directory:");
            ui.text_edit_singleline(&mut self.material_dir);
            if ui.button("Load").clicked() {
                self.load_directory();
            }
        });
        match &self.status {
            Some(Ok(msg)) => {
                ui.colored_label(egui::Color32::GREEN, msg);
            }
            Some(Err(msg)) => {
                ui.colored_label(egui::Color32::RED, msg);
            }
            None => {}
        }

        ui.add_space(8.0);
        let previous = self.selected.clone();
        ui.horizontal_wrapped(|ui| {
            ui.label("Library:");
            for name in self.library.names() {
                ui.selectable_value(&mut self.selected, name.to_string(), name);
            }
        });
        if previous != self.selected {
            self.index_cache = None;
        }

        if self.index_cache.is_none() {
            if let Ok(material) = self.library.get(&self.selected) {
                self.index_cache =
                    Some((self.selected.clone(), sample_index(material.as_ref(), 350)));
            }
        }

        if let Some((name, data)) = &self.index_cache {
            if let Ok(material) = self.library.get(name) {
                let (min, max) = material.wavelength_range();
                ui.label(format!("{name}: data from {min:.0} to {max:.0} nm"));
            }

            let n_points: egui_plot::PlotPoints = data.iter().map(|d| [d[0], d[1]]).collect();
            let k_points: egui_plot::PlotPoints = data.iter().map(|d| [d[0], d[2]]).collect();

            egui_plot::Plot::new("index_plot")
                .height(250.0)
                .x_axis_label("Wavelength (nm)")
                .y_axis_label("Refractive index")
                .legend(egui_plot::Legend::default())
                .show(ui, |plot_ui| {
                    plot_ui.line(
                        egui_plot::Line::new(n_points)
                            .name("n")
                            .color(egui::Color32::from_rgb(50, 120, 220))
                            .width(2.0),
                    );
                    plot_ui.line(
                        egui_plot::Line::new(k_points)
                            .name("k")
                            .color(egui::Color32::from_rgb(220, 100, 50))
                            .width(2.0),
                    );
                });
        }
    }

    fn load_directory(&mut self) {
        let dir = self.material_dir.trim();
        self.status = Some(
            self.library
                .load_directory(Path::new(dir))
                .map(|count| format!("Loaded {count} material file(s) from {dir}"))
                .map_err(|e| e.to_string()),
        );
        self.index_cache = None;
    }
}

fn layer_row(ui: &mut Ui, role: &str, material: &mut String, thickness: Option<&mut f64>) {
    ui.label(role);
    ui.add(egui::TextEdit::singleline(material).desired_width(120.0));
    match thickness {
        Some(t) => {
            ui.add(egui::DragValue::new(t).speed(1.0).range(0.0..=10_000.0).suffix(" nm"));
        }
        None => {
            ui.label("");
        }
    }
    ui.end_row();
}

/// `[λ, n, k]` at `count` evenly spaced wavelengths across the material's
/// data range. Wavelengths the material rejects are skipped.
fn sample_index(material: &dyn MaterialProvider, count: usize) -> Vec<[f64; 3]> {
    let (start, end) = material.wavelength_range();
    let count = count.max(2);
    (0..count)
        .map(|i| start + (end - start) * i as f64 / (count - 1) as f64)
        .filter_map(|wl| material.refractive_index(wl).ok().map(|n| [wl, n.re, n.im]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_index_spans_the_data_range() {
        let library = MaterialLibrary::builtin();
        let si = library.get("Si").unwrap();
        let data = sample_index(si.as_ref(), 50);
        assert_eq!(data.len(), 50);
        assert_eq!(data[0][0], 400.0);
        assert_eq!(data[49][0], 1600.0);
        assert!(data.iter().all(|d| d[1] > 3.0));
    }

    #[test]
    fn test_missing_directory_reports_an_error() {
        let mut panel = MaterialsPanel {
            material_dir: "/definitely/not/here".into(),
            ..Default::default()
        };
        panel.load_directory();
        assert!(matches!(panel.status, Some(Err(_))));
        assert_eq!(panel.library.len(), 3);
    }
}
