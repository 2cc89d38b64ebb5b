//! Results panel: interactive slices of a sweep dataset, plus saving,
//! loading and CSV export.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use egui::Ui;
use metasweep_core::io::{export, load_dataset, save_dataset, PersistenceError};
use metasweep_core::view::{
    Colormap, ImageView, LineView, SliceViewer, View, PHASE_LABEL, TRANSMITTANCE_LABEL,
};
use metasweep_core::{PolarizationChannel, ResultDataset};

use super::{heat_map, heat_map_bins};

/// State for the results display panel.
#[derive(Debug)]
pub struct ResultsPanel {
    viewer: Option<SliceViewer>,
    /// Horizontal axis.
    x_axis: usize,
    /// Vertical axis; `None` shows a line.
    y_axis: Option<usize>,
    transmittance_text: (String, String),
    phase_text: (String, String),
    /// Stem of the `.npz`/`.mat` pair written by "Save dataset".
    pub save_path: String,
    pub load_path: String,
    pub csv_path: String,
    error_message: Option<String>,
    status: Option<String>,
}

impl Default for ResultsPanel {
    fn default() -> Self {
        Self {
            viewer: None,
            x_axis: 0,
            y_axis: None,
            transmittance_text: Default::default(),
            phase_text: Default::default(),
            save_path: "output/data_sheet".into(),
            load_path: "output/data_sheet.npz".into(),
            csv_path: "output/view.csv".into(),
            error_message: None,
            status: None,
        }
    }
}

impl ResultsPanel {
    /// Show `dataset`, starting from a line along its first axis. The
    /// channel, colormap and colour ranges carry over.
    pub fn set_dataset(&mut self, dataset: Arc<ResultDataset>) {
        match self.viewer.as_mut() {
            Some(viewer) => viewer.set_dataset(dataset),
            None => self.viewer = Some(SliceViewer::new(dataset)),
        }
        self.x_axis = 0;
        self.y_axis = None;
        self.error_message = None;
    }

    /// Apply the chosen free axes. A vertical axis equal to the horizontal
    /// one means a line.
    fn select_axes(&mut self, x: usize, y: Option<usize>) {
        let Some(viewer) = self.viewer.as_mut() else { return };
        let y = y.filter(|&y| y != x);
        match viewer.set_free_axes(x, y.unwrap_or(x)) {
            Ok(_) => {
                (self.x_axis, self.y_axis) = (x, y);
                self.error_message = None;
            }
            Err(e) => self.error_message = Some(e.to_string()),
        }
    }

    fn load(&mut self) {
        let path = self.load_path.trim().to_string();
        match load_dataset(Path::new(&path)) {
            Ok(dataset) => {
                self.set_dataset(Arc::new(dataset));
                self.status = Some(format!("Loaded {path}"));
            }
            Err(e) => self.error_message = Some(format!("Cannot load {path}: {e}")),
        }
    }

    fn save(&mut self) {
        let Some(viewer) = &self.viewer else { return };
        let stem = Path::new(self.save_path.trim());
        let result = create_parent(stem).and_then(|()| save_dataset(viewer.dataset(), stem));
        match result {
            Ok((npz, mat)) => {
                self.status = Some(format!("Saved {} and {}", npz.display(), mat.display()))
            }
            Err(e) => self.error_message = Some(e.to_string()),
        }
    }

    fn export_view(&mut self) {
        let Some(view) = self.viewer.as_ref().and_then(SliceViewer::view) else { return };
        let path = Path::new(self.csv_path.trim());
        let result = create_parent(path)
            .and_then(|()| Ok(File::create(path)?))
            .and_then(|file| export::write_view_csv(BufWriter::new(file), view));
        match result {
            Ok(()) => self.status = Some(format!("Slice written to {}", path.display())),
            Err(e) => self.error_message = Some(e.to_string()),
        }
    }

    pub fn ui(&mut self, ui: &mut Ui) {
        ui.heading("Results");
        ui.separator();

        ui.horizontal(|ui| {
            ui.label("Dataset file:");
            ui.text_edit_singleline(&mut self.load_path);
            if ui.button("Load").clicked() {
                self.load();
            }
        });

        if let Some(err) = &self.error_message {
            ui.colored_label(egui::Color32::RED, format!("Error: {err}"));
        }
        if let Some(status) = &self.status {
            ui.label(status);
        }

        if self.viewer.is_none() {
            ui.label("No results yet. Run a sweep or load a saved dataset.");
            return;
        }

        ui.add_space(8.0);
        self.axis_controls(ui);
        self.display_controls(ui);

        ui.add_space(8.0);
        if let Some(viewer) = &self.viewer {
            match viewer.view() {
                Some(View::Line(line)) => line_plots(ui, line, viewer),
                Some(View::Image(image)) => image_plots(ui, image, viewer),
                None => {
                    ui.label("Nothing to show for this selection.");
                }
            }
        }

        ui.add_space(8.0);
        ui.separator();
        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.save_path);
            if ui.button("Save dataset").clicked() {
                self.save();
            }
        });
        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.csv_path);
            if ui.button("Export view CSV").clicked() {
                self.export_view();
            }
        });
    }

    fn axis_controls(&mut self, ui: &mut Ui) {
        let Some(viewer) = &self.viewer else { return };
        let dataset = Arc::clone(viewer.dataset());
        let labels = dataset.labels();

        let (mut x, mut y) = (self.x_axis, self.y_axis);
        ui.horizontal(|ui| {
            egui::ComboBox::from_label("Horizontal")
                .selected_text(labels[x])
                .show_ui(ui, |ui| {
                    for (i, label) in labels.iter().enumerate() {
                        ui.selectable_value(&mut x, i, *label);
                    }
                });
            egui::ComboBox::from_label("Vertical")
                .selected_text(y.map_or("None (line)", |y| labels[y]))
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut y, None, "None (line)");
                    for (i, label) in labels.iter().enumerate() {
                        ui.selectable_value(&mut y, Some(i), *label);
                    }
                });
        });
        if (x, y) != (self.x_axis, self.y_axis) {
            self.select_axes(x, y);
        }

        for (axis, meta) in dataset.axes().iter().enumerate() {
            if axis == self.x_axis || Some(axis) == self.y_axis {
                continue;
            }
            let Some(viewer) = self.viewer.as_mut() else { return };
            let current = viewer.fixed_index(axis).unwrap_or(0);
            let mut index = current;
            let count = meta.count();
            ui.add(
                egui::Slider::new(&mut index, 0..=count - 1)
                    .show_value(false)
                    .text(format!(
                        "{}: {:.2}, {}/{count}",
                        labels[axis],
                        meta.values()[current],
                        current + 1
                    )),
            );
            if index != current {
                if let Err(e) = viewer.set_fixed_index(axis, index) {
                    self.error_message = Some(e.to_string());
                }
            }
        }
    }

    fn display_controls(&mut self, ui: &mut Ui) {
        let Some(viewer) = self.viewer.as_mut() else { return };
        let mut error = None;

        let mut channel = viewer.channel();
        ui.horizontal_wrapped(|ui| {
            ui.label("Channel:");
            for c in PolarizationChannel::ALL {
                ui.selectable_value(&mut channel, c, c.name());
            }
        });
        if channel != viewer.channel() {
            error = viewer.set_channel(channel).err().map(|e| e.to_string());
        }

        let mut colormap = viewer.colormap();
        egui::ComboBox::from_label("Colormap")
            .selected_text(colormap.name())
            .show_ui(ui, |ui| {
                for c in Colormap::ALL {
                    ui.selectable_value(&mut colormap, c, c.name());
                }
            });
        if colormap != viewer.colormap() {
            error = viewer.set_colormap(colormap.name()).err().map(|e| e.to_string());
        }

        let (t, p) = (&mut self.transmittance_text, &mut self.phase_text);
        let mut apply = false;
        ui.horizontal(|ui| {
            ui.label("Transmittance range:");
            ui.add(egui::TextEdit::singleline(&mut t.0).hint_text("0").desired_width(50.0));
            ui.add(egui::TextEdit::singleline(&mut t.1).hint_text("1").desired_width(50.0));
            ui.label("Phase range:");
            ui.add(egui::TextEdit::singleline(&mut p.0).hint_text("0").desired_width(50.0));
            ui.add(egui::TextEdit::singleline(&mut p.1).hint_text("2π").desired_width(50.0));
            apply = ui.button("Apply").clicked();
        });
        if apply {
            let result = viewer
                .set_transmittance_range_text(&t.0, &t.1)
                .and_then(|_| viewer.set_phase_range_text(&p.0, &p.1));
            if let Err(e) = result {
                error = Some(e.to_string());
            }
        }

        if error.is_some() {
            self.error_message = error;
        }
    }
}

fn create_parent(path: &Path) -> Result<(), PersistenceError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => Ok(std::fs::create_dir_all(dir)?),
        _ => Ok(()),
    }
}

fn line_plots(ui: &mut Ui, line: &LineView, viewer: &SliceViewer) {
    let (t_range, p_range) = (viewer.transmittance_range(), viewer.phase_range());
    let points = |ys: &[f64]| -> egui_plot::PlotPoints {
        line.x_values.iter().zip(ys).map(|(&x, &y)| [x, y]).collect()
    };

    for (id, values, range, y_label, colour) in [
        (
            "transmittance_plot",
            line.transmittance.as_slice(),
            t_range,
            TRANSMITTANCE_LABEL,
            egui::Color32::from_rgb(50, 120, 220),
        ),
        ("phase_plot", line.phase.as_slice(), p_range, PHASE_LABEL, egui::Color32::from_rgb(220, 100, 50)),
    ] {
        egui_plot::Plot::new(id)
            .height(250.0)
            .include_y(range.min)
            .include_y(range.max)
            .x_axis_label(line.x_label)
            .y_axis_label(y_label)
            .legend(egui_plot::Legend::default())
            .show(ui, |plot_ui| {
                plot_ui.line(
                    egui_plot::Line::new(points(values))
                        .name(line.channel.name())
                        .color(colour)
                        .width(2.0),
                );
            });
    }
}

fn image_plots(ui: &mut Ui, image: &ImageView, viewer: &SliceViewer) {
    let labels = (image.x_label, image.y_label);
    let colormap = viewer.colormap();
    for (title, id, phase, range) in [
        ("Transmittance", "transmittance_map", false, viewer.transmittance_range()),
        ("Phase", "phase_map", true, viewer.phase_range()),
    ] {
        ui.label(format!("{title} ({}), range {:.3} to {:.3}", image.channel, range.min, range.max));
        let bins = heat_map_bins(image_samples(image, phase), range);
        heat_map(ui, id, &bins, colormap, labels, false);
    }
}

/// `([x, y], value)` for every pixel of the transmittance or phase image.
fn image_samples(image: &ImageView, phase: bool) -> Vec<([f64; 2], f64)> {
    let values = if phase { &image.phase } else { &image.transmittance };
    values
        .indexed_iter()
        .map(|((row, col), &v)| ([image.x_values[col], image.y_values[row]], v))
        .collect()
}
