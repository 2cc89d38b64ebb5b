//! Sweep panel: the fixed axes, solver settings and run controls.
//!
//! The sweep runs on the UI thread. Every frame [`SweepPanel::poll`] advances
//! it by as many grid points as fit in a short time slice, so the window
//! keeps repainting and the pause and cancel buttons act between points.

use std::time::{Duration, Instant};

use egui::Ui;
use metasweep_core::scan::DEFAULT_HARMONIC_ORDER;
use metasweep_core::solver::EffectiveMediumSolver;
use metasweep_core::{
    Axis, AxisKind, ConfigurationError, Device, LayerStack, ResultDataset, ScanSpec, Sweep,
    SweepStep,
};
use metasweep_geometry::unit_cell::DEFAULT_RESOLUTION;
use metasweep_geometry::GeometryKind;

use super::AxisRange;

const FRAME_BUDGET: Duration = Duration::from_millis(15);

/// State for the sweep configuration panel.
pub struct SweepPanel {
    pub wavelength: AxisRange,
    pub period: AxisRange,
    pub thickness: AxisRange,
    pub harmonic_order: usize,
    /// `cpu` or `cuda:N`.
    pub device: String,
    /// Unit-cell sampling of the built-in solver.
    pub resolution: usize,
    /// Set to true by the UI when the user clicks "Run".
    pub launch_requested: bool,
    pub error_message: Option<String>,
    sweep: Option<Sweep<EffectiveMediumSolver>>,
    progress: u8,
    status: Option<String>,
}

impl Default for SweepPanel {
    fn default() -> Self {
        Self {
            wavelength: AxisRange::fixed(940.0),
            period: AxisRange::fixed(500.0),
            thickness: AxisRange::fixed(500.0),
            harmonic_order: DEFAULT_HARMONIC_ORDER,
            device: "cpu".into(),
            resolution: DEFAULT_RESOLUTION,
            launch_requested: false,
            error_message: None,
            sweep: None,
            progress: 0,
            status: None,
        }
    }
}

impl SweepPanel {
    /// Combine the fixed axes and solver settings with `shape_axes`.
    pub fn scan_spec(
        &self,
        geometry: GeometryKind,
        shape_axes: Vec<Axis>,
        stack: LayerStack,
    ) -> Result<ScanSpec, ConfigurationError> {
        let spec = ScanSpec::new(
            geometry,
            self.wavelength.to_axis(AxisKind::Wavelength)?,
            self.period.to_axis(AxisKind::Period)?,
            self.thickness.to_axis(AxisKind::Thickness)?,
            shape_axes,
        )
        .with_stack(stack)
        .with_harmonic_order(self.harmonic_order)
        .with_device(self.device.parse::<Device>()?);
        spec.validate()?;
        Ok(spec)
    }

    pub fn is_active(&self) -> bool {
        self.sweep.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.sweep.as_ref().is_some_and(|s| s.handle().is_paused())
    }

    /// Replace any current sweep with a new one.
    pub fn start(&mut self, spec: ScanSpec, solver: EffectiveMediumSolver) {
        if let Some(old) = self.sweep.take() {
            old.handle().cancel();
        }
        match Sweep::new(spec, solver) {
            Ok(sweep) => {
                self.status = Some(format!("Sweeping {} points", sweep.total_points()));
                self.error_message = None;
                self.progress = 0;
                self.sweep = Some(sweep);
            }
            Err(e) => self.error_message = Some(e.to_string()),
        }
    }

    /// Advance the current sweep. Returns the dataset once it finishes.
    pub fn poll(&mut self) -> Option<ResultDataset> {
        let sweep = self.sweep.as_mut()?;
        let started = Instant::now();
        let outcome = loop {
            match sweep.step() {
                Ok(SweepStep::Computed { progress, .. }) => {
                    self.progress = progress;
                    if started.elapsed() >= FRAME_BUDGET {
                        return None;
                    }
                }
                Ok(SweepStep::Paused) => return None,
                Ok(SweepStep::Finished(dataset)) => break Some(dataset),
                Ok(SweepStep::Cancelled) => {
                    self.status = Some("Sweep cancelled".into());
                    break None;
                }
                Err(e) => {
                    log::error!("{e}");
                    self.error_message = Some(e.to_string());
                    self.status = None;
                    break None;
                }
            }
        };
        self.sweep = None;
        if outcome.is_some() {
            self.status = Some("Sweep finished".into());
        }
        outcome
    }

    pub fn ui(&mut self, ui: &mut Ui) {
        ui.heading("Sweep");
        ui.separator();

        ui.add_enabled_ui(!self.is_active(), |ui| {
            self.wavelength.ui(ui, "Wavelength (nm)");
            self.period.ui(ui, "Period (nm)");
            self.thickness.ui(ui, "Thickness (nm)");

            ui.add_space(8.0);
            ui.horizontal(|ui| {
                ui.label("Harmonic order:");
                ui.add(egui::DragValue::new(&mut self.harmonic_order).range(1..=50));
                ui.label("Device:");
                ui.add(egui::TextEdit::singleline(&mut self.device).desired_width(60.0));
                ui.label("Resolution:");
                ui.add(egui::DragValue::new(&mut self.resolution).range(8..=1000));
            });
        });

        ui.add_space(16.0);
        ui.separator();

        if let Some(err) = &self.error_message {
            ui.colored_label(egui::Color32::RED, format!("Error: {err}"));
            ui.add_space(4.0);
        }
        if let Some(status) = &self.status {
            ui.label(status);
        }

        match &self.sweep {
            Some(sweep) => {
                let handle = sweep.handle();
                let label = if handle.is_paused() { "Paused" } else { "Running..." };
                ui.add(
                    egui::ProgressBar::new(f32::from(self.progress) / 100.0)
                        .text(format!("{label} {}%", self.progress)),
                );
                ui.horizontal(|ui| {
                    if handle.is_paused() {
                        if ui.button("Continue").clicked() {
                            handle.resume();
                        }
                    } else if ui.button("Pause").clicked() {
                        handle.pause();
                    }
                    if ui.button("Cancel").clicked() {
                        handle.cancel();
                    }
                });
            }
            None => {
                if ui.button("Run Sweep").clicked() {
                    self.error_message = None;
                    self.launch_requested = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metasweep_geometry::ShapeParameter;
    use metasweep_materials::MaterialLibrary;

    fn circle_spec(panel: &SweepPanel) -> ScanSpec {
        let r = Axis::from_values(AxisKind::Shape(ShapeParameter::R), vec![100.0, 150.0]).unwrap();
        panel
            .scan_spec(GeometryKind::Circle, vec![r], Default::default())
            .unwrap()
    }

    fn solver() -> EffectiveMediumSolver {
        EffectiveMediumSolver::with_resolution(MaterialLibrary::builtin(), 16)
    }

    #[test]
    fn test_poll_runs_to_completion() {
        let mut panel = SweepPanel::default();
        let spec = circle_spec(&panel);
        panel.start(spec, solver());
        assert!(panel.is_active());

        let mut dataset = None;
        for _ in 0..100 {
            if let Some(ds) = panel.poll() {
                dataset = Some(ds);
                break;
            }
        }
        let dataset = dataset.unwrap();
        assert_eq!(dataset.transmittance().shape(), &[1, 1, 1, 2, 8]);
        assert!(!panel.is_active());
        assert_eq!(panel.progress, 100);
    }

    #[test]
    fn test_paused_poll_makes_no_progress() {
        let mut panel = SweepPanel::default();
        let spec = circle_spec(&panel);
        panel.start(spec, solver());
        panel.sweep.as_ref().unwrap().handle().pause();
        assert!(panel.is_paused());
        assert!(panel.poll().is_none());
        assert_eq!(panel.progress, 0);

        panel.sweep.as_ref().unwrap().handle().cancel();
        assert!(panel.poll().is_none());
        assert!(!panel.is_active());
        assert_eq!(panel.status.as_deref(), Some("Sweep cancelled"));
    }

    #[test]
    fn test_invalid_settings() {
        let panel = SweepPanel { device: "tpu".into(), ..Default::default() };
        let r = Axis::fixed(AxisKind::Shape(ShapeParameter::R), 100.0).unwrap();
        assert!(matches!(
            panel.scan_spec(GeometryKind::Circle, vec![r], Default::default()),
            Err(ConfigurationError::InvalidDevice(_))
        ));

        let mut panel = SweepPanel::default();
        let stack = LayerStack { metasurface_material: "unobtainium".into(), ..Default::default() };
        let r = Axis::fixed(AxisKind::Shape(ShapeParameter::R), 100.0).unwrap();
        let spec = panel.scan_spec(GeometryKind::Circle, vec![r], stack).unwrap();
        panel.start(spec, solver());
        assert!(!panel.is_active());
        assert!(panel.error_message.is_some());
    }
}
