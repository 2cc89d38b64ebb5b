//! Main application state and egui integration.

use std::sync::Arc;

use eframe::egui;
use metasweep_core::solver::EffectiveMediumSolver;

use crate::panels;

/// The main metasweep application.
pub struct MetasweepApp {
    /// Which panel is currently selected in the sidebar.
    active_panel: Panel,
    pub geometry_state: panels::geometry::GeometryPanel,
    pub materials_state: panels::materials::MaterialsPanel,
    pub sweep_state: panels::sweep::SweepPanel,
    pub results_state: panels::results::ResultsPanel,
}

/// Sidebar navigation panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Geometry,
    Materials,
    Sweep,
    Results,
}

impl Default for MetasweepApp {
    fn default() -> Self {
        Self {
            active_panel: Panel::Geometry,
            geometry_state: panels::geometry::GeometryPanel::default(),
            materials_state: panels::materials::MaterialsPanel::default(),
            sweep_state: panels::sweep::SweepPanel::default(),
            results_state: panels::results::ResultsPanel::default(),
        }
    }
}

impl MetasweepApp {
    /// Build a sweep from the three configuration panels and hand it to the
    /// sweep panel.
    fn launch_sweep(&mut self) {
        self.sweep_state.launch_requested = false;
        let spec = self.geometry_state.shape_axes().and_then(|shape_axes| {
            self.sweep_state.scan_spec(
                self.geometry_state.kind,
                shape_axes,
                self.materials_state.stack.clone(),
            )
        });
        match spec {
            Ok(spec) => {
                let solver = EffectiveMediumSolver::with_resolution(
                    self.materials_state.library.clone(),
                    self.sweep_state.resolution,
                );
                self.sweep_state.start(spec, solver);
            }
            Err(e) => {
                log::warn!("Sweep not started: {e}");
                self.sweep_state.error_message = Some(e.to_string());
            }
        }
    }
}

impl eframe::App for MetasweepApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.sweep_state.launch_requested {
            self.launch_sweep();
        }
        if let Some(dataset) = self.sweep_state.poll() {
            self.results_state.set_dataset(Arc::new(dataset));
            self.active_panel = Panel::Results;
        }
        if self.sweep_state.is_active() && !self.sweep_state.is_paused() {
            ctx.request_repaint();
        }

        // Sidebar navigation
        egui::SidePanel::left("nav_panel")
            .resizable(false)
            .default_width(160.0)
            .show(ctx, |ui| {
                ui.heading("metasweep");
                ui.separator();

                ui.selectable_value(&mut self.active_panel, Panel::Geometry, "Geometry");
                ui.selectable_value(&mut self.active_panel, Panel::Materials, "Materials");
                ui.selectable_value(&mut self.active_panel, Panel::Sweep, "Sweep");
                ui.selectable_value(&mut self.active_panel, Panel::Results, "Results");
            });

        // The structure preview uses the first swept period.
        let period = self.sweep_state.period.min;
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| match self.active_panel {
                Panel::Geometry => self.geometry_state.ui(ui, period),
                Panel::Materials => self.materials_state.ui(ui),
                Panel::Sweep => self.sweep_state.ui(ui),
                Panel::Results => self.results_state.ui(ui),
            });
        });
    }
}
