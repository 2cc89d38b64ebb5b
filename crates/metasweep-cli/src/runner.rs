//! Sweep runner: ties together the job file, the material library and the
//! solver, and writes the results.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use metasweep_core::io::{append_extension, export, save_dataset};
use metasweep_core::polarization::PolarizationResponse;
use metasweep_core::solver::{simulate_point, EffectiveMediumSolver};
use metasweep_core::sweep::Sweep;
use metasweep_core::{PolarizationChannel, ResultDataset, SweepHandle, SweepHost};
use metasweep_materials::MaterialLibrary;

use crate::config::JobConfig;

/// Built-in materials plus the job's material directory, if any.
pub fn material_library(dir: Option<&Path>) -> Result<MaterialLibrary> {
    let mut library = MaterialLibrary::builtin();
    if let Some(dir) = dir {
        library
            .load_directory(dir)
            .with_context(|| format!("Cannot load materials from {}", dir.display()))?;
    }
    Ok(library)
}

pub fn build_solver(job: &JobConfig) -> Result<EffectiveMediumSolver> {
    let library = material_library(job.solver.material_dir.as_deref())?;
    Ok(EffectiveMediumSolver::with_resolution(library, job.solver.resolution))
}

/// Logs every tenth percent. A terminal run cannot be paused, so yielding
/// does nothing.
#[derive(Debug, Default)]
pub struct LoggingHost {
    last_logged: Option<u8>,
}

impl SweepHost for LoggingHost {
    fn on_progress(&mut self, percent: u8) {
        let bucket = percent / 10;
        if self.last_logged.map_or(true, |last| bucket > last / 10) {
            info!("Progress: {percent}%");
            self.last_logged = Some(percent);
        }
    }

    fn yield_now(&mut self, _handle: &SweepHandle) {}
}

/// Run the full sweep of `job`.
pub fn run_sweep(job: &JobConfig) -> Result<ResultDataset> {
    let spec = job.scan_spec().context("Invalid sweep")?;
    let solver = build_solver(job)?;
    let mut sweep = Sweep::new(spec, solver).context("Sweep rejected")?;
    println!(
        "Sweeping {} over {:?} ({} points)",
        sweep.spec().geometry,
        sweep.spec().grid_shape(),
        sweep.total_points()
    );
    sweep
        .run(&mut LoggingHost::default())?
        .context("Sweep was cancelled before it finished")
}

/// Save `dataset` under `dir` as configured. Returns every file written.
pub fn write_outputs(dataset: &ResultDataset, dir: &Path, job: &JobConfig) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("Cannot create {}", dir.display()))?;
    let stem = dir.join(&job.output.name);
    let (npz, mat) = save_dataset(dataset, &stem)?;
    let mut written = vec![npz, mat];

    if job.output.save_json {
        let path = append_extension(&stem, "json");
        export::write_json(BufWriter::new(File::create(&path)?), dataset)?;
        written.push(path);
    }
    Ok(written)
}

/// Solve the first point of every axis.
pub fn preview_point(job: &JobConfig) -> Result<PolarizationResponse> {
    let spec = job.scan_spec().context("Invalid sweep")?;
    let mut solver = build_solver(job)?;
    let point = spec.first_point()?;
    Ok(simulate_point(&mut solver, &point)?)
}

pub fn format_response(response: &PolarizationResponse) -> String {
    let mut out = String::from("channel  transmittance  phase (rad)\n");
    for channel in PolarizationChannel::ALL {
        out.push_str(&format!(
            "{:<7}  {:>13.6}  {:>11.6}\n",
            channel.name(),
            response.transmittance(channel),
            response.phase(channel)
        ));
    }
    out
}

/// A short summary of a loaded dataset.
pub fn describe(dataset: &ResultDataset) -> String {
    let mut out = format!("Geometry: {}\nAxes:\n", dataset.geometry());
    for (i, axis) in dataset.axes().iter().enumerate() {
        out.push_str(&format!(
            "  [{i}] {:<22} {:>4} values  {} .. {}\n",
            axis.kind.label(dataset.geometry()),
            axis.count(),
            axis.first(),
            axis.last()
        ));
    }
    out.push_str(&format!("Tensor shape: {:?}\n", dataset.transmittance().shape()));
    out
}
