//! metasweep command-line interface.
//!
//! Run metasurface parameter sweeps from TOML job files and inspect the
//! saved datasets:
//! ```sh
//! metasweep run job.toml
//! metasweep validate job.toml
//! metasweep point job.toml
//! metasweep info output/data_sheet.npz
//! metasweep view output/data_sheet.npz --x 0 --y 3 --fix 1=0 --fix 2=0 --channel LL -o view.csv
//! metasweep materials --dir Materials_data
//! ```

mod config;
mod runner;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use metasweep_core::io::{export, load_dataset};
use metasweep_core::solver::ScatteringSolver;
use metasweep_core::view::{render, SliceSelection};
use metasweep_core::PolarizationChannel;
use metasweep_materials::MaterialProvider;

#[derive(Parser)]
#[command(name = "metasweep")]
#[command(about = "Metasurface unit-cell parameter sweeps")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a sweep from a TOML job file and save the dataset.
    Run {
        /// Path to the job file.
        config: PathBuf,
        /// Output directory (overrides the job file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a job file without running it.
    Validate {
        config: PathBuf,
    },
    /// Solve the first grid point of a job and print all eight channels.
    Point {
        config: PathBuf,
    },
    /// Summarise a saved dataset (.npz, .mat or .json).
    Info {
        dataset: PathBuf,
    },
    /// Render a line or image slice of a saved dataset as CSV.
    View {
        dataset: PathBuf,
        /// Horizontal axis index.
        #[arg(long, default_value_t = 0)]
        x: usize,
        /// Vertical axis index; omit for a line view.
        #[arg(long)]
        y: Option<usize>,
        /// Fixed index of a non-free axis, as AXIS=INDEX. Axes not listed
        /// are fixed at index 0.
        #[arg(long = "fix", value_parser = parse_fixed)]
        fixed: Vec<(usize, usize)>,
        /// Polarization channel (xx, yx, xy, yy, LL, RL, LR, RR).
        #[arg(long, default_value = "xx")]
        channel: String,
        /// Output CSV file; printed to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the built-in materials and those of a material directory.
    Materials {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

fn parse_fixed(text: &str) -> Result<(usize, usize), String> {
    let (axis, index) = text
        .split_once('=')
        .ok_or_else(|| format!("expected AXIS=INDEX, got '{text}'"))?;
    let parse = |s: &str| s.trim().parse::<usize>().map_err(|e| format!("'{s}': {e}"));
    Ok((parse(axis)?, parse(index)?))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            let job = config::load_config(&config)?;
            let dataset = runner::run_sweep(&job)?;
            let out_dir = output.unwrap_or_else(|| job.output.directory.clone());
            for path in runner::write_outputs(&dataset, &out_dir, &job)? {
                println!("Saved {}", path.display());
            }
            println!("Sweep complete.");
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            let spec = job.scan_spec().context("Invalid sweep")?;
            runner::build_solver(&job)?
                .validate_stack(&spec.stack)
                .context("Layer stack rejected")?;
            println!(
                "Configuration is valid: {} ({} sweep, {} points)",
                config.display(),
                spec.geometry,
                spec.total_points()
            );
            Ok(())
        }
        Commands::Point { config } => {
            let job = config::load_config(&config)?;
            let response = runner::preview_point(&job)?;
            print!("{}", runner::format_response(&response));
            Ok(())
        }
        Commands::Info { dataset } => {
            let dataset = load_dataset(&dataset)
                .with_context(|| format!("Cannot load {}", dataset.display()))?;
            print!("{}", runner::describe(&dataset));
            Ok(())
        }
        Commands::View { dataset, x, y, fixed, channel, output } => {
            view(&dataset, x, y.unwrap_or(x), &fixed, &channel, output.as_deref())
        }
        Commands::Materials { dir } => {
            let library = runner::material_library(dir.as_deref())?;
            println!("Available materials:");
            for name in library.names() {
                let material = library.get(name)?;
                let (min, max) = material.wavelength_range();
                println!("  {name:<16} {min:>8.0} - {max:<8.0} nm");
            }
            Ok(())
        }
    }
}

fn view(
    path: &Path,
    x: usize,
    y: usize,
    fixed: &[(usize, usize)],
    channel: &str,
    output: Option<&Path>,
) -> Result<()> {
    let dataset = load_dataset(path).with_context(|| format!("Cannot load {}", path.display()))?;
    let channel: PolarizationChannel = channel.parse()?;

    let mut indices: Vec<(usize, usize)> = (0..dataset.num_axes())
        .filter(|&axis| axis != x && axis != y)
        .map(|axis| (axis, 0))
        .collect();
    for &(axis, index) in fixed {
        match indices.iter_mut().find(|(a, _)| *a == axis) {
            Some(slot) => slot.1 = index,
            None => bail!("Axis {axis} is free or does not exist and cannot be fixed"),
        }
    }

    let view = render(&dataset, &SliceSelection::new(x, y, indices), channel)?;
    match output {
        Some(out) => {
            export::write_view_csv(BufWriter::new(File::create(out)?), &view)?;
            println!("Slice written to: {}", out.display());
        }
        None => export::write_view_csv(std::io::stdout().lock(), &view)?,
    }
    Ok(())
}
