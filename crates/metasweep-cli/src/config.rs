//! TOML configuration deserialisation for sweep jobs.
//!
//! ```toml
//! [geometry]
//! kind = "rectangle"
//!
//! [stack]
//! metasurface_material = "Si.txt"
//!
//! [solver]
//! harmonic_order = 7
//! device = "cpu"
//!
//! [axes]
//! wavelength = { range = [900.0, 1000.0], points = 11 }
//! period = 500.0
//! thickness = { values = [400.0, 500.0, 600.0] }
//! Wx = { range = [100.0, 300.0], points = 21 }
//! Wy = 150.0
//! Theta = 0.0
//!
//! [output]
//! directory = "./output"
//! name = "rectangle_sweep"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use metasweep_core::scan::DEFAULT_HARMONIC_ORDER;
use metasweep_core::{Axis, AxisKind, ConfigurationError, Device, LayerStack, ScanSpec};
use metasweep_geometry::unit_cell::DEFAULT_RESOLUTION;
use metasweep_geometry::GeometryKind;
use serde::Deserialize;

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    pub geometry: GeometryConfig,
    #[serde(default)]
    pub stack: LayerStack,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub axes: AxesConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct GeometryConfig {
    pub kind: GeometryKind,
}

#[derive(Debug, Deserialize)]
pub struct SolverConfig {
    #[serde(default = "default_harmonic_order")]
    pub harmonic_order: usize,
    /// `cpu`, `cuda` or `cuda:N`.
    #[serde(default = "default_device")]
    pub device: String,
    /// Unit-cell sampling of the built-in solver, per side.
    #[serde(default = "default_resolution")]
    pub resolution: usize,
    /// Directory of tabulated `*.txt` materials, added to the built-ins.
    #[serde(default)]
    pub material_dir: Option<PathBuf>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            harmonic_order: default_harmonic_order(),
            device: default_device(),
            resolution: default_resolution(),
            material_dir: None,
        }
    }
}

fn default_harmonic_order() -> usize {
    DEFAULT_HARMONIC_ORDER
}

fn default_device() -> String {
    "cpu".into()
}

fn default_resolution() -> usize {
    DEFAULT_RESOLUTION
}

/// One axis: an inclusive range, an explicit list, or a single value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AxisSpec {
    Range { range: [f64; 2], points: usize },
    List { values: Vec<f64> },
    Fixed(f64),
}

impl AxisSpec {
    pub fn to_axis(&self, kind: AxisKind) -> Result<Axis, ConfigurationError> {
        match self {
            AxisSpec::Range { range, points } => Axis::linspace(kind, range[0], range[1], *points),
            AxisSpec::List { values } => Axis::from_values(kind, values.clone()),
            AxisSpec::Fixed(value) => Axis::fixed(kind, *value),
        }
    }
}

/// Wavelength, period and thickness, plus one entry per shape parameter
/// keyed by its name (`Wx`, `Theta`, `Hollow_R`, ...).
#[derive(Debug, Deserialize)]
pub struct AxesConfig {
    #[serde(default = "default_wavelength")]
    pub wavelength: AxisSpec,
    #[serde(default = "default_length")]
    pub period: AxisSpec,
    #[serde(default = "default_length")]
    pub thickness: AxisSpec,
    #[serde(flatten)]
    pub shape: BTreeMap<String, AxisSpec>,
}

impl Default for AxesConfig {
    fn default() -> Self {
        Self {
            wavelength: default_wavelength(),
            period: default_length(),
            thickness: default_length(),
            shape: BTreeMap::new(),
        }
    }
}

fn default_wavelength() -> AxisSpec {
    AxisSpec::Fixed(940.0)
}

fn default_length() -> AxisSpec {
    AxisSpec::Fixed(500.0)
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
    /// File stem of the saved `.npz`/`.mat` pair.
    #[serde(default = "default_output_name")]
    pub name: String,
    /// Also write the dataset as JSON.
    #[serde(default)]
    pub save_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            name: default_output_name(),
            save_json: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_output_name() -> String {
    "data_sheet".into()
}

impl JobConfig {
    /// Build and validate the sweep described by this job.
    pub fn scan_spec(&self) -> Result<ScanSpec, ConfigurationError> {
        let geometry = self.geometry.kind;
        let axes = &self.axes;

        let mut given = BTreeMap::new();
        for (name, spec) in &axes.shape {
            let kind: AxisKind = name.parse()?;
            if !matches!(kind, AxisKind::Shape(_)) {
                return Err(ConfigurationError::UnknownAxis(name.clone()));
            }
            given.insert(kind.key(), (kind, spec));
        }

        let expected: Vec<&str> = geometry.parameters().iter().map(|p| p.key()).collect();
        if given.len() != expected.len() || !expected.iter().all(|k| given.contains_key(k)) {
            return Err(ConfigurationError::ShapeAxes {
                geometry,
                expected: expected.join(", "),
                got: given.keys().copied().collect::<Vec<_>>().join(", "),
            });
        }

        let shape_axes = expected
            .iter()
            .filter_map(|key| given.get(key))
            .map(|(kind, spec)| spec.to_axis(*kind))
            .collect::<Result<Vec<_>, _>>()?;

        let spec = ScanSpec::new(
            geometry,
            axes.wavelength.to_axis(AxisKind::Wavelength)?,
            axes.period.to_axis(AxisKind::Period)?,
            axes.thickness.to_axis(AxisKind::Thickness)?,
            shape_axes,
        )
        .with_stack(self.stack.clone())
        .with_harmonic_order(self.solver.harmonic_order)
        .with_device(self.solver.device.parse::<Device>()?);

        spec.validate()?;
        Ok(spec)
    }
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read job file {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid job file {}", path.display()))
}

pub fn parse_config(content: &str) -> anyhow::Result<JobConfig> {
    Ok(toml::from_str(content)?)
}
