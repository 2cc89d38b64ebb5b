//! Dataset persistence.
//!
//! A [`ResultDataset`] is flattened into a [`DataSheet`] (an ordered
//! key-value record) before being encoded:
//!
//! | Key | Value |
//! |-----|-------|
//! | `shape_type` | geometry name, e.g. `hollow_square` |
//! | `Dimension_name` | axis display labels, in tensor order |
//! | `Wavelength`, `Period`, `Thickness`, shape keys | axis values |
//! | `transmission_tensor`, `phase_tensor` | `axis counts + [8]` tensors |
//!
//! Two binary encodings are provided, both exact for every `f64`:
//!
//! - [`npz`]: a NumPy `.npz` archive, one `.npy` member per key.
//! - [`mat`]: a MATLAB Level 5 `.mat` file holding a `data_sheet` struct.
//!
//! [`export`] adds a JSON dump of the dataset and CSV dumps of rendered views.

pub mod datasheet;
pub mod export;
pub mod mat;
pub mod npz;

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use metasweep_geometry::GeometryError;
use thiserror::Error;

use crate::dataset::{DatasetError, ResultDataset};
use crate::scan::ConfigurationError;

pub use datasheet::{DataSheet, Field};

/// Failure to save or load a dataset. A failed load never yields a
/// partial dataset.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed file: {0}")]
    Format(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Field '{key}' should be {expected}")]
    FieldType { key: String, expected: &'static str },

    #[error("Unsupported file extension '{0}' (expected .npz, .mat or .json)")]
    UnsupportedExtension(String),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Axis(#[from] ConfigurationError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Write `dataset` to `<path>.npz` and `<path>.mat`. The extensions are
/// appended, so a stem such as `run_1.5nm` keeps its dots. If either write
/// fails, neither file is left behind. Returns the two paths written.
pub fn save_dataset(dataset: &ResultDataset, path: &Path) -> Result<(PathBuf, PathBuf), PersistenceError> {
    let npz_path = append_extension(path, "npz");
    let mat_path = append_extension(path, "mat");
    let sheet = dataset.to_datasheet();

    if let Err(e) = write_npz_file(&npz_path, &sheet) {
        remove_partial(&[npz_path.as_path()]);
        return Err(e);
    }
    if let Err(e) = write_mat_file(&mat_path, &sheet) {
        remove_partial(&[npz_path.as_path(), mat_path.as_path()]);
        return Err(e);
    }
    info!("Saved dataset to {} and {}", npz_path.display(), mat_path.display());
    Ok((npz_path, mat_path))
}

fn write_npz_file(path: &Path, sheet: &DataSheet) -> Result<(), PersistenceError> {
    npz::write_npz(BufWriter::new(File::create(path)?), sheet)?.flush()?;
    Ok(())
}

fn write_mat_file(path: &Path, sheet: &DataSheet) -> Result<(), PersistenceError> {
    mat::write_mat(BufWriter::new(File::create(path)?), sheet, mat::MatOptions::default())
}

fn remove_partial(paths: &[&Path]) {
    for path in paths.iter().filter(|p| p.is_file()) {
        if let Err(e) = fs::remove_file(path) {
            warn!("Could not remove {}: {e}", path.display());
        }
    }
}

/// `path` with `.extension` added after its full file name.
pub fn append_extension(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// Read a dataset from a `.npz`, `.mat` or `.json` file.
pub fn load_dataset(path: &Path) -> Result<ResultDataset, PersistenceError> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let dataset = match extension.as_str() {
        "npz" => ResultDataset::from_datasheet(&npz::read_npz(File::open(path)?)?)?,
        "mat" => ResultDataset::from_datasheet(&mat::read_mat(BufReader::new(File::open(path)?))?)?,
        "json" => export::read_json(BufReader::new(File::open(path)?))?,
        other => return Err(PersistenceError::UnsupportedExtension(other.to_string())),
    };
    info!(
        "Loaded {} dataset with shape {:?} from {}",
        dataset.geometry(),
        dataset.grid_shape(),
        path.display()
    );
    Ok(dataset)
}
