//! Material property provider trait.
//!
//! All material data sources implement [`MaterialProvider`]. Tabulated data
//! is naturally expressed as $(n, k)$, so the refractive index is the primary
//! quantity and the dielectric function is derived from it.

use std::path::PathBuf;

use num_complex::Complex64;
use thiserror::Error;

/// Errors from material providers.
#[derive(Debug, Error)]
pub enum MaterialError {
    #[error("Wavelength {wavelength_nm} nm is outside the data range [{min}, {max}] nm")]
    OutOfRange {
        wavelength_nm: f64,
        min: f64,
        max: f64,
    },

    #[error("Material not found: {0}")]
    NotFound(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Failed to read material file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Provides wavelength-dependent optical constants.
pub trait MaterialProvider: Send + Sync {
    /// Human-readable name of this material.
    fn name(&self) -> &str;

    /// Wavelength range over which data is available (nm).
    fn wavelength_range(&self) -> (f64, f64);

    /// Complex refractive index $\tilde{n} = n + ik$ at a given wavelength.
    fn refractive_index(&self, wavelength_nm: f64) -> Result<Complex64, MaterialError>;

    /// Complex dielectric function $\epsilon = \tilde{n}^2$.
    fn dielectric_function(&self, wavelength_nm: f64) -> Result<Complex64, MaterialError> {
        let n = self.refractive_index(wavelength_nm)?;
        Ok(n * n)
    }
}

/// Reject wavelengths outside `[min, max]`.
pub(crate) fn check_range(
    wavelength_nm: f64,
    (min, max): (f64, f64),
) -> Result<(), MaterialError> {
    if wavelength_nm < min || wavelength_nm > max || !wavelength_nm.is_finite() {
        return Err(MaterialError::OutOfRange {
            wavelength_nm,
            min,
            max,
        });
    }
    Ok(())
}
