//! Tabulated optical constants.
//!
//! Tables are plain text with one row per wavelength:
//!
//! ```text
//! # wavelength_nm  n      k
//! 900             3.624  0.0022
//! 940             3.601  0.0012
//! ```
//!
//! Columns may be separated by whitespace or commas, `#` starts a comment and
//! a leading non-numeric header line is skipped. A missing `k` column means a
//! lossless material. Wavelengths are in nanometres and must be strictly
//! increasing. Values between rows come from natural cubic splines of `n` and
//! `k` separately.

use std::path::Path;

use num_complex::Complex64;

use crate::provider::{check_range, MaterialError, MaterialProvider};
use crate::spline::CubicSpline;

/// A material defined by an `(λ, n, k)` table.
#[derive(Debug, Clone)]
pub struct TabulatedMaterial {
    name: String,
    range: (f64, f64),
    spline_n: CubicSpline,
    spline_k: CubicSpline,
}

impl TabulatedMaterial {
    /// Construct from `(wavelength_nm, n, k)` rows.
    pub fn from_rows(name: impl Into<String>, rows: &[(f64, f64, f64)]) -> Result<Self, MaterialError> {
        let name = name.into();
        if rows.iter().any(|&(lam, n, k)| !(lam.is_finite() && n.is_finite() && k.is_finite())) {
            return Err(MaterialError::DataError(format!("{name}: table contains non-finite values")));
        }
        let wavelengths: Vec<f64> = rows.iter().map(|&(lam, _, _)| lam).collect();
        let n: Vec<f64> = rows.iter().map(|&(_, n, _)| n).collect();
        let k: Vec<f64> = rows.iter().map(|&(_, _, k)| k).collect();

        let spline_n = CubicSpline::new(wavelengths.clone(), n)
            .map_err(|e| MaterialError::DataError(format!("{name}: {e}")))?;
        let spline_k = CubicSpline::new(wavelengths, k)
            .map_err(|e| MaterialError::DataError(format!("{name}: {e}")))?;

        Ok(Self {
            range: spline_n.domain(),
            name,
            spline_n,
            spline_k,
        })
    }

    /// Parse a table from text.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self, MaterialError> {
        let name = name.into();
        let mut rows = Vec::new();

        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|f| !f.is_empty())
                .collect();
            let parsed: Result<Vec<f64>, _> = fields.iter().map(|f| f.parse::<f64>()).collect();
            match parsed {
                Ok(values) if values.len() >= 2 => {
                    let k = values.get(2).copied().unwrap_or(0.0);
                    rows.push((values[0], values[1], k));
                }
                Ok(_) => {
                    return Err(MaterialError::DataError(format!(
                        "{name}, line {}: expected `wavelength n [k]`",
                        line_no + 1
                    )))
                }
                // A header row is only tolerated before the first data row.
                Err(_) if rows.is_empty() => continue,
                Err(e) => {
                    return Err(MaterialError::DataError(format!(
                        "{name}, line {}: {e}",
                        line_no + 1
                    )))
                }
            }
        }

        Self::from_rows(name, &rows)
    }

    /// Load a table from disk. The material is named after the file.
    pub fn from_file(path: &Path) -> Result<Self, MaterialError> {
        let text = std::fs::read_to_string(path).map_err(|source| MaterialError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::parse(name, &text)
    }

    /// Crystalline silicon at room temperature, 400–1600 nm.
    ///
    /// Source: M. A. Green, *Sol. Energy Mater. Sol. Cells* **92**, 1305 (2008),
    /// rounded to four significant figures.
    pub fn silicon() -> Self {
        let data = [
            (400.0, 5.570, 0.3870),
            (450.0, 4.674, 0.1400),
            (500.0, 4.298, 0.0730),
            (550.0, 4.077, 0.0280),
            (600.0, 3.939, 0.0200),
            (650.0, 3.851, 0.0120),
            (700.0, 3.783, 0.0076),
            (750.0, 3.728, 0.0067),
            (800.0, 3.681, 0.0050),
            (850.0, 3.650, 0.0032),
            (900.0, 3.624, 0.0022),
            (950.0, 3.597, 0.0012),
            (1000.0, 3.575, 0.0006),
            (1100.0, 3.547, 0.0001),
            (1200.0, 3.520, 0.0),
            (1400.0, 3.490, 0.0),
            (1600.0, 3.478, 0.0),
        ];
        match Self::from_rows("Si", &data) {
            Ok(material) => material,
            Err(e) => unreachable!("built-in silicon table is valid: {e}"),
        }
    }
}

impl MaterialProvider for TabulatedMaterial {
    fn name(&self) -> &str {
        &self.name
    }

    fn wavelength_range(&self) -> (f64, f64) {
        self.range
    }

    fn refractive_index(&self, wavelength_nm: f64) -> Result<Complex64, MaterialError> {
        check_range(wavelength_nm, self.range)?;
        let n = self.spline_n.evaluate(wavelength_nm);
        // Splines may undershoot between lossless rows.
        let k = self.spline_k.evaluate(wavelength_nm).max(0.0);
        Ok(Complex64::new(n, k))
    }
}
