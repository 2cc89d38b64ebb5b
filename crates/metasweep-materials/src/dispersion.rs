//! Analytic dispersion models.
//!
//! - [`SellmeierMaterial`]: $n^2(\lambda) = 1 + \sum_i \frac{B_i \lambda^2}{\lambda^2 - C_i}$
//!   with $\lambda$ in micrometres.
//! - [`ConstantMaterial`]: a wavelength-independent complex index.

use num_complex::Complex64;

use crate::provider::{check_range, MaterialError, MaterialProvider};

/// A lossless dielectric described by a Sellmeier expansion.
#[derive(Debug, Clone)]
pub struct SellmeierMaterial {
    name: String,
    /// Oscillator strengths $B_i$.
    b: Vec<f64>,
    /// Resonance terms $C_i$ (µm²).
    c: Vec<f64>,
    range: (f64, f64),
}

impl SellmeierMaterial {
    pub fn new(name: impl Into<String>, b: Vec<f64>, c: Vec<f64>, range: (f64, f64)) -> Self {
        Self {
            name: name.into(),
            b,
            c,
            range,
        }
    }

    /// Fused silica, I. H. Malitson, *J. Opt. Soc. Am.* **55**, 1205 (1965).
    pub fn fused_silica() -> Self {
        Self::new(
            "SiO2",
            vec![0.696_166_3, 0.407_942_6, 0.897_479_4],
            vec![
                0.068_404_3_f64.powi(2),
                0.116_241_4_f64.powi(2),
                9.896_161_f64.powi(2),
            ],
            (210.0, 6700.0),
        )
    }
}

impl MaterialProvider for SellmeierMaterial {
    fn name(&self) -> &str {
        &self.name
    }

    fn wavelength_range(&self) -> (f64, f64) {
        self.range
    }

    fn refractive_index(&self, wavelength_nm: f64) -> Result<Complex64, MaterialError> {
        check_range(wavelength_nm, self.range)?;
        let lam2 = (wavelength_nm * 1e-3).powi(2);
        let n2 = 1.0
            + self
                .b
                .iter()
                .zip(&self.c)
                .map(|(b, c)| b * lam2 / (lam2 - c))
                .sum::<f64>();
        Ok(Complex64::new(n2.sqrt(), 0.0))
    }
}

/// A material with the same index at every wavelength.
#[derive(Debug, Clone)]
pub struct ConstantMaterial {
    name: String,
    index: Complex64,
}

impl ConstantMaterial {
    pub fn new(name: impl Into<String>, index: Complex64) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }

    pub fn air() -> Self {
        Self::new("air", Complex64::new(1.0, 0.0))
    }
}

impl MaterialProvider for ConstantMaterial {
    fn name(&self) -> &str {
        &self.name
    }

    fn wavelength_range(&self) -> (f64, f64) {
        (0.0, f64::INFINITY)
    }

    fn refractive_index(&self, _wavelength_nm: f64) -> Result<Complex64, MaterialError> {
        Ok(self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fused_silica_matches_malitson() {
        let silica = SellmeierMaterial::fused_silica();
        // Reference value at the He-Ne line.
        let n = silica.refractive_index(632.8).unwrap();
        assert_relative_eq!(n.re, 1.4570, epsilon = 2e-4);
        assert_eq!(n.im, 0.0);
    }

    #[test]
    fn test_silica_is_normally_dispersive() {
        let silica = SellmeierMaterial::fused_silica();
        let blue = silica.refractive_index(450.0).unwrap().re;
        let red = silica.refractive_index(940.0).unwrap().re;
        assert!(blue > red);
    }

    #[test]
    fn test_air_is_unity_everywhere() {
        let air = ConstantMaterial::air();
        assert_eq!(air.refractive_index(10.0).unwrap(), Complex64::new(1.0, 0.0));
        assert_eq!(air.dielectric_function(5000.0).unwrap(), Complex64::new(1.0, 0.0));
    }
}
