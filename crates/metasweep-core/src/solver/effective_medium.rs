//! Effective-medium preview solver.
//!
//! Replaces the patterned layer with a homogeneous uniaxial slab. The fill
//! fraction $f$ comes from rasterising the meta-atom on its unit cell, and
//! the two zeroth-order form-birefringence limits
//!
//! $$\varepsilon_\parallel = f\varepsilon_p + (1-f)\varepsilon_f, \qquad
//! \varepsilon_\perp^{-1} = f/\varepsilon_p + (1-f)/\varepsilon_f$$
//!
//! are mixed along the shape's principal axes according to its aspect ratio.
//! Each principal axis is then propagated through the stack with
//! single-pass Fresnel factors, and the resulting diagonal Jones matrix is
//! rotated into the lab frame by the shape's angle.
//!
//! This is an approximation valid for deeply sub-wavelength periods. It
//! ignores diffraction, multiple reflections and the harmonic order.

use std::f64::consts::PI;

use log::debug;
use metasweep_geometry::unit_cell::DEFAULT_RESOLUTION;
use metasweep_geometry::UnitCell;
use metasweep_materials::MaterialLibrary;
use nalgebra::Matrix2;
use num_complex::Complex64;

use super::{ScatteringSolver, SolverError};
use crate::polarization::JonesMatrix;
use crate::types::{LayerStack, PointConfig};

/// Fast deterministic stand-in for a full-wave solver.
#[derive(Debug, Clone)]
pub struct EffectiveMediumSolver {
    materials: MaterialLibrary,
    /// Rasterisation samples along each cell edge.
    pub resolution: usize,
}

impl EffectiveMediumSolver {
    pub fn new(materials: MaterialLibrary) -> Self {
        Self { materials, resolution: DEFAULT_RESOLUTION }
    }

    pub fn with_resolution(materials: MaterialLibrary, resolution: usize) -> Self {
        Self { materials, resolution: resolution.max(1) }
    }

    pub fn materials(&self) -> &MaterialLibrary {
        &self.materials
    }

    fn index(&self, name: &str, wavelength_nm: f64) -> Result<Complex64, SolverError> {
        Ok(self.materials.get(name)?.refractive_index(wavelength_nm)?)
    }
}

impl ScatteringSolver for EffectiveMediumSolver {
    fn transmission(&mut self, point: &PointConfig<'_>) -> Result<JonesMatrix, SolverError> {
        let stack = point.stack;
        let wl = point.wavelength;
        if wl <= 0.0 || point.period <= 0.0 {
            return Err(SolverError::InvalidGeometry(format!(
                "wavelength ({wl} nm) and period ({} nm) must be positive",
                point.period
            )));
        }

        let n_sub = self.index(&stack.substrate, wl)?;
        let n_slab = self.index(&stack.slab_material, wl)?;
        let n_pillar = self.index(&stack.metasurface_material, wl)?;
        let n_fill = self.index(&stack.filling_material, wl)?;
        let n_out = self.index(&stack.output, wl)?;

        let cell = UnitCell::with_resolution(point.period, self.resolution, self.resolution);
        let f = cell.fill_fraction(&point.shape);

        let eps_p = n_pillar * n_pillar;
        let eps_f = n_fill * n_fill;
        let eps_par = eps_p * f + eps_f * (1.0 - f);
        let eps_perp = (eps_p.inv() * f + eps_f.inv() * (1.0 - f)).inv();

        let (u, v) = point.shape.principal_extents();
        let a = if u + v > 0.0 { u / (u + v) } else { 0.5 };
        let n_u = (eps_par * a + eps_perp * (1.0 - a)).sqrt();
        let n_v = (eps_par * (1.0 - a) + eps_perp * a).sqrt();

        debug!(
            "EMT at {wl} nm: fill {f:.4}, n_u = {:.4}{:+.4}i, n_v = {:.4}{:+.4}i",
            n_u.re, n_u.im, n_v.re, n_v.im
        );

        let k0 = 2.0 * PI / wl;
        let through_stack = |n_layer: Complex64| {
            let layers = [
                (n_slab, stack.slab_thickness),
                (n_layer, point.thickness),
                (n_fill, stack.filling_thickness),
            ];
            let mut t = Complex64::new(1.0, 0.0);
            let mut n_prev = n_sub;
            for (n, h) in layers {
                t *= interface(n_prev, n) * (Complex64::i() * k0 * n * h).exp();
                n_prev = n;
            }
            t * interface(n_prev, n_out) * (n_out.re / n_sub.re).sqrt()
        };

        let principal = Matrix2::new(
            through_stack(n_u),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            through_stack(n_v),
        );
        let (s, c) = point.shape.rotation().sin_cos();
        let rot = Matrix2::new(
            Complex64::new(c, 0.0),
            Complex64::new(-s, 0.0),
            Complex64::new(s, 0.0),
            Complex64::new(c, 0.0),
        );
        let lab = rot * principal * rot.transpose();
        Ok(JonesMatrix::from_matrix(&lab))
    }

    fn validate_stack(&self, stack: &LayerStack) -> Result<(), SolverError> {
        for (_, name) in stack.materials() {
            self.materials.get(name)?;
        }
        Ok(())
    }

    fn method_name(&self) -> &str {
        "Effective medium (zeroth order)"
    }
}

/// Normal-incidence Fresnel transmission amplitude from `n1` into `n2`.
fn interface(n1: Complex64, n2: Complex64) -> Complex64 {
    n1 * 2.0 / (n1 + n2)
}
