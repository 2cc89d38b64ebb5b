//! Rasterisation of a meta-atom onto its square lattice cell.
//!
//! The cell spans `[0, period]²` with the shape centred at `(period/2, period/2)`.
//! Samples are taken at pixel centres, so an `nx × ny` grid covers the cell
//! exactly once. Arrays are indexed `[ix, iy]` (x first).

use ndarray::{Array1, Array2};

use crate::shape::Shape;

/// Default sampling resolution along each cell edge.
pub const DEFAULT_RESOLUTION: usize = 300;

/// A square unit cell of the metasurface lattice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitCell {
    /// Lattice period (nm).
    pub period: f64,
    /// Samples along x.
    pub nx: usize,
    /// Samples along y.
    pub ny: usize,
}

impl UnitCell {
    pub fn new(period: f64) -> Self {
        Self::with_resolution(period, DEFAULT_RESOLUTION, DEFAULT_RESOLUTION)
    }

    pub fn with_resolution(period: f64, nx: usize, ny: usize) -> Self {
        Self { period, nx, ny }
    }

    /// Sample positions along x (nm, cell coordinates).
    pub fn x_axis(&self) -> Array1<f64> {
        pixel_centres(self.period, self.nx)
    }

    /// Sample positions along y (nm, cell coordinates).
    pub fn y_axis(&self) -> Array1<f64> {
        pixel_centres(self.period, self.ny)
    }

    /// Occupancy of the cell: 1.0 where the shape is present, 0.0 elsewhere.
    pub fn rasterise(&self, shape: &Shape) -> Array2<f64> {
        let xs = self.x_axis();
        let ys = self.y_axis();
        let centre = self.period / 2.0;
        Array2::from_shape_fn((self.nx, self.ny), |(ix, iy)| {
            if shape.contains(xs[ix] - centre, ys[iy] - centre) {
                1.0
            } else {
                0.0
            }
        })
    }

    /// Fraction of the cell area covered by the shape.
    pub fn fill_fraction(&self, shape: &Shape) -> f64 {
        self.rasterise(shape).mean().unwrap_or(0.0)
    }

    /// Real permittivity preview: `eps_pillar` inside the shape, `eps_filling`
    /// around it.
    pub fn permittivity_map(&self, shape: &Shape, eps_pillar: f64, eps_filling: f64) -> Array2<f64> {
        self.rasterise(shape)
            .mapv(|occupied| occupied * eps_pillar + (1.0 - occupied) * eps_filling)
    }
}

fn pixel_centres(period: f64, n: usize) -> Array1<f64> {
    let step = period / n.max(1) as f64;
    Array1::from_shape_fn(n, |i| (i as f64 + 0.5) * step)
}
