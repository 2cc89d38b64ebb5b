//! Linear to circular polarization basis transform.
//!
//! A solver returns the Jones matrix $t_{ij}$ in the linear basis. The
//! circular-basis coefficients use a 0.5 normalisation, so a unit identity
//! matrix maps to $|t_{LL}| = |t_{RR}| = 1$:
//!
//! $$t_{RL} = \tfrac12[(t_{xx} - t_{yy}) - i(t_{xy} + t_{yx})]$$
//! $$t_{RR} = \tfrac12[(t_{xx} + t_{yy}) + i(t_{xy} - t_{yx})]$$
//! $$t_{LR} = \tfrac12[(t_{xx} - t_{yy}) + i(t_{xy} + t_{yx})]$$
//! $$t_{LL} = \tfrac12[(t_{xx} + t_{yy}) - i(t_{xy} - t_{yx})]$$
//!
//! Non-finite inputs propagate unchanged.

use nalgebra::Matrix2;
use num_complex::Complex64;

use crate::types::PolarizationChannel;

/// Zeroth-order transmission coefficients in the linear basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JonesMatrix {
    pub txx: Complex64,
    pub txy: Complex64,
    pub tyx: Complex64,
    pub tyy: Complex64,
}

impl JonesMatrix {
    pub fn identity() -> Self {
        let one = Complex64::new(1.0, 0.0);
        let zero = Complex64::new(0.0, 0.0);
        Self { txx: one, txy: zero, tyx: zero, tyy: one }
    }

    /// Row `x` holds `txx, txy`; row `y` holds `tyx, tyy`.
    pub fn from_matrix(m: &Matrix2<Complex64>) -> Self {
        Self {
            txx: m[(0, 0)],
            txy: m[(0, 1)],
            tyx: m[(1, 0)],
            tyy: m[(1, 1)],
        }
    }

    pub fn to_matrix(&self) -> Matrix2<Complex64> {
        Matrix2::new(self.txx, self.txy, self.tyx, self.tyy)
    }

    pub fn is_finite(&self) -> bool {
        [self.txx, self.txy, self.tyx, self.tyy].iter().all(|t| t.is_finite())
    }

    /// Coefficients in channel order: `xx, yx, xy, yy, LL, RL, LR, RR`.
    pub fn channels(&self) -> [Complex64; 8] {
        let i = Complex64::i();
        let (txx, txy, tyx, tyy) = (self.txx, self.txy, self.tyx, self.tyy);

        let t_rl = ((txx - tyy) - i * (txy + tyx)) * 0.5;
        let t_rr = ((txx + tyy) + i * (txy - tyx)) * 0.5;
        let t_lr = ((txx - tyy) + i * (txy + tyx)) * 0.5;
        let t_ll = ((txx + tyy) - i * (txy - tyx)) * 0.5;

        [txx, tyx, txy, tyy, t_ll, t_rl, t_lr, t_rr]
    }
}

/// Transmittance $|t|^2$ and phase $\arg t$ for all eight channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarizationResponse {
    pub transmittance: [f64; 8],
    /// Radians in $(-\pi, \pi]$, uncorrected.
    pub phase: [f64; 8],
}

impl PolarizationResponse {
    pub fn from_jones(jones: &JonesMatrix) -> Self {
        let channels = jones.channels();
        Self {
            transmittance: channels.map(|t| t.norm_sqr()),
            phase: channels.map(|t| t.arg()),
        }
    }

    pub fn transmittance(&self, channel: PolarizationChannel) -> f64 {
        self.transmittance[channel.index()]
    }

    pub fn phase(&self, channel: PolarizationChannel) -> f64 {
        self.phase[channel.index()]
    }
}
