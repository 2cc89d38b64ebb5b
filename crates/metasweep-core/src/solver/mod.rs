//! Solver abstraction at the boundary of the sweep.
//!
//! The [`ScatteringSolver`] trait is the only thing the scheduler knows
//! about electromagnetics: given one [`PointConfig`] it returns the four
//! zeroth-order transmission coefficients. Implementations may keep mutable
//! state between calls (hence `&mut self`) and are never called
//! concurrently. An RCWA engine plugs in here; [`effective_medium`] provides
//! a fast built-in approximation so the tools work end to end without one.

pub mod effective_medium;

use metasweep_materials::MaterialError;
use thiserror::Error;

use crate::polarization::{JonesMatrix, PolarizationResponse};
use crate::types::{LayerStack, PointConfig};

pub use effective_medium::EffectiveMediumSolver;

/// Errors raised by a solver for a single configuration.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Material lookup failed: {0}")]
    Material(#[from] MaterialError),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Solver returned a non-finite {coefficient} coefficient")]
    NonFinite { coefficient: &'static str },

    #[error("Compute backend error: {0}")]
    Backend(String),
}

/// A per-point electromagnetic solver.
///
/// Must be deterministic: the same configuration always yields the same
/// coefficients.
pub trait ScatteringSolver {
    /// Zeroth-order transmission coefficients for one configuration.
    fn transmission(&mut self, point: &PointConfig<'_>) -> Result<JonesMatrix, SolverError>;

    /// Check that every material in `stack` can be resolved. Called once
    /// before a sweep allocates anything.
    fn validate_stack(&self, _stack: &LayerStack) -> Result<(), SolverError> {
        Ok(())
    }

    /// Human-readable name of the method.
    fn method_name(&self) -> &str;
}

impl<S: ScatteringSolver + ?Sized> ScatteringSolver for Box<S> {
    fn transmission(&mut self, point: &PointConfig<'_>) -> Result<JonesMatrix, SolverError> {
        (**self).transmission(point)
    }

    fn validate_stack(&self, stack: &LayerStack) -> Result<(), SolverError> {
        (**self).validate_stack(stack)
    }

    fn method_name(&self) -> &str {
        (**self).method_name()
    }
}

/// Solve one configuration and expand it into the eight polarization
/// channels. Non-finite coefficients are rejected here, so neither the
/// single-point preview nor a sweep ever stores them.
pub fn simulate_point<S: ScatteringSolver + ?Sized>(
    solver: &mut S,
    point: &PointConfig<'_>,
) -> Result<PolarizationResponse, SolverError> {
    let jones = solver.transmission(point)?;
    let named = [("txx", jones.txx), ("txy", jones.txy), ("tyx", jones.tyx), ("tyy", jones.tyy)];
    if let Some(&(coefficient, _)) = named.iter().find(|(_, t)| !t.is_finite()) {
        return Err(SolverError::NonFinite { coefficient });
    }
    Ok(PolarizationResponse::from_jones(&jones))
}
