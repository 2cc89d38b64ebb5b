//! Cooperative sweep scheduler.
//!
//! A [`Sweep`] owns a validated [`ScanSpec`], a solver and two zeroed
//! tensors of shape `axis counts + [8]`. Each call to [`Sweep::step`]
//! computes at most one grid point, visiting the grid in row-major order
//! (wavelength outermost, last shape axis innermost). Between steps the
//! host is free to service its own events; [`SweepHandle`] lets it pause,
//! resume or cancel from anywhere, including another thread.
//!
//! ```text
//!   step ─▶ cancelled? ─yes─▶ Cancelled        (no dataset)
//!            │ no
//!            ▼
//!           paused? ──yes──▶ Paused            (nothing computed)
//!            │ no
//!            ▼
//!          all done? ─yes─▶ Finished(dataset)
//!            │ no
//!            ▼
//!          solve point ───▶ Computed { index, progress }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};
use ndarray::{ArrayD, IxDyn};
use thiserror::Error;

use crate::dataset::ResultDataset;
use crate::scan::{ConfigurationError, ScanSpec};
use crate::solver::{simulate_point, ScatteringSolver, SolverError};
use crate::types::PolarizationChannel;

/// A sweep that stopped abnormally. No dataset is published.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Simulation failed at grid index {index:?}: {source}")]
    Simulation {
        index: Vec<usize>,
        #[source]
        source: SolverError,
    },

    #[error("The sweep has already finished")]
    Finished,
}

/// Shared run/pause flags. Cloning gives another handle to the same sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepHandle {
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
}

impl SweepHandle {
    pub fn pause(&self) {
        if self.is_running() && !self.paused.swap(true, Ordering::SeqCst) {
            info!("Sweep paused");
        }
    }

    pub fn resume(&self) {
        if self.paused.swap(false, Ordering::SeqCst) {
            info!("Sweep resumed");
        }
    }

    /// Stop at the next step. Clears the running flag.
    pub fn cancel(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("Sweep cancellation requested");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn start(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
    }

    fn reset(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Outcome of one [`Sweep::step`].
#[derive(Debug)]
pub enum SweepStep {
    /// One grid point was solved and written.
    Computed { index: Vec<usize>, progress: u8 },
    /// The sweep is paused; nothing was computed.
    Paused,
    /// Every point is done. The sweep is now idle.
    Finished(ResultDataset),
    /// The sweep was cancelled. The sweep is now idle.
    Cancelled,
}

/// The environment a blocking [`Sweep::run`] interleaves with.
pub trait SweepHost {
    /// Integer percent, non-decreasing, reaching 100 on the last point.
    fn on_progress(&mut self, percent: u8);

    /// Called after every computed point and on every paused step. Hosts
    /// process their pending control events here; a paused sweep only
    /// continues once something calls [`SweepHandle::resume`].
    fn yield_now(&mut self, handle: &SweepHandle);
}

struct Tensors {
    transmittance: ArrayD<f64>,
    phase: ArrayD<f64>,
}

/// A sweep in progress.
pub struct Sweep<S> {
    spec: ScanSpec,
    solver: S,
    handle: SweepHandle,
    grid: Vec<usize>,
    total: usize,
    done: usize,
    tensors: Option<Tensors>,
}

impl<S: ScatteringSolver> Sweep<S> {
    /// Validate `spec` against the solver and allocate the result tensors.
    /// Nothing is allocated when validation fails.
    pub fn new(spec: ScanSpec, solver: S) -> Result<Self, ConfigurationError> {
        spec.validate()?;
        solver.validate_stack(&spec.stack).map_err(ConfigurationError::Stack)?;

        let grid = spec.grid_shape();
        let total: usize = grid.iter().product();
        let mut tensor_shape = grid.clone();
        tensor_shape.push(PolarizationChannel::COUNT);

        let handle = SweepHandle::default();
        handle.start();
        info!(
            "Starting {} sweep over {:?} ({} points) with {}",
            spec.geometry,
            grid,
            total,
            solver.method_name()
        );

        Ok(Self {
            spec,
            solver,
            handle,
            grid,
            total,
            done: 0,
            tensors: Some(Tensors {
                transmittance: ArrayD::zeros(IxDyn(&tensor_shape)),
                phase: ArrayD::zeros(IxDyn(&tensor_shape)),
            }),
        })
    }

    /// A handle for pausing, resuming or cancelling this sweep.
    pub fn handle(&self) -> SweepHandle {
        self.handle.clone()
    }

    pub fn spec(&self) -> &ScanSpec {
        &self.spec
    }

    pub fn total_points(&self) -> usize {
        self.total
    }

    pub fn completed_points(&self) -> usize {
        self.done
    }

    pub fn progress(&self) -> u8 {
        progress_percent(self.done, self.total)
    }

    /// Whether the sweep has published, been cancelled or failed.
    pub fn is_finished(&self) -> bool {
        self.tensors.is_none()
    }

    /// Give the solver back, e.g. to reuse it for the next sweep.
    pub fn into_solver(self) -> S {
        self.solver
    }

    /// Advance by at most one grid point.
    pub fn step(&mut self) -> Result<SweepStep, SweepError> {
        if self.tensors.is_none() {
            return Err(SweepError::Finished);
        }

        if !self.handle.is_running() {
            info!("Sweep cancelled after {}/{} points", self.done, self.total);
            self.stop();
            return Ok(SweepStep::Cancelled);
        }

        if self.handle.is_paused() {
            return Ok(SweepStep::Paused);
        }

        if self.done == self.total {
            return Ok(match self.publish() {
                Some(dataset) => SweepStep::Finished(dataset),
                None => SweepStep::Cancelled,
            });
        }

        let index = unravel(self.done, &self.grid);
        let response = self
            .spec
            .point_config(&index)
            .map_err(|e| SolverError::InvalidGeometry(e.to_string()))
            .and_then(|point| simulate_point(&mut self.solver, &point));

        let response = match response {
            Ok(response) => response,
            Err(source) => {
                self.stop();
                return Err(SweepError::Simulation { index, source });
            }
        };

        if let Some(tensors) = self.tensors.as_mut() {
            let mut at = index.clone();
            at.push(0);
            let channel = at.len() - 1;
            for c in 0..PolarizationChannel::COUNT {
                at[channel] = c;
                tensors.transmittance[at.as_slice()] = response.transmittance[c];
                tensors.phase[at.as_slice()] = response.phase[c];
            }
        }

        self.done += 1;
        debug!("Point {}/{} at {:?}", self.done, self.total, index);
        Ok(SweepStep::Computed { index, progress: self.progress() })
    }

    /// Drive the sweep to completion. Returns `None` when cancelled.
    pub fn run<H: SweepHost + ?Sized>(&mut self, host: &mut H) -> Result<Option<ResultDataset>, SweepError> {
        loop {
            match self.step()? {
                SweepStep::Computed { progress, .. } => {
                    host.on_progress(progress);
                    host.yield_now(&self.handle);
                }
                SweepStep::Paused => host.yield_now(&self.handle),
                SweepStep::Finished(dataset) => return Ok(Some(dataset)),
                SweepStep::Cancelled => return Ok(None),
            }
        }
    }

    fn publish(&mut self) -> Option<ResultDataset> {
        let tensors = self.tensors.take()?;
        self.handle.reset();
        let axes = self.spec.axes().into_iter().cloned().collect();
        info!("Sweep finished: {} points", self.total);
        Some(ResultDataset::from_parts(
            self.spec.geometry,
            axes,
            tensors.transmittance,
            tensors.phase,
        ))
    }

    fn stop(&mut self) {
        self.tensors = None;
        self.handle.reset();
    }
}

/// `round(100 · done / total)` in integer arithmetic, halves rounding up.
pub fn progress_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let done = done.min(total) as u128;
    let total = total as u128;
    ((200 * done + total) / (2 * total)) as u8
}

/// Row-major multi-index of the `flat`-th grid point.
fn unravel(mut flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut index = vec![0; shape.len()];
    for (slot, &n) in index.iter_mut().zip(shape).rev() {
        *slot = flat % n;
        flat /= n;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_rounds_to_nearest() {
        assert_eq!(progress_percent(0, 3), 0);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(3, 3), 100);
        assert_eq!(progress_percent(1, 200), 1);
        assert_eq!(progress_percent(1, 201), 0);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let total = 37;
        let percents: Vec<u8> = (0..=total).map(|d| progress_percent(d, total)).collect();
        assert!(percents.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(*percents.last().unwrap(), 100);
    }

    #[test]
    fn test_unravel_is_row_major() {
        let shape = [2, 1, 3];
        let visited: Vec<Vec<usize>> = (0..6).map(|i| unravel(i, &shape)).collect();
        assert_eq!(
            visited,
            vec![
                vec![0, 0, 0],
                vec![0, 0, 1],
                vec![0, 0, 2],
                vec![1, 0, 0],
                vec![1, 0, 1],
                vec![1, 0, 2],
            ]
        );
    }

    #[test]
    fn test_handle_flags() {
        let handle = SweepHandle::default();
        handle.pause();
        assert!(!handle.is_paused(), "an idle sweep cannot be paused");
        handle.start();
        handle.pause();
        assert!(handle.is_paused());
        handle.resume();
        assert!(!handle.is_paused());
        handle.cancel();
        assert!(!handle.is_running());
    }
}
