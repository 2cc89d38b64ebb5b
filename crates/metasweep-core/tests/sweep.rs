//! Integration tests: the sweep scheduler driven end to end with stub
//! solvers, and the slice viewer on its published dataset.

use std::sync::Arc;

use approx::assert_relative_eq;
use metasweep_core::polarization::JonesMatrix;
use metasweep_core::solver::{EffectiveMediumSolver, ScatteringSolver, SolverError};
use metasweep_core::sweep::progress_percent;
use metasweep_core::view::{SliceViewer, View};
use metasweep_core::{
    Axis, AxisKind, ConfigurationError, LayerStack, PointConfig, PolarizationChannel, ScanSpec, Sweep,
    SweepError, SweepHandle, SweepHost, SweepStep,
};
use metasweep_geometry::{GeometryKind, ShapeParameter};
use metasweep_materials::MaterialLibrary;
use num_complex::Complex64;

/// Coefficients that depend on every swept quantity. Optionally fails on
/// the n-th call.
#[derive(Default)]
struct StubSolver {
    calls: usize,
    fail_on_call: Option<usize>,
}

impl ScatteringSolver for StubSolver {
    fn transmission(&mut self, point: &PointConfig<'_>) -> Result<JonesMatrix, SolverError> {
        let call = self.calls;
        self.calls += 1;
        if self.fail_on_call == Some(call) {
            return Err(SolverError::Backend("solver diverged".into()));
        }
        let r = point.shape.parameters()[0];
        let co = Complex64::from_polar(0.5 + r / 1000.0, point.wavelength / 100.0);
        let cross = Complex64::from_polar(0.1, point.period / 100.0 + point.thickness / 1000.0);
        Ok(JonesMatrix { txx: co, txy: cross, tyx: cross, tyy: co.conj() })
    }

    fn method_name(&self) -> &str {
        "stub"
    }
}

struct Identity;

impl ScatteringSolver for Identity {
    fn transmission(&mut self, _point: &PointConfig<'_>) -> Result<JonesMatrix, SolverError> {
        Ok(JonesMatrix::identity())
    }

    fn method_name(&self) -> &str {
        "identity"
    }
}

/// Returns `bad` as `tyy` once the wavelength reaches `from_wavelength`.
struct NonFiniteSolver {
    from_wavelength: f64,
    bad: Complex64,
}

impl ScatteringSolver for NonFiniteSolver {
    fn transmission(&mut self, point: &PointConfig<'_>) -> Result<JonesMatrix, SolverError> {
        let mut jones = JonesMatrix::identity();
        if point.wavelength >= self.from_wavelength {
            jones.tyy = self.bad;
        }
        Ok(jones)
    }

    fn method_name(&self) -> &str {
        "non-finite"
    }
}

/// Records progress and never interferes.
#[derive(Default)]
struct RecordingHost {
    progress: Vec<u8>,
}

impl SweepHost for RecordingHost {
    fn on_progress(&mut self, percent: u8) {
        self.progress.push(percent);
    }

    fn yield_now(&mut self, _handle: &SweepHandle) {}
}

/// Pauses after `pause_after` points and resumes after `idle` paused yields.
struct PausingHost {
    pause_after: usize,
    idle: usize,
    paused_yields: usize,
    progress: Vec<u8>,
}

impl SweepHost for PausingHost {
    fn on_progress(&mut self, percent: u8) {
        self.progress.push(percent);
    }

    fn yield_now(&mut self, handle: &SweepHandle) {
        if handle.is_paused() {
            self.paused_yields += 1;
            if self.paused_yields >= self.idle {
                handle.resume();
            }
        } else if self.progress.len() == self.pause_after && self.paused_yields == 0 {
            handle.pause();
        }
    }
}

/// Cancels after `after` points.
struct CancellingHost {
    after: usize,
    seen: usize,
}

impl SweepHost for CancellingHost {
    fn on_progress(&mut self, _percent: u8) {
        self.seen += 1;
    }

    fn yield_now(&mut self, handle: &SweepHandle) {
        if self.seen == self.after {
            handle.cancel();
        }
    }
}

fn circle_spec() -> ScanSpec {
    ScanSpec::new(
        GeometryKind::Circle,
        Axis::linspace(AxisKind::Wavelength, 900.0, 1000.0, 2).unwrap(),
        Axis::fixed(AxisKind::Period, 500.0).unwrap(),
        Axis::fixed(AxisKind::Thickness, 600.0).unwrap(),
        vec![Axis::linspace(AxisKind::Shape(ShapeParameter::R), 100.0, 300.0, 3).unwrap()],
    )
}

#[test]
fn test_identity_solver_fills_co_polarised_channels() {
    let spec = ScanSpec::new(
        GeometryKind::Circle,
        Axis::fixed(AxisKind::Wavelength, 940.0).unwrap(),
        Axis::fixed(AxisKind::Period, 500.0).unwrap(),
        Axis::fixed(AxisKind::Thickness, 500.0).unwrap(),
        vec![Axis::linspace(AxisKind::Shape(ShapeParameter::R), 100.0, 200.0, 2).unwrap()],
    );
    let mut sweep = Sweep::new(spec, Identity).unwrap();
    let dataset = sweep.run(&mut RecordingHost::default()).unwrap().unwrap();

    assert_eq!(dataset.transmittance().shape(), &[1, 1, 1, 2, 8]);
    for r in 0..2 {
        for channel in PolarizationChannel::ALL {
            let expected = match channel {
                PolarizationChannel::Xx
                | PolarizationChannel::Yy
                | PolarizationChannel::Ll
                | PolarizationChannel::Rr => 1.0,
                _ => 0.0,
            };
            let t = dataset.transmittance()[[0, 0, 0, r, channel.index()]];
            assert_relative_eq!(t, expected, epsilon = 1e-12);
            assert_relative_eq!(dataset.phase()[[0, 0, 0, r, channel.index()]], 0.0, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_progress_reaches_100_and_never_decreases() {
    let mut sweep = Sweep::new(circle_spec(), StubSolver::default()).unwrap();
    let mut host = RecordingHost::default();
    sweep.run(&mut host).unwrap().unwrap();

    assert_eq!(host.progress.len(), 6);
    assert!(host.progress.windows(2).all(|w| w[1] >= w[0]));
    assert_eq!(host.progress, (1..=6).map(|d| progress_percent(d, 6)).collect::<Vec<_>>());
    assert_eq!(*host.progress.last().unwrap(), 100);
}

#[test]
fn test_repeated_sweeps_are_identical() {
    let first = Sweep::new(circle_spec(), StubSolver::default())
        .unwrap()
        .run(&mut RecordingHost::default())
        .unwrap()
        .unwrap();
    let second = Sweep::new(circle_spec(), StubSolver::default())
        .unwrap()
        .run(&mut RecordingHost::default())
        .unwrap()
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_pause_and_resume_give_the_same_dataset() {
    let reference = Sweep::new(circle_spec(), StubSolver::default())
        .unwrap()
        .run(&mut RecordingHost::default())
        .unwrap()
        .unwrap();

    let mut host = PausingHost { pause_after: 2, idle: 4, paused_yields: 0, progress: Vec::new() };
    let mut sweep = Sweep::new(circle_spec(), StubSolver::default()).unwrap();
    let dataset = sweep.run(&mut host).unwrap().unwrap();

    assert_eq!(host.paused_yields, 4);
    assert_eq!(host.progress.len(), 6);
    assert_eq!(dataset, reference);
}

#[test]
fn test_paused_step_computes_nothing() {
    let mut sweep = Sweep::new(circle_spec(), StubSolver::default()).unwrap();
    let handle = sweep.handle();
    assert!(matches!(sweep.step().unwrap(), SweepStep::Computed { progress: 17, .. }));

    handle.pause();
    for _ in 0..3 {
        assert!(matches!(sweep.step().unwrap(), SweepStep::Paused));
    }
    assert_eq!(sweep.completed_points(), 1);

    handle.resume();
    assert!(matches!(
        sweep.step().unwrap(),
        SweepStep::Computed { ref index, .. } if index == &[0, 0, 0, 1]
    ));
}

#[test]
fn test_cancel_publishes_nothing() {
    let mut sweep = Sweep::new(circle_spec(), StubSolver::default()).unwrap();
    let handle = sweep.handle();
    let result = sweep.run(&mut CancellingHost { after: 2, seen: 0 }).unwrap();

    assert!(result.is_none());
    assert!(!handle.is_running());
    assert!(!handle.is_paused());
    assert!(sweep.is_finished());
    assert_eq!(sweep.completed_points(), 2);
    assert!(matches!(sweep.step(), Err(SweepError::Finished)));
}

#[test]
fn test_cancel_while_paused() {
    let mut sweep = Sweep::new(circle_spec(), StubSolver::default()).unwrap();
    let handle = sweep.handle();
    handle.pause();
    assert!(matches!(sweep.step().unwrap(), SweepStep::Paused));
    handle.cancel();
    assert!(matches!(sweep.step().unwrap(), SweepStep::Cancelled));
    assert!(!handle.is_running());
}

#[test]
fn test_solver_failure_reports_the_grid_index() {
    let solver = StubSolver { fail_on_call: Some(4), ..Default::default() };
    let mut sweep = Sweep::new(circle_spec(), solver).unwrap();
    let handle = sweep.handle();

    let err = sweep.run(&mut RecordingHost::default()).unwrap_err();
    let SweepError::Simulation { index, source } = err else {
        panic!("expected a simulation error");
    };
    assert_eq!(index, vec![1, 0, 0, 1]);
    assert!(matches!(source, SolverError::Backend(_)));
    assert!(!handle.is_running());
    assert!(sweep.is_finished());
}

#[test]
fn test_non_finite_coefficients_stop_the_sweep() {
    for bad in [Complex64::new(f64::NAN, 0.0), Complex64::new(0.0, f64::INFINITY)] {
        let solver = NonFiniteSolver { from_wavelength: 1000.0, bad };
        let mut sweep = Sweep::new(circle_spec(), solver).unwrap();
        let handle = sweep.handle();
        let mut host = RecordingHost::default();

        let err = sweep.run(&mut host).unwrap_err();
        let SweepError::Simulation { index, source } = err else {
            panic!("expected a simulation error");
        };
        assert_eq!(index, vec![1, 0, 0, 0]);
        assert!(matches!(source, SolverError::NonFinite { coefficient: "tyy" }));
        // Only the three 900 nm points completed.
        assert_eq!(host.progress.len(), 3);
        assert!(!handle.is_running());
        assert!(sweep.is_finished());
        assert!(matches!(sweep.step(), Err(SweepError::Finished)));
    }
}

#[test]
fn test_invalid_jobs_are_rejected_before_allocation() {
    assert!(matches!(
        Axis::linspace(AxisKind::Wavelength, 900.0, 1000.0, 0),
        Err(ConfigurationError::EmptyAxis { axis: AxisKind::Wavelength })
    ));

    let mut spec = circle_spec();
    spec.geometry = GeometryKind::Rectangle;
    assert!(matches!(
        Sweep::new(spec, StubSolver::default()),
        Err(ConfigurationError::ShapeAxes { .. })
    ));

    let stack = LayerStack { metasurface_material: "Unobtainium.txt".into(), ..LayerStack::default() };
    let spec = circle_spec().with_stack(stack);
    let solver = EffectiveMediumSolver::new(MaterialLibrary::builtin());
    assert!(matches!(Sweep::new(spec, solver), Err(ConfigurationError::Stack(_))));
}

#[test]
fn test_effective_medium_sweep_is_physical() {
    let solver = EffectiveMediumSolver::with_resolution(MaterialLibrary::builtin(), 64);
    let mut sweep = Sweep::new(circle_spec(), solver).unwrap();
    let dataset = sweep.run(&mut RecordingHost::default()).unwrap().unwrap();

    assert!(dataset.transmittance().iter().all(|t| t.is_finite() && *t >= 0.0));
    assert!(dataset.phase().iter().all(|p| p.is_finite()));
    // A circle has no preferred axis.
    let cross = dataset.channel_transmittance(PolarizationChannel::Yx);
    assert!(cross.iter().all(|t| t.abs() < 1e-12));
}

#[test]
fn test_viewer_on_published_dataset() {
    let dataset = Sweep::new(circle_spec(), StubSolver::default())
        .unwrap()
        .run(&mut RecordingHost::default())
        .unwrap()
        .unwrap();
    let snapshot = dataset.clone();
    let mut viewer = SliceViewer::new(Arc::new(dataset));

    let View::Image(image) = viewer.set_free_axes(3, 0).unwrap().clone() else {
        panic!("expected an image view");
    };
    assert_eq!(image.transmittance.dim(), (2, 3));
    assert_eq!(image.extent, [100.0, 300.0, 900.0, 1000.0]);
    assert_eq!(image.phase[[0, 0]], 0.0);
    assert!(image.phase.iter().all(|p| (0.0..std::f64::consts::TAU).contains(p)));

    viewer.set_channel(PolarizationChannel::Rl).unwrap();
    assert_eq!(viewer.view().map(View::channel), Some(PolarizationChannel::Rl));
    assert_eq!(viewer.dataset().as_ref(), &snapshot);
}
