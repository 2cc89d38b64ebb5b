//! # metasweep Core
//!
//! Orchestration around a per-point electromagnetic solver: the grid sweep
//! that fills the result tensors, the tensors themselves, and the slicing
//! engine that turns them into plottable views.
//!
//! ## Architecture
//!
//! A [`scan::ScanSpec`] names the swept axes. [`sweep::Sweep`] walks their
//! Cartesian product in row-major order, asking a
//! [`solver::ScatteringSolver`] for the four linear transmission
//! coefficients of each point and expanding them into eight polarization
//! channels with [`polarization`]. A completed sweep publishes an immutable
//! [`dataset::ResultDataset`]; [`view`] slices it into line or image views
//! and [`io`] persists it.
//!
//! ## Modules
//!
//! - [`axis`] — Swept axes and their values.
//! - [`types`] — Polarization channels, devices, layer stacks, per-point configuration.
//! - [`polarization`] — Linear to circular basis transform.
//! - [`solver`] — Solver trait and the effective-medium preview solver.
//! - [`scan`] — Sweep job description and validation.
//! - [`sweep`] — Cooperative sweep scheduler.
//! - [`dataset`] — Result tensors with axis metadata.
//! - [`view`] — Slice selection, rendering, colour scales and colormaps.
//! - [`io`] — `.npz`, `.mat`, JSON and CSV persistence.

pub mod axis;
pub mod dataset;
pub mod io;
pub mod polarization;
pub mod scan;
pub mod solver;
pub mod sweep;
pub mod types;
pub mod view;

pub use axis::{Axis, AxisKind};
pub use dataset::ResultDataset;
pub use scan::{ConfigurationError, ScanSpec};
pub use sweep::{Sweep, SweepError, SweepHandle, SweepHost, SweepStep};
pub use types::{Device, LayerStack, PointConfig, PolarizationChannel};
