//! # metasweep Geometry
//!
//! Unit-cell geometries for metasurface sweeps. This crate provides:
//!
//! - **Kinds** ([`kind`]) — The eight supported meta-atom families and the
//!   shape parameters each of them sweeps.
//! - **Shapes** ([`shape`]) — A tagged union holding only the dimensions that
//!   are meaningful for a given kind, with point-containment tests.
//! - **Unit cells** ([`unit_cell`]) — Rasterisation of a shape onto the square
//!   lattice cell for fill-fraction and permittivity previews.

pub mod kind;
pub mod shape;
pub mod unit_cell;

pub use kind::{GeometryError, GeometryKind, ShapeParameter};
pub use shape::Shape;
pub use unit_cell::UnitCell;
