//! # metasweep Materials
//!
//! Refractive-index providers for the layers of a metasurface stack. All
//! materials implement the [`MaterialProvider`](provider::MaterialProvider)
//! trait, which returns the complex index $\tilde{n} = n + ik$ at a given
//! vacuum wavelength.
//!
//! ## Available data sources
//!
//! | Source | Module | Notes |
//! |--------|--------|-------|
//! | Tabulated `λ n k` text files | [`tabulated`] | Spline-interpolated, range-checked |
//! | Crystalline Si (built in) | [`tabulated`] | 400–1600 nm |
//! | Sellmeier fused silica (built in) | [`dispersion`] | 210–6700 nm |
//! | Constant index (`air`) | [`dispersion`] | All wavelengths |
//!
//! Materials are looked up by name through a [`MaterialLibrary`](library::MaterialLibrary),
//! which also scans a directory of `*.txt` tables.

pub mod dispersion;
pub mod library;
pub mod provider;
pub mod spline;
pub mod tabulated;

pub use library::MaterialLibrary;
pub use provider::{MaterialError, MaterialProvider};
