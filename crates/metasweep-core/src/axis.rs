//! Swept axes.
//!
//! Every sweep has three fixed axes (wavelength, period, thickness) followed
//! by the shape axes of its geometry. An axis never has zero points.

use std::fmt;
use std::str::FromStr;

use metasweep_geometry::{GeometryKind, ShapeParameter};

use crate::scan::ConfigurationError;

/// The physical quantity an axis sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisKind {
    Wavelength,
    Period,
    Thickness,
    Shape(ShapeParameter),
}

impl AxisKind {
    /// The axes every sweep starts with, outermost first.
    pub const FIXED: [AxisKind; 3] = [AxisKind::Wavelength, AxisKind::Period, AxisKind::Thickness];

    /// The full axis list of a sweep over `geometry`, in tensor order.
    pub fn all_for(geometry: GeometryKind) -> Vec<AxisKind> {
        Self::FIXED
            .into_iter()
            .chain(geometry.parameters().iter().map(|&p| AxisKind::Shape(p)))
            .collect()
    }

    /// Persistence key of the axis values.
    pub fn key(self) -> &'static str {
        match self {
            AxisKind::Wavelength => "Wavelength",
            AxisKind::Period => "Period",
            AxisKind::Thickness => "Thickness",
            AxisKind::Shape(p) => p.key(),
        }
    }

    /// Display label, e.g. `Wavelength (nm)` or `Rotation Angle (deg)`.
    pub fn label(self, geometry: GeometryKind) -> &'static str {
        match self {
            AxisKind::Wavelength => "Wavelength (nm)",
            AxisKind::Period => "Period (nm)",
            AxisKind::Thickness => "Thickness (nm)",
            AxisKind::Shape(p) => p.label(geometry),
        }
    }

    /// Angles may be negative; every other quantity is a non-negative length.
    fn allows_negative(self) -> bool {
        matches!(self, AxisKind::Shape(p) if p.is_angle())
    }
}

impl fmt::Display for AxisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for AxisKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        if let Some(kind) = Self::FIXED.into_iter().find(|k| k.key().eq_ignore_ascii_case(wanted)) {
            return Ok(kind);
        }
        wanted
            .parse::<ShapeParameter>()
            .map(AxisKind::Shape)
            .map_err(|_| ConfigurationError::UnknownAxis(s.to_string()))
    }
}

/// One swept quantity and its ordered sample values.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub kind: AxisKind,
    values: Vec<f64>,
}

impl Axis {
    /// `count` evenly spaced values from `min` to `max` inclusive.
    ///
    /// A single point yields `[min]`. The last value is exactly `max`.
    pub fn linspace(kind: AxisKind, min: f64, max: f64, count: usize) -> Result<Self, ConfigurationError> {
        if count == 0 {
            return Err(ConfigurationError::EmptyAxis { axis: kind });
        }
        let values = match count {
            1 => vec![min],
            n => {
                let step = (max - min) / (n - 1) as f64;
                let mut values: Vec<f64> = (0..n).map(|i| min + step * i as f64).collect();
                values[n - 1] = max;
                values
            }
        };
        Self::from_values(kind, values)
    }

    /// A single fixed value.
    pub fn fixed(kind: AxisKind, value: f64) -> Result<Self, ConfigurationError> {
        Self::from_values(kind, vec![value])
    }

    /// Explicit sample values, kept in the given order.
    pub fn from_values(kind: AxisKind, values: Vec<f64>) -> Result<Self, ConfigurationError> {
        if values.is_empty() {
            return Err(ConfigurationError::EmptyAxis { axis: kind });
        }
        if let Some(&value) = values
            .iter()
            .find(|v| !v.is_finite() || (!kind.allows_negative() && **v < 0.0))
        {
            return Err(ConfigurationError::InvalidAxisValue { axis: kind, value });
        }
        Ok(Self { kind, values })
    }

    pub fn name(&self) -> &'static str {
        self.kind.key()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    pub fn first(&self) -> f64 {
        self.values[0]
    }

    pub fn last(&self) -> f64 {
        self.values[self.values.len() - 1]
    }
}
