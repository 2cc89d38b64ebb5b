//! Sweep job description.
//!
//! A [`ScanSpec`] fixes the geometry, the three always-present axes and the
//! shape axes of that geometry, plus the static parameters handed to every
//! solver call. [`ScanSpec::validate`] is the gate in front of any tensor
//! allocation.

use metasweep_geometry::{GeometryError, GeometryKind, Shape};
use thiserror::Error;

use crate::axis::{Axis, AxisKind};
use crate::solver::SolverError;
use crate::types::{Device, LayerStack, PointConfig};

/// Default number of Fourier harmonics per direction.
pub const DEFAULT_HARMONIC_ORDER: usize = 7;

/// A sweep job that cannot be started.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Axis '{axis}' has no points (count must be at least 1)")]
    EmptyAxis { axis: AxisKind },

    #[error("Axis '{axis}' has invalid value {value}")]
    InvalidAxisValue { axis: AxisKind, value: f64 },

    #[error("Unknown axis '{0}'")]
    UnknownAxis(String),

    #[error("Geometry '{geometry}' sweeps [{expected}] but the job gives [{got}]")]
    ShapeAxes {
        geometry: GeometryKind,
        expected: String,
        got: String,
    },

    #[error("Axis in slot {slot} must be {expected}, found {got}")]
    AxisOrder {
        slot: usize,
        expected: AxisKind,
        got: AxisKind,
    },

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("No material given for the {layer} layer")]
    EmptyMaterial { layer: &'static str },

    #[error("The {layer} layer has invalid thickness {value}")]
    InvalidThickness { layer: &'static str, value: f64 },

    #[error("Layer stack rejected: {0}")]
    Stack(#[source] SolverError),

    #[error("Unknown polarization channel '{0}'")]
    UnknownChannel(String),

    #[error("Invalid device '{0}' (expected cpu or cuda:N)")]
    InvalidDevice(String),
}

/// One full sweep job.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSpec {
    pub geometry: GeometryKind,
    pub wavelength: Axis,
    pub period: Axis,
    pub thickness: Axis,
    /// In [`GeometryKind::parameters`] order.
    pub shape_axes: Vec<Axis>,
    pub stack: LayerStack,
    pub harmonic_order: usize,
    pub device: Device,
}

impl ScanSpec {
    /// A job with the default stack, harmonic order and device.
    pub fn new(
        geometry: GeometryKind,
        wavelength: Axis,
        period: Axis,
        thickness: Axis,
        shape_axes: Vec<Axis>,
    ) -> Self {
        Self {
            geometry,
            wavelength,
            period,
            thickness,
            shape_axes,
            stack: LayerStack::default(),
            harmonic_order: DEFAULT_HARMONIC_ORDER,
            device: Device::Cpu,
        }
    }

    pub fn with_stack(mut self, stack: LayerStack) -> Self {
        self.stack = stack;
        self
    }

    pub fn with_harmonic_order(mut self, order: usize) -> Self {
        self.harmonic_order = order;
        self
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// All axes in tensor order: wavelength, period, thickness, then shape axes.
    pub fn axes(&self) -> Vec<&Axis> {
        [&self.wavelength, &self.period, &self.thickness]
            .into_iter()
            .chain(self.shape_axes.iter())
            .collect()
    }

    /// Axis counts, without the trailing channel dimension.
    pub fn grid_shape(&self) -> Vec<usize> {
        self.axes().iter().map(|a| a.count()).collect()
    }

    pub fn total_points(&self) -> usize {
        self.grid_shape().iter().product()
    }

    /// Check everything that can be checked without a solver.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (slot, (axis, expected)) in self.axes().iter().zip(AxisKind::FIXED).enumerate() {
            if axis.kind != expected {
                return Err(ConfigurationError::AxisOrder { slot, expected, got: axis.kind });
            }
        }

        let expected = AxisKind::all_for(self.geometry);
        let got: Vec<AxisKind> = self.axes().iter().map(|a| a.kind).collect();
        if got != expected {
            return Err(ConfigurationError::ShapeAxes {
                geometry: self.geometry,
                expected: join(&expected[3..]),
                got: join(&got[3..]),
            });
        }

        for axis in self.axes() {
            if axis.count() == 0 {
                return Err(ConfigurationError::EmptyAxis { axis: axis.kind });
            }
        }
        for axis in [&self.wavelength, &self.period] {
            if let Some(&value) = axis.values().iter().find(|&&v| v <= 0.0) {
                return Err(ConfigurationError::InvalidAxisValue { axis: axis.kind, value });
            }
        }

        self.stack.validate()
    }

    /// Axis values at a grid index.
    pub fn values_at(&self, index: &[usize]) -> Vec<f64> {
        self.axes().iter().zip(index).map(|(axis, &i)| axis.values()[i]).collect()
    }

    /// Per-point configuration at a grid index.
    pub fn point_config(&self, index: &[usize]) -> Result<PointConfig<'_>, GeometryError> {
        let values = self.values_at(index);
        let shape = Shape::from_parameters(self.geometry, &values[3..])?;
        Ok(PointConfig {
            shape,
            wavelength: values[0],
            period: values[1],
            thickness: values[2],
            stack: &self.stack,
            harmonic_order: self.harmonic_order,
            device: self.device,
        })
    }

    /// Configuration built from the first value of every axis.
    pub fn first_point(&self) -> Result<PointConfig<'_>, GeometryError> {
        self.point_config(&vec![0; self.axes().len()])
    }
}

fn join(kinds: &[AxisKind]) -> String {
    kinds.iter().map(|k| k.key()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use metasweep_geometry::ShapeParameter;

    fn circle_spec() -> ScanSpec {
        ScanSpec::new(
            GeometryKind::Circle,
            Axis::linspace(AxisKind::Wavelength, 900.0, 1000.0, 3).unwrap(),
            Axis::fixed(AxisKind::Period, 500.0).unwrap(),
            Axis::fixed(AxisKind::Thickness, 600.0).unwrap(),
            vec![Axis::linspace(AxisKind::Shape(ShapeParameter::R), 100.0, 200.0, 2).unwrap()],
        )
    }

    #[test]
    fn test_grid_shape_and_total() {
        let spec = circle_spec();
        spec.validate().unwrap();
        assert_eq!(spec.grid_shape(), vec![3, 1, 1, 2]);
        assert_eq!(spec.total_points(), 6);
    }

    #[test]
    fn test_axes_of_another_geometry_are_rejected() {
        let mut spec = circle_spec();
        spec.shape_axes = vec![Axis::fixed(AxisKind::Shape(ShapeParameter::Wx), 100.0).unwrap()];
        let err = spec.validate().unwrap_err();
        assert!(matches!(err, ConfigurationError::ShapeAxes { .. }));
        assert!(err.to_string().contains("[R]"));
    }

    #[test]
    fn test_fixed_axes_must_be_in_order() {
        let mut spec = circle_spec();
        std::mem::swap(&mut spec.period, &mut spec.thickness);
        assert!(matches!(spec.validate(), Err(ConfigurationError::AxisOrder { slot: 1, .. })));
    }

    #[test]
    fn test_zero_wavelength_is_rejected() {
        let mut spec = circle_spec();
        spec.wavelength = Axis::fixed(AxisKind::Wavelength, 0.0).unwrap();
        assert!(matches!(spec.validate(), Err(ConfigurationError::InvalidAxisValue { .. })));
    }

    #[test]
    fn test_point_config_reads_every_axis() {
        let spec = circle_spec();
        let point = spec.point_config(&[2, 0, 0, 1]).unwrap();
        assert_eq!(point.wavelength, 1000.0);
        assert_eq!(point.period, 500.0);
        assert_eq!(point.thickness, 600.0);
        assert_eq!(point.shape, Shape::Circle { r: 200.0 });
        assert_eq!(point.harmonic_order, DEFAULT_HARMONIC_ORDER);
    }
}
