//! The published result of a sweep.
//!
//! A [`ResultDataset`] is immutable: it has no mutating methods and is
//! shared with viewers behind an `Arc`. Both tensors have shape
//! `[axis counts..., 8]`, the last dimension being
//! [`PolarizationChannel`] order.

use metasweep_geometry::GeometryKind;
use ndarray::{ArrayD, ArrayViewD, Axis as NdAxis};
use thiserror::Error;

use crate::axis::{Axis, AxisKind};
use crate::types::PolarizationChannel;

/// Axis metadata and tensors that do not describe one consistent dataset.
#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    #[error("Geometry '{geometry}' has axes [{expected}], dataset has [{got}]")]
    Axes {
        geometry: GeometryKind,
        expected: String,
        got: String,
    },

    #[error("{tensor} tensor has shape {got:?}, expected {expected:?}")]
    TensorShape {
        tensor: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },
}

/// Tensors plus the axes that index them.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultDataset {
    geometry: GeometryKind,
    axes: Vec<Axis>,
    transmittance: ArrayD<f64>,
    phase: ArrayD<f64>,
}

impl ResultDataset {
    /// Check that `axes` are the axes of `geometry` and that both tensors
    /// have shape `axis counts + [8]`.
    pub fn new(
        geometry: GeometryKind,
        axes: Vec<Axis>,
        transmittance: ArrayD<f64>,
        phase: ArrayD<f64>,
    ) -> Result<Self, DatasetError> {
        let expected_kinds = AxisKind::all_for(geometry);
        let kinds: Vec<AxisKind> = axes.iter().map(|a| a.kind).collect();
        if kinds != expected_kinds {
            let join = |k: &[AxisKind]| k.iter().map(|k| k.key()).collect::<Vec<_>>().join(", ");
            return Err(DatasetError::Axes {
                geometry,
                expected: join(&expected_kinds),
                got: join(&kinds),
            });
        }

        let mut expected: Vec<usize> = axes.iter().map(Axis::count).collect();
        expected.push(PolarizationChannel::COUNT);
        for (tensor, array) in [("transmission", &transmittance), ("phase", &phase)] {
            if array.shape() != expected.as_slice() {
                return Err(DatasetError::TensorShape {
                    tensor,
                    expected,
                    got: array.shape().to_vec(),
                });
            }
        }

        Ok(Self::from_parts(geometry, axes, transmittance, phase))
    }

    /// Used by the scheduler, which builds consistent parts by construction.
    pub(crate) fn from_parts(
        geometry: GeometryKind,
        axes: Vec<Axis>,
        transmittance: ArrayD<f64>,
        phase: ArrayD<f64>,
    ) -> Self {
        Self { geometry, axes, transmittance, phase }
    }

    pub fn geometry(&self) -> GeometryKind {
        self.geometry
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn num_axes(&self) -> usize {
        self.axes.len()
    }

    pub fn axis(&self, index: usize) -> Option<&Axis> {
        self.axes.get(index)
    }

    /// Position of the axis called `name`: its key (`Wavelength`,
    /// `Hollow_W`, case-insensitive) or its display label.
    pub fn axis_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.axes.iter().position(|a| {
            a.name().eq_ignore_ascii_case(name) || a.kind.label(self.geometry) == name
        })
    }

    pub fn axis_by_name(&self, name: &str) -> Option<&Axis> {
        self.axis_index(name).map(|i| &self.axes[i])
    }

    /// Display label of axis `index`.
    pub fn label(&self, index: usize) -> Option<&'static str> {
        self.axes.get(index).map(|a| a.kind.label(self.geometry))
    }

    /// Display labels of all axes, in order.
    pub fn labels(&self) -> Vec<&'static str> {
        self.axes.iter().map(|a| a.kind.label(self.geometry)).collect()
    }

    /// Axis counts, without the channel dimension.
    pub fn grid_shape(&self) -> Vec<usize> {
        self.axes.iter().map(Axis::count).collect()
    }

    pub fn transmittance(&self) -> &ArrayD<f64> {
        &self.transmittance
    }

    pub fn phase(&self) -> &ArrayD<f64> {
        &self.phase
    }

    /// Transmittance of one channel over the whole grid.
    pub fn channel_transmittance(&self, channel: PolarizationChannel) -> ArrayViewD<'_, f64> {
        self.transmittance.index_axis(NdAxis(self.axes.len()), channel.index())
    }

    /// Raw phase of one channel over the whole grid.
    pub fn channel_phase(&self, channel: PolarizationChannel) -> ArrayViewD<'_, f64> {
        self.phase.index_axis(NdAxis(self.axes.len()), channel.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metasweep_geometry::ShapeParameter;
    use ndarray::IxDyn;

    fn axes() -> Vec<Axis> {
        vec![
            Axis::linspace(AxisKind::Wavelength, 900.0, 1000.0, 2).unwrap(),
            Axis::fixed(AxisKind::Period, 500.0).unwrap(),
            Axis::fixed(AxisKind::Thickness, 600.0).unwrap(),
            Axis::linspace(AxisKind::Shape(ShapeParameter::R), 100.0, 300.0, 3).unwrap(),
        ]
    }

    #[test]
    fn test_new_checks_tensor_shape() {
        let good = ArrayD::zeros(IxDyn(&[2, 1, 1, 3, 8]));
        let bad = ArrayD::zeros(IxDyn(&[2, 1, 1, 3, 4]));
        assert!(ResultDataset::new(GeometryKind::Circle, axes(), good.clone(), good.clone()).is_ok());
        let err = ResultDataset::new(GeometryKind::Circle, axes(), good, bad).unwrap_err();
        assert!(matches!(err, DatasetError::TensorShape { tensor: "phase", .. }));
    }

    #[test]
    fn test_new_checks_axes_match_geometry() {
        let t = ArrayD::zeros(IxDyn(&[2, 1, 1, 3, 8]));
        let err = ResultDataset::new(GeometryKind::Square, axes(), t.clone(), t).unwrap_err();
        assert!(matches!(err, DatasetError::Axes { .. }));
    }

    #[test]
    fn test_axis_lookup() {
        let t = ArrayD::zeros(IxDyn(&[2, 1, 1, 3, 8]));
        let dataset = ResultDataset::new(GeometryKind::Circle, axes(), t.clone(), t).unwrap();
        assert_eq!(dataset.axis_index("wavelength"), Some(0));
        assert_eq!(dataset.axis_index("R (nm)"), Some(3));
        assert_eq!(dataset.axis_index("Wx"), None);
        assert_eq!(dataset.axis_by_name("Thickness").unwrap().values(), &[600.0]);
        assert_eq!(
            dataset.labels(),
            vec!["Wavelength (nm)", "Period (nm)", "Thickness (nm)", "R (nm)"]
        );
        assert_eq!(dataset.channel_transmittance(PolarizationChannel::Rr).shape(), &[2, 1, 1, 3]);
    }
}
