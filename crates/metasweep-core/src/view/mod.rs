//! Slice visualisation of result tensors.
//!
//! A view is a pure function of a dataset, a [`SliceSelection`] and a
//! channel. Two free axes give an image; the same axis twice gives a line.
//! Every other axis is pinned to one index.
//!
//! Phases are shown relative to the first rendered sample and wrapped into
//! $[0, 2\pi)$. Images are laid out with rows along the second free axis
//! (vertical, first row at the bottom) and columns along the first free
//! axis (horizontal), whatever their order in the tensor.

pub mod color;
pub mod viewer;

use std::collections::BTreeMap;
use std::f64::consts::TAU;

use ndarray::{Array2, ArrayD};
use thiserror::Error;

use crate::dataset::ResultDataset;
use crate::types::PolarizationChannel;

pub use color::{ColorRange, Colormap, RangeError};
pub use viewer::SliceViewer;

/// Y-axis label of transmittance line plots.
pub const TRANSMITTANCE_LABEL: &str = "Transmittance (a.u.)";
/// Y-axis label of phase line plots.
pub const PHASE_LABEL: &str = "Phase (rad)";

/// A selection that does not address a slice of the dataset.
#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
    #[error("Axis {axis} does not exist (the dataset has {num_axes} axes)")]
    NoSuchAxis { axis: usize, num_axes: usize },

    #[error("Axis {axis} is free and cannot also be fixed")]
    FixedFreeAxis { axis: usize },

    #[error("Axis {axis} needs a fixed index")]
    MissingIndex { axis: usize },

    #[error("Index {index} is out of range for axis {axis} ({count} values)")]
    IndexOutOfRange { axis: usize, index: usize, count: usize },
}

/// Which axes stay free and where the others are pinned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceSelection {
    /// Horizontal axis.
    pub free_a: usize,
    /// Vertical axis; equal to `free_a` for a line view.
    pub free_b: usize,
    /// Index of every non-free axis.
    pub fixed: BTreeMap<usize, usize>,
}

impl SliceSelection {
    pub fn new(free_a: usize, free_b: usize, fixed: impl IntoIterator<Item = (usize, usize)>) -> Self {
        Self { free_a, free_b, fixed: fixed.into_iter().collect() }
    }

    /// A line along `axis`.
    pub fn line(axis: usize, fixed: impl IntoIterator<Item = (usize, usize)>) -> Self {
        Self::new(axis, axis, fixed)
    }

    pub fn is_line(&self) -> bool {
        self.free_a == self.free_b
    }

    fn is_free(&self, axis: usize) -> bool {
        axis == self.free_a || axis == self.free_b
    }

    /// Every non-free axis must be fixed in range, and nothing else may be.
    pub fn validate(&self, dataset: &ResultDataset) -> Result<(), SelectionError> {
        let num_axes = dataset.num_axes();
        for axis in [self.free_a, self.free_b] {
            if axis >= num_axes {
                return Err(SelectionError::NoSuchAxis { axis, num_axes });
            }
        }
        for &axis in self.fixed.keys() {
            if axis >= num_axes {
                return Err(SelectionError::NoSuchAxis { axis, num_axes });
            }
            if self.is_free(axis) {
                return Err(SelectionError::FixedFreeAxis { axis });
            }
        }
        for (axis, meta) in dataset.axes().iter().enumerate() {
            if self.is_free(axis) {
                continue;
            }
            let index = *self.fixed.get(&axis).ok_or(SelectionError::MissingIndex { axis })?;
            if index >= meta.count() {
                return Err(SelectionError::IndexOutOfRange { axis, index, count: meta.count() });
            }
        }
        Ok(())
    }
}

/// One channel along one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct LineView {
    pub channel: PolarizationChannel,
    pub x_label: &'static str,
    pub x_values: Vec<f64>,
    pub transmittance: Vec<f64>,
    /// Relative to the first sample, in $[0, 2\pi)$.
    pub phase: Vec<f64>,
}

/// One channel over two axes.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageView {
    pub channel: PolarizationChannel,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub x_values: Vec<f64>,
    pub y_values: Vec<f64>,
    /// `[x first, x last, y first, y last]`.
    pub extent: [f64; 4],
    /// Shape `(y count, x count)`; row 0 is the first y value.
    pub transmittance: Array2<f64>,
    /// Relative to element `[0, 0]`, in $[0, 2\pi)$.
    pub phase: Array2<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Line(LineView),
    Image(ImageView),
}

impl View {
    pub fn channel(&self) -> PolarizationChannel {
        match self {
            View::Line(line) => line.channel,
            View::Image(image) => image.channel,
        }
    }
}

/// `(phase - reference) mod 2π`, always in `[0, 2π)`.
pub fn wrap_phase(phase: f64, reference: f64) -> f64 {
    let wrapped = (phase - reference).rem_euclid(TAU);
    // rem_euclid can round up to exactly 2π for tiny negative differences.
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Render one channel of `dataset` for `selection`. The dataset is only read.
pub fn render(
    dataset: &ResultDataset,
    selection: &SliceSelection,
    channel: PolarizationChannel,
) -> Result<View, SelectionError> {
    selection.validate(dataset)?;

    let num_axes = dataset.num_axes();
    let mut index = vec![0; num_axes + 1];
    for (&axis, &i) in &selection.fixed {
        index[axis] = i;
    }
    index[num_axes] = channel.index();

    let transmittance = dataset.transmittance();
    let phase = dataset.phase();
    let axes = dataset.axes();

    if selection.is_line() {
        let d = selection.free_a;
        let (t, p) = gather_line(transmittance, phase, &mut index, d, axes[d].count());
        let reference = p.first().copied().unwrap_or(0.0);
        return Ok(View::Line(LineView {
            channel,
            x_label: axes[d].kind.label(dataset.geometry()),
            x_values: axes[d].values().to_vec(),
            transmittance: t,
            phase: p.into_iter().map(|v| wrap_phase(v, reference)).collect(),
        }));
    }

    let (a, b) = (selection.free_a, selection.free_b);
    let (x_axis, y_axis) = (&axes[a], &axes[b]);
    let shape = (y_axis.count(), x_axis.count());
    let mut t = Array2::zeros(shape);
    let mut p = Array2::zeros(shape);
    for row in 0..shape.0 {
        index[b] = row;
        for col in 0..shape.1 {
            index[a] = col;
            t[[row, col]] = transmittance[index.as_slice()];
            p[[row, col]] = phase[index.as_slice()];
        }
    }
    let reference = p[[0, 0]];
    p.mapv_inplace(|v| wrap_phase(v, reference));

    Ok(View::Image(ImageView {
        channel,
        x_label: x_axis.kind.label(dataset.geometry()),
        y_label: y_axis.kind.label(dataset.geometry()),
        x_values: x_axis.values().to_vec(),
        y_values: y_axis.values().to_vec(),
        extent: [x_axis.first(), x_axis.last(), y_axis.first(), y_axis.last()],
        transmittance: t,
        phase: p,
    }))
}

fn gather_line(
    transmittance: &ArrayD<f64>,
    phase: &ArrayD<f64>,
    index: &mut [usize],
    axis: usize,
    count: usize,
) -> (Vec<f64>, Vec<f64>) {
    let mut t = Vec::with_capacity(count);
    let mut p = Vec::with_capacity(count);
    for i in 0..count {
        index[axis] = i;
        t.push(transmittance[&*index]);
        p.push(phase[&*index]);
    }
    (t, p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::{Axis, AxisKind};
    use approx::assert_relative_eq;
    use metasweep_geometry::{GeometryKind, ShapeParameter};
    use ndarray::IxDyn;

    /// Circle dataset of shape [4, 1, 3, 2, 8] whose values encode their
    /// own grid index.
    fn dataset() -> ResultDataset {
        let axes = vec![
            Axis::from_values(AxisKind::Wavelength, vec![900.0, 920.0, 940.0, 960.0]).unwrap(),
            Axis::fixed(AxisKind::Period, 500.0).unwrap(),
            Axis::from_values(AxisKind::Thickness, vec![400.0, 500.0, 600.0]).unwrap(),
            Axis::from_values(AxisKind::Shape(ShapeParameter::R), vec![100.0, 200.0]).unwrap(),
        ];
        let t = ArrayD::from_shape_fn(IxDyn(&[4, 1, 3, 2, 8]), |ix| {
            (ix[0] * 1000 + ix[2] * 100 + ix[3] * 10 + ix[4]) as f64
        });
        let p = ArrayD::from_shape_fn(IxDyn(&[4, 1, 3, 2, 8]), |ix| 0.5 + ix[0] as f64);
        ResultDataset::new(GeometryKind::Circle, axes, t, p).unwrap()
    }

    #[test]
    fn test_line_view_follows_axis() {
        let data = dataset();
        let selection = SliceSelection::line(0, [(1, 0), (2, 1), (3, 1)]);
        let View::Line(line) = render(&data, &selection, PolarizationChannel::Rl).unwrap() else {
            panic!("expected a line view");
        };
        assert_eq!(line.x_label, "Wavelength (nm)");
        assert_eq!(line.x_values, vec![900.0, 920.0, 940.0, 960.0]);
        assert_eq!(line.transmittance, vec![115.0, 1115.0, 2115.0, 3115.0]);
        assert_eq!(line.phase, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_phase_correction_wraps() {
        let raw = [0.5, 1.5, 2.5, 0.5];
        let corrected: Vec<f64> = raw.iter().map(|&p| wrap_phase(p, raw[0])).collect();
        assert_eq!(corrected, vec![0.0, 1.0, 2.0, 0.0]);
        assert_relative_eq!(wrap_phase(0.0, 1.0), TAU - 1.0);
        assert_eq!(wrap_phase(-1e-18, 0.0), 0.0);
    }

    #[test]
    fn test_image_layout_is_independent_of_axis_order() {
        let data = dataset();
        let fixed = [(1, 0), (3, 0)];
        let View::Image(ab) = render(&data, &SliceSelection::new(0, 2, fixed), PolarizationChannel::Xx).unwrap()
        else {
            panic!("expected an image view");
        };
        // Columns follow wavelength, rows follow thickness.
        assert_eq!(ab.transmittance.dim(), (3, 4));
        assert_eq!(ab.transmittance[[2, 1]], 1200.0);
        assert_eq!(ab.extent, [900.0, 960.0, 400.0, 600.0]);
        assert_eq!((ab.x_label, ab.y_label), ("Wavelength (nm)", "Thickness (nm)"));

        let View::Image(ba) = render(&data, &SliceSelection::new(2, 0, fixed), PolarizationChannel::Xx).unwrap()
        else {
            panic!("expected an image view");
        };
        assert_eq!(ba.transmittance.dim(), (4, 3));
        assert_eq!(ba.transmittance, ab.transmittance.t());
        assert_eq!(ba.extent, [400.0, 600.0, 900.0, 960.0]);
    }

    #[test]
    fn test_image_phase_is_relative_to_first_element() {
        let data = dataset();
        let View::Image(image) =
            render(&data, &SliceSelection::new(3, 0, [(1, 0), (2, 2)]), PolarizationChannel::Ll).unwrap()
        else {
            panic!("expected an image view");
        };
        assert_eq!(image.phase[[0, 0]], 0.0);
        assert_eq!(image.phase[[3, 1]], 3.0);
    }

    #[test]
    fn test_selection_errors() {
        let data = dataset();
        let missing = SliceSelection::new(0, 2, [(1, 0)]);
        assert_eq!(missing.validate(&data), Err(SelectionError::MissingIndex { axis: 3 }));

        let out_of_range = SliceSelection::new(0, 2, [(1, 0), (3, 2)]);
        assert_eq!(
            out_of_range.validate(&data),
            Err(SelectionError::IndexOutOfRange { axis: 3, index: 2, count: 2 })
        );

        let over = SliceSelection::line(0, [(0, 1), (1, 0), (2, 0), (3, 0)]);
        assert_eq!(over.validate(&data), Err(SelectionError::FixedFreeAxis { axis: 0 }));

        let bad_axis = SliceSelection::new(0, 7, [(1, 0), (2, 0), (3, 0)]);
        assert_eq!(bad_axis.validate(&data), Err(SelectionError::NoSuchAxis { axis: 7, num_axes: 4 }));
    }

    #[test]
    fn test_render_leaves_dataset_untouched() {
        let data = dataset();
        let before = data.clone();
        let _ = render(&data, &SliceSelection::new(0, 3, [(1, 0), (2, 0)]), PolarizationChannel::Rr).unwrap();
        assert_eq!(data, before);
    }
}
