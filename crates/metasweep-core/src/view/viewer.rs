//! Stateful query surface over one dataset.
//!
//! [`SliceViewer`] holds the current selection, channel, colormap and colour
//! ranges, and re-renders after every accepted change. A rejected change
//! leaves all of them, and the last rendered view, exactly as they were.

use std::sync::Arc;

use log::warn;

use super::color::{ColorRange, Colormap, RangeError};
use super::{render, SelectionError, SliceSelection, View};
use crate::dataset::ResultDataset;
use crate::types::PolarizationChannel;

#[derive(Debug, Clone)]
pub struct SliceViewer {
    dataset: Arc<ResultDataset>,
    free_a: usize,
    free_b: usize,
    /// One entry per axis; entries of free axes are kept but unused.
    fixed: Vec<usize>,
    channel: PolarizationChannel,
    colormap: Colormap,
    transmittance_range: ColorRange,
    phase_range: ColorRange,
    view: Option<View>,
}

impl SliceViewer {
    /// A line along the first axis, every other axis at index 0, channel `xx`.
    pub fn new(dataset: Arc<ResultDataset>) -> Self {
        let fixed = vec![0; dataset.num_axes()];
        let mut viewer = Self {
            dataset,
            free_a: 0,
            free_b: 0,
            fixed,
            channel: PolarizationChannel::Xx,
            colormap: Colormap::default(),
            transmittance_range: ColorRange::TRANSMITTANCE,
            phase_range: ColorRange::PHASE,
            view: None,
        };
        if let Err(e) = viewer.render() {
            warn!("Initial view could not be rendered: {e}");
        }
        viewer
    }

    /// Swap in a new dataset, keeping the selection where it still fits.
    pub fn set_dataset(&mut self, dataset: Arc<ResultDataset>) {
        *self = Self {
            colormap: self.colormap,
            transmittance_range: self.transmittance_range,
            phase_range: self.phase_range,
            channel: self.channel,
            ..Self::new(dataset)
        };
    }

    pub fn dataset(&self) -> &Arc<ResultDataset> {
        &self.dataset
    }

    pub fn selection(&self) -> SliceSelection {
        let fixed = self
            .fixed
            .iter()
            .enumerate()
            .filter(|(axis, _)| *axis != self.free_a && *axis != self.free_b)
            .map(|(axis, &index)| (axis, index));
        SliceSelection::new(self.free_a, self.free_b, fixed)
    }

    /// Choose the horizontal (`a`) and vertical (`b`) axes; `a == b` plots a line.
    pub fn set_free_axes(&mut self, a: usize, b: usize) -> Result<&View, SelectionError> {
        let previous = (self.free_a, self.free_b);
        (self.free_a, self.free_b) = (a, b);
        self.render_or_restore(|viewer| (viewer.free_a, viewer.free_b) = previous)
    }

    /// Pin `axis` to `index`. Fixing a currently free axis only takes effect
    /// once it stops being free.
    pub fn set_fixed_index(&mut self, axis: usize, index: usize) -> Result<&View, SelectionError> {
        let num_axes = self.dataset.num_axes();
        let count = self
            .dataset
            .axis(axis)
            .ok_or(SelectionError::NoSuchAxis { axis, num_axes })?
            .count();
        if index >= count {
            return Err(SelectionError::IndexOutOfRange { axis, index, count });
        }
        let previous = self.fixed[axis];
        self.fixed[axis] = index;
        self.render_or_restore(|viewer| viewer.fixed[axis] = previous)
    }

    pub fn set_channel(&mut self, channel: PolarizationChannel) -> Result<&View, SelectionError> {
        let previous = self.channel;
        self.channel = channel;
        self.render_or_restore(|viewer| viewer.channel = previous)
    }

    /// Select a palette by name.
    pub fn set_colormap(&mut self, name: &str) -> Result<Colormap, RangeError> {
        self.colormap = name.parse()?;
        Ok(self.colormap)
    }

    pub fn set_transmittance_range(&mut self, min: f64, max: f64) -> Result<ColorRange, RangeError> {
        self.transmittance_range = ColorRange::new(min, max)?;
        Ok(self.transmittance_range)
    }

    pub fn set_phase_range(&mut self, min: f64, max: f64) -> Result<ColorRange, RangeError> {
        self.phase_range = ColorRange::new(min, max)?;
        Ok(self.phase_range)
    }

    /// Text-field variant; empty fields fall back to the default bounds.
    pub fn set_transmittance_range_text(&mut self, min: &str, max: &str) -> Result<ColorRange, RangeError> {
        self.transmittance_range = ColorRange::parse(min, max, ColorRange::TRANSMITTANCE)?;
        Ok(self.transmittance_range)
    }

    pub fn set_phase_range_text(&mut self, min: &str, max: &str) -> Result<ColorRange, RangeError> {
        self.phase_range = ColorRange::parse(min, max, ColorRange::PHASE)?;
        Ok(self.phase_range)
    }

    pub fn free_axes(&self) -> (usize, usize) {
        (self.free_a, self.free_b)
    }

    pub fn fixed_index(&self, axis: usize) -> Option<usize> {
        self.fixed.get(axis).copied()
    }

    pub fn channel(&self) -> PolarizationChannel {
        self.channel
    }

    pub fn colormap(&self) -> Colormap {
        self.colormap
    }

    pub fn transmittance_range(&self) -> ColorRange {
        self.transmittance_range
    }

    pub fn phase_range(&self) -> ColorRange {
        self.phase_range
    }

    /// The last successfully rendered view.
    pub fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }

    /// Re-render from the current state.
    pub fn render(&mut self) -> Result<&View, SelectionError> {
        let view = render(&self.dataset, &self.selection(), self.channel)?;
        Ok(self.view.insert(view))
    }

    fn render_or_restore(&mut self, restore: impl FnOnce(&mut Self)) -> Result<&View, SelectionError> {
        match render(&self.dataset, &self.selection(), self.channel) {
            Ok(view) => Ok(self.view.insert(view)),
            Err(e) => {
                restore(self);
                Err(e)
            }
        }
    }
}
