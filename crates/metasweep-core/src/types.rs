//! Core types shared across the sweep pipeline.
//!
//! This module defines the polarization channels of the result tensors, the
//! compute device, the layer stack around the metasurface and the immutable
//! per-point configuration handed to a solver.

use std::fmt;
use std::str::FromStr;

use metasweep_geometry::Shape;
use serde::{Deserialize, Serialize};

use crate::scan::ConfigurationError;

/// One of the eight transmission channels stored in the last tensor
/// dimension. The order is fixed and shared by the transmittance and phase
/// tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PolarizationChannel {
    Xx,
    Yx,
    Xy,
    Yy,
    Ll,
    Rl,
    Lr,
    Rr,
}

impl PolarizationChannel {
    pub const COUNT: usize = 8;

    /// All channels in tensor order.
    pub const ALL: [PolarizationChannel; 8] = [
        PolarizationChannel::Xx,
        PolarizationChannel::Yx,
        PolarizationChannel::Xy,
        PolarizationChannel::Yy,
        PolarizationChannel::Ll,
        PolarizationChannel::Rl,
        PolarizationChannel::Lr,
        PolarizationChannel::Rr,
    ];

    /// Position in the last tensor dimension.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            PolarizationChannel::Xx => "xx",
            PolarizationChannel::Yx => "yx",
            PolarizationChannel::Xy => "xy",
            PolarizationChannel::Yy => "yy",
            PolarizationChannel::Ll => "LL",
            PolarizationChannel::Rl => "RL",
            PolarizationChannel::Lr => "LR",
            PolarizationChannel::Rr => "RR",
        }
    }

    pub fn is_circular(self) -> bool {
        self.index() >= 4
    }
}

impl fmt::Display for PolarizationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PolarizationChannel {
    type Err = ConfigurationError;

    /// Channel names are unique ignoring case, so `ll` and `LL` both work.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigurationError::UnknownChannel(s.to_string()))
    }
}

/// Where the solver runs. Passed through to the solver untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,
    Cuda(usize),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => f.write_str("cpu"),
            Device::Cuda(index) => write!(f, "cuda:{index}"),
        }
    }
}

impl FromStr for Device {
    type Err = ConfigurationError;

    /// `cpu`, `cuda` (device 0) or `cuda:N`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.split_once(':') {
            None if lower == "cpu" => Ok(Device::Cpu),
            None if lower == "cuda" => Ok(Device::Cuda(0)),
            Some(("cuda", index)) => index
                .parse()
                .map(Device::Cuda)
                .map_err(|_| ConfigurationError::InvalidDevice(s.to_string())),
            _ => Err(ConfigurationError::InvalidDevice(s.to_string())),
        }
    }
}

/// The layers around the patterned metasurface, light entering from the
/// substrate. Materials are referenced by library name; thicknesses are in nm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerStack {
    /// Semi-infinite input medium.
    pub substrate: String,
    /// Buffer layer between substrate and metasurface.
    pub slab_material: String,
    pub slab_thickness: f64,
    /// Material of the meta-atoms.
    pub metasurface_material: String,
    /// Material around the meta-atoms, and the cap layer above them.
    pub filling_material: String,
    pub filling_thickness: f64,
    /// Semi-infinite output medium.
    pub output: String,
}

impl Default for LayerStack {
    fn default() -> Self {
        Self {
            substrate: "SiO2".into(),
            slab_material: "SiO2".into(),
            slab_thickness: 500.0,
            metasurface_material: "Si".into(),
            filling_material: "SiO2".into(),
            filling_thickness: 500.0,
            output: "air".into(),
        }
    }
}

impl LayerStack {
    /// `(role, material)` pairs, input side first.
    pub fn materials(&self) -> [(&'static str, &str); 5] {
        [
            ("substrate", &self.substrate),
            ("slab", &self.slab_material),
            ("metasurface", &self.metasurface_material),
            ("filling", &self.filling_material),
            ("output", &self.output),
        ]
    }

    /// Names must be non-empty and thicknesses finite and non-negative.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if let Some((layer, _)) = self.materials().into_iter().find(|(_, m)| m.trim().is_empty()) {
            return Err(ConfigurationError::EmptyMaterial { layer });
        }
        for (layer, thickness) in [("slab", self.slab_thickness), ("filling", self.filling_thickness)] {
            if !thickness.is_finite() || thickness < 0.0 {
                return Err(ConfigurationError::InvalidThickness { layer, value: thickness });
            }
        }
        Ok(())
    }
}

/// Everything a solver needs for one grid point. Built fresh for every call
/// and never mutated.
#[derive(Debug, Clone, Copy)]
pub struct PointConfig<'a> {
    pub shape: Shape,
    /// Vacuum wavelength (nm).
    pub wavelength: f64,
    /// Lattice period (nm).
    pub period: f64,
    /// Metasurface layer thickness (nm).
    pub thickness: f64,
    pub stack: &'a LayerStack,
    pub harmonic_order: usize,
    pub device: Device,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_order_is_fixed() {
        let names: Vec<_> = PolarizationChannel::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(names, ["xx", "yx", "xy", "yy", "LL", "RL", "LR", "RR"]);
        for (i, channel) in PolarizationChannel::ALL.into_iter().enumerate() {
            assert_eq!(channel.index(), i);
            assert_eq!(PolarizationChannel::from_index(i), Some(channel));
        }
        assert_eq!(PolarizationChannel::from_index(8), None);
    }

    #[test]
    fn test_channel_parsing_ignores_case() {
        assert_eq!("ll".parse::<PolarizationChannel>().unwrap(), PolarizationChannel::Ll);
        assert_eq!("YX".parse::<PolarizationChannel>().unwrap(), PolarizationChannel::Yx);
        assert!("zz".parse::<PolarizationChannel>().is_err());
    }

    #[test]
    fn test_device_parsing() {
        assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("CUDA".parse::<Device>().unwrap(), Device::Cuda(0));
        assert_eq!("cuda:2".parse::<Device>().unwrap(), Device::Cuda(2));
        assert_eq!(Device::Cuda(1).to_string(), "cuda:1");
        assert!("tpu".parse::<Device>().is_err());
        assert!("cuda:x".parse::<Device>().is_err());
    }

    #[test]
    fn test_empty_material_is_rejected() {
        let stack = LayerStack { filling_material: " ".into(), ..Default::default() };
        assert!(matches!(
            stack.validate(),
            Err(ConfigurationError::EmptyMaterial { layer: "filling" })
        ));
        assert!(LayerStack::default().validate().is_ok());
    }
}
