//! Geometry kinds and the shape parameters they sweep.
//!
//! Every [`GeometryKind`] owns a fixed, ordered list of [`ShapeParameter`]s.
//! That list defines the shape axes of a sweep and the order in which they
//! appear in result tensors; parameters of one kind are never mixed with
//! those of another.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building or naming geometries.
#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error(
        "Unknown geometry kind '{0}'. Valid kinds: rectangle, ellipse, circle, rhombus, \
         square, cross, hollow_square, hollow_circle"
    )]
    UnknownKind(String),

    #[error("Unknown shape parameter '{0}'")]
    UnknownParameter(String),

    #[error("Geometry '{kind}' takes {expected} shape parameters, got {got}")]
    ParameterCount {
        kind: GeometryKind,
        expected: usize,
        got: usize,
    },

    #[error("Shape parameter {parameter} = {value} is invalid (dimensions must be finite and >= 0)")]
    InvalidDimension { parameter: ShapeParameter, value: f64 },
}

/// The meta-atom family drawn in the unit cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    Rectangle,
    Ellipse,
    Circle,
    Rhombus,
    Square,
    Cross,
    HollowSquare,
    HollowCircle,
}

impl GeometryKind {
    /// All kinds, in the order they are offered to users.
    pub const ALL: [GeometryKind; 8] = [
        GeometryKind::Rectangle,
        GeometryKind::Ellipse,
        GeometryKind::Circle,
        GeometryKind::Rhombus,
        GeometryKind::Square,
        GeometryKind::Cross,
        GeometryKind::HollowSquare,
        GeometryKind::HollowCircle,
    ];

    /// Snake-case identifier used in job files and persisted datasets.
    pub fn as_str(self) -> &'static str {
        match self {
            GeometryKind::Rectangle => "rectangle",
            GeometryKind::Ellipse => "ellipse",
            GeometryKind::Circle => "circle",
            GeometryKind::Rhombus => "rhombus",
            GeometryKind::Square => "square",
            GeometryKind::Cross => "cross",
            GeometryKind::HollowSquare => "hollow_square",
            GeometryKind::HollowCircle => "hollow_circle",
        }
    }

    /// The shape parameters swept for this kind, in tensor-axis order.
    pub fn parameters(self) -> &'static [ShapeParameter] {
        use ShapeParameter::*;
        match self {
            GeometryKind::Rectangle | GeometryKind::Rhombus | GeometryKind::Cross => {
                &[Wx, Wy, Theta]
            }
            GeometryKind::Ellipse => &[Rx, Ry, Theta],
            GeometryKind::Circle => &[R],
            GeometryKind::Square => &[Wx, Theta],
            GeometryKind::HollowSquare => &[Wx, HollowW, Theta],
            GeometryKind::HollowCircle => &[R, HollowR],
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeometryKind {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GeometryKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| GeometryError::UnknownKind(s.to_string()))
    }
}

/// A geometric dimension of the meta-atom that can be swept.
///
/// Lengths are in nanometres and are *full* widths or diameters; the
/// rotation angle is in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeParameter {
    Wx,
    Wy,
    Theta,
    Rx,
    Ry,
    R,
    HollowW,
    HollowR,
}

impl ShapeParameter {
    pub const ALL: [ShapeParameter; 8] = [
        ShapeParameter::Wx,
        ShapeParameter::Wy,
        ShapeParameter::Theta,
        ShapeParameter::Rx,
        ShapeParameter::Ry,
        ShapeParameter::R,
        ShapeParameter::HollowW,
        ShapeParameter::HollowR,
    ];

    /// Key under which the parameter's values are persisted.
    pub fn key(self) -> &'static str {
        match self {
            ShapeParameter::Wx => "Wx",
            ShapeParameter::Wy => "Wy",
            ShapeParameter::Theta => "Theta",
            ShapeParameter::Rx => "Rx",
            ShapeParameter::Ry => "Ry",
            ShapeParameter::R => "R",
            ShapeParameter::HollowW => "Hollow_W",
            ShapeParameter::HollowR => "Hollow_R",
        }
    }

    /// Axis label shown to users. Squares call their width `W`.
    pub fn label(self, kind: GeometryKind) -> &'static str {
        match self {
            ShapeParameter::Wx => match kind {
                GeometryKind::Square | GeometryKind::HollowSquare => "W (nm)",
                _ => "Wx (nm)",
            },
            ShapeParameter::Wy => "Wy (nm)",
            ShapeParameter::Theta => "Rotation Angle (deg)",
            ShapeParameter::Rx => "Rx (nm)",
            ShapeParameter::Ry => "Ry (nm)",
            ShapeParameter::R => "R (nm)",
            ShapeParameter::HollowW => "Hollow Width (nm)",
            ShapeParameter::HollowR => "Hollow R (nm)",
        }
    }

    /// Whether the parameter is an angle rather than a length.
    pub fn is_angle(self) -> bool {
        matches!(self, ShapeParameter::Theta)
    }
}

impl fmt::Display for ShapeParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ShapeParameter {
    type Err = GeometryError;

    /// Accepts the persisted key (`Hollow_W`) case-insensitively, so job
    /// files may write `hollow_w` or `theta`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ShapeParameter::ALL
            .into_iter()
            .find(|p| p.key().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| GeometryError::UnknownParameter(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in GeometryKind::ALL {
            let parsed: GeometryKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert_eq!(
            "triangle".parse::<GeometryKind>(),
            Err(GeometryError::UnknownKind("triangle".into()))
        );
    }

    #[test]
    fn test_parameter_sets_per_kind() {
        use ShapeParameter::*;
        assert_eq!(GeometryKind::Cross.parameters(), &[Wx, Wy, Theta]);
        assert_eq!(GeometryKind::Ellipse.parameters(), &[Rx, Ry, Theta]);
        assert_eq!(GeometryKind::Circle.parameters(), &[R]);
        assert_eq!(GeometryKind::HollowSquare.parameters(), &[Wx, HollowW, Theta]);
        assert_eq!(GeometryKind::HollowCircle.parameters(), &[R, HollowR]);
    }

    #[test]
    fn test_parameter_keys_parse_case_insensitively() {
        assert_eq!("hollow_w".parse::<ShapeParameter>().unwrap(), ShapeParameter::HollowW);
        assert_eq!("theta".parse::<ShapeParameter>().unwrap(), ShapeParameter::Theta);
        assert!("depth".parse::<ShapeParameter>().is_err());
    }

    #[test]
    fn test_square_width_label() {
        assert_eq!(ShapeParameter::Wx.label(GeometryKind::Square), "W (nm)");
        assert_eq!(ShapeParameter::Wx.label(GeometryKind::Rectangle), "Wx (nm)");
    }
}
