//! Parametric meta-atom shapes.
//!
//! A [`Shape`] is centred on the unit cell and described by the parameters of
//! its [`GeometryKind`] only. Containment tests take coordinates relative to
//! the cell centre, in nanometres.

use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};

use crate::kind::{GeometryError, GeometryKind, ShapeParameter};

/// A meta-atom cross-section. Widths and diameters are full lengths (nm),
/// `theta` is a rotation in degrees about the cell centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Rectangle { wx: f64, wy: f64, theta: f64 },
    Ellipse { rx: f64, ry: f64, theta: f64 },
    Circle { r: f64 },
    Rhombus { wx: f64, wy: f64, theta: f64 },
    Square { w: f64, theta: f64 },
    /// Union of two `wx × wy` bars at `theta` and `theta + 90°`.
    Cross { wx: f64, wy: f64, theta: f64 },
    HollowSquare { w: f64, hollow_w: f64, theta: f64 },
    HollowCircle { r: f64, hollow_r: f64 },
}

impl Shape {
    /// Build a shape from the values of `kind`'s parameters, given in the
    /// order of [`GeometryKind::parameters`].
    pub fn from_parameters(kind: GeometryKind, values: &[f64]) -> Result<Self, GeometryError> {
        let parameters = kind.parameters();
        if values.len() != parameters.len() {
            return Err(GeometryError::ParameterCount {
                kind,
                expected: parameters.len(),
                got: values.len(),
            });
        }
        for (&parameter, &value) in parameters.iter().zip(values) {
            let valid = value.is_finite() && (parameter.is_angle() || value >= 0.0);
            if !valid {
                return Err(GeometryError::InvalidDimension { parameter, value });
            }
        }

        let v = values;
        Ok(match kind {
            GeometryKind::Rectangle => Shape::Rectangle { wx: v[0], wy: v[1], theta: v[2] },
            GeometryKind::Ellipse => Shape::Ellipse { rx: v[0], ry: v[1], theta: v[2] },
            GeometryKind::Circle => Shape::Circle { r: v[0] },
            GeometryKind::Rhombus => Shape::Rhombus { wx: v[0], wy: v[1], theta: v[2] },
            GeometryKind::Square => Shape::Square { w: v[0], theta: v[1] },
            GeometryKind::Cross => Shape::Cross { wx: v[0], wy: v[1], theta: v[2] },
            GeometryKind::HollowSquare => Shape::HollowSquare {
                w: v[0],
                hollow_w: v[1],
                theta: v[2],
            },
            GeometryKind::HollowCircle => Shape::HollowCircle { r: v[0], hollow_r: v[1] },
        })
    }

    pub fn kind(&self) -> GeometryKind {
        match self {
            Shape::Rectangle { .. } => GeometryKind::Rectangle,
            Shape::Ellipse { .. } => GeometryKind::Ellipse,
            Shape::Circle { .. } => GeometryKind::Circle,
            Shape::Rhombus { .. } => GeometryKind::Rhombus,
            Shape::Square { .. } => GeometryKind::Square,
            Shape::Cross { .. } => GeometryKind::Cross,
            Shape::HollowSquare { .. } => GeometryKind::HollowSquare,
            Shape::HollowCircle { .. } => GeometryKind::HollowCircle,
        }
    }

    /// Parameter values in [`GeometryKind::parameters`] order.
    pub fn parameters(&self) -> Vec<f64> {
        match *self {
            Shape::Rectangle { wx, wy, theta }
            | Shape::Rhombus { wx, wy, theta }
            | Shape::Cross { wx, wy, theta } => vec![wx, wy, theta],
            Shape::Ellipse { rx, ry, theta } => vec![rx, ry, theta],
            Shape::Circle { r } => vec![r],
            Shape::Square { w, theta } => vec![w, theta],
            Shape::HollowSquare { w, hollow_w, theta } => vec![w, hollow_w, theta],
            Shape::HollowCircle { r, hollow_r } => vec![r, hollow_r],
        }
    }

    /// Value of a single named parameter, if this shape has it.
    pub fn parameter(&self, parameter: ShapeParameter) -> Option<f64> {
        self.kind()
            .parameters()
            .iter()
            .position(|&p| p == parameter)
            .map(|i| self.parameters()[i])
    }

    /// Rotation of the shape's own frame (radians). Rotationally symmetric
    /// shapes report zero.
    pub fn rotation(&self) -> f64 {
        match *self {
            Shape::Rectangle { theta, .. }
            | Shape::Ellipse { theta, .. }
            | Shape::Rhombus { theta, .. }
            | Shape::Square { theta, .. }
            | Shape::Cross { theta, .. }
            | Shape::HollowSquare { theta, .. } => theta.to_radians(),
            Shape::Circle { .. } | Shape::HollowCircle { .. } => 0.0,
        }
    }

    /// Outer extents `(along u, along v)` in the shape's rotated frame (nm).
    pub fn principal_extents(&self) -> (f64, f64) {
        match *self {
            Shape::Rectangle { wx, wy, .. } | Shape::Rhombus { wx, wy, .. } => (wx, wy),
            Shape::Ellipse { rx, ry, .. } => (rx, ry),
            Shape::Circle { r } | Shape::HollowCircle { r, .. } => (r, r),
            Shape::Square { w, .. } | Shape::HollowSquare { w, .. } => (w, w),
            Shape::Cross { wx, wy, .. } => {
                let arm = wx.max(wy);
                (arm, arm)
            }
        }
    }

    /// Whether the point `(x, y)` (nm, relative to the cell centre) lies
    /// inside the shape.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let p = Vector2::new(x, y);
        match *self {
            Shape::Rectangle { wx, wy, theta } => in_rectangle(to_frame(p, theta), wx, wy),
            Shape::Ellipse { rx, ry, theta } => in_ellipse(to_frame(p, theta), rx, ry),
            Shape::Circle { r } => in_ellipse(p, r, r),
            Shape::Rhombus { wx, wy, theta } => {
                let q = to_frame(p, theta);
                if wx <= 0.0 || wy <= 0.0 {
                    return false;
                }
                q.x.abs() / (wx / 2.0) + q.y.abs() / (wy / 2.0) <= 1.0
            }
            Shape::Square { w, theta } => in_rectangle(to_frame(p, theta), w, w),
            Shape::Cross { wx, wy, theta } => {
                in_rectangle(to_frame(p, theta), wx, wy)
                    || in_rectangle(to_frame(p, theta + 90.0), wx, wy)
            }
            Shape::HollowSquare { w, hollow_w, theta } => {
                let q = to_frame(p, theta);
                in_rectangle(q, w, w) && !in_rectangle(q, hollow_w, hollow_w)
            }
            Shape::HollowCircle { r, hollow_r } => {
                in_ellipse(p, r, r) && !in_ellipse(p, hollow_r, hollow_r)
            }
        }
    }
}

/// Express `p` in the frame of a shape rotated by `theta_deg`.
fn to_frame(p: Vector2<f64>, theta_deg: f64) -> Vector2<f64> {
    Rotation2::new(-theta_deg.to_radians()) * p
}

fn in_rectangle(q: Vector2<f64>, wx: f64, wy: f64) -> bool {
    q.x.abs() <= wx / 2.0 && q.y.abs() <= wy / 2.0
}

/// Diameters, not semi-axes.
fn in_ellipse(q: Vector2<f64>, dx: f64, dy: f64) -> bool {
    if dx <= 0.0 || dy <= 0.0 {
        return false;
    }
    let u = q.x / (dx / 2.0);
    let v = q.y / (dy / 2.0);
    u * u + v * v <= 1.0
}
