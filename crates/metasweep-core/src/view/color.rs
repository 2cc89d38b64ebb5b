//! Colour scales and named colormaps for rendered views.

use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A rejected colour-scale input. The previous range stays in effect.
#[derive(Debug, Error, PartialEq)]
pub enum RangeError {
    #[error("Range is inverted: max {max} < min {min}")]
    Inverted { min: f64, max: f64 },

    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("Range bounds must be finite")]
    NonFinite,

    #[error("Unknown colormap '{0}'. Valid colormaps: jet, viridis, plasma, inferno, magma, hot, gray, coolwarm, twilight")]
    UnknownColormap(String),
}

/// Data limits mapped onto the ends of a colormap (or a line plot's y axis).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorRange {
    pub min: f64,
    pub max: f64,
}

impl ColorRange {
    /// Default transmittance limits.
    pub const TRANSMITTANCE: ColorRange = ColorRange { min: 0.0, max: 1.0 };
    /// Default phase limits.
    pub const PHASE: ColorRange = ColorRange { min: 0.0, max: TAU };

    /// `min == max` is allowed; `max < min` is not.
    pub fn new(min: f64, max: f64) -> Result<Self, RangeError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(RangeError::NonFinite);
        }
        if max < min {
            return Err(RangeError::Inverted { min, max });
        }
        Ok(Self { min, max })
    }

    /// Parse two text fields. An empty field takes the matching bound of
    /// `default`.
    pub fn parse(min_text: &str, max_text: &str, default: ColorRange) -> Result<Self, RangeError> {
        let field = |text: &str, fallback: f64| -> Result<f64, RangeError> {
            let text = text.trim();
            if text.is_empty() {
                return Ok(fallback);
            }
            text.parse::<f64>().map_err(|_| RangeError::NotANumber(text.to_string()))
        };
        Self::new(field(min_text, default.min)?, field(max_text, default.max)?)
    }

    /// Position of `value` within the range, clamped to `[0, 1]`. A
    /// degenerate range maps everything to 0.
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 || !value.is_finite() {
            return 0.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }
}

/// A named palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Colormap {
    #[default]
    Jet,
    Viridis,
    Plasma,
    Inferno,
    Magma,
    Hot,
    Gray,
    Coolwarm,
    Twilight,
}

type Stop = (f64, [u8; 3]);

const JET: &[Stop] = &[
    (0.0, [0, 0, 128]),
    (0.125, [0, 0, 255]),
    (0.375, [0, 255, 255]),
    (0.625, [255, 255, 0]),
    (0.875, [255, 0, 0]),
    (1.0, [128, 0, 0]),
];
const VIRIDIS: &[Stop] = &[
    (0.0, [68, 1, 84]),
    (0.25, [59, 82, 139]),
    (0.5, [33, 145, 140]),
    (0.75, [94, 201, 98]),
    (1.0, [253, 231, 37]),
];
const PLASMA: &[Stop] = &[
    (0.0, [13, 8, 135]),
    (0.25, [126, 3, 168]),
    (0.5, [204, 71, 120]),
    (0.75, [248, 149, 64]),
    (1.0, [240, 249, 33]),
];
const INFERNO: &[Stop] = &[
    (0.0, [0, 0, 4]),
    (0.25, [87, 16, 110]),
    (0.5, [188, 55, 84]),
    (0.75, [249, 142, 9]),
    (1.0, [252, 255, 164]),
];
const MAGMA: &[Stop] = &[
    (0.0, [0, 0, 4]),
    (0.25, [81, 18, 124]),
    (0.5, [183, 55, 121]),
    (0.75, [252, 137, 97]),
    (1.0, [252, 253, 191]),
];
const GRAY: &[Stop] = &[(0.0, [0, 0, 0]), (1.0, [255, 255, 255])];
const COOLWARM: &[Stop] = &[(0.0, [59, 76, 192]), (0.5, [221, 221, 221]), (1.0, [180, 4, 38])];
// Cyclic: both ends share a colour.
const TWILIGHT: &[Stop] = &[
    (0.0, [226, 217, 226]),
    (0.25, [94, 128, 181]),
    (0.5, [47, 20, 54]),
    (0.75, [168, 82, 74]),
    (1.0, [226, 217, 226]),
];

impl Colormap {
    pub const ALL: [Colormap; 9] = [
        Colormap::Jet,
        Colormap::Viridis,
        Colormap::Plasma,
        Colormap::Inferno,
        Colormap::Magma,
        Colormap::Hot,
        Colormap::Gray,
        Colormap::Coolwarm,
        Colormap::Twilight,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Colormap::Jet => "jet",
            Colormap::Viridis => "viridis",
            Colormap::Plasma => "plasma",
            Colormap::Inferno => "inferno",
            Colormap::Magma => "magma",
            Colormap::Hot => "hot",
            Colormap::Gray => "gray",
            Colormap::Coolwarm => "coolwarm",
            Colormap::Twilight => "twilight",
        }
    }

    /// RGB colour at `t`, clamped to `[0, 1]`.
    pub fn sample(self, t: f64) -> [u8; 3] {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let stops = match self {
            Colormap::Hot => return hot(t),
            Colormap::Jet => JET,
            Colormap::Viridis => VIRIDIS,
            Colormap::Plasma => PLASMA,
            Colormap::Inferno => INFERNO,
            Colormap::Magma => MAGMA,
            Colormap::Gray => GRAY,
            Colormap::Coolwarm => COOLWARM,
            Colormap::Twilight => TWILIGHT,
        };
        interpolate(stops, t)
    }
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Colormap {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = match s.trim() {
            w if w.eq_ignore_ascii_case("grey") => "gray",
            w => w,
        };
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| RangeError::UnknownColormap(s.to_string()))
    }
}

/// Black, red, yellow, white.
fn hot(t: f64) -> [u8; 3] {
    let r = (t * 3.0).min(1.0);
    let g = ((t - 1.0 / 3.0) * 3.0).clamp(0.0, 1.0);
    let b = ((t - 2.0 / 3.0) * 3.0).clamp(0.0, 1.0);
    [r, g, b].map(|c| (c * 255.0).round() as u8)
}

fn interpolate(stops: &[Stop], t: f64) -> [u8; 3] {
    let hi = stops.partition_point(|(pos, _)| *pos < t).clamp(1, stops.len() - 1);
    let (p0, c0) = stops[hi - 1];
    let (p1, c1) = stops[hi];
    let w = if p1 > p0 { (t - p0) / (p1 - p0) } else { 0.0 };
    let mut out = [0u8; 3];
    for k in 0..3 {
        let v = c0[k] as f64 + (c1[k] as f64 - c0[k] as f64) * w;
        out[k] = v.round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverted_range_is_rejected() {
        assert_eq!(
            ColorRange::new(1.0, 0.5),
            Err(RangeError::Inverted { min: 1.0, max: 0.5 })
        );
        assert!(ColorRange::new(0.5, 0.5).is_ok());
    }

    #[test]
    fn test_parse_uses_defaults_for_empty_fields() {
        let range = ColorRange::parse("", "  ", ColorRange::PHASE).unwrap();
        assert_eq!(range, ColorRange::PHASE);
        let range = ColorRange::parse("0.2", "", ColorRange::TRANSMITTANCE).unwrap();
        assert_eq!(range, ColorRange { min: 0.2, max: 1.0 });
    }

    #[test]
    fn test_parse_rejects_text() {
        assert_eq!(
            ColorRange::parse("abc", "1", ColorRange::TRANSMITTANCE),
            Err(RangeError::NotANumber("abc".into()))
        );
        assert_eq!(ColorRange::parse("inf", "1", ColorRange::TRANSMITTANCE), Err(RangeError::NonFinite));
    }

    #[test]
    fn test_normalize_clamps() {
        let range = ColorRange::new(1.0, 3.0).unwrap();
        assert_eq!(range.normalize(2.0), 0.5);
        assert_eq!(range.normalize(-5.0), 0.0);
        assert_eq!(range.normalize(10.0), 1.0);
        assert_eq!(ColorRange::new(1.0, 1.0).unwrap().normalize(1.0), 0.0);
    }

    #[test]
    fn test_colormap_names() {
        for cmap in Colormap::ALL {
            assert_eq!(cmap.name().parse::<Colormap>().unwrap(), cmap);
        }
        assert_eq!("Grey".parse::<Colormap>().unwrap(), Colormap::Gray);
        assert!(matches!("rainbow".parse::<Colormap>(), Err(RangeError::UnknownColormap(_))));
    }

    #[test]
    fn test_colormap_endpoints() {
        assert_eq!(Colormap::Gray.sample(0.0), [0, 0, 0]);
        assert_eq!(Colormap::Gray.sample(1.0), [255, 255, 255]);
        assert_eq!(Colormap::Gray.sample(0.5), [128, 128, 128]);
        assert_eq!(Colormap::Viridis.sample(0.0), [68, 1, 84]);
        assert_eq!(Colormap::Viridis.sample(2.0), [253, 231, 37]);
        assert_eq!(Colormap::Hot.sample(0.0), [0, 0, 0]);
        assert_eq!(Colormap::Hot.sample(1.0), [255, 255, 255]);
        assert_eq!(Colormap::Twilight.sample(0.0), Colormap::Twilight.sample(1.0));
    }
}
