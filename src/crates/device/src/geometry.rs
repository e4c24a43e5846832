//! Coordinate math: points, element bounds, percent conversions.

use crate::error::{DeviceError, Result};
use serde::{Deserialize, Serialize};

/// A pixel coordinate on the device screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.x, self.y)
    }
}

/// Rectangular element bounds in the `"[x1,y1][x2,y2]"` notation used by
/// UI hierarchies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Bounds {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Parse the `"[x1,y1][x2,y2]"` form. Round-trips with [`Display`].
    pub fn parse(raw: &str) -> Result<Self> {
        let digits: Vec<i32> = raw
            .split(['[', ']', ','])
            .filter(|chunk| !chunk.is_empty())
            .map(|chunk| {
                chunk
                    .trim()
                    .parse::<i32>()
                    .map_err(|_| DeviceError::InvalidBounds(raw.to_string()))
            })
            .collect::<Result<_>>()?;
        if digits.len() != 4 || !raw.starts_with('[') || !raw.ends_with(']') {
            return Err(DeviceError::InvalidBounds(raw.to_string()));
        }
        Ok(Self::new(digits[0], digits[1], digits[2], digits[3]))
    }

    /// Integer midpoint.
    pub fn center(&self) -> Point {
        Point::new((self.x1 + self.x2) / 2, (self.y1 + self.y2) / 2)
    }

    /// A point at the given fractions of the width/height, e.g.
    /// `(0.99, 0.99)` for the lower-right corner area.
    pub fn relative_point(&self, x_fraction: f64, y_fraction: f64) -> Point {
        let width = (self.x2 - self.x1) as f64;
        let height = (self.y2 - self.y1) as f64;
        Point::new(
            self.x1 + (width * x_fraction).round() as i32,
            self.y1 + (height * y_fraction).round() as i32,
        )
    }
}

impl std::fmt::Display for Bounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{}][{},{}]", self.x1, self.y1, self.x2, self.y2)
    }
}

/// Resolve a percentage (0..=100) against a screen dimension:
/// `round((dim - 1) * pct / 100)`, clamped to `[0, dim - 1]`.
pub fn percent_to_pixel(dim: u32, percent: u8) -> i32 {
    if dim == 0 {
        return 0;
    }
    let max = (dim - 1) as f64;
    let value = (max * percent as f64 / 100.0).round() as i32;
    value.clamp(0, dim as i32 - 1)
}
