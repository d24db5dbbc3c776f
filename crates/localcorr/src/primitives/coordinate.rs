//! Pixel coordinates.
//!
//! A [`Coordinate`] is the grouping and join key of the whole pipeline. x and
//! y are 1-based and bounded by the volume extents; z is a plane index that
//! is carried through untouched.

use std::fmt;

/// Integer (x, y, z) position of a pixel in the volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    /// Column, 1-based.
    pub x: i64,
    /// Row, 1-based.
    pub y: i64,
    /// Plane index.
    pub z: i64,
}

impl Coordinate {
    /// Create a coordinate.
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// Image (row-major) ordering key: plane, then row, then column.
    pub fn raster_key(&self) -> (i64, i64, i64) {
        (self.z, self.y, self.x)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
