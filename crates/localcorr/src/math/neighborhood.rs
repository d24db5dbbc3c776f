//! Square neighborhood window with saturating boundary handling.
//!
//! ## Purpose
//!
//! This module turns one (coordinate, series) record into the records that
//! feed every neighborhood mean the pixel participates in. For a window of
//! half-width `r`, a pixel contributes its unshifted series to each of the
//! `(2r+1)²` targets obtained by offsetting x and y and clamping the result
//! back into the volume.
//!
//! ## Design notes
//!
//! * **Saturation**: Offsets that leave the volume are clamped to the nearest
//!   edge, so boundary pixels emit duplicate targets. Nothing is dropped or
//!   deduplicated.
//! * **Planes**: z is never offset or clamped.
//! * **Order**: x offsets form the outer loop and y offsets the inner loop.
//!
//! ## Invariants
//!
//! * `expand` yields exactly [`NeighborhoodWindow::area`] pairs per record.
//! * The (0, 0) offset of an in-bounds coordinate yields that coordinate.
//! * Every expanded coordinate satisfies `1 <= x <= max_x`, `1 <= y <= max_y`.

use num_traits::Float;

use crate::primitives::coordinate::Coordinate;
use crate::primitives::errors::LocalCorrError;
use crate::primitives::series::TimeSeries;

/// Saturate `value` into `[min, max]`.
#[inline]
pub fn clamp(value: i64, min: i64, max: i64) -> i64 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Validated (2r+1)×(2r+1) window over a `max_x` × `max_y` volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborhoodWindow {
    radius: i64,
    area: usize,
    max_x: i64,
    max_y: i64,
}

impl NeighborhoodWindow {
    /// Create a window, rejecting non-positive bounds and radii whose area overflows.
    pub fn new(radius: usize, max_x: i64, max_y: i64) -> Result<Self, LocalCorrError> {
        if max_x < 1 {
            return Err(LocalCorrError::InvalidBounds {
                axis: "x",
                value: max_x,
            });
        }
        if max_y < 1 {
            return Err(LocalCorrError::InvalidBounds {
                axis: "y",
                value: max_y,
            });
        }

        let area = radius
            .checked_mul(2)
            .and_then(|d| d.checked_add(1))
            .and_then(|side| side.checked_mul(side))
            .ok_or(LocalCorrError::RadiusTooLarge(radius))?;
        let signed_radius =
            i64::try_from(radius).map_err(|_| LocalCorrError::RadiusTooLarge(radius))?;

        Ok(Self {
            radius: signed_radius,
            area,
            max_x,
            max_y,
        })
    }

    /// Neighborhood half-width.
    pub fn radius(&self) -> usize {
        self.radius as usize
    }

    /// Inclusive upper x bound.
    pub fn max_x(&self) -> i64 {
        self.max_x
    }

    /// Inclusive upper y bound.
    pub fn max_y(&self) -> i64 {
        self.max_y
    }

    /// Nominal number of pixels in the window, `(2r+1)²`.
    pub fn area(&self) -> usize {
        self.area
    }

    /// All (dx, dy) offsets, dx outer.
    pub fn offsets(&self) -> impl Iterator<Item = (i64, i64)> {
        let r = self.radius;
        (-r..=r).flat_map(move |dx| (-r..=r).map(move |dy| (dx, dy)))
    }

    /// Target coordinate for one offset, clamped into the volume.
    #[inline]
    pub fn target(&self, origin: Coordinate, dx: i64, dy: i64) -> Coordinate {
        Coordinate::new(
            clamp(origin.x.saturating_add(dx), 1, self.max_x),
            clamp(origin.y.saturating_add(dy), 1, self.max_y),
            origin.z,
        )
    }

    /// Every target coordinate `origin` contributes to, duplicates included.
    pub fn targets(&self, origin: Coordinate) -> impl Iterator<Item = Coordinate> + '_ {
        self.offsets().map(move |(dx, dy)| self.target(origin, dx, dy))
    }
}

/// Fan one record out to every neighborhood it contributes to.
///
/// Each returned pair carries an unmodified copy of `series`.
pub fn expand<T: Float>(
    coord: Coordinate,
    series: &TimeSeries<T>,
    window: &NeighborhoodWindow,
) -> Vec<(Coordinate, TimeSeries<T>)> {
    window
        .targets(coord)
        .map(|target| (target, series.clone()))
        .collect()
}
