//! Collected correlation results.
//!
//! [`LocalCorrResult`] holds the coordinates and coefficients as two parallel
//! columns built from a single collection of the result dataset, so the i-th
//! coordinate always belongs to the i-th coefficient.

use num_traits::Float;

use crate::primitives::coordinate::Coordinate;

/// Per-pixel correlation with its neighborhood mean.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalCorrResult<T> {
    /// Pixel coordinates.
    pub coordinates: Vec<Coordinate>,
    /// Correlation coefficient of each pixel, NaN for constant series.
    pub correlations: Vec<T>,
    /// Neighborhood half-width used.
    pub radius: usize,
    /// Raw records that found no neighborhood mean in the join.
    pub unmatched: usize,
}

impl<T: Float> LocalCorrResult<T> {
    /// Build from (coordinate, coefficient) pairs, keeping their order.
    pub fn from_pairs(pairs: Vec<(Coordinate, T)>, radius: usize, unmatched: usize) -> Self {
        let (coordinates, correlations) = pairs.into_iter().unzip();
        Self {
            coordinates,
            correlations,
            radius,
            unmatched,
        }
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    /// Whether no pixel was correlated.
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// x column.
    pub fn x_values(&self) -> Vec<i64> {
        self.coordinates.iter().map(|c| c.x).collect()
    }

    /// y column.
    pub fn y_values(&self) -> Vec<i64> {
        self.coordinates.iter().map(|c| c.y).collect()
    }

    /// (coordinate, coefficient) pairs in stored order.
    pub fn iter(&self) -> impl Iterator<Item = (Coordinate, T)> + '_ {
        self.coordinates
            .iter()
            .copied()
            .zip(self.correlations.iter().copied())
    }

    /// Coefficient stored for `coord`, if any.
    pub fn correlation_at(&self, coord: Coordinate) -> Option<T> {
        self.iter().find(|(c, _)| *c == coord).map(|(_, r)| r)
    }

    /// Reorder both columns by plane, row, then column.
    pub fn sort_by_coordinate(&mut self) {
        let mut pairs: Vec<(Coordinate, T)> = self.iter().collect();
        pairs.sort_by_key(|(c, _)| c.raster_key());
        let (coordinates, correlations) = pairs.into_iter().unzip();
        self.coordinates = coordinates;
        self.correlations = correlations;
    }
}
