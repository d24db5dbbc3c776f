//! Time-series values.
//!
//! ## Purpose
//!
//! This module provides [`TimeSeries`], the per-pixel sequence of samples, and
//! the checked element-wise operations the aggregator needs.
//!
//! ## Invariants
//!
//! * Element-wise operations only run on series of equal length; a mismatch is
//!   returned as [`LocalCorrError::ShapeMismatch`].
//! * Series are never mutated after parsing except by the aggregator, which
//!   owns the running sums it mutates.

use ndarray::{Array1, ArrayView1};
use num_traits::Float;

use crate::primitives::errors::LocalCorrError;

/// Ordered, fixed-length sequence of samples for one pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries<T> {
    values: Array1<T>,
}

impl<T: Float> TimeSeries<T> {
    /// Wrap a vector of samples.
    pub fn new(values: Vec<T>) -> Self {
        Self {
            values: Array1::from_vec(values),
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series holds no samples.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Borrowed view of the samples.
    pub fn view(&self) -> ArrayView1<'_, T> {
        self.values.view()
    }

    /// Copy the samples out.
    pub fn to_vec(&self) -> Vec<T> {
        self.values.to_vec()
    }

    /// Arithmetic mean of the samples (NaN when empty).
    pub fn mean(&self) -> T {
        let n = T::from(self.values.len()).unwrap_or_else(T::nan);
        self.values.fold(T::zero(), |acc, &v| acc + v) / n
    }

    /// Fail unless `other` has the same length as `self`.
    pub fn check_same_len(&self, other: &Self) -> Result<(), LocalCorrError> {
        if self.len() == other.len() {
            Ok(())
        } else {
            Err(LocalCorrError::ShapeMismatch {
                expected: self.len(),
                found: other.len(),
            })
        }
    }

    /// Element-wise `self += other`.
    pub fn add_assign_checked(&mut self, other: &Self) -> Result<(), LocalCorrError> {
        self.check_same_len(other)?;
        self.values.zip_mut_with(&other.values, |a, &b| *a = *a + b);
        Ok(())
    }

    /// Divide every sample by `divisor`.
    pub fn divided_by(self, divisor: T) -> Self {
        Self {
            values: self.values.mapv_into(|v| v / divisor),
        }
    }

    /// Apply `f` to every sample.
    pub fn map_values(self, f: impl Fn(T) -> T) -> Self {
        Self {
            values: self.values.mapv_into(f),
        }
    }
}

impl<T: Float> From<Vec<T>> for TimeSeries<T> {
    fn from(values: Vec<T>) -> Self {
        Self::new(values)
    }
}
