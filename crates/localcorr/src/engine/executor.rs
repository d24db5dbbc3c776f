//! Pipeline stages for local neighborhood correlation.
//!
//! ## Purpose
//!
//! This module expresses the three stages of the computation as dataset
//! transformations:
//!
//! 1. **Expand**: fan each record out to every neighborhood it belongs to.
//! 2. **Aggregate**: group contributions by target coordinate, sum them and
//!    divide into a mean series.
//! 3. **Correlate**: join each raw record with its neighborhood mean and
//!    compute the Pearson coefficient.
//!
//! It also exposes the per-group building blocks ([`NeighborhoodSum`],
//! [`aggregate`]) so that other execution paths share the exact arithmetic.
//!
//! ## Design notes
//!
//! * **Sharing**: Expansion shares one `Arc` copy of each series among all of
//!   its targets.
//! * **Divisor**: The default mean divides by the nominal window area
//!   `(2r+1)²`, not by the number of contributions. Near the volume edge,
//!   clamping makes the two differ, which biases edge means.
//!   [`Normalization::ContributionCount`] is the edge-corrected mode.
//!
//! ## Invariants
//!
//! * Summation is commutative and associative, so partial sums may be merged
//!   in any order.
//! * Every stage is a pure function of its inputs.

// External dependencies
use num_traits::Float;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::debug;

// Internal dependencies
use crate::engine::dataset::Dataset;
use crate::math::correlation::correlate_series;
use crate::math::neighborhood::NeighborhoodWindow;
use crate::primitives::coordinate::Coordinate;
use crate::primitives::errors::LocalCorrError;
use crate::primitives::series::TimeSeries;

/// Dataset of raw (coordinate, series) records.
pub type Records<T> = Dataset<(Coordinate, TimeSeries<T>)>;

// ============================================================================
// Normalization
// ============================================================================

/// Divisor used to turn a neighborhood sum into a mean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Normalization {
    /// Divide by `(2r+1)²` for every pixel (reference behaviour).
    #[default]
    WindowArea,
    /// Divide by the number of contributions actually received.
    ContributionCount,
}

// ============================================================================
// Neighborhood Sum
// ============================================================================

/// Running element-wise sum of the series contributed to one neighborhood.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborhoodSum<T> {
    sum: TimeSeries<T>,
    contributions: usize,
}

impl<T: Float> NeighborhoodSum<T> {
    /// Start a sum from one contribution.
    pub fn seed(series: &TimeSeries<T>) -> Self {
        Self {
            sum: series.clone(),
            contributions: 1,
        }
    }

    /// Add one contribution.
    pub fn add(&mut self, series: &TimeSeries<T>) -> Result<(), LocalCorrError> {
        self.sum.add_assign_checked(series)?;
        self.contributions += 1;
        Ok(())
    }

    /// Fold another partial sum into this one.
    pub fn merge(&mut self, other: Self) -> Result<(), LocalCorrError> {
        self.sum.add_assign_checked(&other.sum)?;
        self.contributions += other.contributions;
        Ok(())
    }

    /// Element-wise sum so far.
    pub fn sum(&self) -> &TimeSeries<T> {
        &self.sum
    }

    /// Number of contributions so far.
    pub fn contributions(&self) -> usize {
        self.contributions
    }

    /// Divide into the neighborhood mean.
    pub fn into_mean(
        self,
        window: &NeighborhoodWindow,
        normalization: Normalization,
    ) -> TimeSeries<T> {
        let divisor = match normalization {
            Normalization::WindowArea => window.area(),
            Normalization::ContributionCount => self.contributions,
        };
        self.sum.divided_by(T::from(divisor).unwrap_or_else(T::nan))
    }
}

/// Mean of one group of contributions, or `None` for an empty group.
pub fn aggregate<'a, T, I>(
    group: I,
    window: &NeighborhoodWindow,
    normalization: Normalization,
) -> Result<Option<TimeSeries<T>>, LocalCorrError>
where
    T: Float + 'a,
    I: IntoIterator<Item = &'a TimeSeries<T>>,
{
    let mut iter = group.into_iter();
    let Some(first) = iter.next() else {
        return Ok(None);
    };
    let mut acc = NeighborhoodSum::seed(first);
    for series in iter {
        acc.add(series)?;
    }
    Ok(Some(acc.into_mean(window, normalization)))
}

// ============================================================================
// Dataset Stages
// ============================================================================

/// Common series length of `records`, or `None` when there are none.
///
/// Every record must carry the same number of samples, whether or not it
/// ever shares a neighborhood with another record.
pub fn uniform_series_len<T>(records: &Records<T>) -> Result<Option<usize>, LocalCorrError>
where
    T: Float + Debug + Send + Sync + 'static,
{
    let lengths = records.map(|(_, series)| series.len()).collect()?;
    let Some(&expected) = lengths.first() else {
        return Ok(None);
    };
    match lengths.iter().find(|&&found| found != expected) {
        Some(&found) => Err(LocalCorrError::ShapeMismatch { expected, found }),
        None => Ok(Some(expected)),
    }
}

/// Fan every record out to the neighborhoods it contributes to.
pub fn expand_stage<T>(
    records: &Records<T>,
    window: NeighborhoodWindow,
) -> Dataset<(Coordinate, Arc<TimeSeries<T>>)>
where
    T: Float + Debug + Send + Sync + 'static,
{
    debug!(radius = window.radius(), area = window.area(), "expand stage");
    records.flat_map(move |(coord, series)| {
        let shared = Arc::new(series.clone());
        window
            .targets(*coord)
            .map(|target| (target, Arc::clone(&shared)))
            .collect::<Vec<_>>()
    })
}

/// Reduce expanded contributions to one mean series per target coordinate.
pub fn aggregate_stage<T>(
    expanded: &Dataset<(Coordinate, Arc<TimeSeries<T>>)>,
    window: NeighborhoodWindow,
    normalization: Normalization,
    partitions: usize,
) -> Records<T>
where
    T: Float + Debug + Send + Sync + 'static,
{
    debug!(partitions, ?normalization, "aggregate stage");
    expanded
        .try_combine_by_key(
            partitions,
            |series: &Arc<TimeSeries<T>>| NeighborhoodSum::seed(series),
            |acc: &mut NeighborhoodSum<T>, series: &Arc<TimeSeries<T>>| acc.add(series),
            |acc: &mut NeighborhoodSum<T>, other| acc.merge(other),
        )
        .map(move |(coord, sum)| (*coord, sum.clone().into_mean(&window, normalization)))
}

/// Join raw records with their neighborhood means and correlate each pair.
pub fn correlate_stage<T>(
    records: &Records<T>,
    means: &Records<T>,
    partitions: usize,
) -> Dataset<(Coordinate, T)>
where
    T: Float + Debug + Send + Sync + 'static,
{
    debug!(partitions, "correlate stage");
    records
        .join(means, partitions)
        .try_flat_map(|(coord, (series, mean))| {
            correlate_series(series, mean).map(|r| Some((*coord, r)))
        })
}
