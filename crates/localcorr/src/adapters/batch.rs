//! Batch adapter for local neighborhood correlation.
//!
//! ## Purpose
//!
//! This module runs the full expand → aggregate → join → correlate pipeline
//! as lazy transformations over partitioned datasets, and collects the
//! result once at the end.
//!
//! ## Design notes
//!
//! * **Processing**: Builds the whole transformation graph, then forces it
//!   with a single collect.
//! * **Caching**: The raw records are cached because both the expansion and
//!   the join read them.
//! * **Barrier**: With `.barrier(true)` the expanded dataset is materialized
//!   before the reduction runs.
//! * **Parallelism**: Inherited from the execution context's worker pool.
//!
//! ## Invariants
//!
//! * Every raw coordinate reaches the join, since expansion includes the
//!   identity offset. A non-zero `unmatched` count means inconsistent input.
//! * All records of a run share one series length; [`BatchLocalCorr::fit`]
//!   fails with `ShapeMismatch` before correlating otherwise.
//!
//! ## Non-goals
//!
//! * This adapter does not order its output; see
//!   [`LocalCorrResult::sort_by_coordinate`].

// External dependencies
use num_traits::Float;
use std::fmt::Debug;
use tracing::{debug, info, warn};

// Internal dependencies
use crate::api::LocalCorrBuilder;
use crate::engine::context::ExecutionContext;
use crate::engine::dataset::Dataset;
use crate::engine::executor::{
    aggregate_stage, correlate_stage, expand_stage, uniform_series_len, Normalization, Records,
};
use crate::engine::result::LocalCorrResult;
use crate::input::LocalCorrInput;
use crate::math::neighborhood::NeighborhoodWindow;
use crate::primitives::coordinate::Coordinate;
use crate::primitives::errors::LocalCorrError;

// ============================================================================
// Batch Builder
// ============================================================================

/// Builder for the batch processor.
#[derive(Debug, Clone, Default)]
pub struct BatchLocalCorrBuilder {
    /// Shared parameters.
    pub base: LocalCorrBuilder,
    /// Shuffle partition count; the context default when unset.
    pub partitions: Option<usize>,
    /// Materialize the expansion before reducing.
    pub barrier: bool,
}

impl BatchLocalCorrBuilder {
    pub(crate) fn from_base(base: LocalCorrBuilder) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    // ========================================================================
    // Shared Setters
    // ========================================================================

    /// Set the neighborhood half-width.
    pub fn radius(mut self, radius: usize) -> Self {
        self.base.radius = radius;
        self
    }

    /// Set the inclusive x and y extents of the volume.
    pub fn bounds(mut self, max_x: i64, max_y: i64) -> Self {
        self.base.bounds = Some((max_x, max_y));
        self
    }

    /// Set the mean divisor.
    pub fn normalization(mut self, normalization: Normalization) -> Self {
        self.base.normalization = normalization;
        self
    }

    // ========================================================================
    // Batch-Specific Setters
    // ========================================================================

    /// Set the number of partitions used by the reduction and the join.
    pub fn partitions(mut self, partitions: usize) -> Self {
        self.partitions = Some(partitions);
        self
    }

    /// Force evaluation of the expanded dataset before the reduction.
    pub fn barrier(mut self, enabled: bool) -> Self {
        self.barrier = enabled;
        self
    }

    // ========================================================================
    // Build Method
    // ========================================================================

    /// Validate parameters and build the processor.
    pub fn build(self) -> Result<BatchLocalCorr, LocalCorrError> {
        let window = self.base.window()?;
        if let Some(0) = self.partitions {
            return Err(LocalCorrError::InvalidPartitions(0));
        }

        Ok(BatchLocalCorr {
            window,
            normalization: self.base.normalization,
            partitions: self.partitions,
            barrier: self.barrier,
        })
    }
}

// ============================================================================
// Batch Processor
// ============================================================================

/// Validated batch processor.
#[derive(Debug, Clone, Copy)]
pub struct BatchLocalCorr {
    window: NeighborhoodWindow,
    normalization: Normalization,
    partitions: Option<usize>,
    barrier: bool,
}

impl BatchLocalCorr {
    /// Neighborhood window in use.
    pub fn window(&self) -> NeighborhoodWindow {
        self.window
    }

    /// Mean divisor in use.
    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// Build the lazy (coordinate, coefficient) dataset for `records`.
    ///
    /// `records` is read twice, by the expansion and by the join; pass a
    /// cached dataset to avoid evaluating its lineage twice. Nothing runs
    /// unless the barrier is enabled.
    pub fn transform<T>(
        &self,
        records: &Records<T>,
    ) -> Result<Dataset<(Coordinate, T)>, LocalCorrError>
    where
        T: Float + Debug + Send + Sync + 'static,
    {
        let partitions = self
            .partitions
            .unwrap_or_else(|| records.context().default_partitions());

        let mut expanded = expand_stage(records, self.window);
        if self.barrier {
            expanded = expanded.materialize()?;
        }

        let means = aggregate_stage(&expanded, self.window, self.normalization, partitions);
        Ok(correlate_stage(records, &means, partitions))
    }

    /// Run the pipeline on `input` and collect the result.
    pub fn fit<T, I>(
        &self,
        context: &ExecutionContext,
        input: I,
    ) -> Result<LocalCorrResult<T>, LocalCorrError>
    where
        T: Float + Debug + Send + Sync + 'static,
        I: LocalCorrInput<T>,
    {
        info!(
            radius = self.window.radius(),
            max_x = self.window.max_x(),
            max_y = self.window.max_y(),
            normalization = ?self.normalization,
            barrier = self.barrier,
            "starting batch local correlation"
        );

        let records = input.into_records(context).cache();
        let series_len = uniform_series_len(&records)?;
        debug!(?series_len, "validated series lengths");

        let pairs = self.transform(&records)?.collect()?;
        let total = records.count()?;

        let unmatched = total.saturating_sub(pairs.len());
        if unmatched > 0 {
            warn!(unmatched, total, "raw records dropped by the neighborhood join");
        }
        info!(records = pairs.len(), "batch local correlation finished");

        Ok(LocalCorrResult::from_pairs(pairs, self.window.radius(), unmatched))
    }
}
