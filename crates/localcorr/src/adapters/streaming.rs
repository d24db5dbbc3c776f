//! Streaming adapter for local neighborhood correlation.
//!
//! ## Purpose
//!
//! This module accumulates neighborhood sums incrementally as records
//! arrive in chunks, and produces the correlations when the stream ends.
//! It suits inputs that arrive from a reader rather than a file on disk.
//!
//! ## Design notes
//!
//! * **Strategy**: Each chunk is split into blocks; every block is expanded
//!   into partial sums independently, then the partials are merged into the
//!   running sums in block order.
//! * **Parallelism**: Blocks and the final correlation pass run on `rayon`
//!   (`cpu` feature).
//! * **Memory**: Raw records are retained until [`finalize`] because the
//!   correlation needs them.
//!
//! ## Invariants
//!
//! * Same arithmetic as the batch adapter ([`NeighborhoodSum`]); results
//!   agree up to floating-point summation order.
//! * All records between two [`finalize`] calls share one series length. A
//!   chunk that breaks this is rejected whole and leaves the running sums
//!   untouched.
//! * [`finalize`] leaves the processor empty and reusable.
//!
//! [`finalize`]: StreamingLocalCorr::finalize

// Feature-gated imports
#[cfg(feature = "cpu")]
use rayon::prelude::*;

// External dependencies
use indexmap::map::Entry;
use indexmap::IndexMap;
use num_traits::Float;
use std::fmt::Debug;
use std::io::BufRead;
use std::mem;
use tracing::{debug, info, warn};

// Internal dependencies
use crate::api::LocalCorrBuilder;
use crate::engine::executor::{NeighborhoodSum, Normalization};
use crate::engine::result::LocalCorrResult;
use crate::io::parse::RecordParser;
use crate::math::correlation::correlate_series;
use crate::math::neighborhood::NeighborhoodWindow;
use crate::primitives::coordinate::Coordinate;
use crate::primitives::errors::LocalCorrError;
use crate::primitives::series::TimeSeries;

/// Default number of records per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

type Record<T> = (Coordinate, TimeSeries<T>);
type SumMap<T> = IndexMap<Coordinate, NeighborhoodSum<T>>;

// ============================================================================
// Streaming Builder
// ============================================================================

/// Builder for the streaming processor.
#[derive(Debug, Clone)]
pub struct StreamingLocalCorrBuilder {
    /// Shared parameters.
    pub base: LocalCorrBuilder,
    /// Records per chunk when reading lines.
    pub chunk_size: usize,
}

impl StreamingLocalCorrBuilder {
    pub(crate) fn from_base(base: LocalCorrBuilder) -> Self {
        Self {
            base,
            chunk_size: DEFAULT_CHUNK_SIZE,
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
    // Streaming-Specific Setters
    // ========================================================================

    /// Set the number of records buffered before they are accumulated.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    // ========================================================================
    // Build Method
    // ========================================================================

    /// Validate parameters and build the processor.
    pub fn build<T: Float>(self) -> Result<StreamingLocalCorr<T>, LocalCorrError> {
        let window = self.base.window()?;
        if self.chunk_size == 0 {
            return Err(LocalCorrError::InvalidChunkSize(0));
        }

        Ok(StreamingLocalCorr {
            window,
            normalization: self.base.normalization,
            chunk_size: self.chunk_size,
            series_len: None,
            sums: IndexMap::new(),
            records: Vec::new(),
        })
    }
}

// ============================================================================
// Streaming Processor
// ============================================================================

/// Incremental local correlation processor.
#[derive(Debug)]
pub struct StreamingLocalCorr<T> {
    window: NeighborhoodWindow,
    normalization: Normalization,
    chunk_size: usize,
    series_len: Option<usize>,
    sums: SumMap<T>,
    records: Vec<Record<T>>,
}

impl<T> StreamingLocalCorr<T>
where
    T: Float + Debug + Send + Sync + 'static,
{
    /// Neighborhood window in use.
    pub fn window(&self) -> NeighborhoodWindow {
        self.window
    }

    /// Records accumulated since the last finalize.
    pub fn pending(&self) -> usize {
        self.records.len()
    }

    /// Accumulate a chunk of records.
    ///
    /// Fails with `ShapeMismatch` if any record's series length differs from
    /// the ones accumulated so far; the processor is then left as it was.
    pub fn process_chunk(&mut self, chunk: &[Record<T>]) -> Result<(), LocalCorrError> {
        let Some((_, head)) = chunk.first() else {
            return Ok(());
        };
        let expected = self.series_len.unwrap_or(head.len());
        check_chunk_len(chunk, expected)?;

        let partials = block_sums(chunk, &self.window)?;
        for partial in partials {
            for (coord, sum) in partial {
                match self.sums.entry(coord) {
                    Entry::Occupied(mut slot) => slot.get_mut().merge(sum)?,
                    Entry::Vacant(slot) => {
                        slot.insert(sum);
                    }
                }
            }
        }

        self.series_len = Some(expected);
        self.records.extend_from_slice(chunk);
        debug!(
            chunk = chunk.len(),
            records = self.records.len(),
            neighborhoods = self.sums.len(),
            "accumulated chunk"
        );
        Ok(())
    }

    /// Parse and accumulate every line of `reader`, one chunk at a time.
    ///
    /// Returns the number of records read.
    pub fn process_lines<R: BufRead>(
        &mut self,
        reader: R,
        parser: &RecordParser,
    ) -> Result<usize, LocalCorrError> {
        let mut chunk = Vec::with_capacity(self.chunk_size);
        let mut total = 0;

        for line in reader.lines() {
            let line = line.map_err(|e| LocalCorrError::io("<stream>", e))?;
            if let Some(record) = parser.parse_line::<T>(&line)? {
                chunk.push(record);
            }
            if chunk.len() == self.chunk_size {
                self.process_chunk(&chunk)?;
                total += chunk.len();
                chunk.clear();
            }
        }

        self.process_chunk(&chunk)?;
        total += chunk.len();
        Ok(total)
    }

    /// Compute the correlations of everything accumulated and reset.
    pub fn finalize(&mut self) -> Result<LocalCorrResult<T>, LocalCorrError> {
        let sums = mem::take(&mut self.sums);
        let records = mem::take(&mut self.records);
        self.series_len = None;

        let window = self.window;
        let normalization = self.normalization;
        let means: IndexMap<Coordinate, TimeSeries<T>> = sums
            .into_iter()
            .map(|(coord, sum)| (coord, sum.into_mean(&window, normalization)))
            .collect();

        let pairs = correlate_records(&records, &means)?;
        let unmatched = records.len() - pairs.len();
        if unmatched > 0 {
            warn!(unmatched, "raw records without a neighborhood mean");
        }
        info!(records = pairs.len(), "streaming local correlation finished");

        Ok(LocalCorrResult::from_pairs(pairs, window.radius(), unmatched))
    }
}

// ============================================================================
// Block Helpers
// ============================================================================

/// Fail unless every record of `chunk` has `expected` samples.
fn check_chunk_len<T: Float>(chunk: &[Record<T>], expected: usize) -> Result<(), LocalCorrError> {
    match chunk.iter().find(|(_, series)| series.len() != expected) {
        Some((_, series)) => Err(LocalCorrError::ShapeMismatch {
            expected,
            found: series.len(),
        }),
        None => Ok(()),
    }
}

/// Partial sums of one block of records.
fn sum_block<T: Float>(
    block: &[Record<T>],
    window: &NeighborhoodWindow,
) -> Result<SumMap<T>, LocalCorrError> {
    let mut sums: SumMap<T> = IndexMap::new();
    for (coord, series) in block {
        for target in window.targets(*coord) {
            match sums.get_mut(&target) {
                Some(acc) => acc.add(series)?,
                None => {
                    sums.insert(target, NeighborhoodSum::seed(series));
                }
            }
        }
    }
    Ok(sums)
}

#[cfg(feature = "cpu")]
fn block_sums<T>(
    chunk: &[Record<T>],
    window: &NeighborhoodWindow,
) -> Result<Vec<SumMap<T>>, LocalCorrError>
where
    T: Float + Send + Sync,
{
    let block = chunk.len().div_ceil(rayon::current_num_threads()).max(1);
    chunk
        .par_chunks(block)
        .map(|b| sum_block(b, window))
        .collect()
}

#[cfg(not(feature = "cpu"))]
fn block_sums<T>(
    chunk: &[Record<T>],
    window: &NeighborhoodWindow,
) -> Result<Vec<SumMap<T>>, LocalCorrError>
where
    T: Float + Send + Sync,
{
    sum_block(chunk, window).map(|sums| vec![sums])
}

fn correlate_one<T: Float>(
    record: &Record<T>,
    means: &IndexMap<Coordinate, TimeSeries<T>>,
) -> Result<Option<(Coordinate, T)>, LocalCorrError> {
    let (coord, series) = record;
    match means.get(coord) {
        Some(mean) => correlate_series(series, mean).map(|r| Some((*coord, r))),
        None => Ok(None),
    }
}

#[cfg(feature = "cpu")]
fn correlate_records<T>(
    records: &[Record<T>],
    means: &IndexMap<Coordinate, TimeSeries<T>>,
) -> Result<Vec<(Coordinate, T)>, LocalCorrError>
where
    T: Float + Send + Sync,
{
    let matched: Vec<Option<(Coordinate, T)>> = records
        .par_iter()
        .map(|record| correlate_one(record, means))
        .collect::<Result<_, _>>()?;
    Ok(matched.into_iter().flatten().collect())
}

#[cfg(not(feature = "cpu"))]
fn correlate_records<T>(
    records: &[Record<T>],
    means: &IndexMap<Coordinate, TimeSeries<T>>,
) -> Result<Vec<(Coordinate, T)>, LocalCorrError>
where
    T: Float + Send + Sync,
{
    let matched: Vec<Option<(Coordinate, T)>> = records
        .iter()
        .map(|record| correlate_one(record, means))
        .collect::<Result<_, _>>()?;
    Ok(matched.into_iter().flatten().collect())
}
