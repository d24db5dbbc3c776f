//! High-level API for local neighborhood correlation.
//!
//! ## Purpose
//!
//! This module provides the primary user-facing entry point. It implements a
//! fluent builder for the parameters shared by every execution path and the
//! choice of an execution adapter (Batch or Streaming).
//!
//! ## Design notes
//!
//! * **Ergonomic**: Fluent builder; only the volume bounds are mandatory.
//! * **Polymorphic**: Marker types select the adapter-specific builder.
//! * **Validated**: Parameters are checked when `.build()` is called on the
//!   adapter builder, before any data is read.
//!
//! ### Configuration Flow
//!
//! 1. Create a [`LocalCorrBuilder`] via `LocalCorr::new()`.
//! 2. Chain configuration methods (`.radius()`, `.bounds()`, ...).
//! 3. Select an adapter via `.adapter(Batch)` or `.adapter(Streaming)`.
//! 4. Call `.build()` and run the processor.

pub use crate::adapters::batch::BatchLocalCorrBuilder;
pub use crate::adapters::streaming::StreamingLocalCorrBuilder;

// Publicly re-exported types
pub use crate::adapters::batch::BatchLocalCorr;
pub use crate::adapters::streaming::StreamingLocalCorr;
pub use crate::engine::context::{ConnectionTarget, ExecutionContext, ExecutionContextBuilder};
pub use crate::engine::dataset::Dataset;
pub use crate::engine::executor::{Normalization, Records};
pub use crate::engine::result::LocalCorrResult;
pub use crate::input::{LocalCorrInput, TextInput};
pub use crate::io::emit::{emit, OutputFormat};
pub use crate::io::parse::{KeyFormat, Preprocess, RecordParser};
pub use crate::math::neighborhood::NeighborhoodWindow;
pub use crate::primitives::coordinate::Coordinate;
pub use crate::primitives::errors::LocalCorrError;
pub use crate::primitives::series::TimeSeries;

// ============================================================================
// Shared Builder
// ============================================================================

/// Parameters shared by every adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalCorrBuilder {
    /// Neighborhood half-width.
    pub radius: usize,
    /// Inclusive (x, y) volume extents.
    pub bounds: Option<(i64, i64)>,
    /// Mean divisor.
    pub normalization: Normalization,
}

impl LocalCorrBuilder {
    /// Radius 0, no bounds, window-area normalization.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the neighborhood half-width.
    pub fn radius(mut self, radius: usize) -> Self {
        self.radius = radius;
        self
    }

    /// Set the inclusive x and y extents of the volume.
    pub fn bounds(mut self, max_x: i64, max_y: i64) -> Self {
        self.bounds = Some((max_x, max_y));
        self
    }

    /// Set the mean divisor.
    pub fn normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Select an execution adapter.
    pub fn adapter<A: LocalCorrAdapter>(self, _adapter: A) -> A::Output {
        A::convert(self)
    }

    /// Validate radius and bounds into a window.
    pub fn window(&self) -> Result<NeighborhoodWindow, LocalCorrError> {
        let (max_x, max_y) = self.bounds.ok_or(LocalCorrError::MissingParameter("bounds"))?;
        NeighborhoodWindow::new(self.radius, max_x, max_y)
    }
}

// ============================================================================
// Adapters
// ============================================================================

/// Conversion from the shared builder to an adapter-specific builder.
pub trait LocalCorrAdapter {
    /// Adapter-specific builder.
    type Output;

    /// Carry the shared parameters over.
    fn convert(builder: LocalCorrBuilder) -> Self::Output;
}

/// Adapter selection namespace.
#[allow(non_snake_case)]
pub mod Adapter {
    pub use super::{Batch, Streaming};
}

/// Marker for the partitioned, lazily evaluated dataset pipeline.
#[derive(Debug, Clone, Copy)]
pub struct Batch;

impl LocalCorrAdapter for Batch {
    type Output = BatchLocalCorrBuilder;

    fn convert(builder: LocalCorrBuilder) -> Self::Output {
        BatchLocalCorrBuilder::from_base(builder)
    }
}

/// Marker for incremental chunk-by-chunk accumulation.
#[derive(Debug, Clone, Copy)]
pub struct Streaming;

impl LocalCorrAdapter for Streaming {
    type Output = StreamingLocalCorrBuilder;

    fn convert(builder: LocalCorrBuilder) -> Self::Output {
        StreamingLocalCorrBuilder::from_base(builder)
    }
}
