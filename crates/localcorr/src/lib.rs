//! # localcorr
//!
//! Parallel local neighborhood correlation for image time-series volumes.
//!
//! For every pixel of a volume, `localcorr` computes the Pearson correlation
//! between the pixel's time series and the mean time series of the square
//! window around it. The work is expressed as a data-parallel pipeline:
//!
//! ```text
//! records ──expand──▶ (target, series) ──combine by key──▶ (target, mean)
//!    │                                                         │
//!    └──────────────────────── join ◀──────────────────────────┘
//!                                │
//!                            correlate ──▶ (coordinate, r)
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use localcorr::prelude::*;
//!
//! # fn main() -> Result<(), LocalCorrError> {
//! let context = ExecutionContext::builder("local[4]".parse()?).open()?;
//! let input = TextInput::new("data/fish.txt", RecordParser::new());
//!
//! let result = LocalCorr::new()
//!     .radius(2)
//!     .bounds(88, 76)
//!     .adapter(Batch)
//!     .build()?
//!     .fit::<f64, _>(&context, input)?;
//!
//! emit(&result, "results-localcorr".as_ref(), OutputFormat::Text)?;
//! context.close();
//! # Ok(())
//! # }
//! ```
//!
//! ## Layers
//!
//! ```text
//! Layer 5: API         builders and adapter selection
//! Layer 4: Adapters    batch and streaming execution
//! Layer 3: Engine      execution context, datasets, pipeline stages
//! Layer 2: Math        neighborhood expansion, Pearson correlation
//! Layer 1: Primitives  coordinates, series, errors
//! ```
//!
//! ## Features
//!
//! * `cpu` (default): multi-threaded execution with `rayon`. Without it the
//!   same pipeline runs on the calling thread.

#![deny(missing_docs)]

/// Layer 4: execution adapters.
pub mod adapters;

/// Layer 5: builders and re-exports.
pub mod api;

/// Layer 3: execution engine.
pub mod engine;

/// Input sources.
pub mod input;

/// Record parsing and artifact writing.
pub mod io;

/// Layer 2: math.
pub mod math;

/// Layer 1: primitives.
pub mod primitives;

/// Commonly used types.
pub mod prelude {
    pub use crate::api::{
        emit, Adapter, Batch, BatchLocalCorr, ConnectionTarget, Coordinate, Dataset,
        ExecutionContext, KeyFormat, LocalCorrAdapter, LocalCorrBuilder as LocalCorr,
        LocalCorrError, LocalCorrInput, LocalCorrResult, NeighborhoodWindow, Normalization,
        OutputFormat, Preprocess, RecordParser, Records, Streaming, StreamingLocalCorr,
        TextInput, TimeSeries,
    };
}
