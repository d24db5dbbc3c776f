//! Input abstractions for local correlation.
//!
//! ## Purpose
//!
//! This module provides a unified abstraction for pipeline inputs, allowing
//! `fit` to accept in-memory records, an existing dataset, or a text file
//! through a single interface.
//!
//! ## Design notes
//!
//! * **Lazy**: Conversion never reads data; files are read when the pipeline
//!   first runs.
//! * **Context-bound**: Every input becomes a dataset of the context `fit`
//!   runs on.
//!
//! ## Key concepts
//!
//! * **LocalCorrInput Trait**: Turns a source into a dataset of
//!   (coordinate, series) records.
//! * **TextInput**: A file of text records read through a [`RecordParser`].
//!
//! ## Non-goals
//!
//! * This module does not validate that all series share one length; the
//!   pipeline reports a mismatch where two series meet.

// External dependencies
use num_traits::Float;
use std::fmt::Debug;
use std::path::PathBuf;

// Internal dependencies
use crate::engine::context::ExecutionContext;
use crate::engine::executor::Records;
use crate::io::parse::RecordParser;
use crate::primitives::coordinate::Coordinate;
use crate::primitives::series::TimeSeries;

/// Trait for sources that can feed the local correlation pipeline.
pub trait LocalCorrInput<T: Float> {
    /// Convert into a dataset on `context`.
    fn into_records(self, context: &ExecutionContext) -> Records<T>;
}

impl<T> LocalCorrInput<T> for Records<T>
where
    T: Float + Debug + Send + Sync + 'static,
{
    fn into_records(self, _context: &ExecutionContext) -> Records<T> {
        self
    }
}

impl<T> LocalCorrInput<T> for &Records<T>
where
    T: Float + Debug + Send + Sync + 'static,
{
    fn into_records(self, _context: &ExecutionContext) -> Records<T> {
        self.clone()
    }
}

impl<T> LocalCorrInput<T> for Vec<(Coordinate, TimeSeries<T>)>
where
    T: Float + Debug + Send + Sync + 'static,
{
    fn into_records(self, context: &ExecutionContext) -> Records<T> {
        context.parallelize(self)
    }
}

impl<T> LocalCorrInput<T> for &[(Coordinate, TimeSeries<T>)]
where
    T: Float + Debug + Send + Sync + 'static,
{
    fn into_records(self, context: &ExecutionContext) -> Records<T> {
        context.parallelize(self.to_vec())
    }
}

/// Text file of records, one per line.
#[derive(Debug, Clone)]
pub struct TextInput {
    path: PathBuf,
    parser: RecordParser,
}

impl TextInput {
    /// Read `path` with `parser`.
    pub fn new(path: impl Into<PathBuf>, parser: RecordParser) -> Self {
        Self {
            path: path.into(),
            parser,
        }
    }
}

impl<T> LocalCorrInput<T> for TextInput
where
    T: Float + Debug + Send + Sync + 'static,
{
    fn into_records(self, context: &ExecutionContext) -> Records<T> {
        let parser = self.parser;
        context
            .text_file(self.path)
            .try_flat_map(move |line| parser.parse_line::<T>(line))
    }
}
