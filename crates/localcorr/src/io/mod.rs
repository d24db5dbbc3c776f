//! Input parsing and output writing.
//!
//! ## Purpose
//!
//! This module turns text lines into (coordinate, series) records and writes
//! collected results to a directory as parallel x / y / corr artifacts.

/// Result artifact writers.
pub mod emit;

/// Text record parser.
pub mod parse;
