//! Layer 2: Math
//!
//! ## Purpose
//!
//! This layer provides the pure per-record computations of the pipeline: the
//! clamped neighborhood fan-out and the Pearson correlation coefficient.
//!
//! ## Architecture
//!
//! ```text
//! Layer 5: API
//!   ↓
//! Layer 4: Adapters
//!   ↓
//! Layer 3: Engine
//!   ↓
//! Layer 2: Math ← You are here
//!   ↓
//! Layer 1: Primitives
//! ```

/// Pearson correlation between two series.
pub mod correlation;

/// Square neighborhood window and clamped expansion.
pub mod neighborhood;
