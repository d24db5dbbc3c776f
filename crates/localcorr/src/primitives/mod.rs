//! Layer 1: Primitives
//!
//! ## Purpose
//!
//! This layer provides the typed data model shared by every other layer:
//! pixel coordinates, time-series values, and the crate error type.
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
//! Layer 2: Math
//!   ↓
//! Layer 1: Primitives ← You are here
//! ```

/// Integer pixel/voxel coordinates.
pub mod coordinate;

/// Error types.
pub mod errors;

/// Fixed-length time-series values.
pub mod series;
