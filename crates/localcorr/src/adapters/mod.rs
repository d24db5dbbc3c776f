//! Layer 4: Adapters
//!
//! ## Purpose
//!
//! This layer provides the execution adapters that run the pipeline:
//! a batch adapter over partitioned datasets and a streaming adapter that
//! accumulates neighborhood sums chunk by chunk.
//!
//! ## Architecture
//!
//! ```text
//! Layer 5: API
//!   ↓
//! Layer 4: Adapters ← You are here
//!   ↓
//! Layer 3: Engine
//!   ↓
//! Layer 2: Math
//!   ↓
//! Layer 1: Primitives
//! ```

/// Batch adapter over partitioned datasets.
pub mod batch;

/// Streaming adapter with chunked accumulation.
pub mod streaming;
