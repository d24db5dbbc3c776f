//! Layer 3: Engine
//!
//! ## Purpose
//!
//! This layer provides the data-parallel execution engine and the pipeline
//! stages built on it. An [`context::ExecutionContext`] owns the worker pool;
//! a [`dataset::Dataset`] is a lazy, partitioned, immutable collection whose
//! transformations run on that pool when an action forces them.
//!
//! ## Architecture
//!
//! ```text
//! Layer 5: API
//!   ↓
//! Layer 4: Adapters
//!   ↓
//! Layer 3: Engine ← You are here
//!   ↓
//! Layer 2: Math
//!   ↓
//! Layer 1: Primitives
//! ```

/// Execution context and connection targets.
pub mod context;

/// Lazy partitioned datasets.
pub mod dataset;

/// Expand, aggregate and correlate stages.
pub mod executor;

/// Collected correlation results.
pub mod result;
