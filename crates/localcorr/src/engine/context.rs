//! Execution context for the data-parallel engine.
//!
//! ## Purpose
//!
//! This module provides [`ExecutionContext`], the explicit session object every
//! dataset is created from. It owns the worker pool and the default partition
//! count, and has an explicit lifecycle: opened by
//! [`ExecutionContextBuilder::open`], closed by [`ExecutionContext::close`].
//!
//! ## Design notes
//!
//! * **Parallelism**: A dedicated `rayon` pool per context (`cpu` feature).
//!   Without the feature all work runs on the calling thread.
//! * **Sharing**: The context is a cheap `Arc` handle; datasets keep a clone.
//! * **Lifecycle**: Actions on a dataset whose context is closed fail with
//!   [`LocalCorrError::ContextClosed`].
//!
//! ## Invariants
//!
//! * The default partition count is at least 1.

// Feature-gated imports
#[cfg(feature = "cpu")]
use rayon::{ThreadPool, ThreadPoolBuilder};

// External dependencies
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

// Internal dependencies
use crate::engine::dataset::{split_into, Dataset};
use crate::primitives::errors::LocalCorrError;

// ============================================================================
// Connection Target
// ============================================================================

/// Where the engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionTarget {
    /// In-process worker pool. `None` uses every available core.
    Local {
        /// Requested worker count.
        threads: Option<usize>,
    },
}

impl ConnectionTarget {
    /// Requested worker count, if fixed.
    pub fn threads(&self) -> Option<usize> {
        match self {
            Self::Local { threads } => *threads,
        }
    }
}

impl Default for ConnectionTarget {
    fn default() -> Self {
        Self::Local { threads: None }
    }
}

impl FromStr for ConnectionTarget {
    type Err = LocalCorrError;

    /// Accepts `local`, `local[*]` and `local[N]` with `N >= 1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unsupported = || LocalCorrError::UnsupportedTarget(s.to_string());
        let trimmed = s.trim();

        if trimmed == "local" || trimmed == "local[*]" {
            return Ok(Self::Local { threads: None });
        }

        let inner = trimmed
            .strip_prefix("local[")
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(unsupported)?;
        match inner.parse::<usize>() {
            Ok(n) if n >= 1 => Ok(Self::Local { threads: Some(n) }),
            _ => Err(unsupported()),
        }
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local { threads: None } => write!(f, "local[*]"),
            Self::Local { threads: Some(n) } => write!(f, "local[{n}]"),
        }
    }
}

// ============================================================================
// Context Builder
// ============================================================================

/// Builder for [`ExecutionContext`].
#[derive(Debug, Clone)]
pub struct ExecutionContextBuilder {
    target: ConnectionTarget,
    app_name: String,
    partitions: Option<usize>,
}

impl ExecutionContextBuilder {
    /// Set the application name used for worker thread names and logs.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Set the default number of partitions for new and shuffled datasets.
    pub fn partitions(mut self, partitions: usize) -> Self {
        self.partitions = Some(partitions);
        self
    }

    /// Start the worker pool and open the context.
    pub fn open(self) -> Result<ExecutionContext, LocalCorrError> {
        if let Some(0) = self.partitions {
            return Err(LocalCorrError::InvalidPartitions(0));
        }

        #[cfg(feature = "cpu")]
        let pool = {
            let name = self.app_name.clone();
            ThreadPoolBuilder::new()
                .num_threads(self.target.threads().unwrap_or(0))
                .thread_name(move |i| format!("{name}-worker-{i}"))
                .build()
                .map_err(|e| LocalCorrError::ThreadPool(e.to_string()))?
        };

        #[cfg(feature = "cpu")]
        let workers = pool.current_num_threads();
        #[cfg(not(feature = "cpu"))]
        let workers = 1;

        let default_partitions = self.partitions.unwrap_or(workers).max(1);

        info!(
            app = %self.app_name,
            target = %self.target,
            workers,
            partitions = default_partitions,
            "execution context opened"
        );

        Ok(ExecutionContext {
            inner: Arc::new(ContextInner {
                app_name: self.app_name,
                target: self.target,
                workers,
                default_partitions,
                open: AtomicBool::new(true),
                #[cfg(feature = "cpu")]
                pool,
            }),
        })
    }
}

// ============================================================================
// Execution Context
// ============================================================================

struct ContextInner {
    app_name: String,
    target: ConnectionTarget,
    workers: usize,
    default_partitions: usize,
    open: AtomicBool,
    #[cfg(feature = "cpu")]
    pool: ThreadPool,
}

/// Handle to an open engine session.
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("app_name", &self.inner.app_name)
            .field("target", &self.inner.target)
            .field("workers", &self.inner.workers)
            .field("default_partitions", &self.inner.default_partitions)
            .field("open", &self.is_open())
            .finish()
    }
}

impl ExecutionContext {
    /// Start configuring a context for `target`.
    pub fn builder(target: ConnectionTarget) -> ExecutionContextBuilder {
        ExecutionContextBuilder {
            target,
            app_name: "localcorr".to_string(),
            partitions: None,
        }
    }

    /// Open a context on every available core with default settings.
    pub fn local() -> Result<Self, LocalCorrError> {
        Self::builder(ConnectionTarget::default()).open()
    }

    /// Application name.
    pub fn app_name(&self) -> &str {
        &self.inner.app_name
    }

    /// Connection target the context was opened with.
    pub fn target(&self) -> ConnectionTarget {
        self.inner.target
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.inner.workers
    }

    /// Partition count used when none is given explicitly.
    pub fn default_partitions(&self) -> usize {
        self.inner.default_partitions
    }

    /// Whether [`close`](Self::close) has not been called yet.
    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::Acquire)
    }

    /// Close the context. Later actions on its datasets fail.
    pub fn close(&self) {
        if self.inner.open.swap(false, Ordering::AcqRel) {
            info!(app = %self.inner.app_name, "execution context closed");
        }
    }

    pub(crate) fn ensure_open(&self) -> Result<(), LocalCorrError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(LocalCorrError::ContextClosed(self.inner.app_name.clone()))
        }
    }

    /// Run `op` inside the context's worker pool.
    ///
    /// Any `rayon` work started from `op` runs on this pool, so code outside
    /// the dataset API (such as the streaming adapter) honors the target's
    /// worker count.
    pub fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        #[cfg(feature = "cpu")]
        {
            self.inner.pool.install(op)
        }
        #[cfg(not(feature = "cpu"))]
        {
            op()
        }
    }

    /// Distribute `items` over the default number of partitions.
    pub fn parallelize<T>(&self, items: Vec<T>) -> Dataset<T>
    where
        T: Send + Sync + 'static,
    {
        self.parallelize_with(items, self.default_partitions())
    }

    /// Distribute `items` over `partitions` contiguous partitions.
    ///
    /// A partition count of zero is treated as one.
    pub fn parallelize_with<T>(&self, items: Vec<T>, partitions: usize) -> Dataset<T>
    where
        T: Send + Sync + 'static,
    {
        let parts = split_into(items, partitions);
        debug!(partitions = parts.len(), "parallelized collection");
        Dataset::from_partitions(self.clone(), parts)
    }

    /// Lazily read a text file as one dataset element per line.
    ///
    /// The file is read when an action first needs it.
    pub fn text_file(&self, path: impl Into<PathBuf>) -> Dataset<String> {
        let path = path.into();
        let partitions = self.default_partitions();
        Dataset::from_source(self.clone(), move || {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| LocalCorrError::io(path.clone(), e))?;
            let lines: Vec<String> = text.lines().map(str::to_owned).collect();
            debug!(path = %path.display(), lines = lines.len(), "read text input");
            Ok(split_into(lines, partitions))
        })
    }
}
