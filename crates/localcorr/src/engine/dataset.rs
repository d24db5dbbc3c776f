//! Lazy, partitioned, immutable datasets.
//!
//! ## Purpose
//!
//! This module provides [`Dataset`], the collection type the pipeline is
//! expressed in. A dataset is a recipe: transformations (`map`, `flat_map`,
//! `try_combine_by_key`, `join`, ...) build a new dataset from an existing one
//! without running anything. Actions (`collect`, `count`, `first`,
//! `materialize`) evaluate the recipe on the context's worker pool.
//!
//! ## Design notes
//!
//! * **Parallelism**: Partitions are processed in parallel with `rayon`.
//! * **Shuffles**: Keyed operations route every key to one of `n` buckets with
//!   a fixed hasher, so all values for a key meet in one bucket.
//! * **Determinism**: Per-partition combining and bucket merging use
//!   insertion-ordered maps and visit inputs in partition order. The same
//!   input and partition count always yields bit-identical output.
//! * **Caching**: [`Dataset::cache`] memoizes partitions after first
//!   evaluation; every dataset derived from a cached one shares the memo.
//!
//! ## Invariants
//!
//! * Datasets are never mutated; each transformation yields a new one.
//! * Combining functions must be commutative and associative.
//! * Errors from user functions abort the action; the first failing partition
//!   (in partition order) wins.
//!
//! ## Non-goals
//!
//! * This module does not spill to disk or recover from worker loss.

// Feature-gated imports
#[cfg(feature = "cpu")]
use rayon::prelude::*;

// External dependencies
use indexmap::map::Entry;
use indexmap::IndexMap;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};
use tracing::debug;

// Internal dependencies
use crate::engine::context::ExecutionContext;
use crate::primitives::errors::LocalCorrError;

type Partitions<T> = Arc<Vec<Vec<T>>>;
type ComputeFn<T> = dyn Fn() -> Result<Partitions<T>, LocalCorrError> + Send + Sync;

// ============================================================================
// Partition Helpers
// ============================================================================

/// Apply `f` to every partition, in parallel when the `cpu` feature is on.
#[cfg(feature = "cpu")]
fn map_partitions<'a, T, U, F>(parts: &'a [Vec<T>], f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&'a [T]) -> U + Sync + Send,
{
    parts.par_iter().map(|p| f(p)).collect()
}

#[cfg(not(feature = "cpu"))]
fn map_partitions<'a, T, U, F>(parts: &'a [Vec<T>], f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&'a [T]) -> U + Sync + Send,
{
    parts.iter().map(|p| f(p)).collect()
}

/// Consume `items`, applying `f` to each, in parallel when the `cpu` feature is on.
#[cfg(feature = "cpu")]
fn map_owned<I, U, F>(items: Vec<I>, f: F) -> Vec<U>
where
    I: Send,
    U: Send,
    F: Fn(I) -> U + Sync + Send,
{
    items.into_par_iter().map(f).collect()
}

#[cfg(not(feature = "cpu"))]
fn map_owned<I, U, F>(items: Vec<I>, f: F) -> Vec<U>
where
    I: Send,
    U: Send,
    F: Fn(I) -> U + Sync + Send,
{
    items.into_iter().map(f).collect()
}

/// Bucket a key is routed to during a shuffle.
fn bucket_of<K: Hash>(key: &K, buckets: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % buckets as u64) as usize
}

/// Split `items` into at most `partitions` contiguous, order-preserving chunks.
pub(crate) fn split_into<T>(items: Vec<T>, partitions: usize) -> Vec<Vec<T>> {
    let chunk = items.len().div_ceil(partitions.max(1)).max(1);
    let mut parts = Vec::new();
    let mut rest = items.into_iter().peekable();
    while rest.peek().is_some() {
        parts.push(rest.by_ref().take(chunk).collect());
    }
    parts
}

/// Turn `[input][bucket]` into `[bucket][input]`.
fn transpose<T>(grid: Vec<Vec<T>>, buckets: usize) -> Vec<Vec<T>> {
    let mut out: Vec<Vec<T>> = (0..buckets).map(|_| Vec::with_capacity(grid.len())).collect();
    for row in grid {
        for (bucket, cell) in row.into_iter().enumerate() {
            out[bucket].push(cell);
        }
    }
    out
}

// ============================================================================
// Dataset
// ============================================================================

/// A lazily evaluated, partitioned collection bound to an [`ExecutionContext`].
pub struct Dataset<T> {
    context: ExecutionContext,
    compute: Arc<ComputeFn<T>>,
    cache: Option<Arc<OnceLock<Partitions<T>>>>,
}

impl<T> Clone for Dataset<T> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            compute: Arc::clone(&self.compute),
            cache: self.cache.clone(),
        }
    }
}

impl<T> fmt::Debug for Dataset<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("context", &self.context.app_name())
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

impl<T: Send + Sync + 'static> Dataset<T> {
    pub(crate) fn from_partitions(context: ExecutionContext, parts: Vec<Vec<T>>) -> Self {
        Self::from_shared(context, Arc::new(parts))
    }

    fn from_shared(context: ExecutionContext, parts: Partitions<T>) -> Self {
        Self {
            context,
            compute: Arc::new(move || Ok(Arc::clone(&parts))),
            cache: None,
        }
    }

    pub(crate) fn from_source<F>(context: ExecutionContext, source: F) -> Self
    where
        F: Fn() -> Result<Vec<Vec<T>>, LocalCorrError> + Send + Sync + 'static,
    {
        Self {
            context,
            compute: Arc::new(move || source().map(Arc::new)),
            cache: None,
        }
    }

    /// Context this dataset runs on.
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Evaluate (or fetch from cache) every partition.
    fn partitions(&self) -> Result<Partitions<T>, LocalCorrError> {
        self.context.ensure_open()?;
        match &self.cache {
            Some(cell) => {
                if let Some(parts) = cell.get() {
                    return Ok(Arc::clone(parts));
                }
                let parts = (self.compute)()?;
                Ok(Arc::clone(cell.get_or_init(|| parts)))
            }
            None => (self.compute)(),
        }
    }

    /// Build a dataset whose partitions are computed from this one's.
    fn derive<U, F>(&self, f: F) -> Dataset<U>
    where
        U: Send + Sync + 'static,
        F: Fn(&ExecutionContext, &[Vec<T>]) -> Result<Vec<Vec<U>>, LocalCorrError>
            + Send
            + Sync
            + 'static,
    {
        let parent = self.clone();
        Dataset {
            context: self.context.clone(),
            compute: Arc::new(move || {
                let parts = parent.partitions()?;
                f(&parent.context, &parts).map(Arc::new)
            }),
            cache: None,
        }
    }

    // ========================================================================
    // Transformations
    // ========================================================================

    /// Apply `f` to every element.
    pub fn map<U, F>(&self, f: F) -> Dataset<U>
    where
        U: Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        self.derive(move |ctx, parts| {
            Ok(ctx.install(|| map_partitions(parts, |part| part.iter().map(&f).collect())))
        })
    }

    /// Apply `f` to every element and flatten the results.
    pub fn flat_map<U, I, F>(&self, f: F) -> Dataset<U>
    where
        U: Send + Sync + 'static,
        I: IntoIterator<Item = U>,
        F: Fn(&T) -> I + Send + Sync + 'static,
    {
        self.derive(move |ctx, parts| {
            Ok(ctx.install(|| {
                map_partitions(parts, |part| part.iter().flat_map(&f).collect())
            }))
        })
    }

    /// Fallible [`flat_map`](Self::flat_map); the first error aborts the action.
    pub fn try_flat_map<U, I, F>(&self, f: F) -> Dataset<U>
    where
        U: Send + Sync + 'static,
        I: IntoIterator<Item = U>,
        F: Fn(&T) -> Result<I, LocalCorrError> + Send + Sync + 'static,
    {
        self.derive(move |ctx, parts| {
            ctx.install(|| {
                map_partitions(parts, |part| -> Result<Vec<U>, LocalCorrError> {
                    let mut out = Vec::with_capacity(part.len());
                    for item in part {
                        out.extend(f(item)?);
                    }
                    Ok(out)
                })
            })
            .into_iter()
            .collect()
        })
    }

    /// Memoize this dataset's partitions after the first evaluation.
    pub fn cache(&self) -> Self {
        Self {
            context: self.context.clone(),
            compute: Arc::clone(&self.compute),
            cache: Some(Arc::new(OnceLock::new())),
        }
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Evaluation barrier: compute every partition now and return a dataset
    /// backed by the computed data.
    ///
    /// Everything downstream of the returned dataset starts from the stored
    /// partitions instead of re-running this dataset's lineage.
    pub fn materialize(&self) -> Result<Self, LocalCorrError> {
        let parts = self.partitions()?;
        debug!(
            partitions = parts.len(),
            elements = parts.iter().map(Vec::len).sum::<usize>(),
            "materialized dataset"
        );
        Ok(Self::from_shared(self.context.clone(), parts))
    }

    /// Number of elements.
    pub fn count(&self) -> Result<usize, LocalCorrError> {
        Ok(self.partitions()?.iter().map(Vec::len).sum())
    }
}

impl<T: Clone + Send + Sync + 'static> Dataset<T> {
    /// Every element, partitions concatenated in order.
    pub fn collect(&self) -> Result<Vec<T>, LocalCorrError> {
        Ok(self.partitions()?.iter().flatten().cloned().collect())
    }

    /// First element of the first non-empty partition.
    pub fn first(&self) -> Result<Option<T>, LocalCorrError> {
        Ok(self.partitions()?.iter().flatten().next().cloned())
    }
}

// ============================================================================
// Keyed Operations
// ============================================================================

impl<K, V> Dataset<(K, V)>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Group values by key into per-key combiners.
    ///
    /// `create` starts a combiner from the first value seen for a key in a
    /// partition, `merge_value` folds further values of that partition into it,
    /// and `merge_combiners` folds combiners from different partitions together
    /// after the shuffle. The result has one element per distinct key, spread
    /// over `partitions` buckets.
    pub fn try_combine_by_key<C, FC, FV, FM>(
        &self,
        partitions: usize,
        create: FC,
        merge_value: FV,
        merge_combiners: FM,
    ) -> Dataset<(K, C)>
    where
        C: Send + Sync + 'static,
        FC: Fn(&V) -> C + Send + Sync + 'static,
        FV: Fn(&mut C, &V) -> Result<(), LocalCorrError> + Send + Sync + 'static,
        FM: Fn(&mut C, C) -> Result<(), LocalCorrError> + Send + Sync + 'static,
    {
        let buckets = partitions.max(1);
        self.derive(move |ctx, parts| {
            ctx.install(|| -> Result<Vec<Vec<(K, C)>>, LocalCorrError> {
                // Partition-local combine, then split by destination bucket.
                let combine = |part: &[(K, V)]| -> Result<Vec<Vec<(K, C)>>, LocalCorrError> {
                    let mut combined: IndexMap<K, C> = IndexMap::new();
                    for (key, value) in part {
                        match combined.get_mut(key) {
                            Some(acc) => merge_value(acc, value)?,
                            None => {
                                combined.insert(key.clone(), create(value));
                            }
                        }
                    }
                    let mut routed: Vec<Vec<(K, C)>> = (0..buckets).map(|_| Vec::new()).collect();
                    for (key, acc) in combined {
                        routed[bucket_of(&key, buckets)].push((key, acc));
                    }
                    Ok(routed)
                };
                let local = map_partitions(parts, combine)
                    .into_iter()
                    .collect::<Result<Vec<_>, LocalCorrError>>()?;

                debug!(inputs = local.len(), buckets, "shuffling combiners");

                let merge = |inputs: Vec<Vec<(K, C)>>| -> Result<Vec<(K, C)>, LocalCorrError> {
                    let mut merged: IndexMap<K, C> = IndexMap::new();
                    for (key, acc) in inputs.into_iter().flatten() {
                        match merged.entry(key) {
                            Entry::Occupied(mut slot) => merge_combiners(slot.get_mut(), acc)?,
                            Entry::Vacant(slot) => {
                                slot.insert(acc);
                            }
                        }
                    }
                    Ok(merged.into_iter().collect())
                };
                map_owned(transpose(local, buckets), merge)
                    .into_iter()
                    .collect()
            })
        })
    }

    /// Fold every value of a key into one with the in-place combiner `f`.
    pub fn try_reduce_by_key<F>(&self, partitions: usize, f: F) -> Dataset<(K, V)>
    where
        V: Clone,
        F: Fn(&mut V, &V) -> Result<(), LocalCorrError> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let merge = Arc::clone(&f);
        self.try_combine_by_key(
            partitions,
            V::clone,
            move |acc, v| f(acc, v),
            move |acc, other| merge(acc, &other),
        )
    }

    /// Inner equi-join on the key.
    ///
    /// Every pair of matching elements yields one output element; keys present
    /// on only one side are dropped.
    pub fn join<W>(&self, other: &Dataset<(K, W)>, partitions: usize) -> Dataset<(K, (V, W))>
    where
        V: Clone,
        W: Clone + Send + Sync + 'static,
    {
        let right = other.clone();
        let buckets = partitions.max(1);
        self.derive(move |ctx, left_parts| {
            let right_parts = right.partitions()?;
            let out = ctx.install(|| {
                let left = transpose(map_partitions(left_parts, |p| route(p, buckets)), buckets);
                let right = transpose(
                    map_partitions(right_parts.as_slice(), |p| route(p, buckets)),
                    buckets,
                );
                let pairs: Vec<_> = left.into_iter().zip(right).collect();

                map_owned(pairs, |(left, right)| {
                    let mut index: IndexMap<&K, Vec<&W>> = IndexMap::new();
                    for (key, value) in right.into_iter().flatten() {
                        index.entry(key).or_default().push(value);
                    }
                    let mut joined = Vec::new();
                    for (key, value) in left.into_iter().flatten() {
                        if let Some(matches) = index.get(&key) {
                            for w in matches {
                                joined.push((key.clone(), (value.clone(), (*w).clone())));
                            }
                        }
                    }
                    joined
                })
            });
            Ok(out)
        })
    }
}

/// Split one partition's references by destination bucket.
fn route<K: Hash, V>(part: &[(K, V)], buckets: usize) -> Vec<Vec<(&K, &V)>> {
    let mut routed: Vec<Vec<(&K, &V)>> = (0..buckets).map(|_| Vec::new()).collect();
    for (key, value) in part {
        routed[bucket_of(key, buckets)].push((key, value));
    }
    routed
}
