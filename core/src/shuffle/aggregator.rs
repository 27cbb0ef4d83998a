//! Defines the Aggregator trait for combining values in shuffle operations.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::hash::Hash;

/// Aggregator trait for combining values for a key.
///
/// K: Key type
/// V: Input value type
/// C: Combiner (intermediate/output) type
///
/// `merge_value` and `merge_combiners` must be associative and commutative,
/// so the same aggregator can run as a map-side combine pass zero, one or
/// many times before the final reduce without changing totals.
pub trait Aggregator<K, V, C>: Send + Sync + Debug {
    /// Create a combiner from the first value for a key.
    fn create_combiner(&self, v: V) -> C;

    /// Merge a new value into an existing combiner.
    fn merge_value(&self, c: C, v: V) -> C;

    /// Merge two combiners.
    fn merge_combiners(&self, c1: C, c2: C) -> C;
}

/// Sums values per key. Used for both the combine and the reduce pass.
#[derive(Clone, Debug)]
pub struct SumAggregator<V> {
    _phantom: std::marker::PhantomData<fn() -> V>,
}

impl<V> SumAggregator<V> {
    pub fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<V> Default for SumAggregator<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Aggregator<K, V, V> for SumAggregator<V>
where
    V: Debug + std::ops::Add<Output = V> + 'static,
{
    fn create_combiner(&self, v: V) -> V {
        v
    }

    fn merge_value(&self, c: V, v: V) -> V {
        c + v
    }

    fn merge_combiners(&self, c1: V, c2: V) -> V {
        c1 + c2
    }
}

/// Map-side combine: fold raw values into one combiner per exact key.
pub fn combine_by_key<K, V, C, A, I>(records: I, aggregator: &A) -> Vec<(K, C)>
where
    K: Hash + Eq,
    A: Aggregator<K, V, C> + ?Sized,
    I: IntoIterator<Item = (K, V)>,
{
    let mut combined: HashMap<K, C> = HashMap::new();
    for (key, value) in records {
        let merged = match combined.remove(&key) {
            Some(c) => aggregator.merge_value(c, value),
            None => aggregator.create_combiner(value),
        };
        combined.insert(key, merged);
    }
    combined.into_iter().collect()
}

/// Reduce-side merge of one group.
///
/// The group is treated as an unordered multiset and may hold several
/// distinct keys; one merged combiner is produced per exact key, in key
/// order.
pub fn merge_group<'a, K, V, C, A, I>(group: I, aggregator: &A) -> Vec<(K, C)>
where
    K: Ord + Clone + 'a,
    C: Clone + 'a,
    A: Aggregator<K, V, C> + ?Sized,
    I: IntoIterator<Item = &'a (K, C)>,
{
    let mut merged: BTreeMap<K, C> = BTreeMap::new();
    for (key, combiner) in group {
        let next = match merged.remove(key) {
            Some(c) => aggregator.merge_combiners(c, combiner.clone()),
            None => combiner.clone(),
        };
        merged.insert(key.clone(), next);
    }
    merged.into_iter().collect()
}
