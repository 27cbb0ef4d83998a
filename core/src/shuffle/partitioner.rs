//! Defines partitioners for routing map output to reduce workers.

use std::collections::hash_map::DefaultHasher;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::pair_key::PairKey;
use crate::types::ItemId;

/// Decides which reduce worker receives a key.
///
/// Implementations must be deterministic for the lifetime of a job: the
/// same key always lands on the same partition.
pub trait Partitioner<K>: Send + Sync + Debug {
    fn num_partitions(&self) -> u32;

    fn get_partition(&self, key: &K) -> u32;
}

/// Hash of `value` reduced modulo `num_partitions`.
///
/// `DefaultHasher::new()` uses fixed keys, so the result is stable across
/// threads and runs of the same binary.
pub fn hash_partition<T: Hash + ?Sized>(value: &T, num_partitions: u32, seed: u64) -> u32 {
    let mut s = DefaultHasher::new();
    seed.hash(&mut s);
    value.hash(&mut s);
    (s.finish() % num_partitions as u64) as u32
}

/// A partitioner that uses the hash of the whole key.
#[derive(Clone, Debug)]
pub struct HashPartitioner {
    num_partitions: u32,
    seed: u64,
}

impl HashPartitioner {
    pub fn new(num_partitions: u32) -> Self {
        Self::with_seed(num_partitions, 0)
    }

    pub fn with_seed(num_partitions: u32, seed: u64) -> Self {
        assert!(num_partitions > 0, "Number of partitions must be positive.");
        Self {
            num_partitions,
            seed,
        }
    }
}

impl<K: Hash> Partitioner<K> for HashPartitioner {
    fn num_partitions(&self) -> u32 {
        self.num_partitions
    }

    fn get_partition(&self, key: &K) -> u32 {
        hash_partition(key, self.num_partitions, self.seed)
    }
}

/// A key whose routing identity may be narrower than its full identity.
pub trait RouteKey {
    type Route: Hash;

    fn route_key(&self) -> Self::Route;
}

impl RouteKey for PairKey {
    type Route = ItemId;

    fn route_key(&self) -> ItemId {
        PairKey::route_key(self)
    }
}

/// Routes on the key's routing sub-key only.
///
/// Every key sharing a sub-key lands on the same worker, whatever the rest
/// of the key holds. This is what lets a reduce-side grouping coarser than
/// full key equality see all of its records.
pub struct RouteKeyPartitioner<K> {
    num_partitions: u32,
    seed: u64,
    _phantom: PhantomData<fn(&K)>,
}

impl<K> Clone for RouteKeyPartitioner<K> {
    fn clone(&self) -> Self {
        Self::with_seed(self.num_partitions, self.seed)
    }
}

impl<K> Debug for RouteKeyPartitioner<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteKeyPartitioner")
            .field("num_partitions", &self.num_partitions)
            .field("seed", &self.seed)
            .finish()
    }
}

impl<K> RouteKeyPartitioner<K> {
    pub fn new(num_partitions: u32) -> Self {
        Self::with_seed(num_partitions, 0)
    }

    pub fn with_seed(num_partitions: u32, seed: u64) -> Self {
        assert!(num_partitions > 0, "Number of partitions must be positive.");
        Self {
            num_partitions,
            seed,
            _phantom: PhantomData,
        }
    }
}

impl<K: RouteKey> Partitioner<K> for RouteKeyPartitioner<K> {
    fn num_partitions(&self) -> u32 {
        self.num_partitions
    }

    fn get_partition(&self, key: &K) -> u32 {
        hash_partition(&key.route_key(), self.num_partitions, self.seed)
    }
}
