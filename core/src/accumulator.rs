//! Accumulator implementation
//!
//! Accumulators are variables that are only "added" to through an associative and commutative operation
//! and can therefore be updated from parallel tasks without coordination. The job uses them as
//! MapReduce-style counters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Unique identifier for an accumulator
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccumulatorId(pub String);

impl AccumulatorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for AccumulatorId {
    fn default() -> Self {
        Self::new()
    }
}

/// A named, shareable counter. Clones share the same value.
#[derive(Debug, Clone)]
pub struct LongAccumulator {
    id: AccumulatorId,
    name: String,
    value: Arc<AtomicU64>,
}

impl LongAccumulator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: AccumulatorId::new(),
            name: name.into(),
            value: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn add(&self, value: u64) {
        self.value.fetch_add(value, Ordering::Relaxed);
    }

    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.value.store(0, Ordering::Relaxed);
    }

    pub fn id(&self) -> &AccumulatorId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Counters kept for one job run.
#[derive(Debug, Clone)]
pub struct JobCounters {
    pub ratings_read: LongAccumulator,
    pub ratings_qualified: LongAccumulator,
    pub ratings_below_threshold: LongAccumulator,
    pub malformed_records: LongAccumulator,
    pub users_seen: LongAccumulator,
    pub pairs_emitted: LongAccumulator,
    pub combine_output_records: LongAccumulator,
    pub reduce_groups: LongAccumulator,
    pub output_pairs: LongAccumulator,
}

impl JobCounters {
    pub fn new() -> Self {
        Self {
            ratings_read: LongAccumulator::new("ratings_read"),
            ratings_qualified: LongAccumulator::new("ratings_qualified"),
            ratings_below_threshold: LongAccumulator::new("ratings_below_threshold"),
            malformed_records: LongAccumulator::new("malformed_records"),
            users_seen: LongAccumulator::new("users_seen"),
            pairs_emitted: LongAccumulator::new("pairs_emitted"),
            combine_output_records: LongAccumulator::new("combine_output_records"),
            reduce_groups: LongAccumulator::new("reduce_groups"),
            output_pairs: LongAccumulator::new("output_pairs"),
        }
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            ratings_read: self.ratings_read.value(),
            ratings_qualified: self.ratings_qualified.value(),
            ratings_below_threshold: self.ratings_below_threshold.value(),
            malformed_records: self.malformed_records.value(),
            users_seen: self.users_seen.value(),
            pairs_emitted: self.pairs_emitted.value(),
            combine_output_records: self.combine_output_records.value(),
            reduce_groups: self.reduce_groups.value(),
            output_pairs: self.output_pairs.value(),
        }
    }
}

impl Default for JobCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`JobCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub ratings_read: u64,
    pub ratings_qualified: u64,
    pub ratings_below_threshold: u64,
    pub malformed_records: u64,
    pub users_seen: u64,
    pub pairs_emitted: u64,
    pub combine_output_records: u64,
    pub reduce_groups: u64,
    pub output_pairs: u64,
}

impl fmt::Display for CounterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ratings_read={}", self.ratings_read)?;
        writeln!(f, "ratings_qualified={}", self.ratings_qualified)?;
        writeln!(f, "ratings_below_threshold={}", self.ratings_below_threshold)?;
        writeln!(f, "malformed_records={}", self.malformed_records)?;
        writeln!(f, "users_seen={}", self.users_seen)?;
        writeln!(f, "pairs_emitted={}", self.pairs_emitted)?;
        writeln!(f, "combine_output_records={}", self.combine_output_records)?;
        writeln!(f, "reduce_groups={}", self.reduce_groups)?;
        write!(f, "output_pairs={}", self.output_pairs)
    }
}
