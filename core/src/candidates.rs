//! Map stage: per-user candidate pair generation.
//!
//! A [`CandidateGenerator`] owns the working set of one map partition. It
//! buffers every qualifying item per user while ratings are observed and
//! emits nothing until [`CandidateGenerator::finalize`] is called at the
//! end of the partition.
//!
//! Emission is quadratic in the size of a user's qualifying set: a user
//! with `n` qualifying items yields `n * (n - 1) / 2` records, so a few
//! heavy raters can dominate the cost of a partition.

use std::collections::{BTreeSet, HashMap};

use crate::pair_key::PairKey;
use crate::traits::PairsResult;
use crate::types::{Count, ItemId, Rating, Score, UserId};

/// Number of unordered pairs among `n` distinct items.
pub fn pair_count(n: usize) -> u64 {
    let n = n as u64;
    n * n.saturating_sub(1) / 2
}

/// Pair metadata for a qualifying set of `len` items, saturating at `u32::MAX`.
pub fn set_size_metadata(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// What one partition contributed, reported by [`CandidateGenerator::finalize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneratorStats {
    pub users: u64,
    pub pairs_emitted: u64,
}

#[derive(Debug)]
pub struct CandidateGenerator {
    threshold: Score,
    working_set: HashMap<UserId, BTreeSet<ItemId>>,
}

impl CandidateGenerator {
    pub fn new(threshold: Score) -> Self {
        Self {
            threshold,
            working_set: HashMap::new(),
        }
    }

    pub fn threshold(&self) -> Score {
        self.threshold
    }

    /// Buffer a rating. Returns whether it qualified.
    pub fn observe(&mut self, rating: Rating) -> bool {
        if !rating.qualifies(self.threshold) {
            return false;
        }
        self.working_set
            .entry(rating.user)
            .or_default()
            .insert(rating.item);
        true
    }

    /// Users with at least one qualifying item so far.
    pub fn num_users(&self) -> usize {
        self.working_set.len()
    }

    /// Emit every unordered pair of each user's qualifying items with a count of 1.
    ///
    /// Items are iterated in ascending order and only `i < j` is visited, so
    /// each pair is emitted once, already in canonical order. The pair's
    /// metadata is the size of the user's qualifying set.
    pub fn finalize<F>(self, emit: &mut F) -> PairsResult<GeneratorStats>
    where
        F: FnMut(PairKey, Count) -> PairsResult<()>,
    {
        let mut stats = GeneratorStats {
            users: self.working_set.len() as u64,
            pairs_emitted: 0,
        };

        for items in self.working_set.into_values() {
            let items: Vec<ItemId> = items.into_iter().collect();
            let size = set_size_metadata(items.len());
            for (i, &low) in items.iter().enumerate() {
                for &high in &items[i + 1..] {
                    emit(PairKey::new(low, high, size)?, 1)?;
                    stats.pairs_emitted += 1;
                }
            }
        }

        Ok(stats)
    }
}
