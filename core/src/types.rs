//! Input record types.

use serde::{Deserialize, Serialize};

pub type UserId = u64;
pub type ItemId = u64;
/// A rating value as found in the input, not yet compared to the threshold.
pub type Score = i32;
/// Co-occurrence count carried through combine and reduce.
pub type Count = u64;

/// One `(user, item, rating)` observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rating {
    pub user: UserId,
    pub item: ItemId,
    pub score: Score,
}

impl Rating {
    pub fn new(user: UserId, item: ItemId, score: Score) -> Self {
        Self { user, item, score }
    }

    /// A rating qualifies when it is strictly above the threshold.
    pub fn qualifies(&self, threshold: Score) -> bool {
        self.score > threshold
    }
}
