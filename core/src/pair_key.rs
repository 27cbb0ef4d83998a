//! Composite key for an unordered item pair.
//!
//! A [`PairKey`] has two identities. Its full identity is `(low, high)` and
//! drives equality, hashing and ordering. Its routing identity is `low`
//! alone, which decides the reduce worker. The `metadata` field rides
//! along for context and never takes part in either.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::traits::{PairsError, PairsResult};
use crate::types::{Count, ItemId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Encode, Decode)]
pub struct PairKey {
    low: ItemId,
    high: ItemId,
    metadata: u32,
}

impl PairKey {
    /// Build a key from two distinct items given in any order.
    pub fn new(a: ItemId, b: ItemId, metadata: u32) -> PairsResult<Self> {
        match a.cmp(&b) {
            Ordering::Less => Ok(Self {
                low: a,
                high: b,
                metadata,
            }),
            Ordering::Greater => Ok(Self {
                low: b,
                high: a,
                metadata,
            }),
            Ordering::Equal => Err(PairsError::InvalidPair(a)),
        }
    }

    pub fn low_id(&self) -> ItemId {
        self.low
    }

    pub fn high_id(&self) -> ItemId {
        self.high
    }

    /// Size of the qualifying set the pair was generated from. Informational only.
    pub fn metadata(&self) -> u32 {
        self.metadata
    }

    /// The routing sub-key.
    pub fn route_key(&self) -> ItemId {
        self.low
    }

    pub fn pair(&self) -> (ItemId, ItemId) {
        (self.low, self.high)
    }

    /// True when both keys share the routing sub-key.
    pub fn route_eq(&self, other: &PairKey) -> bool {
        self.low == other.low
    }

    pub fn to_bytes(&self) -> PairsResult<Vec<u8>> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| PairsError::SerializationError(format!("encode pair key: {}", e)))
    }

    /// Decode a key, re-checking the `low < high` invariant.
    pub fn from_bytes(bytes: &[u8]) -> PairsResult<Self> {
        let (raw, _): (PairKey, usize) =
            bincode::decode_from_slice(bytes, bincode::config::standard()).map_err(|e| {
                PairsError::SerializationError(format!("decode pair key: {}", e))
            })?;
        PairKey::new(raw.low, raw.high, raw.metadata)
    }
}

impl PartialEq for PairKey {
    fn eq(&self, other: &Self) -> bool {
        self.pair() == other.pair()
    }
}

impl Eq for PairKey {}

impl Hash for PairKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.low.hash(state);
        self.high.hash(state);
    }
}

impl Ord for PairKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.low
            .cmp(&other.low)
            .then_with(|| self.high.cmp(&other.high))
    }
}

impl PartialOrd for PairKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}:{}, {}>", self.metadata, self.low, self.high)
    }
}

/// Final count for one exact pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairCount {
    pub low: ItemId,
    pub high: ItemId,
    pub count: Count,
}

impl PairCount {
    pub fn new(key: &PairKey, count: Count) -> Self {
        Self {
            low: key.low_id(),
            high: key.high_id(),
            count,
        }
    }
}

impl fmt::Display for PairCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}>\t{}", self.low, self.high, self.count)
    }
}
