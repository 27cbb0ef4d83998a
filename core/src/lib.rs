//! copairs core - co-occurrence pair counting over user ratings
//!
//! Ratings are parsed into per-user item sets, every unordered pair of a
//! user's well-rated items is emitted, and the pairs are routed, grouped and
//! summed in a local map/shuffle/reduce pipeline.

pub mod accumulator;
pub mod candidates;
pub mod context;
pub mod input;
pub mod pair_key;
pub mod scheduler;
pub mod shuffle;
pub mod sink;
pub mod traits;
pub mod types;

pub use accumulator::{CounterSnapshot, JobCounters, LongAccumulator};
pub use candidates::CandidateGenerator;
pub use context::{JobOutput, PairsContext};
pub use input::RecordParser;
pub use pair_key::{PairCount, PairKey};
pub use shuffle::{GroupingPolicy, RouteKeyPartitioner};
pub use sink::{MemorySink, PairSink, TextFileSink};
pub use traits::{PairsError, PairsResult};
pub use types::{Count, ItemId, Rating, Score, UserId};
