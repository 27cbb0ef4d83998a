//! Core components for shuffle operations.

pub mod aggregator;
pub mod exchange;
pub mod grouping;
pub mod partitioner;

pub use aggregator::*;
pub use exchange::*;
pub use grouping::*;
pub use partitioner::*;
