//! Core traits for the copairs job
//!
//! This module defines the error type shared by every stage of a job and
//! the partition abstraction the scheduler hands to tasks.

use copairs_common::CommonError;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

use crate::types::ItemId;

/// Error types for pairs operations
#[derive(Error, Debug)]
pub enum PairsError {
    /// A pair was built from one item twice. Never produced by a healthy generator.
    #[error("Invalid pair: item {0} cannot be paired with itself")]
    InvalidPair(ItemId),

    #[error("Malformed record {record:?}: {reason}")]
    MalformedRecord { record: String, reason: String },

    #[error("Computation failed: {0}")]
    ComputationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid partition: {0}")]
    InvalidPartition(usize),

    #[error("Shuffle error: {0}")]
    ShuffleError(String),

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl PairsError {
    pub fn malformed(record: impl Into<String>, reason: impl Into<String>) -> Self {
        PairsError::MalformedRecord {
            record: record.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure is confined to a single input record.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PairsError::MalformedRecord { .. })
    }
}

/// Result type for pairs operations
pub type PairsResult<T> = Result<T, PairsError>;

/// Partition represents a logical partition of work handed to a task
pub trait Partition: Send + Sync + Debug {
    /// Get the partition index
    fn index(&self) -> usize;

    /// Get a unique identifier for this partition
    fn id(&self) -> String {
        format!("partition_{}", self.index())
    }
}

/// Basic partition implementation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicPartition {
    index: usize,
}

impl BasicPartition {
    pub fn new(index: usize) -> Self {
        Self { index }
    }
}

impl Partition for BasicPartition {
    fn index(&self) -> usize {
        self.index
    }
}
