//! Common utilities and abstractions for the copairs project.
//!
//! This crate provides the shared error type and the job configuration model.

pub mod config;
pub mod error;

pub use config::{DEFAULT_QUALITY_THRESHOLD, DatasetVariant, GroupingMode, JobConfig};
pub use error::{CommonError, Diagnose, ErrorCategory, ErrorContext, Result};
