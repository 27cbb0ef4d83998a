//! Context module for copairs
//!
//! This module provides the execution context that runs pairs jobs.

pub mod pairs_context;

pub use pairs_context::*;
