//! Depot Core
//!
//! Shared utilities for the Depot asset crates: hashed collections, logging
//! bootstrap and profiling hooks.

pub mod alloc;
pub mod logging;
#[cfg(feature = "profiling")]
pub mod profiling;
