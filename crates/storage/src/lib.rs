//! Artifact storage for certsuite.
//!
//! This crate provides a trait-based interface for the files a run reads and
//! writes (environment snapshot, claim, run log, expected-results template)
//! with a plain filesystem implementation.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;

pub use trait_::{ArtifactStore, StorageError, Result};
pub use json_storage::{JsonStorage, CLAIM_FILE};
