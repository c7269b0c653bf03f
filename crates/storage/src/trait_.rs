//! Storage trait abstraction.

use async_trait::async_trait;
use certsuite_core::{ClaimRoot, Environment, TestResultsTemplate};
use std::path::{Path, PathBuf};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Artifact not found
    #[error("Not found: {0}")]
    NotFound(PathBuf),
}

/// Storage abstraction for run artifacts.
///
/// Inputs are read from explicit paths; outputs land under the store's root.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    // === Inputs ===

    /// Load an environment snapshot.
    async fn load_environment(&self, path: &Path) -> Result<Environment>;

    /// Read a run log as text.
    async fn read_log(&self, path: &Path) -> Result<String>;

    /// Load an expected-results template.
    async fn load_template(&self, path: &Path) -> Result<TestResultsTemplate>;

    /// Load a claim written by an earlier run.
    async fn load_claim(&self, path: &Path) -> Result<ClaimRoot>;

    // === Outputs ===

    /// Write the claim; returns the path written.
    async fn save_claim(&self, claim: &ClaimRoot) -> Result<PathBuf>;

    /// Write an expected-results template; returns the path written.
    async fn save_template(&self, template: &TestResultsTemplate) -> Result<PathBuf>;
}
