//! Filesystem storage implementation.
//!
//! Claims are JSON files, templates are YAML files. Outputs are written under
//! a root directory that is created on demand.

use std::path::{Path, PathBuf};
use certsuite_core::{ClaimRoot, Environment, TestResultsTemplate, DEFAULT_TEMPLATE_FILE};
use super::{ArtifactStore, StorageError, Result};
use tokio::fs;

/// File name of the claim inside the output directory.
pub const CLAIM_FILE: &str = "claim.json";

/// File-based storage backend.
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    /// Create storage rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Output directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn claim_path(&self) -> PathBuf {
        self.root.join(CLAIM_FILE)
    }

    fn template_path(&self) -> PathBuf {
        self.root.join(DEFAULT_TEMPLATE_FILE)
    }
}

#[async_trait::async_trait]
impl ArtifactStore for JsonStorage {
    async fn load_environment(&self, path: &Path) -> Result<Environment> {
        let json = read_text(path).await?;
        Ok(serde_json::from_str(&json)?)
    }

    async fn read_log(&self, path: &Path) -> Result<String> {
        read_text(path).await
    }

    async fn load_template(&self, path: &Path) -> Result<TestResultsTemplate> {
        let yaml = read_text(path).await?;
        Ok(serde_yaml::from_str(&yaml)?)
    }

    async fn load_claim(&self, path: &Path) -> Result<ClaimRoot> {
        let json = read_text(path).await?;
        Ok(ClaimRoot::from_json(&json)?)
    }

    async fn save_claim(&self, claim: &ClaimRoot) -> Result<PathBuf> {
        let path = self.claim_path();
        let json = claim.to_json_pretty()?;
        fs::write(&path, json.as_bytes()).await?;
        tracing::debug!("Wrote claim to {}", path.display());
        Ok(path)
    }

    async fn save_template(&self, template: &TestResultsTemplate) -> Result<PathBuf> {
        let path = self.template_path();
        let yaml = serde_yaml::to_string(template)?;
        fs::write(&path, yaml.as_bytes()).await?;
        tracing::debug!("Wrote template to {}", path.display());
        Ok(path)
    }
}

async fn read_text(path: &Path) -> Result<String> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(StorageError::NotFound(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}
