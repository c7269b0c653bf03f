//! Catalog metadata - descriptive fields attached to every check id.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag carried by checks that apply to every workload.
pub const TAG_COMMON: &str = "common";
/// Tag for the extended tier.
pub const TAG_EXTENDED: &str = "extended";
/// Tag for the far-edge tier.
pub const TAG_FAR_EDGE: &str = "faredge";
/// Tag for the telco tier.
pub const TAG_TELCO: &str = "telco";

/// Tier tags, the expansion of the `all` label literal.
pub const TIER_TAGS: [&str; 4] = [TAG_COMMON, TAG_EXTENDED, TAG_FAR_EDGE, TAG_TELCO];

/// Exception process text used when an entry documents none.
pub const DEFAULT_EXCEPTION_PROCESS: &str = "No exceptions";
/// Reference text used when an entry has no doc link.
pub const DEFAULT_REFERENCE: &str = "No Reference Document Specified";

/// Certification scenario a check can be classified for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Scenario {
    /// Far-edge deployments
    FarEdge,
    /// Telco workloads
    Telco,
    /// Non-telco workloads
    NonTelco,
    /// Extended certification
    Extended,
}

impl Scenario {
    /// All scenarios, in report order.
    pub const ALL: [Scenario; 4] = [
        Scenario::FarEdge,
        Scenario::Telco,
        Scenario::NonTelco,
        Scenario::Extended,
    ];
}

/// Whether a check is required for a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    /// Must pass for the scenario
    Mandatory,
    /// Informational for the scenario
    Optional,
}

/// Key of a catalog entry: ids are unique within a suite namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CatalogKey {
    /// Check identifier
    pub id: String,

    /// Suite the check belongs to
    pub suite: String,
}

impl std::fmt::Display for CatalogKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.suite, self.id)
    }
}

/// Immutable descriptive metadata for one check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Check identifier
    pub id: String,

    /// Suite name
    pub suite: String,

    /// What the check verifies
    pub description: String,

    /// How to fix a failure
    pub remediation: String,

    /// How to request an exception
    pub exception_process: String,

    /// Documentation link
    pub best_practice_reference: String,

    /// Covered by QE
    pub qe: bool,

    /// Per-scenario classification
    pub classification: BTreeMap<Scenario, Classification>,

    /// Tags (tiers and free-form labels)
    pub tags: Vec<String>,
}

impl CatalogEntry {
    /// Create an entry with empty descriptive fields.
    pub fn new(id: impl Into<String>, suite: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            suite: suite.into(),
            description: String::new(),
            remediation: String::new(),
            exception_process: String::new(),
            best_practice_reference: String::new(),
            qe: false,
            classification: BTreeMap::new(),
            tags: Vec::new(),
        }
    }

    /// Set description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Set remediation.
    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = remediation.into();
        self
    }

    /// Set exception process.
    pub fn with_exception_process(mut self, process: impl Into<String>) -> Self {
        self.exception_process = process.into();
        self
    }

    /// Set documentation link.
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.best_practice_reference = reference.into();
        self
    }

    /// Mark as QE-covered.
    pub fn with_qe(mut self, qe: bool) -> Self {
        self.qe = qe;
        self
    }

    /// Classify for one scenario.
    pub fn classify(mut self, scenario: Scenario, classification: Classification) -> Self {
        self.classification.insert(scenario, classification);
        self
    }

    /// Add tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Key of this entry.
    pub fn key(&self) -> CatalogKey {
        CatalogKey {
            id: self.id.clone(),
            suite: self.suite.clone(),
        }
    }

    /// Fill blank fields with their registration defaults.
    pub fn apply_defaults(&mut self) {
        if self.exception_process.trim().is_empty() {
            self.exception_process = DEFAULT_EXCEPTION_PROCESS.to_string();
        }
        if self.best_practice_reference.trim().is_empty() {
            self.best_practice_reference = DEFAULT_REFERENCE.to_string();
        }
        if self.tags.is_empty() {
            self.tags.push(TAG_COMMON.to_string());
        }
    }

    /// Comma-joined tag list, as catalog generators print it.
    pub fn joined_tags(&self) -> String {
        self.tags.join(",")
    }

    /// Classification for a scenario, `Optional` when unset.
    pub fn classification_for(&self, scenario: Scenario) -> Classification {
        self.classification
            .get(&scenario)
            .copied()
            .unwrap_or(Classification::Optional)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_defaults_fills_blank_fields() {
        let mut entry = CatalogEntry::new("no-1337-uid", "access-control")
            .with_exception_process("   ");
        entry.apply_defaults();

        assert_eq!(entry.exception_process, DEFAULT_EXCEPTION_PROCESS);
        assert_eq!(entry.best_practice_reference, DEFAULT_REFERENCE);
        assert_eq!(entry.tags, vec![TAG_COMMON.to_string()]);
    }

    #[test]
    fn test_apply_defaults_keeps_explicit_values() {
        let mut entry = CatalogEntry::new("crd-status", "observability")
            .with_exception_process("File a ticket")
            .with_reference("https://example.invalid/crd")
            .with_tags([TAG_EXTENDED]);
        entry.apply_defaults();

        assert_eq!(entry.exception_process, "File a ticket");
        assert_eq!(entry.best_practice_reference, "https://example.invalid/crd");
        assert_eq!(entry.joined_tags(), "extended");
    }

    #[test]
    fn test_classification_serializes_as_names() {
        let entry = CatalogEntry::new("a", "s")
            .classify(Scenario::Telco, Classification::Mandatory)
            .classify(Scenario::FarEdge, Classification::Optional);
        let json = serde_json::to_value(&entry.classification).unwrap();
        assert_eq!(json["Telco"], "Mandatory");
        assert_eq!(json["FarEdge"], "Optional");
        assert_eq!(entry.classification_for(Scenario::NonTelco), Classification::Optional);
    }

    #[test]
    fn test_key_display() {
        let key = CatalogEntry::new("network-policy-deny-all", "networking").key();
        assert_eq!(key.to_string(), "networking/network-policy-deny-all");
    }
}
