//! Claim model - the machine-readable report of one run.
//!
//! The claim is consumed downstream (failure views, the reference verifier,
//! external tooling), so its serialized form is stable: results are keyed
//! in an ordered map and every field round-trips byte for byte.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::{Classification, Scenario};
use crate::evidence::Evidence;
use crate::id::RunId;
use crate::outcome::CheckState;
use crate::Time;

/// Version of the claim layout written by this crate.
pub const CLAIM_FORMAT_VERSION: &str = "v0.5.0";

/// Top-level claim document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRoot {
    /// The claim body
    pub claim: Claim,
}

/// Claim body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Run metadata
    pub metadata: ClaimMetadata,

    /// Tool and format versions
    pub versions: Versions,

    /// Results keyed by `suite/id`
    pub results: BTreeMap<String, CheckRecord>,
}

/// Run metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimMetadata {
    /// Run identifier
    pub run_id: RunId,

    /// Run start
    pub start_time: Time,

    /// Run end
    pub end_time: Time,

    /// Label expression the run was filtered with
    pub label_filter: String,

    /// Global timeout, as given
    pub timeout: String,

    /// Whether the global timeout elapsed
    pub timed_out: bool,

    /// Why the run was aborted, if it was
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,
}

/// Versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Versions {
    /// certsuite version
    pub certsuite: String,

    /// Claim format version
    pub claim_format: String,
}

impl Default for Versions {
    fn default() -> Self {
        Self {
            certsuite: env!("CARGO_PKG_VERSION").to_string(),
            claim_format: CLAIM_FORMAT_VERSION.to_string(),
        }
    }
}

/// Identity of a check in the claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestId {
    /// Check identifier
    pub id: String,

    /// Suite name
    pub suite: String,

    /// Tags
    pub tags: Vec<String>,
}

/// Catalog text copied into the claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogInfo {
    /// Description
    pub description: String,

    /// Remediation
    pub remediation: String,

    /// Documentation link
    pub best_practice_reference: String,

    /// Exception process
    pub exception_process: String,
}

/// Compliant and non-compliant objects of a check.
pub type CheckDetails = Evidence;

/// Recorded result of one check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRecord {
    /// Check identity
    #[serde(rename = "testID")]
    pub test_id: TestId,

    /// Terminal state
    pub state: CheckState,

    /// Start time
    pub start_time: Time,

    /// End time
    pub end_time: Time,

    /// Duration in seconds
    pub duration: i64,

    /// Skip reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,

    /// Failure or error reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    /// Evidence
    pub check_details: CheckDetails,

    /// Captured per-check log
    pub captured_test_output: String,

    /// Scenario classification
    #[serde(default)]
    pub category_classification: BTreeMap<Scenario, Classification>,

    /// Catalog text, absent for checks without a catalog entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_info: Option<CatalogInfo>,
}

impl ClaimRoot {
    /// Serialize as indented JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl Claim {
    /// Number of results in a given state.
    pub fn count_by_state(&self, state: CheckState) -> usize {
        self.results.values().filter(|r| r.state == state).count()
    }

    /// Distinct suite names, sorted.
    pub fn suites(&self) -> Vec<String> {
        let mut suites: Vec<String> = self
            .results
            .values()
            .map(|r| r.test_id.suite.clone())
            .collect();
        suites.sort();
        suites.dedup();
        suites
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::ReportObject;

    fn sample_claim() -> ClaimRoot {
        let start: Time = "2026-03-01T10:00:00.123456789Z".parse().unwrap();
        let end: Time = "2026-03-01T10:05:00Z".parse().unwrap();

        let mut details = Evidence::new();
        details.add_non_compliant(ReportObject::namespace("ns1", "no deny-all", false));

        let mut results = BTreeMap::new();
        results.insert(
            "networking/network-policy-deny-all".to_string(),
            CheckRecord {
                test_id: TestId {
                    id: "network-policy-deny-all".to_string(),
                    suite: "networking".to_string(),
                    tags: vec!["common".to_string(), "networking".to_string()],
                },
                state: CheckState::Failed,
                start_time: start,
                end_time: end,
                duration: 300,
                skip_reason: None,
                failure_reason: Some("1 non-compliant object".to_string()),
                check_details: details,
                captured_test_output: "line\n".to_string(),
                category_classification: [(Scenario::Telco, Classification::Mandatory)].into(),
                catalog_info: None,
            },
        );

        ClaimRoot {
            claim: Claim {
                metadata: ClaimMetadata {
                    run_id: RunId::new(),
                    start_time: start,
                    end_time: end,
                    label_filter: "common".to_string(),
                    timeout: "24h".to_string(),
                    timed_out: false,
                    abort_reason: None,
                },
                versions: Versions::default(),
                results,
            },
        }
    }

    #[test]
    fn test_claim_json_is_byte_stable() {
        let claim = sample_claim();
        let first = claim.to_json_pretty().unwrap();
        let reparsed = ClaimRoot::from_json(&first).unwrap();
        let second = reparsed.to_json_pretty().unwrap();

        assert_eq!(first, second);
        assert_eq!(reparsed, claim);
    }

    #[test]
    fn test_claim_field_names() {
        let json: serde_json::Value =
            serde_json::from_str(&sample_claim().to_json_pretty().unwrap()).unwrap();
        let record = &json["claim"]["results"]["networking/network-policy-deny-all"];
        assert_eq!(record["testID"]["suite"], "networking");
        assert_eq!(record["state"], "failed");
        assert!(record.get("skipReason").is_none());
        assert_eq!(record["checkDetails"]["NonCompliantObjectsOut"][0]["ObjectType"], "Namespace");
    }

    #[test]
    fn test_counts_and_suites() {
        let claim = sample_claim().claim;
        assert_eq!(claim.count_by_state(CheckState::Failed), 1);
        assert_eq!(claim.count_by_state(CheckState::Passed), 0);
        assert_eq!(claim.suites(), vec!["networking".to_string()]);
    }
}
