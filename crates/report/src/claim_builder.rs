//! Builds the claim document from a run report and the catalog.

use certsuite_core::{
    CatalogInfo, CheckOutcome, CheckRecord, Claim, ClaimMetadata, ClaimRoot, RunId, TestId,
    Versions,
};
use certsuite_engine::{Catalog, RunReport};
use std::collections::BTreeMap;

/// Claim builder.
pub struct ClaimBuilder<'a> {
    catalog: &'a Catalog,
    run_id: RunId,
    label_filter: String,
    timeout: String,
    versions: Versions,
}

impl<'a> ClaimBuilder<'a> {
    /// Create a builder that looks entries up in `catalog`.
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            run_id: RunId::new(),
            label_filter: String::new(),
            timeout: String::new(),
            versions: Versions::default(),
        }
    }

    /// Set the run id.
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = run_id;
        self
    }

    /// Record the label expression.
    pub fn with_label_filter(mut self, filter: impl Into<String>) -> Self {
        self.label_filter = filter.into();
        self
    }

    /// Record the timeout as the user gave it.
    pub fn with_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = timeout.into();
        self
    }

    /// Override versions.
    pub fn with_versions(mut self, versions: Versions) -> Self {
        self.versions = versions;
        self
    }

    /// Build the claim.
    pub fn build(&self, report: &RunReport) -> ClaimRoot {
        let results: BTreeMap<String, CheckRecord> = report
            .outcomes
            .iter()
            .map(|o| (o.key().to_string(), self.record(o)))
            .collect();

        ClaimRoot {
            claim: Claim {
                metadata: ClaimMetadata {
                    run_id: self.run_id,
                    start_time: report.start_time,
                    end_time: report.end_time,
                    label_filter: self.label_filter.clone(),
                    timeout: self.timeout.clone(),
                    timed_out: report.timed_out,
                    abort_reason: report.abort_reason.clone(),
                },
                versions: self.versions.clone(),
                results,
            },
        }
    }

    fn record(&self, outcome: &CheckOutcome) -> CheckRecord {
        let entry = self.catalog.lookup(&outcome.suite, &outcome.id);
        if entry.is_none() {
            tracing::warn!("[{}] No catalog entry in suite {}", outcome.id, outcome.suite);
        }

        CheckRecord {
            test_id: TestId {
                id: outcome.id.clone(),
                suite: outcome.suite.clone(),
                tags: outcome.tags.clone(),
            },
            state: outcome.state,
            start_time: outcome.start_time,
            end_time: outcome.end_time,
            duration: outcome.duration_secs(),
            skip_reason: outcome.skip_reason.clone(),
            failure_reason: outcome.failure_reason.clone(),
            check_details: outcome.evidence.clone(),
            captured_test_output: outcome.captured_output.clone(),
            category_classification: entry.map(|e| e.classification.clone()).unwrap_or_default(),
            catalog_info: entry.map(|e| CatalogInfo {
                description: e.description.clone(),
                remediation: e.remediation.clone(),
                best_practice_reference: e.best_practice_reference.clone(),
                exception_process: e.exception_process.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::tests::{outcome, report};
    use certsuite_core::{CatalogEntry, CheckState, Classification, ReportObject, Scenario};
    use certsuite_engine::CatalogBuilder;

    fn catalog() -> Catalog {
        let mut builder = CatalogBuilder::new();
        builder
            .register(
                CatalogEntry::new("a", "networking")
                    .with_description("Checks a")
                    .classify(Scenario::Telco, Classification::Mandatory),
            )
            .unwrap();
        builder.build()
    }

    #[test]
    fn test_build_copies_outcomes_and_catalog_info() {
        let catalog = catalog();
        let mut failed = outcome("a", "networking", CheckState::Failed);
        failed
            .evidence
            .add_non_compliant(ReportObject::namespace("ns1", "no policy", false));
        let run = report(vec![failed, outcome("b", "networking", CheckState::Passed)]);

        let claim = ClaimBuilder::new(&catalog)
            .with_label_filter("networking")
            .with_timeout("24h")
            .build(&run)
            .claim;

        assert_eq!(claim.results.len(), 2);
        let a = &claim.results["networking/a"];
        assert_eq!(a.state, CheckState::Failed);
        assert_eq!(a.check_details.non_compliant.len(), 1);
        assert_eq!(a.catalog_info.as_ref().unwrap().description, "Checks a");
        assert_eq!(
            a.category_classification.get(&Scenario::Telco),
            Some(&Classification::Mandatory)
        );
        assert!(claim.results["networking/b"].catalog_info.is_none());
        assert_eq!(claim.metadata.label_filter, "networking");
    }

    #[test]
    fn test_same_id_in_two_suites_keeps_both_records() {
        let mut builder = CatalogBuilder::new();
        builder.register(CatalogEntry::new("a", "networking")).unwrap();
        builder.register(CatalogEntry::new("a", "observability")).unwrap();
        let catalog = builder.build();

        let run = report(vec![
            outcome("a", "networking", CheckState::Failed),
            outcome("a", "observability", CheckState::Passed),
        ]);
        let claim = ClaimBuilder::new(&catalog).build(&run).claim;

        assert_eq!(claim.results.len(), run.outcomes.len());
        assert_eq!(claim.results["networking/a"].state, CheckState::Failed);
        assert_eq!(claim.results["observability/a"].state, CheckState::Passed);
        assert_eq!(claim.count_by_state(CheckState::Failed), 1);
    }

    #[test]
    fn test_built_claim_round_trips() {
        let catalog = catalog();
        let run = report(vec![outcome("a", "networking", CheckState::Passed)]);
        let claim = ClaimBuilder::new(&catalog).build(&run);

        let first = claim.to_json_pretty().unwrap();
        let second = ClaimRoot::from_json(&first).unwrap().to_json_pretty().unwrap();
        assert_eq!(first, second);
    }
}
