//! Failure view over a claim: failed checks per suite with their
//! non-compliant objects.

use certsuite_core::{fields, CheckState, Claim, ReportObject};
use serde::Serialize;

/// Errors building the failure view.
#[derive(Debug, thiserror::Error)]
pub enum FailuresError {
    /// A requested suite is not in the claim
    #[error("suite {0:?} not found in claim")]
    UnknownSuite(String),

    /// JSON rendering failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human readable text
    Text,
    /// JSON document
    Json,
}

/// One key/value of a non-compliant object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectField {
    /// Field key
    pub key: String,
    /// Field value
    pub value: String,
}

/// A non-compliant object, reason split out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NonCompliantObject {
    /// Object type
    #[serde(rename = "type")]
    pub object_type: String,

    /// Why it is non-compliant
    pub reason: String,

    /// Remaining fields, in order
    pub spec: Vec<ObjectField>,
}

impl From<&ReportObject> for NonCompliantObject {
    fn from(object: &ReportObject) -> Self {
        Self {
            object_type: object.object_type().to_string(),
            reason: object.reason().unwrap_or_default().to_string(),
            spec: object
                .fields()
                .filter(|(k, _)| {
                    *k != fields::REASON_FOR_NON_COMPLIANCE && *k != fields::REASON_FOR_COMPLIANCE
                })
                .map(|(k, v)| ObjectField {
                    key: k.to_string(),
                    value: v.to_string(),
                })
                .collect(),
        }
    }
}

/// A failed check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedCheck {
    /// Check id
    pub name: String,

    /// Catalog description
    pub description: String,

    /// Failure reason recorded by the runner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    /// Non-compliant objects
    pub non_compliant_objects: Vec<NonCompliantObject>,
}

/// Failed checks of one suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedSuite {
    /// Suite name
    pub name: String,

    /// Failed checks, by id
    pub failures: Vec<FailedCheck>,
}

/// Collect failed checks per suite. `suites` restricts the view; unknown
/// names are an error.
pub fn collect_failures(claim: &Claim, suites: &[String]) -> Result<Vec<FailedSuite>, FailuresError> {
    let known = claim.suites();
    if let Some(unknown) = suites.iter().find(|s| !known.contains(*s)) {
        return Err(FailuresError::UnknownSuite(unknown.clone()));
    }

    let wanted: Vec<&String> = if suites.is_empty() {
        known.iter().collect()
    } else {
        known.iter().filter(|s| suites.contains(*s)).collect()
    };

    let mut out = Vec::new();
    for suite in wanted {
        let failures: Vec<FailedCheck> = claim
            .results
            .values()
            .filter(|r| &r.test_id.suite == suite && r.state == CheckState::Failed)
            .map(|r| FailedCheck {
                name: r.test_id.id.clone(),
                description: r
                    .catalog_info
                    .as_ref()
                    .map(|c| c.description.clone())
                    .unwrap_or_default(),
                failure_reason: r.failure_reason.clone(),
                non_compliant_objects: r
                    .check_details
                    .non_compliant
                    .iter()
                    .map(NonCompliantObject::from)
                    .collect(),
            })
            .collect();

        if !failures.is_empty() {
            out.push(FailedSuite {
                name: suite.clone(),
                failures,
            });
        }
    }
    Ok(out)
}

/// Text rendering.
pub fn render_text(suites: &[FailedSuite]) -> String {
    if suites.is_empty() {
        return "No failed checks.\n".to_string();
    }

    let mut out = String::new();
    for suite in suites {
        out.push_str(&format!("Test Suite: {}\n", suite.name));
        for check in &suite.failures {
            out.push_str(&format!("  Test Case: {}\n", check.name));
            out.push_str(&format!("    Description: {}\n", check.description));
            if check.non_compliant_objects.is_empty() {
                let reason = check.failure_reason.as_deref().unwrap_or("no reason recorded");
                out.push_str(&format!("    Failure reason: {}\n", reason));
                continue;
            }
            out.push_str("    Non-Compliant Objects:\n");
            for object in &check.non_compliant_objects {
                out.push_str(&format!("      Type: {}\n", object.object_type));
                out.push_str(&format!("      Reason: {}\n", object.reason));
                for field in &object.spec {
                    out.push_str(&format!("      {}: {}\n", field.key, field.value));
                }
                out.push('\n');
            }
        }
    }
    out
}

/// JSON rendering: `{"testSuites": [...]}`.
pub fn render_json(suites: &[FailedSuite]) -> Result<String, FailuresError> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Document<'a> {
        test_suites: &'a [FailedSuite],
    }
    Ok(serde_json::to_string_pretty(&Document { test_suites: suites })?)
}

/// Render in the requested format.
pub fn render(suites: &[FailedSuite], format: OutputFormat) -> Result<String, FailuresError> {
    match format {
        OutputFormat::Text => Ok(render_text(suites)),
        OutputFormat::Json => render_json(suites),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::tests::{outcome, report};
    use crate::ClaimBuilder;
    use certsuite_engine::CatalogBuilder;

    fn claim() -> Claim {
        let mut failed = outcome("deny-all", "networking", CheckState::Failed);
        failed
            .evidence
            .add_non_compliant(ReportObject::namespace("ns1", "no deny-all policy", false));
        failed
            .evidence
            .add_compliant(ReportObject::namespace("ns2", "has policy", true));
        let run = report(vec![
            failed,
            outcome("icmp", "networking", CheckState::Passed),
            outcome("uid", "access-control", CheckState::Failed),
            outcome("crd", "observability", CheckState::Skipped),
        ]);
        let catalog = CatalogBuilder::new().build();
        ClaimBuilder::new(&catalog).build(&run).claim
    }

    #[test]
    fn test_collect_all_suites() {
        let suites = collect_failures(&claim(), &[]).unwrap();
        let names: Vec<_> = suites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["access-control", "networking"]);

        let net = &suites[1];
        assert_eq!(net.failures.len(), 1);
        let object = &net.failures[0].non_compliant_objects[0];
        assert_eq!(object.reason, "no deny-all policy");
        assert_eq!(object.spec, vec![ObjectField { key: "Namespace".into(), value: "ns1".into() }]);
    }

    #[test]
    fn test_collect_filtered_and_unknown() {
        let claim = claim();
        let suites = collect_failures(&claim, &["networking".to_string()]).unwrap();
        assert_eq!(suites.len(), 1);

        let err = collect_failures(&claim, &["platform".to_string()]).unwrap_err();
        assert!(matches!(err, FailuresError::UnknownSuite(s) if s == "platform"));
    }

    #[test]
    fn test_render_text_and_json() {
        let suites = collect_failures(&claim(), &["networking".to_string()]).unwrap();

        let text = render(&suites, OutputFormat::Text).unwrap();
        assert!(text.contains("Test Suite: networking"));
        assert!(text.contains("  Test Case: deny-all"));
        assert!(text.contains("      Namespace: ns1"));

        let json: serde_json::Value =
            serde_json::from_str(&render(&suites, OutputFormat::Json).unwrap()).unwrap();
        let object = &json["testSuites"][0]["failures"][0]["nonCompliantObjects"][0];
        assert_eq!(object["type"], "Namespace");
        assert_eq!(object["spec"][0]["key"], "Namespace");
    }

    #[test]
    fn test_no_failures() {
        assert_eq!(render_text(&[]), "No failed checks.\n");
    }
}
