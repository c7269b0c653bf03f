//! Reference verifier - compares a run log against an expected-results
//! template.

use certsuite_core::{TestCaseList, TestResultsTemplate};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

/// Placeholder for a result absent on one side.
pub const MISSING: &str = "MISSING";
/// Passed result string.
pub const RESULT_PASSED: &str = "PASSED";
/// Failed result string.
pub const RESULT_FAILED: &str = "FAILED";
/// Skipped result string.
pub const RESULT_SKIPPED: &str = "SKIPPED";

/// Printed when expected and actual results differ.
pub const MISMATCH_MESSAGE: &str = "Expected results DO NOT match actual results";
/// Printed when they agree.
pub const MATCH_MESSAGE: &str = "Expected results and actual results match";

const RESULT_LINE: &str = r#".*\[(.*?)\]\s+Recording result\s+"(.*?)""#;
const TABLE_WIDTH: usize = 96;

/// Verifier errors.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// Result line pattern failed to compile
    #[error("invalid result pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// A result cannot be placed in a template bucket
    #[error("unknown result {result:?} for check {id}")]
    UnknownResult {
        /// Check id
        id: String,
        /// Result found in the log
        result: String,
    },
}

/// Check id to result string, sorted by id.
pub type ResultMap = BTreeMap<String, String>;

/// One disagreement between template and log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Check id
    pub id: String,
    /// Expected result or [`MISSING`]
    pub expected: String,
    /// Actual result or [`MISSING`]
    pub actual: String,
}

/// Scan a log for `[<id>] ... Recording result "<RESULT>"` lines. The last
/// line for an id wins.
pub fn parse_log_results(log: &str) -> Result<ResultMap, VerifyError> {
    let re = Regex::new(RESULT_LINE)?;
    let mut results = ResultMap::new();
    for line in log.lines() {
        if let Some(caps) = re.captures(line) {
            results.insert(caps[1].to_string(), caps[2].to_string());
        }
    }
    Ok(results)
}

/// Fan a template out into `id -> result`.
pub fn expected_results(template: &TestResultsTemplate) -> ResultMap {
    let buckets = [
        (&template.test_cases.pass, RESULT_PASSED),
        (&template.test_cases.fail, RESULT_FAILED),
        (&template.test_cases.skip, RESULT_SKIPPED),
    ];

    let mut expected = ResultMap::new();
    for (ids, result) in buckets {
        for id in ids {
            expected.insert(id.clone(), result.to_string());
        }
    }
    expected
}

/// Disagreements between `expected` and `actual`, sorted by id.
pub fn find_mismatches(expected: &ResultMap, actual: &ResultMap) -> Vec<Mismatch> {
    let ids: BTreeSet<&String> = expected.keys().chain(actual.keys()).collect();

    ids.into_iter()
        .filter_map(|id| {
            let want = expected.get(id);
            let got = actual.get(id);
            if want == got {
                return None;
            }
            Some(Mismatch {
                id: id.clone(),
                expected: want.map_or(MISSING, String::as_str).to_string(),
                actual: got.map_or(MISSING, String::as_str).to_string(),
            })
        })
        .collect()
}

/// Aligned mismatch table.
pub fn render_mismatches(mismatches: &[Mismatch]) -> String {
    let line = "-".repeat(TABLE_WIDTH);
    let mut out = String::new();
    out.push_str(MISMATCH_MESSAGE);
    out.push('\n');
    out.push_str(&line);
    out.push('\n');
    out.push_str(&format!(
        "| {:<58} {:<19} {} |\n",
        "TEST_CASE", "EXPECTED_RESULT", "ACTUAL_RESULT"
    ));
    out.push_str(&line);
    out.push('\n');
    for m in mismatches {
        out.push_str(&format!("| {:<54} {:>19} {:>17} |\n", m.id, m.expected, m.actual));
    }
    out.push_str(&line);
    out.push('\n');
    out
}

/// Build a template from actual results. Ids are sorted within buckets.
pub fn generate_template(actual: &ResultMap) -> Result<TestResultsTemplate, VerifyError> {
    let mut cases = TestCaseList::default();
    for (id, result) in actual {
        let bucket = match result.as_str() {
            RESULT_PASSED => &mut cases.pass,
            RESULT_FAILED => &mut cases.fail,
            RESULT_SKIPPED => &mut cases.skip,
            _ => {
                return Err(VerifyError::UnknownResult {
                    id: id.clone(),
                    result: result.clone(),
                })
            }
        };
        bucket.push(id.clone());
    }
    Ok(TestResultsTemplate { test_cases: cases })
}

/// Outcome of a verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// Disagreements, sorted by id
    pub mismatches: Vec<Mismatch>,
}

impl Verification {
    /// Whether the log matches the template.
    pub fn is_match(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// Process exit code: `0` on match, `1` otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.is_match() {
            0
        } else {
            1
        }
    }

    /// Report text.
    pub fn render(&self) -> String {
        if self.is_match() {
            format!("{}\n", MATCH_MESSAGE)
        } else {
            render_mismatches(&self.mismatches)
        }
    }
}

/// Verify a log against a template.
pub fn verify(log: &str, template: &TestResultsTemplate) -> Result<Verification, VerifyError> {
    let actual = parse_log_results(log)?;
    let expected = expected_results(template);
    tracing::debug!(
        "Verifying {} logged results against {} expected",
        actual.len(),
        expected.len()
    );
    Ok(Verification {
        mismatches: find_mismatches(&expected, &actual),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(pass: &[&str], fail: &[&str], skip: &[&str]) -> TestResultsTemplate {
        let owned = |ids: &[&str]| -> Vec<String> { ids.iter().map(|s| s.to_string()).collect() };
        TestResultsTemplate {
            test_cases: TestCaseList {
                pass: owned(pass),
                fail: owned(fail),
                skip: owned(skip),
            },
        }
    }

    fn actual(pairs: &[(&str, &str)]) -> ResultMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_last_result_wins() {
        let log = "\
2026-03-01T10:00:00Z  INFO certsuite_engine::runner: [net-policy-deny-all] Recording result \"FAILED\"
2026-03-01T10:00:01Z  INFO certsuite_engine::runner: [other] some unrelated line
2026-03-01T10:00:02Z  INFO certsuite_engine::runner: [net-policy-deny-all] Recording result \"PASSED\"
";
        let results = parse_log_results(log).unwrap();
        assert_eq!(results, actual(&[("net-policy-deny-all", "PASSED")]));
    }

    #[test]
    fn test_parse_uses_last_bracket_before_marker() {
        let log = "INFO [2026-03-01] [runner.rs:212] [crd-status] Recording result  \"SKIPPED\"\n";
        let results = parse_log_results(log).unwrap();
        assert_eq!(results.get("crd-status").map(String::as_str), Some("SKIPPED"));
    }

    #[test]
    fn test_mismatch_on_wrong_bucket() {
        let expected = expected_results(&template(&["a"], &[], &["b"]));
        let mismatches = find_mismatches(&expected, &actual(&[("a", "PASSED"), ("b", "FAILED")]));
        assert_eq!(
            mismatches,
            vec![Mismatch {
                id: "b".into(),
                expected: "SKIPPED".into(),
                actual: "FAILED".into(),
            }]
        );
    }

    #[test]
    fn test_missing_on_either_side() {
        let expected = expected_results(&template(&["a", "c"], &[], &[]));
        let mismatches = find_mismatches(&expected, &actual(&[("a", "PASSED"), ("d", "FAILED")]));
        assert_eq!(mismatches.len(), 2);
        assert_eq!((mismatches[0].id.as_str(), mismatches[0].actual.as_str()), ("c", MISSING));
        assert_eq!((mismatches[1].id.as_str(), mismatches[1].expected.as_str()), ("d", MISSING));
    }

    #[test]
    fn test_generate_then_verify_round_trip() {
        let log = "\
[a] Recording result \"PASSED\"
[b] Recording result \"FAILED\"
[c] Recording result \"SKIPPED\"
";
        let generated = generate_template(&parse_log_results(log).unwrap()).unwrap();
        assert_eq!(generated, template(&["a"], &["b"], &["c"]));

        let verification = verify(log, &generated).unwrap();
        assert!(verification.is_match());
        assert_eq!(verification.exit_code(), 0);
        assert_eq!(verification.render(), format!("{}\n", MATCH_MESSAGE));
    }

    #[test]
    fn test_generate_rejects_unknown_result() {
        let err = generate_template(&actual(&[("a", "ERROR")])).unwrap_err();
        assert!(matches!(err, VerifyError::UnknownResult { id, .. } if id == "a"));
    }

    #[test]
    fn test_render_table_is_aligned() {
        let verification = Verification {
            mismatches: vec![Mismatch {
                id: "b".into(),
                expected: "SKIPPED".into(),
                actual: "FAILED".into(),
            }],
        };
        assert_eq!(verification.exit_code(), 1);

        let text = verification.render();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(MISMATCH_MESSAGE));
        for line in lines {
            assert_eq!(line.len(), TABLE_WIDTH, "{line:?}");
        }
    }
}
