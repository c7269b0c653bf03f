//! Expected-results template used by the reference verifier.

use serde::{Deserialize, Serialize};

/// File name the verifier reads and writes by default.
pub const DEFAULT_TEMPLATE_FILE: &str = "expected_results.yaml";

/// Check ids bucketed by expected result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseList {
    /// Expected to pass
    #[serde(default)]
    pub pass: Vec<String>,

    /// Expected to fail
    #[serde(default)]
    pub fail: Vec<String>,

    /// Expected to be skipped
    #[serde(default)]
    pub skip: Vec<String>,
}

/// Root of the template document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResultsTemplate {
    /// Buckets
    #[serde(rename = "testCases", default)]
    pub test_cases: TestCaseList,
}

impl TestResultsTemplate {
    /// Total number of listed ids.
    pub fn len(&self) -> usize {
        self.test_cases.pass.len() + self.test_cases.fail.len() + self.test_cases.skip.len()
    }

    /// Whether no id is listed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
