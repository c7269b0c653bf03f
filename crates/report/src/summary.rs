//! Console summary: per-suite counters, the results table and run warnings.

use certsuite_core::{CheckOutcome, CheckState};
use certsuite_engine::RunReport;

const TABLE_WIDTH: usize = 59;

/// Counters for one suite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteSummary {
    /// Suite name
    pub suite: String,

    /// Passed checks
    pub passed: usize,

    /// Failed checks
    pub failed: usize,

    /// Skipped checks
    pub skipped: usize,

    /// Errored checks
    pub errored: usize,
}

impl SuiteSummary {
    /// Empty counters for a suite.
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            ..Self::default()
        }
    }

    /// Count one terminal state. `NotRun` is ignored.
    pub fn add(&mut self, state: CheckState) {
        match state {
            CheckState::Passed => self.passed += 1,
            CheckState::Failed => self.failed += 1,
            CheckState::Skipped => self.skipped += 1,
            CheckState::Error => self.errored += 1,
            CheckState::NotRun => {}
        }
    }

    /// Total counted checks.
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped + self.errored
    }
}

/// Fold outcomes into per-suite counters, in first-seen suite order.
pub fn summarize(outcomes: &[CheckOutcome]) -> Vec<SuiteSummary> {
    let mut summaries: Vec<SuiteSummary> = Vec::new();
    for outcome in outcomes {
        let pos = match summaries.iter().position(|s| s.suite == outcome.suite) {
            Some(pos) => pos,
            None => {
                summaries.push(SuiteSummary::new(&outcome.suite));
                summaries.len() - 1
            }
        };
        summaries[pos].add(outcome.state);
    }
    summaries
}

/// Sum of all suites.
pub fn totals(summaries: &[SuiteSummary]) -> SuiteSummary {
    summaries.iter().fold(SuiteSummary::new("TOTAL"), |mut acc, s| {
        acc.passed += s.passed;
        acc.failed += s.failed;
        acc.skipped += s.skipped;
        acc.errored += s.errored;
        acc
    })
}

fn separator(out: &mut String) {
    out.push_str(&"-".repeat(TABLE_WIDTH));
    out.push('\n');
}

fn row(out: &mut String, s: &SuiteSummary) {
    out.push_str(&format!(
        "| {:<25} {:>8} {:>9} {:>10} |\n",
        s.suite, s.passed, s.failed, s.skipped
    ));
}

/// Fixed-width `SUITE | PASSED | FAILED | SKIPPED` table.
pub fn render_table(summaries: &[SuiteSummary]) -> String {
    let mut out = String::new();
    separator(&mut out);
    out.push_str(&format!(
        "| {:<27} {:<9} {:<9} {} |\n",
        "SUITE", "PASSED", "FAILED", "SKIPPED"
    ));
    separator(&mut out);
    for summary in summaries {
        row(&mut out, summary);
    }
    separator(&mut out);
    row(&mut out, &totals(summaries));
    separator(&mut out);
    out
}

/// Warning lines for errored checks, a timed-out run and an aborted run.
pub fn warnings(report: &RunReport) -> Vec<String> {
    let mut lines = Vec::new();

    let errored: Vec<&str> = report
        .outcomes
        .iter()
        .filter(|o| o.state == CheckState::Error)
        .map(|o| o.id.as_str())
        .collect();
    if !errored.is_empty() {
        lines.push(format!(
            "WARNING: {} check(s) ended in error: {}",
            errored.len(),
            errored.join(", ")
        ));
    }

    if report.timed_out {
        let not_started = report
            .outcomes
            .iter()
            .filter(|o| o.skip_reason.as_deref() == Some(certsuite_engine::GLOBAL_TIMEOUT_REASON))
            .count();
        lines.push(format!(
            "WARNING: global time-out reached, {} check(s) were not started",
            not_started
        ));
    }

    if let Some(reason) = &report.abort_reason {
        lines.push(format!("WARNING: run aborted: {}", reason));
    }

    lines.extend(report.warnings.iter().map(|w| format!("WARNING: {}", w)));
    lines
}

/// Table followed by warnings.
pub fn render_summary(report: &RunReport) -> String {
    let mut out = render_table(&summarize(&report.outcomes));
    for line in warnings(report) {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Captured log of every failed check.
pub fn render_failed_logs(outcomes: &[CheckOutcome]) -> String {
    let mut out = String::new();
    for outcome in outcomes.iter().filter(|o| o.state == CheckState::Failed) {
        out.push_str(&format!("{}\n", "=".repeat(TABLE_WIDTH)));
        out.push_str(&format!("Failed check: {} ({})\n", outcome.id, outcome.suite));
        if let Some(reason) = &outcome.failure_reason {
            out.push_str(&format!("Reason: {}\n", reason));
        }
        out.push_str(&format!("{}\n", "-".repeat(TABLE_WIDTH)));
        if outcome.captured_output.is_empty() {
            out.push_str("(no log output)\n");
        } else {
            out.push_str(&outcome.captured_output);
            if !outcome.captured_output.ends_with('\n') {
                out.push('\n');
            }
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use certsuite_core::{Evidence, Time};

    pub(crate) fn outcome(id: &str, suite: &str, state: CheckState) -> CheckOutcome {
        let now: Time = "2026-03-01T10:00:00Z".parse().unwrap();
        CheckOutcome {
            id: id.to_string(),
            suite: suite.to_string(),
            tags: vec!["common".to_string(), suite.to_string(), id.to_string()],
            state,
            skip_reason: None,
            failure_reason: None,
            evidence: Evidence::new(),
            captured_output: String::new(),
            start_time: now,
            end_time: now,
        }
    }

    pub(crate) fn report(outcomes: Vec<CheckOutcome>) -> RunReport {
        let now: Time = "2026-03-01T10:00:00Z".parse().unwrap();
        RunReport {
            outcomes,
            start_time: now,
            end_time: now,
            timed_out: false,
            abort_reason: None,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_summarize_keeps_suite_order() {
        let outcomes = vec![
            outcome("a", "networking", CheckState::Passed),
            outcome("b", "access-control", CheckState::Failed),
            outcome("c", "networking", CheckState::Skipped),
            outcome("d", "networking", CheckState::Error),
        ];
        let summaries = summarize(&outcomes);

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].suite, "networking");
        assert_eq!((summaries[0].passed, summaries[0].skipped, summaries[0].errored), (1, 1, 1));
        assert_eq!(summaries[1].failed, 1);
        assert_eq!(totals(&summaries).total(), outcomes.len());
    }

    #[test]
    fn test_table_is_fixed_width() {
        let table = render_table(&summarize(&[
            outcome("a", "networking", CheckState::Passed),
            outcome("b", "observability", CheckState::Failed),
        ]));
        for line in table.lines() {
            assert_eq!(line.len(), TABLE_WIDTH, "{line:?}");
        }
        assert!(table.contains("| SUITE                       PASSED    FAILED    SKIPPED |"));
        assert!(table.contains("| networking                       1         0          0 |"));
        assert!(table.contains("| TOTAL                            1         1          0 |"));
    }

    #[test]
    fn test_warnings() {
        let mut skipped = outcome("b", "g", CheckState::Skipped);
        skipped.skip_reason = Some(certsuite_engine::GLOBAL_TIMEOUT_REASON.to_string());
        let mut report = report(vec![outcome("a", "g", CheckState::Error), skipped]);
        report.timed_out = true;
        report.abort_reason = Some("SIGINT/SIGTERM".to_string());

        let lines = warnings(&report);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("1 check(s) ended in error: a"));
        assert!(lines[1].contains("1 check(s) were not started"));
        assert!(lines[2].ends_with("run aborted: SIGINT/SIGTERM"));
    }

    #[test]
    fn test_failed_logs_only_failed_checks() {
        let mut failed = outcome("a", "g", CheckState::Failed);
        failed.captured_output = "INFO [t] [a] checked 3 pods\n".to_string();
        let passed = outcome("b", "g", CheckState::Passed);

        let logs = render_failed_logs(&[failed, passed]);
        assert!(logs.contains("Failed check: a (g)"));
        assert!(logs.contains("checked 3 pods"));
        assert!(!logs.contains("Failed check: b"));
    }
}
