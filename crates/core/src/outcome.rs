//! Check states and the terminal outcome of a check run.

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogKey;
use crate::evidence::Evidence;
use crate::Time;

/// Lifecycle state of a check.
///
/// A check is created `NotRun` and moves forward exactly once into one of
/// the terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    /// Not classified yet
    #[serde(rename = "not-run")]
    NotRun,
    /// Skipped by a predicate, the check itself, the deadline or an abort
    Skipped,
    /// No non-compliant evidence
    Passed,
    /// At least one non-compliant object
    Failed,
    /// The check or a group hook failed
    Error,
}

/// Attempted transition out of a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid check state transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    /// Current state
    pub from: CheckState,
    /// Requested state
    pub to: CheckState,
}

impl CheckState {
    /// Whether the state is final.
    pub fn is_terminal(self) -> bool {
        !matches!(self, CheckState::NotRun)
    }

    /// Move forward to `to`. Only `NotRun` may transition.
    pub fn transition(self, to: CheckState) -> Result<CheckState, InvalidTransition> {
        if self.is_terminal() || !to.is_terminal() {
            return Err(InvalidTransition { from: self, to });
        }
        Ok(to)
    }

    /// Lowercase name used in the claim.
    pub fn as_str(self) -> &'static str {
        match self {
            CheckState::NotRun => "not-run",
            CheckState::Skipped => "skipped",
            CheckState::Passed => "passed",
            CheckState::Failed => "failed",
            CheckState::Error => "error",
        }
    }

    /// Uppercase name used in `Recording result` log lines.
    pub fn log_label(self) -> &'static str {
        match self {
            CheckState::NotRun => "NOT-RUN",
            CheckState::Skipped => "SKIPPED",
            CheckState::Passed => "PASSED",
            CheckState::Failed => "FAILED",
            CheckState::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for CheckState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal classification of one selected check.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    /// Check identifier
    pub id: String,

    /// Suite name
    pub suite: String,

    /// Tags the check was selected with
    pub tags: Vec<String>,

    /// Terminal state
    pub state: CheckState,

    /// Why the check was skipped
    pub skip_reason: Option<String>,

    /// Why the check failed or errored
    pub failure_reason: Option<String>,

    /// Recorded evidence
    pub evidence: Evidence,

    /// Log lines captured while the check ran
    pub captured_output: String,

    /// When the check started
    pub start_time: Time,

    /// When the check was classified
    pub end_time: Time,
}

impl CheckOutcome {
    /// Suite-qualified key; ids are only unique within a suite.
    pub fn key(&self) -> CatalogKey {
        CatalogKey {
            id: self.id.clone(),
            suite: self.suite.clone(),
        }
    }

    /// Wall-clock duration in whole seconds.
    pub fn duration_secs(&self) -> i64 {
        (self.end_time - self.start_time).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_run_moves_forward() {
        for to in [CheckState::Skipped, CheckState::Passed, CheckState::Failed, CheckState::Error] {
            assert_eq!(CheckState::NotRun.transition(to), Ok(to));
        }
    }

    #[test]
    fn test_terminal_states_do_not_move() {
        let err = CheckState::Passed.transition(CheckState::Failed).unwrap_err();
        assert_eq!(err.from, CheckState::Passed);
        assert!(CheckState::Skipped.transition(CheckState::Error).is_err());
    }

    #[test]
    fn test_cannot_transition_back_to_not_run() {
        assert!(CheckState::NotRun.transition(CheckState::NotRun).is_err());
    }

    #[test]
    fn test_state_names() {
        assert_eq!(CheckState::Failed.as_str(), "failed");
        assert_eq!(CheckState::Skipped.log_label(), "SKIPPED");
        assert_eq!(serde_json::to_string(&CheckState::Error).unwrap(), "\"error\"");
        assert_eq!(serde_json::to_string(&CheckState::NotRun).unwrap(), "\"not-run\"");
    }
}
