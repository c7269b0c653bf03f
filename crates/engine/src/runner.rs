//! Runner - executes selected checks group by group.
//!
//! Checks run sequentially in registration order. Before each check the
//! runner consults the abort token and the global deadline; once either
//! fires, no further check starts and every remaining selected check is
//! classified `Skipped`, so every selected check ends with exactly one
//! outcome.

use certsuite_core::{CheckOutcome, CheckState, Evidence, Time};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use crate::check::{Check, CheckHandle};
use crate::group::ChecksGroup;
use crate::labels::LabelFilter;

/// Skip reason for checks not started before the deadline.
pub const GLOBAL_TIMEOUT_REASON: &str = "global time-out";

/// Abort reason used when the process is interrupted.
pub const SIGNAL_ABORT_REASON: &str = "SIGINT/SIGTERM";

/// Default global timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Run configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Which checks to run
    pub filter: LabelFilter,

    /// Budget for the whole run
    pub timeout: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            filter: LabelFilter::none(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RunConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the label filter.
    pub fn with_filter(mut self, filter: LabelFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the global timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Run-wide abort flag. Set once; the first reason wins.
#[derive(Debug, Clone, Default)]
pub struct AbortToken {
    reason: Arc<OnceLock<String>>,
}

impl AbortToken {
    /// Create an unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an abort. Returns `false` if the run was already aborted.
    pub fn abort(&self, reason: impl Into<String>) -> bool {
        self.reason.set(reason.into()).is_ok()
    }

    /// Whether an abort was requested.
    pub fn is_aborted(&self) -> bool {
        self.reason.get().is_some()
    }

    /// The first abort reason.
    pub fn reason(&self) -> Option<&str> {
        self.reason.get().map(String::as_str)
    }
}

/// Result of a run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// One outcome per selected check, in execution order
    pub outcomes: Vec<CheckOutcome>,

    /// Run start
    pub start_time: Time,

    /// Run end
    pub end_time: Time,

    /// Whether the global deadline stopped the run
    pub timed_out: bool,

    /// Why the run was aborted, if it was
    pub abort_reason: Option<String>,

    /// Non-fatal problems, e.g. failing `after_all` hooks
    pub warnings: Vec<String>,
}

impl RunReport {
    /// Number of outcomes in a state.
    pub fn count(&self, state: CheckState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }

    /// Whether any check failed or errored.
    pub fn has_failures(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| matches!(o.state, CheckState::Failed | CheckState::Error))
    }
}

/// Executes groups of checks against an environment.
pub struct Runner<E> {
    config: RunConfig,
    groups: Vec<ChecksGroup<E>>,
    abort: AbortToken,
}

impl<E> Runner<E> {
    /// Create a runner.
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            groups: Vec::new(),
            abort: AbortToken::new(),
        }
    }

    /// Share an abort token with the caller (e.g. a signal handler).
    pub fn with_abort_token(mut self, token: AbortToken) -> Self {
        self.abort = token;
        self
    }

    /// Add a group. Groups run in the order they are added.
    pub fn add_group(&mut self, group: ChecksGroup<E>) -> &mut Self {
        self.groups.push(group);
        self
    }

    /// Add several groups.
    pub fn with_groups(mut self, groups: impl IntoIterator<Item = ChecksGroup<E>>) -> Self {
        self.groups.extend(groups);
        self
    }

    /// The run's abort token.
    pub fn abort_token(&self) -> AbortToken {
        self.abort.clone()
    }

    /// Configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Selected checks with their group name, in run order.
    pub fn selected(&self) -> Vec<(&str, &Check<E>)> {
        self.groups
            .iter()
            .flat_map(|g| {
                g.checks()
                    .iter()
                    .filter(|c| self.config.filter.matches(c.tags()))
                    .map(move |c| (g.name(), c))
            })
            .collect()
    }

    /// Run every selected check once.
    pub fn run(mut self, env: &mut E) -> RunReport {
        let start_time = chrono::Utc::now();
        let deadline = Instant::now().checked_add(self.config.timeout);
        let mut state = RunState {
            outcomes: Vec::new(),
            warnings: Vec::new(),
            deadline,
            timed_out: false,
        };

        tracing::info!(
            "Running checks matching label filter {:?} (timeout {:?})",
            self.config.filter.as_str(),
            self.config.timeout
        );

        for group in &mut self.groups {
            run_group(group, &self.config.filter, &self.abort, &mut state, env);
        }

        let report = RunReport {
            outcomes: state.outcomes,
            start_time,
            end_time: chrono::Utc::now(),
            timed_out: state.timed_out,
            abort_reason: self.abort.reason().map(str::to_string),
            warnings: state.warnings,
        };

        tracing::info!(
            "Finished {} checks: {} passed, {} failed, {} skipped, {} errored",
            report.outcomes.len(),
            report.count(CheckState::Passed),
            report.count(CheckState::Failed),
            report.count(CheckState::Skipped),
            report.count(CheckState::Error)
        );
        report
    }
}

struct RunState {
    outcomes: Vec<CheckOutcome>,
    warnings: Vec<String>,
    deadline: Option<Instant>,
    timed_out: bool,
}

impl RunState {
    /// Reason a check must not start, if any.
    fn stop_reason(&mut self, abort: &AbortToken) -> Option<String> {
        if let Some(reason) = abort.reason() {
            return Some(reason.to_string());
        }
        if !self.timed_out && self.deadline.is_some_and(|d| Instant::now() >= d) {
            tracing::warn!("Global timeout reached, no further checks will start");
            self.timed_out = true;
        }
        self.timed_out.then(|| GLOBAL_TIMEOUT_REASON.to_string())
    }
}

/// What happened to one check before classification.
struct Execution {
    evidence: Evidence,
    output: String,
    skip_reason: Option<String>,
    failure: Option<String>,
}

fn run_group<E>(
    group: &mut ChecksGroup<E>,
    filter: &LabelFilter,
    abort: &AbortToken,
    state: &mut RunState,
    env: &mut E,
) {
    let selected: Vec<usize> = group
        .checks()
        .iter()
        .enumerate()
        .filter(|(_, c)| filter.matches(c.tags()))
        .map(|(i, _)| i)
        .collect();
    if selected.is_empty() {
        return;
    }

    let suite = group.name().to_string();
    tracing::info!("Running suite {} ({} checks)", suite, selected.len());

    // Checks left in the group become Error once a hook fails.
    let mut group_failure: Option<String> = None;

    if state.stop_reason(abort).is_none() {
        if let Err(e) = group.run_before_all(env) {
            tracing::error!("Suite {}: before_all hook failed: {}", suite, e);
            group_failure = Some(format!("before_all hook failed: {}", e));
        }
    }

    for &idx in &selected {
        let check_start = chrono::Utc::now();

        if let Some(reason) = state.stop_reason(abort) {
            let check = &mut group.checks_mut()[idx];
            finish(state, &suite, check, CheckState::Skipped, Execution::skipped(reason), check_start);
            continue;
        }

        if let Some(reason) = &group_failure {
            let check = &mut group.checks_mut()[idx];
            finish(state, &suite, check, CheckState::Error, Execution::failed(reason.clone()), check_start);
            continue;
        }

        if let Err(e) = group.run_before_each(env) {
            let reason = format!("before_each hook failed: {}", e);
            tracing::error!("Suite {}: {}", suite, reason);
            let check = &mut group.checks_mut()[idx];
            finish(state, &suite, check, CheckState::Error, Execution::failed(reason.clone()), check_start);
            group_failure = Some(reason);
            continue;
        }

        let (mut check_state, mut execution) = execute_check(&group.checks()[idx], abort, env);

        if let Err(e) = group.run_after_each(env) {
            let reason = format!("after_each hook failed: {}", e);
            tracing::error!("Suite {}: {}", suite, reason);
            check_state = CheckState::Error;
            execution.failure = Some(reason.clone());
            group_failure = Some(reason);
        }

        let check = &mut group.checks_mut()[idx];
        finish(state, &suite, check, check_state, execution, check_start);
    }

    if group_failure.is_none() {
        if let Err(e) = group.run_after_all(env) {
            let warning = format!("Suite {}: after_all hook failed: {}", suite, e);
            tracing::error!("{}", warning);
            state.warnings.push(warning);
        }
    }
}

/// Evaluate skip predicates, run the check function and classify.
fn execute_check<E>(check: &Check<E>, abort: &AbortToken, env: &E) -> (CheckState, Execution) {
    let mut handle = CheckHandle::new(check.id(), abort);

    if let Some(reason) = check.evaluate_skip(env) {
        handle.log_info(format_args!("Skipping check: {}", reason));
        let parts = handle.into_parts();
        return (
            CheckState::Skipped,
            Execution {
                evidence: parts.evidence,
                output: parts.output,
                skip_reason: Some(reason),
                failure: None,
            },
        );
    }

    tracing::debug!("[{}] Running check", check.id());
    let result = check.execute(&mut handle, env);
    let parts = handle.into_parts();

    let mut execution = Execution {
        evidence: parts.evidence,
        output: parts.output,
        skip_reason: None,
        failure: None,
    };

    let state = if let Some(reason) = parts.abort_reason {
        execution.failure = Some(format!("aborted: {}", reason));
        CheckState::Error
    } else if let Err(e) = result {
        tracing::error!("[{}] Check failed with error: {}", check.id(), e);
        execution.failure = Some(e.to_string());
        CheckState::Error
    } else if let Some(reason) = parts.skip_reason {
        execution.skip_reason = Some(reason);
        CheckState::Skipped
    } else if execution.evidence.has_non_compliant() {
        let count = execution.evidence.non_compliant.len();
        execution.failure = Some(format!("{} non-compliant object(s)", count));
        CheckState::Failed
    } else {
        if execution.evidence.is_empty() {
            tracing::warn!("[{}] Check recorded no evidence", check.id());
            execution
                .output
                .push_str("WARN check recorded no compliant or non-compliant objects\n");
        }
        CheckState::Passed
    };

    (state, execution)
}

impl Execution {
    fn skipped(reason: String) -> Self {
        Self {
            evidence: Evidence::new(),
            output: String::new(),
            skip_reason: Some(reason),
            failure: None,
        }
    }

    fn failed(reason: String) -> Self {
        Self {
            evidence: Evidence::new(),
            output: String::new(),
            skip_reason: None,
            failure: Some(reason),
        }
    }
}

fn finish<E>(
    state: &mut RunState,
    suite: &str,
    check: &mut Check<E>,
    to: CheckState,
    execution: Execution,
    start_time: Time,
) {
    if let Err(e) = check.set_state(to) {
        tracing::error!("[{}] {}", check.id(), e);
        return;
    }

    tracing::info!("[{}] Recording result \"{}\"", check.id(), to.log_label());

    state.outcomes.push(CheckOutcome {
        id: check.id().to_string(),
        suite: suite.to_string(),
        tags: check.tags().to_vec(),
        state: to,
        skip_reason: execution.skip_reason,
        failure_reason: execution.failure,
        evidence: execution.evidence,
        captured_output: execution.output,
        start_time,
        end_time: chrono::Utc::now(),
    });
}
