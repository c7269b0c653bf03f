//! Checks and the handle a check function records through.

use certsuite_core::{CheckState, EnvironmentError, Evidence, InvalidTransition, ReportObject};
use std::any::Any;
use std::fmt::Display;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::runner::AbortToken;

/// Result of a check function.
pub type CheckResult = std::result::Result<(), CheckError>;

/// Error returned by a check function. The check is classified `Error`.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// Free-form failure
    #[error("{0}")]
    Message(String),

    /// The environment could not be read
    #[error(transparent)]
    Environment(#[from] EnvironmentError),
}

impl CheckError {
    /// Create a free-form error.
    pub fn msg(message: impl Into<String>) -> Self {
        CheckError::Message(message.into())
    }
}

/// Skip predicate: `(skip, reason)`.
pub type SkipFn<E> = Box<dyn Fn(&E) -> (bool, String) + Send>;

/// Check function.
pub type CheckFn<E> = Box<dyn Fn(&mut CheckHandle<'_>, &E) -> CheckResult + Send>;

/// How skip predicates combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SkipMode {
    /// Skip when any predicate says skip
    #[default]
    Any,
    /// Skip only when every predicate says skip
    All,
}

/// A single compliance check.
pub struct Check<E> {
    id: String,
    tags: Vec<String>,
    skip_fns: Vec<SkipFn<E>>,
    skip_mode: SkipMode,
    check_fn: Option<CheckFn<E>>,
    state: CheckState,
}

impl<E> Check<E> {
    /// Create a check. Its id is always one of its tags.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            tags: vec![id.clone()],
            id,
            skip_fns: Vec::new(),
            skip_mode: SkipMode::Any,
            check_fn: None,
            state: CheckState::NotRun,
        }
    }

    /// Add tags. Duplicates are ignored.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            self.add_tag(tag.into());
        }
        self
    }

    /// Add a skip predicate.
    pub fn with_skip_check<F>(mut self, f: F) -> Self
    where
        F: Fn(&E) -> (bool, String) + Send + 'static,
    {
        self.skip_fns.push(Box::new(f));
        self
    }

    /// Set how skip predicates combine.
    pub fn with_skip_mode(mut self, mode: SkipMode) -> Self {
        self.skip_mode = mode;
        self
    }

    /// Set the check function.
    pub fn with_check_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut CheckHandle<'_>, &E) -> CheckResult + Send + 'static,
    {
        self.check_fn = Some(Box::new(f));
        self
    }

    /// Check id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Tags.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Skip mode.
    pub fn skip_mode(&self) -> SkipMode {
        self.skip_mode
    }

    /// Current state.
    pub fn state(&self) -> CheckState {
        self.state
    }

    pub(crate) fn add_tag(&mut self, tag: String) {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    pub(crate) fn set_state(&mut self, to: CheckState) -> Result<(), InvalidTransition> {
        self.state = self.state.transition(to)?;
        Ok(())
    }

    /// Evaluate skip predicates. Returns the skip reason, if skipped.
    ///
    /// A panicking predicate counts as "skip".
    pub fn evaluate_skip(&self, env: &E) -> Option<String> {
        if self.skip_fns.is_empty() {
            return None;
        }

        let mut reasons = Vec::new();
        for (i, skip_fn) in self.skip_fns.iter().enumerate() {
            let (skip, reason) = match catch_unwind(AssertUnwindSafe(|| skip_fn(env))) {
                Ok(decision) => decision,
                Err(payload) => (
                    true,
                    format!("skip function {} panicked: {}", i, panic_message(payload.as_ref())),
                ),
            };

            match (skip, self.skip_mode) {
                (true, SkipMode::Any) => return Some(reason),
                (true, SkipMode::All) => reasons.push(reason),
                (false, SkipMode::All) => return None,
                (false, SkipMode::Any) => {}
            }
        }

        match self.skip_mode {
            SkipMode::Any => None,
            SkipMode::All => Some(reasons.join(", ")),
        }
    }

    /// Run the check function once, catching panics.
    pub(crate) fn execute(&self, handle: &mut CheckHandle<'_>, env: &E) -> CheckResult {
        let Some(check_fn) = &self.check_fn else {
            return Err(CheckError::msg("check has no check function"));
        };

        match catch_unwind(AssertUnwindSafe(|| check_fn(handle, env))) {
            Ok(result) => result,
            Err(payload) => Err(CheckError::msg(format!(
                "check panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    }
}

impl<E> std::fmt::Debug for Check<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Check")
            .field("id", &self.id)
            .field("tags", &self.tags)
            .field("skip_fns", &self.skip_fns.len())
            .field("skip_mode", &self.skip_mode)
            .field("state", &self.state)
            .finish()
    }
}

/// Text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// What a check function sees while it runs.
///
/// Evidence is append-only. Log lines go to `tracing` and are also kept as
/// the check's captured output.
pub struct CheckHandle<'a> {
    id: &'a str,
    abort: &'a AbortToken,
    evidence: Evidence,
    output: String,
    skip_reason: Option<String>,
    abort_reason: Option<String>,
}

impl<'a> CheckHandle<'a> {
    /// Create a handle for check `id`.
    pub fn new(id: &'a str, abort: &'a AbortToken) -> Self {
        Self {
            id,
            abort,
            evidence: Evidence::new(),
            output: String::new(),
            skip_reason: None,
            abort_reason: None,
        }
    }

    /// Check id.
    pub fn id(&self) -> &str {
        self.id
    }

    /// Record a compliant object.
    pub fn add_compliant(&mut self, object: ReportObject) {
        self.evidence.add_compliant(object);
    }

    /// Record a non-compliant object.
    pub fn add_non_compliant(&mut self, object: ReportObject) {
        self.evidence.add_non_compliant(object);
    }

    /// Record both lists. Appends to what was recorded before.
    pub fn record(
        &mut self,
        compliant: impl IntoIterator<Item = ReportObject>,
        non_compliant: impl IntoIterator<Item = ReportObject>,
    ) {
        self.evidence.record(compliant, non_compliant);
    }

    /// Evidence so far.
    pub fn evidence(&self) -> &Evidence {
        &self.evidence
    }

    /// Log at debug level.
    pub fn log_debug(&mut self, message: impl Display) {
        tracing::debug!("[{}] {}", self.id, message);
        self.capture("DEBUG", &message);
    }

    /// Log at info level.
    pub fn log_info(&mut self, message: impl Display) {
        tracing::info!("[{}] {}", self.id, message);
        self.capture("INFO", &message);
    }

    /// Log at warn level.
    pub fn log_warn(&mut self, message: impl Display) {
        tracing::warn!("[{}] {}", self.id, message);
        self.capture("WARN", &message);
    }

    /// Log at error level.
    pub fn log_error(&mut self, message: impl Display) {
        tracing::error!("[{}] {}", self.id, message);
        self.capture("ERROR", &message);
    }

    /// Ask for the check to be classified `Skipped`.
    pub fn skip(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        self.log_info(format_args!("Skipping check: {}", reason));
        self.skip_reason = Some(reason);
    }

    /// Abort the whole run. This check becomes `Error`, the rest are skipped.
    pub fn abort(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        self.log_error(format_args!("Aborting run: {}", reason));
        self.abort.abort(reason.clone());
        self.abort_reason = Some(reason);
    }

    fn capture(&mut self, level: &str, message: &dyn Display) {
        let time = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
        self.output
            .push_str(&format!("{} [{}] [{}] {}\n", level, time, self.id, message));
    }

    pub(crate) fn into_parts(self) -> HandleParts {
        HandleParts {
            evidence: self.evidence,
            output: self.output,
            skip_reason: self.skip_reason,
            abort_reason: self.abort_reason,
        }
    }
}

/// Everything a handle collected, once the check function returned.
pub(crate) struct HandleParts {
    pub evidence: Evidence,
    pub output: String,
    pub skip_reason: Option<String>,
    pub abort_reason: Option<String>,
}
