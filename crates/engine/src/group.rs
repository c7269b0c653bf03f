//! Checks groups - one per suite.

use certsuite_core::EnvironmentError;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::check::{panic_message, Check};

/// Error returned by a group hook.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// Free-form failure
    #[error("{0}")]
    Message(String),

    /// The environment could not be refreshed
    #[error(transparent)]
    Environment(#[from] EnvironmentError),
}

impl HookError {
    /// Create a free-form error.
    pub fn msg(message: impl Into<String>) -> Self {
        HookError::Message(message.into())
    }
}

/// Group hook. Receives the environment mutably so it can refresh it.
pub type HookFn<E> = Box<dyn FnMut(&mut E) -> Result<(), HookError> + Send>;

/// An ordered set of checks sharing hooks.
pub struct ChecksGroup<E> {
    name: String,
    before_all: Option<HookFn<E>>,
    before_each: Option<HookFn<E>>,
    after_each: Option<HookFn<E>>,
    after_all: Option<HookFn<E>>,
    checks: Vec<Check<E>>,
}

impl<E> ChecksGroup<E> {
    /// Create an empty group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            before_all: None,
            before_each: None,
            after_each: None,
            after_all: None,
            checks: Vec::new(),
        }
    }

    /// Hook run once before the group's first selected check.
    pub fn with_before_all<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut E) -> Result<(), HookError> + Send + 'static,
    {
        self.before_all = Some(Box::new(f));
        self
    }

    /// Hook run before every check, ahead of its skip predicates.
    pub fn with_before_each<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut E) -> Result<(), HookError> + Send + 'static,
    {
        self.before_each = Some(Box::new(f));
        self
    }

    /// Hook run after every check, skipped or not.
    pub fn with_after_each<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut E) -> Result<(), HookError> + Send + 'static,
    {
        self.after_each = Some(Box::new(f));
        self
    }

    /// Hook run once after the group's last selected check.
    pub fn with_after_all<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut E) -> Result<(), HookError> + Send + 'static,
    {
        self.after_all = Some(Box::new(f));
        self
    }

    /// Add a check. The group name is added to its tags.
    pub fn add(&mut self, mut check: Check<E>) -> &mut Self {
        check.add_tag(self.name.clone());
        self.checks.push(check);
        self
    }

    /// Add a check, builder style.
    pub fn with_check(mut self, check: Check<E>) -> Self {
        self.add(check);
        self
    }

    /// Group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Checks in registration order.
    pub fn checks(&self) -> &[Check<E>] {
        &self.checks
    }

    /// Number of checks.
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Whether the group has no checks.
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub(crate) fn checks_mut(&mut self) -> &mut [Check<E>] {
        &mut self.checks
    }

    pub(crate) fn run_before_all(&mut self, env: &mut E) -> Result<(), String> {
        run_hook(self.before_all.as_mut(), env)
    }

    pub(crate) fn run_before_each(&mut self, env: &mut E) -> Result<(), String> {
        run_hook(self.before_each.as_mut(), env)
    }

    pub(crate) fn run_after_each(&mut self, env: &mut E) -> Result<(), String> {
        run_hook(self.after_each.as_mut(), env)
    }

    pub(crate) fn run_after_all(&mut self, env: &mut E) -> Result<(), String> {
        run_hook(self.after_all.as_mut(), env)
    }
}

impl<E> std::fmt::Debug for ChecksGroup<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChecksGroup")
            .field("name", &self.name)
            .field("checks", &self.checks)
            .finish()
    }
}

/// Run an optional hook, turning errors and panics into a message.
fn run_hook<E>(hook: Option<&mut HookFn<E>>, env: &mut E) -> Result<(), String> {
    let Some(hook) = hook else {
        return Ok(());
    };

    match catch_unwind(AssertUnwindSafe(|| hook(env))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_tags_check_with_group_name() {
        let group: ChecksGroup<()> = ChecksGroup::new("networking")
            .with_check(Check::new("a"))
            .with_check(Check::new("b").with_tags(["networking"]));

        for check in group.checks() {
            assert!(check.tags().iter().any(|t| t == "networking"));
        }
        assert_eq!(group.checks()[1].tags().len(), 2);
    }

    #[test]
    fn test_hooks_report_errors_and_panics() {
        let mut group = ChecksGroup::<u32>::new("g")
            .with_before_each(|n| {
                *n += 1;
                Ok(())
            })
            .with_after_each(|_| Err(HookError::msg("cleanup failed")))
            .with_before_all(|_| panic!("no cluster"));

        let mut counter = 0;
        assert!(group.run_before_each(&mut counter).is_ok());
        assert_eq!(counter, 1);
        assert_eq!(group.run_after_each(&mut counter), Err("cleanup failed".to_string()));
        assert_eq!(group.run_before_all(&mut counter), Err("panicked: no cluster".to_string()));
        assert!(group.run_after_all(&mut counter).is_ok());
    }
}
