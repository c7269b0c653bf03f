//! Skip predicates shared by the built-in suites.

use certsuite_core::TestEnvironment;

/// Skip when there are no pods.
pub fn no_pods(env: &TestEnvironment) -> (bool, String) {
    (env.snapshot().pods.is_empty(), "no pods to check found".to_string())
}

/// Skip when there are no containers.
pub fn no_containers(env: &TestEnvironment) -> (bool, String) {
    (
        env.snapshot().containers().next().is_none(),
        "no containers to check found".to_string(),
    )
}

/// Skip when there are no CRDs.
pub fn no_crds(env: &TestEnvironment) -> (bool, String) {
    (env.snapshot().crds.is_empty(), "no CRDs to check found".to_string())
}

/// Skip when there are no deployments.
pub fn no_deployments(env: &TestEnvironment) -> (bool, String) {
    (
        env.snapshot().deployments.is_empty(),
        "no deployments to check found".to_string(),
    )
}

/// Skip when there are no statefulsets.
pub fn no_stateful_sets(env: &TestEnvironment) -> (bool, String) {
    (
        env.snapshot().stateful_sets.is_empty(),
        "no statefulsets to check found".to_string(),
    )
}

/// Skip when there are no namespaces.
pub fn no_namespaces(env: &TestEnvironment) -> (bool, String) {
    (
        env.snapshot().namespaces.is_empty(),
        "no namespaces to check found".to_string(),
    )
}

/// Skip when there are no operators.
pub fn no_operators(env: &TestEnvironment) -> (bool, String) {
    (
        env.snapshot().operators.is_empty(),
        "no operators to check found".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use certsuite_core::{Deployment, Environment};

    #[test]
    fn test_empty_environment_skips_everything() {
        let env = TestEnvironment::new(Environment::default());
        for predicate in [
            no_pods,
            no_containers,
            no_crds,
            no_deployments,
            no_stateful_sets,
            no_namespaces,
            no_operators,
        ] {
            assert!(predicate(&env).0);
        }
    }

    #[test]
    fn test_deployments_present() {
        let env = TestEnvironment::new(Environment {
            deployments: vec![Deployment::default()],
            ..Environment::default()
        });
        assert_eq!(no_deployments(&env), (false, "no deployments to check found".to_string()));
        assert!(no_stateful_sets(&env).0);
    }
}
