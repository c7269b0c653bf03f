//! Networking suite.

use certsuite_core::{NetworkPolicy, ReportObject, TestEnvironment};
use certsuite_engine::{Catalog, CheckHandle, CheckResult, ChecksGroup};

use crate::identifiers::{new_check, SUITE_NETWORKING, TEST_NETWORK_POLICY_DENY_ALL};
use crate::{refresh_environment, skip};

const POLICY_INGRESS: &str = "Ingress";
const POLICY_EGRESS: &str = "Egress";

/// Build the networking group.
pub fn load_checks(catalog: &Catalog) -> ChecksGroup<TestEnvironment> {
    ChecksGroup::new(SUITE_NETWORKING)
        .with_before_each(refresh_environment)
        .with_check(
            new_check(catalog, SUITE_NETWORKING, TEST_NETWORK_POLICY_DENY_ALL)
                .with_skip_check(skip::no_namespaces)
                .with_check_fn(test_network_policy_deny_all),
        )
}

/// Whether `policy` denies all traffic of `policy_type` for every pod.
fn is_deny_all(policy: &NetworkPolicy, policy_type: &str) -> bool {
    if !policy.pod_selector.is_empty() || !policy.policy_types.iter().any(|t| t == policy_type) {
        return false;
    }
    match policy_type {
        POLICY_INGRESS => policy.ingress_rules == 0,
        POLICY_EGRESS => policy.egress_rules == 0,
        _ => false,
    }
}

fn test_network_policy_deny_all(h: &mut CheckHandle<'_>, env: &TestEnvironment) -> CheckResult {
    let snapshot = env.snapshot();

    for namespace in &snapshot.namespaces {
        let policies: Vec<&NetworkPolicy> = snapshot
            .network_policies
            .iter()
            .filter(|p| &p.namespace == namespace)
            .collect();

        let ingress = policies.iter().any(|p| is_deny_all(p, POLICY_INGRESS));
        let egress = policies.iter().any(|p| is_deny_all(p, POLICY_EGRESS));

        match (ingress, egress) {
            (true, true) => h.add_compliant(ReportObject::namespace(
                namespace,
                "Namespace has a default ingress and egress deny-all network policy",
                true,
            )),
            (false, false) => h.add_non_compliant(ReportObject::namespace(
                namespace,
                "Namespace has no default ingress or egress deny-all network policy",
                false,
            )),
            (false, true) => h.add_non_compliant(ReportObject::namespace(
                namespace,
                "Namespace has no default ingress deny-all network policy",
                false,
            )),
            (true, false) => h.add_non_compliant(ReportObject::namespace(
                namespace,
                "Namespace has no default egress deny-all network policy",
                false,
            )),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(types: &[&str], ingress_rules: usize) -> NetworkPolicy {
        NetworkPolicy {
            name: "deny".to_string(),
            namespace: "ns1".to_string(),
            policy_types: types.iter().map(|s| s.to_string()).collect(),
            ingress_rules,
            ..NetworkPolicy::default()
        }
    }

    #[test]
    fn test_is_deny_all() {
        let both = policy(&[POLICY_INGRESS, POLICY_EGRESS], 0);
        assert!(is_deny_all(&both, POLICY_INGRESS));
        assert!(is_deny_all(&both, POLICY_EGRESS));

        assert!(!is_deny_all(&policy(&[POLICY_INGRESS], 1), POLICY_INGRESS));
        assert!(!is_deny_all(&policy(&[POLICY_INGRESS], 0), POLICY_EGRESS));

        let mut selective = policy(&[POLICY_INGRESS], 0);
        selective.pod_selector.insert("app".to_string(), "web".to_string());
        assert!(!is_deny_all(&selective, POLICY_INGRESS));
    }
}
