//! Observability suite.

use certsuite_core::{fields, PodDisruptionBudget, ReportObject, TestEnvironment};
use certsuite_engine::{Catalog, CheckHandle, CheckResult, ChecksGroup, SkipMode};
use std::collections::BTreeMap;

use crate::identifiers::{
    new_check, SUITE_OBSERVABILITY, TEST_CONTAINER_LOGGING, TEST_CRD_STATUS,
    TEST_POD_DISRUPTION_BUDGET, TEST_TERMINATION_POLICY,
};
use crate::{refresh_environment, skip};

const FALLBACK_TO_LOGS_ON_ERROR: &str = "FallbackToLogsOnError";

/// Build the observability group.
pub fn load_checks(catalog: &Catalog) -> ChecksGroup<TestEnvironment> {
    ChecksGroup::new(SUITE_OBSERVABILITY)
        .with_before_each(refresh_environment)
        .with_check(
            new_check(catalog, SUITE_OBSERVABILITY, TEST_CONTAINER_LOGGING)
                .with_skip_check(skip::no_containers)
                .with_check_fn(test_container_logging),
        )
        .with_check(
            new_check(catalog, SUITE_OBSERVABILITY, TEST_CRD_STATUS)
                .with_skip_check(skip::no_crds)
                .with_check_fn(test_crd_status),
        )
        .with_check(
            new_check(catalog, SUITE_OBSERVABILITY, TEST_TERMINATION_POLICY)
                .with_skip_check(skip::no_containers)
                .with_check_fn(test_termination_policy),
        )
        .with_check(
            new_check(catalog, SUITE_OBSERVABILITY, TEST_POD_DISRUPTION_BUDGET)
                .with_skip_check(skip::no_deployments)
                .with_skip_check(skip::no_stateful_sets)
                .with_skip_mode(SkipMode::All)
                .with_check_fn(test_pod_disruption_budgets),
        )
}

fn test_container_logging(h: &mut CheckHandle<'_>, env: &TestEnvironment) -> CheckResult {
    for (pod, container) in env.snapshot().containers() {
        let object = |reason: &str, compliant| {
            ReportObject::container(&pod.namespace, &pod.name, &container.name, reason, compliant)
        };
        match &container.logs {
            None => {
                h.log_error(format_args!("Failed to get log output from container {}", container.name));
                h.add_non_compliant(object("Could not get log output", false));
            }
            Some(logs) if logs.lines().any(|l| !l.trim().is_empty()) => {
                h.add_compliant(object("Found log line to stderr/stdout", true));
            }
            Some(_) => {
                h.log_info(format_args!("No log line to stdout/stderr found in container {}", container.name));
                h.add_non_compliant(object("No log line to stderr/stdout found", false));
            }
        }
    }
    Ok(())
}

fn test_crd_status(h: &mut CheckHandle<'_>, env: &TestEnvironment) -> CheckResult {
    for crd in &env.snapshot().crds {
        for version in &crd.versions {
            if version.has_status_subresource {
                h.add_compliant(ReportObject::crd(
                    &crd.name,
                    &version.name,
                    "Crd has a status sub resource set",
                    true,
                ));
            } else {
                h.log_info(format_args!("CRD {}, version {} does not have a status subresource", crd.name, version.name));
                h.add_non_compliant(ReportObject::crd(
                    &crd.name,
                    &version.name,
                    "Crd does not have a status sub resource set",
                    false,
                ));
            }
        }
    }
    Ok(())
}

fn test_termination_policy(h: &mut CheckHandle<'_>, env: &TestEnvironment) -> CheckResult {
    for (pod, container) in env.snapshot().containers() {
        let compliant = container.termination_message_policy == FALLBACK_TO_LOGS_ON_ERROR;
        let reason = if compliant {
            "TerminationMessagePolicy is FallbackToLogsOnError"
        } else {
            "TerminationMessagePolicy is not FallbackToLogsOnError"
        };
        let object =
            ReportObject::container(&pod.namespace, &pod.name, &container.name, reason, compliant);
        if compliant {
            h.add_compliant(object);
        } else {
            h.add_non_compliant(object);
        }
    }
    Ok(())
}

/// PDB in `namespace` whose selector matches `labels`.
fn find_pdb<'a>(
    pdbs: &'a [PodDisruptionBudget],
    namespace: &str,
    labels: &BTreeMap<String, String>,
) -> Option<&'a PodDisruptionBudget> {
    pdbs.iter().find(|pdb| {
        pdb.namespace == namespace
            && !pdb.selector.is_empty()
            && pdb.selector.iter().all(|(k, v)| labels.get(k) == Some(v))
    })
}

/// Why a PDB is unusable for `replicas` pods, if it is.
fn validate_pdb(pdb: &PodDisruptionBudget, replicas: i32) -> Option<String> {
    if pdb.min_available == Some(0) {
        return Some(format!("PodDisruptionBudget {}: minAvailable cannot be zero", pdb.name));
    }
    if let Some(max) = pdb.max_unavailable {
        if max >= replicas {
            return Some(format!(
                "PodDisruptionBudget {}: maxUnavailable ({}) must be less than the number of replicas ({})",
                pdb.name, max, replicas
            ));
        }
    }
    None
}

fn pdb_evidence(
    pdbs: &[PodDisruptionBudget],
    namespace: &str,
    replicas: i32,
    labels: &BTreeMap<String, String>,
    object: impl Fn(&str, bool) -> ReportObject,
) -> (bool, ReportObject) {
    let Some(pdb) = find_pdb(pdbs, namespace, labels) else {
        return (false, object("Object does not reference a PodDisruptionBudget", false));
    };
    match validate_pdb(pdb, replicas) {
        Some(reason) => (false, object(&reason, false).add_field(fields::PDB_REFERENCE, &pdb.name)),
        None => (
            true,
            object("Object references a valid PodDisruptionBudget", true)
                .add_field(fields::PDB_REFERENCE, &pdb.name),
        ),
    }
}

fn test_pod_disruption_budgets(h: &mut CheckHandle<'_>, env: &TestEnvironment) -> CheckResult {
    let snapshot = env.snapshot();
    let pdbs = &snapshot.pod_disruption_budgets;

    for d in &snapshot.deployments {
        let (ok, object) = pdb_evidence(pdbs, &d.namespace, d.replicas, &d.template_labels, |reason, compliant| {
            ReportObject::deployment(&d.namespace, &d.name, reason, compliant)
        });
        if ok {
            h.add_compliant(object);
        } else {
            h.add_non_compliant(object);
        }
    }

    for s in &snapshot.stateful_sets {
        let (ok, object) = pdb_evidence(pdbs, &s.namespace, s.replicas, &s.template_labels, |reason, compliant| {
            ReportObject::stateful_set(&s.namespace, &s.name, reason, compliant)
        });
        if ok {
            h.add_compliant(object);
        } else {
            h.add_non_compliant(object);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdb(name: &str, min: Option<i32>, max: Option<i32>) -> PodDisruptionBudget {
        PodDisruptionBudget {
            name: name.to_string(),
            namespace: "ns1".to_string(),
            selector: [("app".to_string(), "web".to_string())].into(),
            min_available: min,
            max_unavailable: max,
        }
    }

    #[test]
    fn test_validate_pdb() {
        assert!(validate_pdb(&pdb("p", Some(1), None), 3).is_none());
        assert!(validate_pdb(&pdb("p", Some(0), None), 3).unwrap().contains("minAvailable"));
        assert!(validate_pdb(&pdb("p", None, Some(3)), 3).unwrap().contains("maxUnavailable"));
        assert!(validate_pdb(&pdb("p", None, Some(1)), 3).is_none());
    }

    #[test]
    fn test_find_pdb_matches_selector_and_namespace() {
        let pdbs = vec![pdb("p", Some(1), None)];
        let labels: BTreeMap<String, String> =
            [("app".to_string(), "web".to_string()), ("tier".to_string(), "fe".to_string())].into();

        assert!(find_pdb(&pdbs, "ns1", &labels).is_some());
        assert!(find_pdb(&pdbs, "ns2", &labels).is_none());
        assert!(find_pdb(&pdbs, "ns1", &BTreeMap::new()).is_none());
    }
}
