//! Check identifiers and their catalog entries.

use certsuite_core::{
    CatalogEntry, Classification, Scenario, TestEnvironment, TAG_COMMON, TAG_EXTENDED, TAG_TELCO,
};
use certsuite_engine::{Catalog, Check};

/// Observability suite name.
pub const SUITE_OBSERVABILITY: &str = "observability";
/// Access-control suite name.
pub const SUITE_ACCESS_CONTROL: &str = "access-control";
/// Networking suite name.
pub const SUITE_NETWORKING: &str = "networking";
/// Operator suite name.
pub const SUITE_OPERATOR: &str = "operator";

/// Containers write to stdout/stderr.
pub const TEST_CONTAINER_LOGGING: &str = "observability-container-logging";
/// CRDs declare a status subresource.
pub const TEST_CRD_STATUS: &str = "observability-crd-status";
/// Containers use `FallbackToLogsOnError`.
pub const TEST_TERMINATION_POLICY: &str = "observability-termination-policy";
/// Deployments and statefulsets have a valid PodDisruptionBudget.
pub const TEST_POD_DISRUPTION_BUDGET: &str = "observability-pod-disruption-budget";

/// No pod or container runs as UID 1337.
pub const TEST_NO_1337_UID: &str = "access-control-no-1337-uid";
/// Containers do not allow privilege escalation.
pub const TEST_PRIVILEGE_ESCALATION: &str = "access-control-security-context-privilege-escalation";
/// Pods do not use the host network.
pub const TEST_POD_HOST_NETWORK: &str = "access-control-pod-host-network";
/// Containers do not add SYS_ADMIN.
pub const TEST_SYS_ADMIN_CAPABILITY: &str = "access-control-sys-admin-capability-check";

/// Namespaces have deny-all ingress and egress policies.
pub const TEST_NETWORK_POLICY_DENY_ALL: &str = "networking-network-policy-deny-all";

/// Operators report the `Succeeded` install phase.
pub const TEST_OPERATOR_INSTALL_STATUS: &str = "operator-install-status-succeeded";

const TAGS_COMMON: [&str; 1] = [TAG_COMMON];
const TAGS_EXTENDED: [&str; 1] = [TAG_EXTENDED];
const TAGS_TELCO: [&str; 1] = [TAG_TELCO];

fn mandatory_everywhere(entry: CatalogEntry) -> CatalogEntry {
    Scenario::ALL
        .into_iter()
        .fold(entry, |e, s| e.classify(s, Classification::Mandatory))
}

fn telco_only(entry: CatalogEntry) -> CatalogEntry {
    entry
        .classify(Scenario::FarEdge, Classification::Mandatory)
        .classify(Scenario::Telco, Classification::Mandatory)
        .classify(Scenario::NonTelco, Classification::Optional)
        .classify(Scenario::Extended, Classification::Mandatory)
}

/// Catalog entries of every built-in check, in suite order.
pub fn catalog_entries() -> Vec<CatalogEntry> {
    vec![
        mandatory_everywhere(
            CatalogEntry::new(TEST_CONTAINER_LOGGING, SUITE_OBSERVABILITY)
                .with_description("Check that all containers under test use standard input output and standard error when logging.")
                .with_remediation("Ensure containers are not redirecting stdout/stderr.")
                .with_reference("https://redhat-best-practices-for-k8s.github.io/guide/#k8s-best-practices-logging")
                .with_tags(TAGS_TELCO)
                .with_qe(true),
        ),
        mandatory_everywhere(
            CatalogEntry::new(TEST_CRD_STATUS, SUITE_OBSERVABILITY)
                .with_description("Checks that all CRDs have a status sub-resource specification.")
                .with_remediation("Ensure that all the CRDs have a meaningful status specification.")
                .with_tags(TAGS_COMMON)
                .with_qe(true),
        ),
        telco_only(
            CatalogEntry::new(TEST_TERMINATION_POLICY, SUITE_OBSERVABILITY)
                .with_description("Check that all containers are using terminationMessagePolicy: FallbackToLogsOnError.")
                .with_remediation("Set terminationMessagePolicy to FallbackToLogsOnError in the container spec.")
                .with_tags(TAGS_TELCO),
        ),
        mandatory_everywhere(
            CatalogEntry::new(TEST_POD_DISRUPTION_BUDGET, SUITE_OBSERVABILITY)
                .with_description("Checks to see if pod disruption budgets have reasonable values for minAvailable and maxUnavailable.")
                .with_remediation("Ensure minAvailable is not zero and maxUnavailable does not equal the number of pods in the replica.")
                .with_tags(TAGS_COMMON),
        ),
        mandatory_everywhere(
            CatalogEntry::new(TEST_NO_1337_UID, SUITE_ACCESS_CONTROL)
                .with_description("Checks that all pods are not using the securityContext UID 1337.")
                .with_remediation("Use another UID than 1337.")
                .with_exception_process("No exception needed for optional/extended tests.")
                .with_tags(TAGS_EXTENDED),
        ),
        mandatory_everywhere(
            CatalogEntry::new(TEST_PRIVILEGE_ESCALATION, SUITE_ACCESS_CONTROL)
                .with_description("Checks if privileged escalation is enabled (AllowPrivilegeEscalation=true).")
                .with_remediation("Configure privilege escalation to false.")
                .with_tags(TAGS_COMMON),
        ),
        mandatory_everywhere(
            CatalogEntry::new(TEST_POD_HOST_NETWORK, SUITE_ACCESS_CONTROL)
                .with_description("Verifies that the spec.HostNetwork parameter is not set (not present).")
                .with_remediation("Set the spec.HostNetwork parameter to false in the pod configuration.")
                .with_exception_process("Exception will only be considered if application requires host network access.")
                .with_tags(TAGS_COMMON),
        ),
        mandatory_everywhere(
            CatalogEntry::new(TEST_SYS_ADMIN_CAPABILITY, SUITE_ACCESS_CONTROL)
                .with_description("Ensures that containers do not use SYS_ADMIN capability.")
                .with_remediation("Exception possible if a workload uses mlock(), mlockall(), shmctl(), mmap(); exception will be considered for DPDK applications only.")
                .with_tags(TAGS_COMMON),
        ),
        mandatory_everywhere(
            CatalogEntry::new(TEST_NETWORK_POLICY_DENY_ALL, SUITE_NETWORKING)
                .with_description("Check that a network policy with default deny-all ingress and egress exists in each namespace.")
                .with_remediation("Create a NetworkPolicy with an empty podSelector and no ingress or egress rules in each namespace.")
                .with_tags(TAGS_COMMON),
        ),
        mandatory_everywhere(
            CatalogEntry::new(TEST_OPERATOR_INSTALL_STATUS, SUITE_OPERATOR)
                .with_description("Ensures that the target workload operators report \"Succeeded\" as their installation status.")
                .with_remediation("Ensure all the workload's operators have been successfully installed by OLM.")
                .with_tags(TAGS_COMMON)
                .with_qe(true),
        ),
    ]
}

/// A check whose tags come from its catalog entry.
pub fn new_check(catalog: &Catalog, suite: &str, id: &str) -> Check<TestEnvironment> {
    match catalog.lookup(suite, id) {
        Some(entry) => Check::new(id).with_tags(entry.tags.iter().cloned()),
        None => {
            tracing::warn!("[{}] No catalog entry in suite {}", id, suite);
            Check::new(id)
        }
    }
}
