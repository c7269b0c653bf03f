//! Access-control suite.

use certsuite_core::{Container, Pod, ReportObject, TestEnvironment};
use certsuite_engine::{Catalog, CheckHandle, CheckResult, ChecksGroup};

use crate::identifiers::{
    new_check, SUITE_ACCESS_CONTROL, TEST_NO_1337_UID, TEST_POD_HOST_NETWORK,
    TEST_PRIVILEGE_ESCALATION, TEST_SYS_ADMIN_CAPABILITY,
};
use crate::{refresh_environment, skip};

const LEET_UID: i64 = 1337;

/// Build the access-control group.
pub fn load_checks(catalog: &Catalog) -> ChecksGroup<TestEnvironment> {
    ChecksGroup::new(SUITE_ACCESS_CONTROL)
        .with_before_each(refresh_environment)
        .with_check(
            new_check(catalog, SUITE_ACCESS_CONTROL, TEST_NO_1337_UID)
                .with_skip_check(skip::no_pods)
                .with_check_fn(test_no_1337_uid),
        )
        .with_check(
            new_check(catalog, SUITE_ACCESS_CONTROL, TEST_PRIVILEGE_ESCALATION)
                .with_skip_check(skip::no_containers)
                .with_check_fn(test_privilege_escalation),
        )
        .with_check(
            new_check(catalog, SUITE_ACCESS_CONTROL, TEST_POD_HOST_NETWORK)
                .with_skip_check(skip::no_pods)
                .with_check_fn(test_pod_host_network),
        )
        .with_check(
            new_check(catalog, SUITE_ACCESS_CONTROL, TEST_SYS_ADMIN_CAPABILITY)
                .with_skip_check(skip::no_containers)
                .with_check_fn(test_sys_admin_capability),
        )
}

/// Effective UID of a container: its own setting, else the pod's.
fn effective_uid(pod: &Pod, container: &Container) -> Option<i64> {
    container.run_as_user.or(pod.run_as_user)
}

fn test_no_1337_uid(h: &mut CheckHandle<'_>, env: &TestEnvironment) -> CheckResult {
    for pod in &env.snapshot().pods {
        let leet: Vec<&str> = pod
            .containers
            .iter()
            .filter(|c| effective_uid(pod, c) == Some(LEET_UID))
            .map(|c| c.name.as_str())
            .collect();

        if leet.is_empty() {
            h.add_compliant(ReportObject::pod(&pod.namespace, &pod.name, "Pod is not using securityContext RunAsUser 1337", true));
        } else {
            h.log_info(format_args!("Pod {}/{} runs containers {} as UID 1337", pod.namespace, pod.name, leet.join(", ")));
            h.add_non_compliant(ReportObject::pod(&pod.namespace, &pod.name, "Pod is using securityContext RunAsUser 1337", false));
        }
    }
    Ok(())
}

fn test_privilege_escalation(h: &mut CheckHandle<'_>, env: &TestEnvironment) -> CheckResult {
    for (pod, container) in env.snapshot().containers() {
        if container.allow_privilege_escalation == Some(true) {
            h.add_non_compliant(ReportObject::container(
                &pod.namespace,
                &pod.name,
                &container.name,
                "AllowPrivilegeEscalation is set to true",
                false,
            ));
        } else {
            h.add_compliant(ReportObject::container(
                &pod.namespace,
                &pod.name,
                &container.name,
                "AllowPrivilegeEscalation is set to false",
                true,
            ));
        }
    }
    Ok(())
}

fn test_pod_host_network(h: &mut CheckHandle<'_>, env: &TestEnvironment) -> CheckResult {
    for pod in &env.snapshot().pods {
        if pod.host_network {
            h.add_non_compliant(ReportObject::pod(&pod.namespace, &pod.name, "Host network is set to true", false));
        } else {
            h.add_compliant(ReportObject::pod(&pod.namespace, &pod.name, "Host network is not set", true));
        }
    }
    Ok(())
}

fn test_sys_admin_capability(h: &mut CheckHandle<'_>, env: &TestEnvironment) -> CheckResult {
    for (pod, container) in env.snapshot().containers() {
        let forbidden = container
            .capabilities_add
            .iter()
            .find(|c| matches!(c.as_str(), "SYS_ADMIN" | "ALL"));

        let object = match forbidden {
            Some(cap) => {
                h.log_info(format_args!("Container {} adds capability {}", container.name, cap));
                ReportObject::container(&pod.namespace, &pod.name, &container.name, "Non compliant capability detected in container", false)
                    .add_field("SCC Capability", cap.as_str())
            }
            None => ReportObject::container(&pod.namespace, &pod.name, &container.name, "No SYS_ADMIN capability detected in container", true),
        };

        if forbidden.is_some() {
            h.add_non_compliant(object);
        } else {
            h.add_compliant(object);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_uid_prefers_container() {
        let pod = Pod {
            run_as_user: Some(LEET_UID),
            ..Pod::default()
        };
        let own = Container {
            run_as_user: Some(1000),
            ..Container::default()
        };
        assert_eq!(effective_uid(&pod, &own), Some(1000));
        assert_eq!(effective_uid(&pod, &Container::default()), Some(LEET_UID));
    }
}
