//! Operator suite.

use certsuite_core::{fields, Operator, ReportObject, TestEnvironment};
use certsuite_engine::{Catalog, CheckHandle, CheckResult, ChecksGroup};

use crate::identifiers::{new_check, SUITE_OPERATOR, TEST_OPERATOR_INSTALL_STATUS};
use crate::{refresh_environment, skip};

const PHASE_SUCCEEDED: &str = "Succeeded";

/// Build the operator group.
pub fn load_checks(catalog: &Catalog) -> ChecksGroup<TestEnvironment> {
    ChecksGroup::new(SUITE_OPERATOR)
        .with_before_each(refresh_environment)
        .with_check(
            new_check(catalog, SUITE_OPERATOR, TEST_OPERATOR_INSTALL_STATUS)
                .with_skip_check(skip::no_operators)
                .with_check_fn(test_operator_install_status),
        )
}

fn install_evidence(op: &Operator) -> (bool, ReportObject) {
    let succeeded = op.phase == PHASE_SUCCEEDED;
    let reason = if succeeded {
        "Operator on Succeeded state"
    } else {
        "Operator not in Succeeded state"
    };
    let object = ReportObject::operator(&op.namespace, &op.name, reason, succeeded)
        .add_field(fields::OPERATOR_PHASE, op.phase.as_str());
    (succeeded, object)
}

fn test_operator_install_status(h: &mut CheckHandle<'_>, env: &TestEnvironment) -> CheckResult {
    for op in &env.snapshot().operators {
        let (succeeded, object) = install_evidence(op);
        if succeeded {
            h.log_info(format_args!("Operator {}/{} is in Succeeded phase", op.namespace, op.name));
            h.add_compliant(object);
        } else {
            h.log_error(format_args!(
                "Operator {}/{} is not in Succeeded phase (phase={:?})",
                op.namespace, op.name, op.phase
            ));
            h.add_non_compliant(object);
        }
    }
    Ok(())
}
