//! Evidence model - structured compliant/non-compliant records.
//!
//! A [`ReportObject`] describes one resource and why it is (or is not)
//! compliant. Fields are kept as two parallel, ordered lists so that reports
//! diff reproducibly. [`Evidence`] accumulates objects for a single check;
//! it is append-only and is read once when the check is classified.

use serde::{Deserialize, Serialize};

/// Object type names used in report objects.
pub mod object_types {
    /// A container inside a pod
    pub const CONTAINER: &str = "Container";
    /// A pod
    pub const POD: &str = "Pod";
    /// A deployment
    pub const DEPLOYMENT: &str = "Deployment";
    /// A statefulset
    pub const STATEFUL_SET: &str = "StatefulSet";
    /// A namespace
    pub const NAMESPACE: &str = "Namespace";
    /// A custom resource definition
    pub const CRD: &str = "Custom Resource Definition";
    /// An operator
    pub const OPERATOR: &str = "Operator";
}

/// Field keys used in report objects.
pub mod fields {
    /// Reason recorded on compliant objects
    pub const REASON_FOR_COMPLIANCE: &str = "ReasonForCompliance";
    /// Reason recorded on non-compliant objects
    pub const REASON_FOR_NON_COMPLIANCE: &str = "ReasonForNonCompliance";
    /// Namespace
    pub const NAMESPACE: &str = "Namespace";
    /// Pod name
    pub const POD_NAME: &str = "Pod Name";
    /// Container name
    pub const CONTAINER_NAME: &str = "Container Name";
    /// Deployment name
    pub const DEPLOYMENT_NAME: &str = "Deployment Name";
    /// StatefulSet name
    pub const STATEFUL_SET_NAME: &str = "StatefulSet Name";
    /// CRD name
    pub const CRD_NAME: &str = "Custom Resource Definition Name";
    /// CRD version
    pub const CRD_VERSION: &str = "Custom Resource Definition Version";
    /// Operator name
    pub const OPERATOR_NAME: &str = "Operator Name";
    /// Operator install phase
    pub const OPERATOR_PHASE: &str = "Operator Phase";
    /// Referenced PodDisruptionBudget
    pub const PDB_REFERENCE: &str = "Pod Disruption Budget Reference";
}

/// Errors raised when decoding evidence.
#[derive(Debug, thiserror::Error)]
pub enum EvidenceError {
    /// Keys and values lists differ in length
    #[error("report object has {keys} field keys but {values} field values")]
    MismatchedFields {
        /// Number of keys
        keys: usize,
        /// Number of values
        values: usize,
    },
}

/// One resource's compliance record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawReportObject")]
pub struct ReportObject {
    #[serde(rename = "ObjectType")]
    object_type: String,

    #[serde(rename = "ObjectFieldsKeys")]
    field_keys: Vec<String>,

    #[serde(rename = "ObjectFieldsValues")]
    field_values: Vec<String>,
}

#[derive(Deserialize)]
struct RawReportObject {
    #[serde(rename = "ObjectType")]
    object_type: String,

    #[serde(rename = "ObjectFieldsKeys", default)]
    field_keys: Vec<String>,

    #[serde(rename = "ObjectFieldsValues", default)]
    field_values: Vec<String>,
}

impl TryFrom<RawReportObject> for ReportObject {
    type Error = EvidenceError;

    fn try_from(raw: RawReportObject) -> Result<Self, Self::Error> {
        if raw.field_keys.len() != raw.field_values.len() {
            return Err(EvidenceError::MismatchedFields {
                keys: raw.field_keys.len(),
                values: raw.field_values.len(),
            });
        }
        Ok(Self {
            object_type: raw.object_type,
            field_keys: raw.field_keys,
            field_values: raw.field_values,
        })
    }
}

impl ReportObject {
    /// Create a report object whose first field is the compliance reason.
    pub fn new(reason: impl Into<String>, object_type: impl Into<String>, compliant: bool) -> Self {
        let key = if compliant {
            fields::REASON_FOR_COMPLIANCE
        } else {
            fields::REASON_FOR_NON_COMPLIANCE
        };
        Self {
            object_type: object_type.into(),
            field_keys: Vec::new(),
            field_values: Vec::new(),
        }
        .add_field(key, reason)
    }

    /// Append a field. Order is preserved in the report.
    pub fn add_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.field_keys.push(key.into());
        self.field_values.push(value.into());
        self
    }

    /// Container-level record.
    pub fn container(
        namespace: &str,
        pod: &str,
        container: &str,
        reason: impl Into<String>,
        compliant: bool,
    ) -> Self {
        Self::new(reason, object_types::CONTAINER, compliant)
            .add_field(fields::NAMESPACE, namespace)
            .add_field(fields::POD_NAME, pod)
            .add_field(fields::CONTAINER_NAME, container)
    }

    /// Pod-level record.
    pub fn pod(namespace: &str, pod: &str, reason: impl Into<String>, compliant: bool) -> Self {
        Self::new(reason, object_types::POD, compliant)
            .add_field(fields::NAMESPACE, namespace)
            .add_field(fields::POD_NAME, pod)
    }

    /// Deployment-level record.
    pub fn deployment(namespace: &str, name: &str, reason: impl Into<String>, compliant: bool) -> Self {
        Self::new(reason, object_types::DEPLOYMENT, compliant)
            .add_field(fields::NAMESPACE, namespace)
            .add_field(fields::DEPLOYMENT_NAME, name)
    }

    /// StatefulSet-level record.
    pub fn stateful_set(namespace: &str, name: &str, reason: impl Into<String>, compliant: bool) -> Self {
        Self::new(reason, object_types::STATEFUL_SET, compliant)
            .add_field(fields::NAMESPACE, namespace)
            .add_field(fields::STATEFUL_SET_NAME, name)
    }

    /// Namespace-level record.
    pub fn namespace(namespace: &str, reason: impl Into<String>, compliant: bool) -> Self {
        Self::new(reason, object_types::NAMESPACE, compliant).add_field(fields::NAMESPACE, namespace)
    }

    /// CRD-level record.
    pub fn crd(name: &str, version: &str, reason: impl Into<String>, compliant: bool) -> Self {
        Self::new(reason, object_types::CRD, compliant)
            .add_field(fields::CRD_NAME, name)
            .add_field(fields::CRD_VERSION, version)
    }

    /// Operator-level record.
    pub fn operator(namespace: &str, name: &str, reason: impl Into<String>, compliant: bool) -> Self {
        Self::new(reason, object_types::OPERATOR, compliant)
            .add_field(fields::NAMESPACE, namespace)
            .add_field(fields::OPERATOR_NAME, name)
    }

    /// Object type.
    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    /// Fields as ordered `(key, value)` pairs.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.field_keys
            .iter()
            .zip(self.field_values.iter())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Value of the first field with this key.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Compliance reason, whichever side it was recorded for.
    pub fn reason(&self) -> Option<&str> {
        self.field(fields::REASON_FOR_NON_COMPLIANCE)
            .or_else(|| self.field(fields::REASON_FOR_COMPLIANCE))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.field_keys.len()
    }

    /// Whether the object has no fields.
    pub fn is_empty(&self) -> bool {
        self.field_keys.is_empty()
    }
}

/// Evidence accumulated by one check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Compliant objects, in recording order
    #[serde(rename = "CompliantObjectsOut", default)]
    pub compliant: Vec<ReportObject>,

    /// Non-compliant objects, in recording order
    #[serde(rename = "NonCompliantObjectsOut", default)]
    pub non_compliant: Vec<ReportObject>,
}

impl Evidence {
    /// Create empty evidence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a compliant object.
    pub fn add_compliant(&mut self, object: ReportObject) {
        self.compliant.push(object);
    }

    /// Append a non-compliant object.
    pub fn add_non_compliant(&mut self, object: ReportObject) {
        self.non_compliant.push(object);
    }

    /// Append both lists. Earlier evidence is kept.
    pub fn record(
        &mut self,
        compliant: impl IntoIterator<Item = ReportObject>,
        non_compliant: impl IntoIterator<Item = ReportObject>,
    ) {
        self.compliant.extend(compliant);
        self.non_compliant.extend(non_compliant);
    }

    /// Whether any non-compliant object was recorded.
    pub fn has_non_compliant(&self) -> bool {
        !self.non_compliant.is_empty()
    }

    /// Whether nothing was recorded at all.
    pub fn is_empty(&self) -> bool {
        self.compliant.is_empty() && self.non_compliant.is_empty()
    }

    /// Total number of recorded objects.
    pub fn len(&self) -> usize {
        self.compliant.len() + self.non_compliant.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_puts_reason_first() {
        let obj = ReportObject::new("Crd has a status sub resource set", object_types::CRD, true)
            .add_field(fields::CRD_NAME, "widgets.example.com");

        let pairs: Vec<_> = obj.fields().collect();
        assert_eq!(pairs[0], (fields::REASON_FOR_COMPLIANCE, "Crd has a status sub resource set"));
        assert_eq!(pairs[1], (fields::CRD_NAME, "widgets.example.com"));
        assert_eq!(obj.len(), 2);
    }

    #[test]
    fn test_container_object_fields() {
        let obj = ReportObject::container("ns1", "pod-a", "app", "UID is 1337", false);
        assert_eq!(obj.object_type(), object_types::CONTAINER);
        assert_eq!(obj.field(fields::POD_NAME), Some("pod-a"));
        assert_eq!(obj.reason(), Some("UID is 1337"));
        assert_eq!(obj.field(fields::REASON_FOR_COMPLIANCE), None);
    }

    #[test]
    fn test_json_uses_parallel_arrays() {
        let obj = ReportObject::namespace("ns1", "has deny-all policy", true);
        let json = serde_json::to_value(&obj).unwrap();
        assert_eq!(json["ObjectType"], "Namespace");
        assert_eq!(json["ObjectFieldsKeys"][1], "Namespace");
        assert_eq!(json["ObjectFieldsValues"][1], "ns1");
    }

    #[test]
    fn test_deserialize_rejects_mismatched_fields() {
        let json = r#"{"ObjectType":"Pod","ObjectFieldsKeys":["a","b"],"ObjectFieldsValues":["1"]}"#;
        let err = serde_json::from_str::<ReportObject>(json).unwrap_err();
        assert!(err.to_string().contains("2 field keys but 1 field values"));
    }

    #[test]
    fn test_evidence_record_is_additive() {
        let mut evidence = Evidence::new();
        evidence.record(vec![ReportObject::pod("ns", "p1", "ok", true)], vec![]);
        evidence.record(vec![], vec![ReportObject::pod("ns", "p2", "bad", false)]);
        evidence.record(vec![ReportObject::pod("ns", "p3", "ok", true)], vec![]);

        assert_eq!(evidence.compliant.len(), 2);
        assert_eq!(evidence.non_compliant.len(), 1);
        assert!(evidence.has_non_compliant());
        assert_eq!(evidence.len(), 3);
    }

    #[test]
    fn test_empty_evidence() {
        let evidence = Evidence::new();
        assert!(evidence.is_empty());
        assert!(!evidence.has_non_compliant());
        let json = serde_json::to_string(&evidence).unwrap();
        assert_eq!(json, r#"{"CompliantObjectsOut":[],"NonCompliantObjectsOut":[]}"#);
    }
}
