//! Environment snapshot - the resources under test.
//!
//! Discovery happens elsewhere; the engine consumes a JSON snapshot of what
//! was found. [`TestEnvironment`] wraps a snapshot with its source so that a
//! group hook can reload it after a check has changed the environment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::Time;

/// Errors reading a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    /// Snapshot file could not be read
    #[error("could not read environment snapshot {path}: {source}")]
    Io {
        /// Snapshot path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Snapshot file is not valid JSON for the model
    #[error("could not parse environment snapshot {path}: {source}")]
    Json {
        /// Snapshot path
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },
}

/// A container inside a pod.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Container {
    /// Container name
    pub name: String,
    /// Image reference
    pub image: String,
    /// `securityContext.runAsUser`; falls back to the pod's when unset
    pub run_as_user: Option<i64>,
    /// `securityContext.runAsNonRoot`
    pub run_as_non_root: Option<bool>,
    /// `securityContext.privileged`
    pub privileged: bool,
    /// `securityContext.allowPrivilegeEscalation`
    pub allow_privilege_escalation: Option<bool>,
    /// Capabilities added through `securityContext.capabilities.add`
    pub capabilities_add: Vec<String>,
    /// `terminationMessagePolicy`
    pub termination_message_policy: String,
    /// Recent log output; `None` when logs could not be fetched
    pub logs: Option<String>,
}

/// A pod under test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pod {
    /// Pod name
    pub name: String,
    /// Namespace
    pub namespace: String,
    /// Pod labels
    pub labels: BTreeMap<String, String>,
    /// `spec.hostNetwork`
    pub host_network: bool,
    /// `spec.hostPID`
    pub host_pid: bool,
    /// `spec.hostIPC`
    pub host_ipc: bool,
    /// Pod-level `securityContext.runAsUser`
    pub run_as_user: Option<i64>,
    /// Containers of the pod
    pub containers: Vec<Container>,
}

/// A deployment under test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Deployment {
    /// Deployment name
    pub name: String,
    /// Namespace
    pub namespace: String,
    /// Desired replica count
    pub replicas: i32,
    /// Labels of the pod template
    pub template_labels: BTreeMap<String, String>,
}

/// A statefulset under test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatefulSet {
    /// StatefulSet name
    pub name: String,
    /// Namespace
    pub namespace: String,
    /// Desired replica count
    pub replicas: i32,
    /// Labels of the pod template
    pub template_labels: BTreeMap<String, String>,
}

/// One served version of a CRD.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrdVersion {
    /// Version name, e.g. `v1`
    pub name: String,
    /// Whether the version declares the `status` subresource
    pub has_status_subresource: bool,
}

/// A custom resource definition under test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Crd {
    /// CRD name
    pub name: String,
    /// Served versions
    pub versions: Vec<CrdVersion>,
}

/// A network policy in a namespace under test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkPolicy {
    /// Policy name
    pub name: String,
    /// Namespace
    pub namespace: String,
    /// Empty selector: the policy applies to every pod in the namespace
    pub pod_selector: BTreeMap<String, String>,
    /// `Ingress` and/or `Egress`
    pub policy_types: Vec<String>,
    /// Number of ingress rules
    pub ingress_rules: usize,
    /// Number of egress rules
    pub egress_rules: usize,
}

/// A pod disruption budget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PodDisruptionBudget {
    /// PDB name
    pub name: String,
    /// Namespace
    pub namespace: String,
    /// `matchLabels` of the selector
    pub selector: BTreeMap<String, String>,
    /// `minAvailable`, as an absolute count
    pub min_available: Option<i32>,
    /// `maxUnavailable`, as an absolute count
    pub max_unavailable: Option<i32>,
}

/// An installed operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Operator {
    /// Operator name
    pub name: String,
    /// Namespace it is installed in
    pub namespace: String,
    /// Installed version
    pub version: String,
    /// Install phase reported by the operator lifecycle manager
    pub phase: String,
}

/// Snapshot of the resources under test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Environment {
    /// Namespaces under test
    pub namespaces: Vec<String>,
    /// Pods under test
    pub pods: Vec<Pod>,
    /// Deployments under test
    pub deployments: Vec<Deployment>,
    /// StatefulSets under test
    pub stateful_sets: Vec<StatefulSet>,
    /// CRDs under test
    pub crds: Vec<Crd>,
    /// Network policies of the namespaces under test
    pub network_policies: Vec<NetworkPolicy>,
    /// Pod disruption budgets of the namespaces under test
    pub pod_disruption_budgets: Vec<PodDisruptionBudget>,
    /// Operators under test
    pub operators: Vec<Operator>,
}

impl Environment {
    /// Read a snapshot from a JSON file.
    pub fn read_from(path: &Path) -> Result<Self, EnvironmentError> {
        let json = std::fs::read_to_string(path).map_err(|source| EnvironmentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json, path)
    }

    /// Parse a snapshot; `path` is only used for error messages.
    pub fn from_json(json: &str, path: &Path) -> Result<Self, EnvironmentError> {
        serde_json::from_str(json).map_err(|source| EnvironmentError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// All containers with their pod.
    pub fn containers(&self) -> impl Iterator<Item = (&Pod, &Container)> {
        self.pods
            .iter()
            .flat_map(|pod| pod.containers.iter().map(move |c| (pod, c)))
    }
}

/// A snapshot plus where it came from.
///
/// Checks only see `&TestEnvironment`; a check that changes the environment
/// calls [`mark_stale`](Self::mark_stale) and the next group hook reloads it.
#[derive(Debug)]
pub struct TestEnvironment {
    snapshot: Environment,
    source: Option<PathBuf>,
    stale: AtomicBool,
    loaded_at: Time,
}

impl TestEnvironment {
    /// Wrap an in-memory snapshot.
    pub fn new(snapshot: Environment) -> Self {
        Self {
            snapshot,
            source: None,
            stale: AtomicBool::new(false),
            loaded_at: chrono::Utc::now(),
        }
    }

    /// Wrap a snapshot read from `source`, so it can be reloaded later.
    pub fn with_source(snapshot: Environment, source: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::new(snapshot)
        }
    }

    /// Load a snapshot file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EnvironmentError> {
        let path = path.as_ref();
        Ok(Self::with_source(Environment::read_from(path)?, path))
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> &Environment {
        &self.snapshot
    }

    /// When the current snapshot was loaded.
    pub fn loaded_at(&self) -> Time {
        self.loaded_at
    }

    /// Request a reload before the next check.
    pub fn mark_stale(&self) {
        self.stale.store(true, Ordering::Relaxed);
    }

    /// Whether a reload was requested.
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Relaxed)
    }

    /// Reload the snapshot if a reload was requested. Returns whether it reloaded.
    pub fn refresh_if_stale(&mut self) -> Result<bool, EnvironmentError> {
        if !self.is_stale() {
            return Ok(false);
        }

        let Some(source) = &self.source else {
            tracing::debug!("Environment marked stale but has no source; keeping snapshot");
            self.stale.store(false, Ordering::Relaxed);
            return Ok(false);
        };

        tracing::info!("Refreshing environment snapshot from {}", source.display());
        self.snapshot = Environment::read_from(source)?;
        self.loaded_at = chrono::Utc::now();
        self.stale.store(false, Ordering::Relaxed);
        Ok(true)
    }
}
