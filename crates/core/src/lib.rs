//! certsuite core data models.
//!
//! This crate defines the data structures shared by the check engine, the
//! reporter and the verifier: evidence objects, check states, catalog
//! metadata, the claim document and the environment snapshot.

#![warn(missing_docs)]

// Core identities
mod id;

// Catalog metadata
mod catalog;

// Check execution
mod evidence;
mod outcome;

// Reporting
mod claim;
mod template;

// Inputs
mod environment;
pub mod duration;

// Re-exports
pub use id::*;

pub use catalog::{
    CatalogEntry, CatalogKey, Classification, Scenario, DEFAULT_EXCEPTION_PROCESS,
    DEFAULT_REFERENCE, TAG_COMMON, TAG_EXTENDED, TAG_FAR_EDGE, TAG_TELCO, TIER_TAGS,
};
pub use evidence::{fields, object_types, Evidence, EvidenceError, ReportObject};
pub use outcome::{CheckOutcome, CheckState, InvalidTransition};
pub use claim::{
    CatalogInfo, CheckDetails, CheckRecord, Claim, ClaimMetadata, ClaimRoot, TestId, Versions,
    CLAIM_FORMAT_VERSION,
};
pub use template::{TestCaseList, TestResultsTemplate, DEFAULT_TEMPLATE_FILE};
pub use environment::{
    Container, Crd, CrdVersion, Deployment, Environment, EnvironmentError, NetworkPolicy, Operator, Pod,
    PodDisruptionBudget, StatefulSet, TestEnvironment,
};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
