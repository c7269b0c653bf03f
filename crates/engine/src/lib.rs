//! Check engine - catalog, label selection, checks, groups and the runner.
//!
//! The engine is generic over the environment type `E`: group hooks receive
//! `&mut E`, skip predicates and check functions receive `&E`.

#![warn(missing_docs)]

pub mod catalog;
pub mod labels;
pub mod check;
pub mod group;
pub mod runner;

pub use catalog::{Catalog, CatalogBuilder, CatalogError};
pub use labels::{select, LabelError, LabelExpr, LabelFilter, LABEL_ALL, LABEL_NONE};
pub use check::{Check, CheckError, CheckFn, CheckHandle, CheckResult, SkipFn, SkipMode};
pub use group::{ChecksGroup, HookError, HookFn};
pub use runner::{
    AbortToken, RunConfig, RunReport, Runner, DEFAULT_TIMEOUT, GLOBAL_TIMEOUT_REASON,
    SIGNAL_ABORT_REASON,
};
