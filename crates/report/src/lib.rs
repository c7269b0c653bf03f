//! Reporting for certsuite runs.
//!
//! Turns a run report into the console summary and the claim document, reads
//! claims back for the failure view, and verifies run logs against an
//! expected-results template.

#![warn(missing_docs)]

pub mod summary;
pub mod claim_builder;
pub mod failures;
pub mod verify;

pub use summary::{render_failed_logs, render_summary, render_table, summarize, warnings, SuiteSummary};
pub use claim_builder::ClaimBuilder;
pub use failures::{collect_failures, FailedCheck, FailedSuite, FailuresError, NonCompliantObject, OutputFormat};
pub use verify::{
    generate_template, parse_log_results, verify, Mismatch, Verification, VerifyError, MISSING,
};
