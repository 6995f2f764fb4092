//! Verification and reconciliation of stored distances.

pub mod classify;
pub mod engine;

pub use classify::{classify, severity, Discrepancy, Severity, Verdict};
pub use engine::{
    apply_findings, read_report, write_report, ApplySummary, Failure, FailureReason, Finding,
    Reconciler, Scope, VerificationReport, FINDINGS_FILE,
};
