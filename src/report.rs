//! First-failure report formatting.
//!
//! The report is the harness's entire user-facing output: success is
//! silent, and exactly one failure is ever printed per run. The format is
//! consumed by CI logs, so it stays stable.

use crate::verify::{FailReason, Failure};

/// Render the report for the first failing case.
pub fn format_failure(failure: &Failure) -> String {
    match failure.reason {
        FailReason::DidNotFail => {
            format!("expected error, but it didn't fail: {}", failure.expected)
        }
        FailReason::MissingDiagnostic => {
            format!("expected: {}\ngot: {}", failure.expected, failure.output)
        }
        FailReason::TimedOut => {
            format!("translator timed out: {}", failure.expected)
        }
    }
}
