//! Pass/fail decision for one executed case.
//!
//! A pure function of the captured execution and the expected diagnostic:
//! no I/O, no retries, exactly one outcome per case.

use crate::exec::{ExecutionResult, Termination};

/// Why a case failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailReason {
    /// The translator exited successfully despite the invalid input.
    DidNotFail,
    /// The translator rejected the input but never mentioned the expected
    /// diagnostic text.
    MissingDiagnostic,
    /// The translator hung past the per-case deadline.
    TimedOut,
}

/// A failed case, with everything the report needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub reason: FailReason,
    pub expected: String,
    /// Captured output, trailing newlines already stripped.
    pub output: String,
}

/// Verification outcome for one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail(Failure),
}

impl Outcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::Pass)
    }
}

/// Decide whether the captured execution satisfies the expected diagnostic.
///
/// Matching is exact, case-sensitive substring containment with no trimming
/// of the expected text. Trailing newlines are stripped from the captured
/// output first so platform line-ending differences cannot produce spurious
/// mismatches.
pub fn verify(result: &ExecutionResult, expected: &str) -> Outcome {
    let output = result.output.trim_end_matches(['\r', '\n']);
    let fail = |reason| {
        Outcome::Fail(Failure {
            reason,
            expected: expected.to_string(),
            output: output.to_string(),
        })
    };
    match result.termination {
        Termination::SuccessExit => fail(FailReason::DidNotFail),
        Termination::TimedOut => fail(FailReason::TimedOut),
        Termination::FailureExit if output.contains(expected) => Outcome::Pass,
        Termination::FailureExit => fail(FailReason::MissingDiagnostic),
    }
}
