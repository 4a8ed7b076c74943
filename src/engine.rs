//! Worker-pool dispatch and fail-fast aggregation.
//!
//! Cases fan out to a fixed-size pool of OS threads, each owning one child
//! process at a time; results fan back in over a channel in completion
//! order, not submission order. The aggregator stops at the first failure,
//! and the pool is always joined before control returns, so no child
//! process can outlive the harness.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

use crate::corpus::{self, Category, TestCase, parser::CorpusError};
use crate::exec::{ExecError, Translator};
use crate::verify::{self, Failure, Outcome};

/// Anything that aborts a run without producing a verdict.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Malformed corpus block; surfaced before any execution.
    #[error("corpus error: {0}")]
    Corpus(#[from] CorpusError),

    /// The translator could not be driven at all.
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Final verdict of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Every dispatched case passed.
    AllPassed { cases: usize },
    /// The first observed failure. Cases still in flight when it was
    /// observed were abandoned after their child processes were reaped;
    /// which failure is first is nondeterministic when several cases fail.
    Failed { case: TestCase, failure: Failure },
}

/// Default worker count: one per available processing unit.
pub fn default_workers() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

/// Parse the selected category blocks and run every case.
///
/// Corpus faults abort before a single translator invocation.
pub fn run_corpus<T: Translator>(
    translator: &T,
    categories: &[Category],
    workers: usize,
) -> Result<Verdict, HarnessError> {
    let cases = corpus::load_cases(categories)?;
    debug!(cases = cases.len(), workers, "corpus parsed, dispatching");
    run_cases(translator, cases, workers)
}

type CaseMessage = Result<(TestCase, Outcome), ExecError>;

/// Dispatch `cases` across `workers` threads and aggregate fail-fast.
pub fn run_cases<T: Translator>(
    translator: &T,
    cases: Vec<TestCase>,
    workers: usize,
) -> Result<Verdict, HarnessError> {
    let total = cases.len();
    if total == 0 {
        return Ok(Verdict::AllPassed { cases: 0 });
    }
    let workers = workers.clamp(1, total);

    let queue = Mutex::new(VecDeque::from(cases));
    let cancelled = AtomicBool::new(false);
    let (tx, rx) = mpsc::channel::<CaseMessage>();

    thread::scope(|scope| {
        let queue = &queue;
        let cancelled = &cancelled;
        for _ in 0..workers {
            let tx = tx.clone();
            scope.spawn(move || worker_loop(translator, queue, cancelled, &tx));
        }
        // The workers hold the remaining senders; the channel closes once
        // they all finish.
        drop(tx);

        let mut verdict = Ok(Verdict::AllPassed { cases: total });
        let mut passed = 0usize;
        while let Ok(message) = rx.recv() {
            match message {
                Ok((_, Outcome::Pass)) => {
                    passed += 1;
                    if passed == total {
                        break;
                    }
                }
                Ok((case, Outcome::Fail(failure))) => {
                    cancelled.store(true, Ordering::Relaxed);
                    verdict = Ok(Verdict::Failed { case, failure });
                    break;
                }
                Err(fault) => {
                    cancelled.store(true, Ordering::Relaxed);
                    verdict = Err(HarnessError::Exec(fault));
                    break;
                }
            }
        }
        // Leaving the scope joins every worker; each finishes reaping its
        // in-flight child before the pool is torn down.
        verdict
    })
}

fn worker_loop<T: Translator>(
    translator: &T,
    queue: &Mutex<VecDeque<TestCase>>,
    cancelled: &AtomicBool,
    results: &Sender<CaseMessage>,
) {
    loop {
        if cancelled.load(Ordering::Relaxed) {
            return;
        }
        let Some(case) = queue.lock().pop_front() else {
            return;
        };
        let message = match translator.accept(&case.source) {
            Ok(executed) => {
                let outcome = verify::verify(&executed, &case.expected);
                Ok((case, outcome))
            }
            Err(fault) => Err(fault),
        };
        // A send error means the aggregator is gone and the result is being
        // abandoned; the child was already reaped above either way.
        if results.send(message).is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{ExecutionResult, Termination};
    use std::sync::atomic::AtomicUsize;

    /// Deterministic in-process stand-ins for the translator.
    struct Stub {
        behavior: Behavior,
        calls: AtomicUsize,
    }

    enum Behavior {
        /// Echo the source and exit non-zero.
        EchoRejecting,
        /// Exit zero no matter what.
        AcceptEverything,
        /// Exit non-zero with unrelated output.
        UnrelatedOutput,
        /// Pretend the executable is missing.
        Unstartable,
    }

    impl Stub {
        fn new(behavior: Behavior) -> Self {
            Stub {
                behavior,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Translator for Stub {
        fn accept(&self, source: &str) -> Result<ExecutionResult, ExecError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            match self.behavior {
                Behavior::EchoRejecting => Ok(ExecutionResult {
                    output: source.to_string(),
                    termination: Termination::FailureExit,
                }),
                Behavior::AcceptEverything => Ok(ExecutionResult {
                    output: String::new(),
                    termination: Termination::SuccessExit,
                }),
                Behavior::UnrelatedOutput => Ok(ExecutionResult {
                    output: "internal compiler error\n".to_string(),
                    termination: Termination::FailureExit,
                }),
                Behavior::Unstartable => Err(ExecError::Spawn {
                    program: "/no/such/translator".to_string(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                }),
            }
        }
    }

    /// Cases whose expected text is embedded in their own source, so the
    /// echoing stub passes them all.
    fn self_matching_cases(n: usize) -> Vec<TestCase> {
        (0..n)
            .map(|i| TestCase {
                expected: format!("diag {i}"),
                source: format!("bad input {i} // diag {i}\n"),
                category: Category::Syntax,
            })
            .collect()
    }

    #[test]
    fn empty_case_list_passes_trivially() {
        let stub = Stub::new(Behavior::EchoRejecting);
        let verdict = run_cases(&stub, vec![], 4).unwrap();
        assert_eq!(verdict, Verdict::AllPassed { cases: 0 });
        assert_eq!(stub.calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn echoing_stub_passes_self_matching_cases() {
        let stub = Stub::new(Behavior::EchoRejecting);
        let verdict = run_cases(&stub, self_matching_cases(50), 4).unwrap();
        assert_eq!(verdict, Verdict::AllPassed { cases: 50 });
        assert_eq!(stub.calls.load(Ordering::Relaxed), 50);
    }

    #[test]
    fn accepting_stub_fails_with_did_not_fail() {
        let stub = Stub::new(Behavior::AcceptEverything);
        match run_cases(&stub, self_matching_cases(8), 2).unwrap() {
            Verdict::Failed { failure, .. } => {
                assert_eq!(failure.reason, crate::verify::FailReason::DidNotFail);
            }
            Verdict::AllPassed { .. } => panic!("false accepts must fail the run"),
        }
    }

    #[test]
    fn unrelated_output_fails_with_missing_diagnostic() {
        let stub = Stub::new(Behavior::UnrelatedOutput);
        match run_cases(&stub, self_matching_cases(8), 2).unwrap() {
            Verdict::Failed { failure, .. } => {
                assert_eq!(failure.reason, crate::verify::FailReason::MissingDiagnostic);
            }
            Verdict::AllPassed { .. } => panic!("wrong diagnostics must fail the run"),
        }
    }

    #[test]
    fn single_poisoned_case_is_reported_for_any_worker_count() {
        for workers in [1, 2, 4, 8] {
            let mut cases = self_matching_cases(100);
            cases[57].source = "no diagnostic here\n".to_string();
            let stub = Stub::new(Behavior::EchoRejecting);
            match run_cases(&stub, cases, workers).unwrap() {
                Verdict::Failed { case, failure } => {
                    assert_eq!(case.expected, "diag 57");
                    assert_eq!(failure.reason, crate::verify::FailReason::MissingDiagnostic);
                }
                Verdict::AllPassed { .. } => {
                    panic!("poisoned case must fail with {workers} workers")
                }
            }
        }
    }

    #[test]
    fn worker_count_does_not_change_an_all_pass_verdict() {
        let baseline = run_cases(
            &Stub::new(Behavior::EchoRejecting),
            self_matching_cases(40),
            1,
        )
        .unwrap();
        for workers in [2, 4, 8, 16] {
            let verdict = run_cases(
                &Stub::new(Behavior::EchoRejecting),
                self_matching_cases(40),
                workers,
            )
            .unwrap();
            assert_eq!(verdict, baseline);
        }
    }

    #[test]
    fn unstartable_translator_is_a_harness_fault_not_a_failure() {
        let stub = Stub::new(Behavior::Unstartable);
        match run_cases(&stub, self_matching_cases(10), 4) {
            Err(HarnessError::Exec(ExecError::Spawn { program, .. })) => {
                assert_eq!(program, "/no/such/translator");
            }
            other => panic!("expected harness fault, got {other:?}"),
        }
    }

    #[test]
    fn worker_count_larger_than_case_count_is_clamped() {
        let stub = Stub::new(Behavior::EchoRejecting);
        let verdict = run_cases(&stub, self_matching_cases(3), 64).unwrap();
        assert_eq!(verdict, Verdict::AllPassed { cases: 3 });
    }

    #[test]
    fn run_corpus_executes_the_embedded_corpus() {
        // The echoing stub rejects everything, so exactly the cases whose
        // expected text appears in their own source can pass; the first
        // case that does not match fails the run.
        let stub = Stub::new(Behavior::AcceptEverything);
        match run_corpus(&stub, &[Category::Lexical], 2).unwrap() {
            Verdict::Failed { case, failure } => {
                assert_eq!(case.category, Category::Lexical);
                assert_eq!(failure.reason, crate::verify::FailReason::DidNotFail);
            }
            Verdict::AllPassed { .. } => panic!("accept-everything stub must fail"),
        }
    }
}
