#![forbid(unsafe_code)]
//! diagcheck — conformance harness for translator diagnostics
//!
//! The harness owns a corpus of deliberately invalid inputs, each paired
//! with a required diagnostic substring, and answers one question per
//! entry: does invoking the translator on this invalid input produce output
//! containing the expected diagnostic text?
//!
//! Pipeline: [`corpus`] parses the embedded category blocks into cases;
//! [`engine`] fans the cases out to a fixed-size worker pool; each worker
//! drives one [`exec::Translator`] invocation per case and [`verify`]
//! decides pass/fail; the aggregator stops at the first failure and
//! [`report`] formats it. Success is silent with a zero exit status.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` /
//!   `map_err`. The `cli` module enforces `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **True invariants**: If a panic represents a harness bug (logic
//!   error), use `.expect("INVARIANT: reason")` with a clear explanation.

pub mod cli;
pub mod corpus;
pub mod engine;
pub mod exec;
pub mod report;
pub mod verify;

pub use corpus::{Category, TestCase};
pub use engine::{HarnessError, Verdict, run_cases, run_corpus};
pub use exec::{CommandTranslator, ExecutionResult, Termination, Translator};
pub use verify::{FailReason, Failure, Outcome};
