//! CLI for the diagcheck harness.
//!
//! ## Exit status
//!
//! - `0` — every case passed (silent)
//! - `1` — the first failing case's report was printed to stdout
//! - `2` — harness fault: malformed corpus, unstartable translator, or a
//!   usage error; never confused with a test failure
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros. `execute()`
//! returns `CliResult<ExitCode>` instead of calling `process::exit`; only
//! the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, info};

use crate::corpus::Category;
use crate::engine::{self, Verdict};
use crate::exec::{CommandTranslator, DEFAULT_ARGS};
use crate::report;

/// Environment variable consulted when `--translator` is not given.
pub const TRANSLATOR_ENV: &str = "DIAGCHECK_TRANSLATOR";

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    /// A test case failed.
    pub const FAILURE: ExitCode = ExitCode(1);
    /// The harness itself could not run.
    pub const FAULT: ExitCode = ExitCode(2);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// A harness fault (exit code 2).
    pub fn fault(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAULT)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Conformance harness for the diagnostic behavior of an external translator
#[derive(Parser, Debug)]
#[command(name = "diagcheck")]
#[command(version = VERSION)]
#[command(about = "Checks that a translator rejects known-invalid inputs \
                   with the expected diagnostics", long_about = None)]
pub struct Cli {
    /// Translator executable to test (default: $DIAGCHECK_TRANSLATOR)
    #[arg(long, value_name = "PATH")]
    pub translator: Option<PathBuf>,

    /// Argument passed to the translator (repeatable; default: -c -o /dev/null -)
    // Translator arguments are flags themselves; leading hyphens must pass
    // through instead of being parsed as our own options.
    #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Number of concurrent workers (default: available parallelism)
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Per-case timeout in seconds; 0 disables the timeout
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    pub timeout_secs: u64,

    /// Restrict the run to the named categories (repeatable)
    #[arg(long = "category", value_name = "NAME")]
    pub categories: Vec<String>,

    /// List the parsed cases without invoking the translator
    #[arg(long)]
    pub list: bool,

    /// Print run details to stderr (success stays silent on stdout)
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. `execute`
/// returns `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return the exit code.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    let categories = resolve_categories(&cli.categories)?;

    if cli.list {
        return list_cases(&categories);
    }

    let program = cli
        .translator
        .or_else(|| env::var_os(TRANSLATOR_ENV).map(PathBuf::from))
        .ok_or_else(|| {
            CliError::fault(format!(
                "no translator configured: pass --translator or set ${TRANSLATOR_ENV}"
            ))
        })?;
    let args = if cli.args.is_empty() {
        DEFAULT_ARGS.iter().map(|a| (*a).to_string()).collect()
    } else {
        cli.args
    };
    let timeout = (cli.timeout_secs > 0).then(|| Duration::from_secs(cli.timeout_secs));
    let translator = CommandTranslator::new(program, args, timeout);

    let workers = cli.jobs.unwrap_or_else(engine::default_workers).max(1);
    info!(
        translator = %translator.program().display(),
        workers,
        "running conformance corpus"
    );

    match engine::run_corpus(&translator, &categories, workers) {
        Ok(Verdict::AllPassed { cases }) => {
            debug!(cases, "all cases passed");
            if cli.verbose {
                eprintln!("{cases} cases passed");
            }
            Ok(ExitCode::SUCCESS)
        }
        Ok(Verdict::Failed { case, failure }) => {
            if cli.verbose {
                eprintln!("failing case in '{}' block", case.category);
            }
            println!("{}", report::format_failure(&failure));
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(CliError::fault(e.to_string())),
    }
}

/// Map `--category` names to categories; no selection means all of them.
fn resolve_categories(names: &[String]) -> CliResult<Vec<Category>> {
    if names.is_empty() {
        return Ok(Category::ALL.to_vec());
    }
    names
        .iter()
        .map(|name| {
            Category::from_name(name).ok_or_else(|| {
                CliError::fault(format!(
                    "unknown category '{name}' (expected one of: {})",
                    Category::ALL.map(Category::name).join(", ")
                ))
            })
        })
        .collect()
}

/// Print every parsed case without executing anything.
///
/// Exercises the parser's fatal-validation path on its own, which makes it
/// a quick corpus-authoring check.
fn list_cases(categories: &[Category]) -> CliResult<ExitCode> {
    let cases = crate::corpus::load_cases(categories)
        .map_err(|e| CliError::fault(format!("corpus error: {e}")))?;
    for case in &cases {
        println!("{}: {}", case.category, case.expected);
    }
    println!("{} cases", cases.len());
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_translator_and_jobs() {
        let cli =
            Cli::try_parse_from(["diagcheck", "--translator", "./mycc", "-j", "4"]).unwrap();
        assert_eq!(cli.translator.unwrap(), PathBuf::from("./mycc"));
        assert_eq!(cli.jobs, Some(4));
        assert_eq!(cli.timeout_secs, 10);
    }

    #[test]
    fn parses_repeated_args_and_categories() {
        let cli = Cli::try_parse_from([
            "diagcheck",
            "--arg",
            "-fsyntax-only",
            "--arg",
            "-",
            "--category",
            "lexical",
            "--category",
            "syntax",
        ])
        .unwrap();
        assert_eq!(cli.args, vec!["-fsyntax-only", "-"]);
        assert_eq!(cli.categories, vec!["lexical", "syntax"]);
    }

    #[test]
    fn parses_list_mode() {
        let cli = Cli::try_parse_from(["diagcheck", "--list"]).unwrap();
        assert!(cli.list);
    }

    #[test]
    fn resolves_all_categories_by_default() {
        assert_eq!(resolve_categories(&[]).unwrap(), Category::ALL.to_vec());
    }

    #[test]
    fn rejects_unknown_category_with_fault_code() {
        let err = resolve_categories(&["parser".to_string()]).unwrap_err();
        assert_eq!(err.exit_code, ExitCode::FAULT);
        assert!(err.message.contains("unknown category 'parser'"));
    }
}
