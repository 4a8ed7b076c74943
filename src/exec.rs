//! Child-process execution of the translator under test.
//!
//! The translator is a capability, not a concrete binary: anything that can
//! accept source text and report (merged output, termination) implements
//! [`Translator`], so tests substitute deterministic stubs for a real
//! compiler. [`CommandTranslator`] is the production implementation that
//! spawns one child process per case.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

/// Arguments selecting "compile only, discard output, read from stdin".
pub const DEFAULT_ARGS: [&str; 4] = ["-c", "-o", "/dev/null", "-"];

/// Poll interval while waiting on a child under a deadline.
const EXIT_POLL: Duration = Duration::from_millis(5);

/// How the translator process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Non-zero exit status: the translator rejected the input.
    FailureExit,
    /// Zero exit status: the translator accepted the input.
    SuccessExit,
    /// The translator outlived the per-case deadline and was killed.
    TimedOut,
}

impl From<ExitStatus> for Termination {
    fn from(status: ExitStatus) -> Self {
        if status.success() {
            Termination::SuccessExit
        } else {
            Termination::FailureExit
        }
    }
}

/// Captured outcome of one translator invocation.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// stdout and stderr, merged in the order the translator emitted them,
    /// captured in full.
    pub output: String,
    pub termination: Termination,
}

/// Harness faults, as opposed to test failures.
///
/// A translator that cannot be started at all tells us nothing about its
/// diagnostics; these abort the run instead of counting as failed cases.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("cannot start translator '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("i/o error while driving the translator: {0}")]
    Io(#[from] io::Error),
}

/// The translator under test.
///
/// `accept` owns one full child-process lifecycle: by the time it returns,
/// any process it spawned has been reaped. Implementations are called from
/// multiple worker threads at once.
pub trait Translator: Sync {
    fn accept(&self, source: &str) -> Result<ExecutionResult, ExecError>;
}

/// A real external translator executable.
#[derive(Debug, Clone)]
pub struct CommandTranslator {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandTranslator {
    pub fn new(
        program: impl Into<PathBuf>,
        args: Vec<String>,
        timeout: Option<Duration>,
    ) -> Self {
        CommandTranslator {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// The configured executable path.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Wait for the child to exit, enforcing the per-case deadline.
    ///
    /// Every path reaps the child, the error arms included: either
    /// `try_wait` observed the exit, or we kill and `wait`. The harness
    /// must never leave a zombie behind, including when the aggregator is
    /// already tearing the pool down.
    fn await_exit(&self, child: &mut Child) -> Result<Termination, ExecError> {
        let Some(timeout) = self.timeout else {
            return match child.wait() {
                Ok(status) => Ok(status.into()),
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    Err(err.into())
                }
            };
        };
        let deadline = Instant::now() + timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status.into()),
                Ok(None) => {}
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(err.into());
                }
            }
            if Instant::now() >= deadline {
                debug!(program = %self.program.display(), "translator hit deadline, killing");
                // Kill may race an exit that just happened; wait still reaps.
                let _ = child.kill();
                child.wait()?;
                return Ok(Termination::TimedOut);
            }
            thread::sleep(EXIT_POLL);
        }
    }
}

impl Translator for CommandTranslator {
    fn accept(&self, source: &str) -> Result<ExecutionResult, ExecError> {
        // One pipe for both output streams, so the interleaving of the
        // translator's diagnostics is preserved exactly as emitted.
        let (mut reader, writer) = io::pipe()?;
        let writer_for_stderr = writer.try_clone()?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::from(writer))
            .stderr(Stdio::from(writer_for_stderr));

        let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;
        // Drop the parent's copies of the write end, or the pipe never
        // reports end-of-file.
        drop(cmd);

        // Feed stdin and drain the output pipe on their own threads: a
        // translator may emit more than a pipe buffer before it finishes
        // reading its input, and blocking on either side while the child
        // blocks on the other would deadlock the exchange.
        let stdin = child.stdin.take();
        let text = source.as_bytes().to_vec();
        let feeder = thread::spawn(move || {
            if let Some(mut stdin) = stdin {
                // A child that exits without consuming all input produces
                // EPIPE here; its exit status already carries the verdict.
                let _ = stdin.write_all(&text);
            }
            // Dropping stdin closes it, signaling end-of-input.
        });
        // The collector streams chunks instead of returning one buffer at
        // end-of-file, so the deadline path below can take what has arrived
        // without waiting for the pipe to close.
        let (chunk_tx, chunk_rx) = mpsc::channel::<Vec<u8>>();
        let collector = thread::spawn(move || {
            let mut buf = [0u8; 8192];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if chunk_tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let termination = self.await_exit(&mut child)?;

        let mut output = Vec::new();
        if termination == Termination::TimedOut {
            // Killing the direct child does not close the pipe: any process
            // it spawned inherited the write end and may hold it open
            // indefinitely. Take whatever already arrived and leave both
            // threads to finish on their own once the pipe dies with the
            // stragglers; joining here would reintroduce the hang the
            // deadline exists to bound.
            while let Ok(chunk) = chunk_rx.try_recv() {
                output.extend_from_slice(&chunk);
            }
        } else {
            // The child is reaped, so its ends of the pipe are closed and
            // both threads run to completion promptly.
            for chunk in chunk_rx {
                output.extend_from_slice(&chunk);
            }
            let _ = feeder.join();
            let _ = collector.join();
        }

        Ok(ExecutionResult {
            output: String::from_utf8_lossy(&output).into_owned(),
            termination,
        })
    }
}
