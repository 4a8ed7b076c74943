//! Marker-delimited corpus block parser.
//!
//! An entry starts with a line beginning with `"! "`; the remainder of that
//! line is the expected diagnostic text. The invalid source text follows on
//! the next lines, running until the next marker line or the end of the
//! block. The marker is recognized only at the start of a line, so source
//! text containing `"! "` mid-line never splits an entry.
//!
//! Entries are separated by blank lines; blank lines surrounding a source
//! chunk belong to the separation and are stripped, interior blank lines are
//! preserved verbatim.

use thiserror::Error;

use super::{Category, TestCase};

/// Marker token introducing an entry, valid only at the start of a line.
pub const MARKER: &str = "! ";

/// A malformed corpus block. Always fatal: surfaced before any execution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CorpusError {
    /// A marker line with no diagnostic text after it.
    #[error("{category} block, entry {entry}: marker line has no diagnostic text")]
    EmptyExpected { category: Category, entry: usize },

    /// A marker line with no source text before the next marker or the end
    /// of the block (a dangling trailing marker is the common shape).
    #[error("{category} block, entry {entry} ({expected:?}): no source text follows the marker")]
    MissingSource {
        category: Category,
        entry: usize,
        expected: String,
    },

    /// Non-blank text before the first marker line.
    #[error("{category} block: text before the first marker: {line:?}")]
    TextBeforeMarker { category: Category, line: String },
}

/// Lazy iterator over the entries of one category block.
///
/// Yields cases in source order; the first malformed entry is yielded as an
/// error and ends the iteration.
pub struct Entries<'a> {
    category: Category,
    lines: std::iter::Peekable<std::str::Lines<'a>>,
    entry: usize,
    poisoned: bool,
}

/// Iterate over the entries of `block`.
pub fn entries(category: Category, block: &str) -> Entries<'_> {
    Entries {
        category,
        lines: block.lines().peekable(),
        entry: 0,
        poisoned: false,
    }
}

/// Parse one block eagerly, failing on the first malformed entry.
pub fn parse_block(category: Category, block: &str) -> Result<Vec<TestCase>, CorpusError> {
    entries(category, block).collect()
}

fn is_marker_line(line: &str) -> bool {
    line.starts_with(MARKER) || line == "!"
}

impl Iterator for Entries<'_> {
    type Item = Result<TestCase, CorpusError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.poisoned {
            return None;
        }

        // Skip separating blank lines; the next non-blank line must open an
        // entry.
        let header = loop {
            let line = self.lines.next()?;
            if line.trim().is_empty() {
                continue;
            }
            if !is_marker_line(line) {
                self.poisoned = true;
                return Some(Err(CorpusError::TextBeforeMarker {
                    category: self.category,
                    line: line.to_string(),
                }));
            }
            break line;
        };

        self.entry += 1;
        let expected = header.strip_prefix(MARKER).unwrap_or("");
        if expected.trim().is_empty() {
            self.poisoned = true;
            return Some(Err(CorpusError::EmptyExpected {
                category: self.category,
                entry: self.entry,
            }));
        }

        // Collect source lines up to the next marker line or end of block.
        let mut source_lines: Vec<&str> = Vec::new();
        while let Some(&line) = self.lines.peek() {
            if is_marker_line(line) {
                break;
            }
            source_lines.push(line);
            self.lines.next();
        }

        // Strip the blank separation around the chunk, keep interior blanks.
        while source_lines.first().is_some_and(|l| l.trim().is_empty()) {
            source_lines.remove(0);
        }
        while source_lines.last().is_some_and(|l| l.trim().is_empty()) {
            source_lines.pop();
        }

        if source_lines.is_empty() {
            self.poisoned = true;
            return Some(Err(CorpusError::MissingSource {
                category: self.category,
                entry: self.entry,
                expected: expected.to_string(),
            }));
        }

        Some(Ok(TestCase {
            expected: expected.to_string(),
            source: source_lines.join("\n"),
            category: self.category,
        }))
    }
}
