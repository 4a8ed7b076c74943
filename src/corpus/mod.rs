//! Corpus model: the embedded blocks of deliberately invalid inputs.
//!
//! The corpus is organized into named category blocks. Each block is a plain
//! text file under `corpus/` embedded at compile time, containing alternating
//! "expected diagnostic" / "invalid source" entries delimited by a line-start
//! marker (see [`parser`]). The blocks are immutable literal data: parsing is
//! a pure function of the text, so every run sees the same cases.

pub mod parser;

use std::fmt;

/// A corpus category block.
///
/// Informational only — execution does not depend on the category, and no
/// case depends on another. The full corpus is an unordered bag of
/// independent cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Lexical,
    Preprocessor,
    Encoding,
    Syntax,
}

impl Category {
    /// All categories, in corpus order.
    pub const ALL: [Category; 4] = [
        Category::Lexical,
        Category::Preprocessor,
        Category::Encoding,
        Category::Syntax,
    ];

    /// Stable lowercase name used on the command line and in reports.
    pub fn name(self) -> &'static str {
        match self {
            Category::Lexical => "lexical",
            Category::Preprocessor => "preprocessor",
            Category::Encoding => "encoding",
            Category::Syntax => "syntax",
        }
    }

    /// Look up a category by its command-line name.
    pub fn from_name(name: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.name() == name)
    }

    /// The literal block text for this category.
    pub fn block(self) -> &'static str {
        match self {
            Category::Lexical => include_str!("../../corpus/lexical.txt"),
            Category::Preprocessor => include_str!("../../corpus/preprocessor.txt"),
            Category::Encoding => include_str!("../../corpus/encoding.txt"),
            Category::Syntax => include_str!("../../corpus/syntax.txt"),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One (expected-diagnostic, invalid-source) pair: the unit of work.
///
/// Constructed once at parse time, consumed by exactly one translator
/// invocation, discarded after verification. Both fields are non-empty by
/// construction (the parser rejects blocks that would violate this).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Diagnostic substring the translator's output must contain.
    /// Matched as a raw substring, not line-anchored.
    pub expected: String,
    /// Invalid source text fed to the translator.
    pub source: String,
    /// Block the case came from.
    pub category: Category,
}

/// Parse the selected category blocks into a flat list of cases.
///
/// Any malformed block aborts the whole run before a single translator
/// invocation: a broken corpus is an authoring bug, not a translator bug,
/// and must never be silently skipped.
pub fn load_cases(categories: &[Category]) -> Result<Vec<TestCase>, parser::CorpusError> {
    let mut cases = Vec::new();
    for &category in categories {
        cases.extend(parser::parse_block(category, category.block())?);
    }
    Ok(cases)
}
