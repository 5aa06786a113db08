//! Error and warning taxonomy for the reordering engine.
//!
//! Identity ambiguity and unreadable input abort the file pair; everything
//! else degrades per definition and is reported as an `EngineWarning`.

use std::path::PathBuf;

use serde::Serialize;

/// Malformed or unparseable extractor input
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ExtractionError {
    #[error("{extractor} could not parse the input")]
    Unparseable { extractor: &'static str },

    #[error("{extractor}: {message} (line {line})")]
    Malformed {
        extractor: &'static str,
        line: usize,
        message: String,
    },

    #[error("{extractor} setup failed: {message}")]
    Setup {
        extractor: &'static str,
        message: String,
    },
}

/// Fatal engine failures for one header/implementation pair
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum EngineError {
    #[error("extraction failed for {file}: {source}")]
    Extraction {
        /// Which input failed: "header" or "source"
        file: &'static str,
        #[source]
        source: ExtractionError,
    },

    #[error(
        "declarations `{first}` and `{second}` both normalize to `{signature}`; \
         the overloads cannot be told apart"
    )]
    DuplicateSignature {
        signature: String,
        first: String,
        second: String,
    },

    #[error("invalid layout configuration: {0}")]
    Config(String),

    #[error("function spans are inconsistent: {0}")]
    Span(#[from] crate::core::reconstruct::SpanError),
}

/// Non-fatal findings collected during a run
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineWarning {
    NoDeclarationsFound,
    NoDefinitionsFound,
    UnmatchedDefinition { name: String, line: usize },
    AmbiguousDefinition { name: String, line: usize, candidates: usize },
    SkippedDefinition { name: String, line: usize, reason: String },
}

impl std::fmt::Display for EngineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineWarning::NoDeclarationsFound => {
                write!(f, "no function declarations found in header")
            }
            EngineWarning::NoDefinitionsFound => {
                write!(f, "no function implementations found in source")
            }
            EngineWarning::UnmatchedDefinition { name, line } => {
                write!(f, "{name} (line {}) has no header declaration; left in place", line + 1)
            }
            EngineWarning::AmbiguousDefinition { name, line, candidates } => write!(
                f,
                "{name} (line {}) matches {candidates} declarations; left in place",
                line + 1
            ),
            EngineWarning::SkippedDefinition { name, line, reason } => {
                write!(f, "{name} (line {}) skipped: {reason}", line + 1)
            }
        }
    }
}

/// Command-line input problems, reported before any engine work
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("{} is not a header file (expected .{expected})", .path.display())]
    NotAHeader { path: PathBuf, expected: String },

    #[error("{} is not an implementation file (expected .{expected})", .path.display())]
    NotASource { path: PathBuf, expected: String },

    #[error("{} does not exist", .path.display())]
    Missing { path: PathBuf },

    #[error("no implementation file found next to {}", .header.display())]
    NoSibling { header: PathBuf },
}

/// `--check` found files whose functions are out of layout order
#[derive(Debug, thiserror::Error)]
#[error("{count} file(s) not in layout order")]
pub struct CheckFailed {
    pub count: usize,
}
