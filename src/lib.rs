//! **cpplayout** - Reorders C++ function implementations to follow their header
//!
//! Definitions in a `.cpp` file are matched against the declarations in the
//! header, ordered by configurable layout rules (access, static-ness, name
//! patterns) and header position, and moved together with their leading
//! comments. Everything else in the file is kept byte for byte.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Matching & reordering engine plus the commands built on it
pub mod core {
    /// Extractor records, access levels and line spans
    pub mod model;

    /// Error and warning taxonomy
    pub mod error;
    pub use error::{EngineError, EngineWarning, ExtractionError};

    /// Lexical signature canonicalization
    pub mod normalize;
    pub use normalize::normalize;

    /// Header declarations indexed by signature and name
    pub mod decl_table;
    pub use decl_table::DeclarationTable;

    /// Definition -> declaration resolution
    pub mod matcher;
    pub use matcher::match_definition;

    /// Layout rules, order keys and the built-in defaults
    pub mod layout;
    pub use layout::{GapPolicy, LayoutRules};

    /// Comment attribution and block reassembly
    pub mod reconstruct;
    pub use reconstruct::reconstruct;

    /// The five-stage pipeline for one file pair
    pub mod engine;
    pub use engine::{Engine, Outcome};

    /// Character/word/line counts before and after
    pub mod metrics;

    /// `reorder` command
    pub mod reorder;
    pub use reorder::run as reorder_run;

    /// `plan` command (tabled / JSON)
    pub mod plan;
    pub use plan::run as plan_run;

    /// `batch` command (walker + rayon)
    pub mod batch;
    pub use batch::run as batch_run;
}

/// Declaration/definition extractors (tree-sitter and lexical scanner)
pub mod parsers;

/// Infrastructure - Configuration, I/O, logging and utilities
pub mod infra {
    /// Layered configuration with TOML/YAML/JSON and env overrides
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// Memory-mapped reads for large files, atomic writes
    pub mod io;
    pub use io::{FileContent, read_file_smart, write_atomic};

    /// LF/CRLF-aware line table
    pub mod line_index;
    pub use line_index::LineTable;

    /// Gitignore-aware directory walking
    pub mod walk;
    pub use walk::FileWalker;

    /// tracing-subscriber setup
    pub mod logging;

    /// Scoped-name and tree-sitter node helpers
    pub mod utils;
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use core::{batch_run, plan_run, reorder_run};
pub use infra::{Config, FileWalker, load_config};
pub use parsers::{Extractor, ExtractorKind, get_extractor};

// Core types for external consumers
pub use core::{Engine, EngineError, GapPolicy, LayoutRules, Outcome};
