//! Records exchanged between the extractors and the reordering engine.
//!
//! Extractors emit the `Raw*` records. The engine turns them into
//! `DeclarationRecord`s (indexed, normalized) and `DefinitionRecord`s
//! (comment-extended, matched) for a single run.

use serde::{Deserialize, Serialize};

/// C++ access level of a declaration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Public,
    Protected,
    Private,
    /// Free functions and anything outside a class body
    #[default]
    None,
}

impl Access {
    /// Parse an access keyword, tolerating a trailing ':'
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().trim_end_matches(':').trim() {
            "public" => Some(Access::Public),
            "protected" => Some(Access::Protected),
            "private" => Some(Access::Private),
            "none" => Some(Access::None),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Public => "public",
            Access::Protected => "protected",
            Access::Private => "private",
            Access::None => "none",
        }
    }
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive, 0-based line range
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn overlaps(&self, other: &LineSpan) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl std::fmt::Display for LineSpan {
    // 1-based for humans
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start + 1, self.end + 1)
    }
}

/// A header prototype as reported by an extractor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawDeclaration {
    /// Unqualified function name (`f`, `~Widget`, `operator==`)
    pub simple_name: String,

    /// Namespace + class + name joined with `::`
    pub qualified_name: String,

    /// Unnormalized signature: `ret qualified(params)quals`
    pub signature: String,

    pub access: Access,

    pub is_static: bool,

    pub owning_class: Option<String>,

    /// Enclosing namespaces joined with `::`
    pub namespace_path: Option<String>,

    /// 0-based line where the declaration starts
    pub line: usize,
}

/// A function body as reported by an extractor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawDefinition {
    pub simple_name: String,

    /// Name as written plus enclosing namespaces
    pub qualified_name: String,

    pub signature: String,

    /// Lines of the definition proper, without leading comments
    pub span: LineSpan,
}

/// A definition the extractor saw but could not delimit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedDefinition {
    pub name: String,
    pub line: usize,
    pub reason: String,
}

/// Everything an extractor found in an implementation file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DefinitionScan {
    pub definitions: Vec<RawDefinition>,
    pub skipped: Vec<SkippedDefinition>,
}

/// Indexed, normalized header declaration (immutable once built)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeclarationRecord {
    pub simple_name: String,
    pub qualified_name: String,
    pub normalized_signature: String,
    pub access: Access,
    pub is_static: bool,
    pub owning_class: Option<String>,
    pub namespace_path: Option<String>,
    pub header_order_index: usize,
}

impl DeclarationRecord {
    /// Constructor/destructor-shaped: the name equals the owning class,
    /// optionally prefixed with `~`
    pub fn is_special_member(&self) -> bool {
        match &self.owning_class {
            Some(class) => {
                let base = class.split('<').next().unwrap_or(class);
                let name = self.simple_name.trim_start_matches('~');
                name == base
            }
            None => false,
        }
    }
}

/// Implementation-file function body with its attached leading comments
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefinitionRecord {
    pub qualified_name: String,
    pub normalized_signature: String,

    /// Extended span: leading comment/blank run plus the body
    pub span: LineSpan,

    /// First line of the definition proper
    pub body_start: usize,

    /// Verbatim text of `span`, terminators included
    pub raw_text: String,

    pub matched_declaration: Option<DeclarationRecord>,
}
