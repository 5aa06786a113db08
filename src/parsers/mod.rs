//! Declaration/definition extractors.
//!
//! Two interchangeable strategies sit behind [`Extractor`]: a tree-sitter
//! AST walk and a lexical brace-counting scanner. The engine only sees the
//! records they produce.

pub mod cpp_parser;
pub mod cpp_scanner;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::{
    error::ExtractionError,
    model::{DefinitionScan, RawDeclaration},
};

pub use cpp_parser::TreeSitterExtractor;
pub use cpp_scanner::ScannerExtractor;

/// Available extraction strategies
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractorKind {
    /// Full C++ grammar via tree-sitter
    #[default]
    TreeSitter,
    /// Comment/string-aware brace counting
    Scanner,
}

pub trait Extractor: Send + Sync {
    /// Short name used in errors and logs
    fn name(&self) -> &'static str;

    /// Function prototypes in header traversal order
    fn extract_declarations(&self, header: &str) -> Result<Vec<RawDeclaration>, ExtractionError>;

    /// Function bodies outside class bodies, in file order
    fn extract_definitions(&self, source: &str) -> Result<DefinitionScan, ExtractionError>;
}

// Simple extractor registry
pub fn get_extractor(kind: ExtractorKind) -> Result<Box<dyn Extractor>, ExtractionError> {
    match kind {
        ExtractorKind::TreeSitter => Ok(Box::new(TreeSitterExtractor::new()?)),
        ExtractorKind::Scanner => Ok(Box::new(ScannerExtractor::new())),
    }
}

/// Specifiers that never belong to a signature
pub const NON_TYPE_SPECIFIERS: &[&str] = &[
    "static",
    "virtual",
    "inline",
    "explicit",
    "extern",
    "friend",
    "constexpr",
    "consteval",
    "constinit",
    "mutable",
    "register",
    "thread_local",
];

static ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[.*?\]\]|__attribute__\s*\(\(.*?\)\)").expect("valid regex"));

static EXPLICIT_BOOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bexplicit\s*\([^)]*\)").expect("valid regex"));

static EXCEPTION_SPEC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:noexcept|throw)\s*(?:\([^)]*\))?").expect("valid regex"));

static METHOD_QUALIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bconst\b|\bvolatile\b|&&|&").expect("valid regex"));

static WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Return type with specifiers and attributes removed
pub fn clean_return_type(text: &str) -> String {
    let text = ATTRIBUTE.replace_all(text, " ");
    let text = EXPLICIT_BOOL.replace_all(&text, " ");
    let kept: Vec<&str> = WS
        .split(text.trim())
        .filter(|t| !t.is_empty() && !NON_TYPE_SPECIFIERS.contains(t))
        .collect();
    kept.join(" ")
}

/// True when the specifier text carries `static`
pub fn has_static(text: &str) -> bool {
    WS.split(text).any(|t| t == "static")
}

/// Keep only cv/ref method qualifiers from the text after the parameter list
pub fn clean_qualifiers(text: &str) -> String {
    let text = EXCEPTION_SPEC.replace_all(text, " ");
    let text = ATTRIBUTE.replace_all(&text, " ");
    // `-> T` and `= 0` are not part of the qualifier set
    let cut = [text.find("->"), text.find('=')]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(text.len());
    METHOD_QUALIFIER
        .find_iter(&text[..cut])
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trailing return type (`-> T`) from the text after the parameter list
pub fn trailing_return(text: &str) -> Option<String> {
    let start = text.find("->")? + 2;
    let rest = &text[start..];
    let end = [rest.find('='), rest.find('{'), rest.find(';')]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(rest.len());
    let ret = EXCEPTION_SPEC.replace_all(rest[..end].trim(), "");
    let ret = ret
        .trim()
        .trim_end_matches("override")
        .trim_end_matches("final")
        .trim();
    (!ret.is_empty()).then(|| ret.to_string())
}

/// `"{ret} {qualified}({params}){quals}"`, `ret` omitted when empty
pub fn compose_signature(ret: &str, qualified: &str, params: &str, quals: &str) -> String {
    let head = if ret.is_empty() {
        qualified.to_string()
    } else {
        format!("{ret} {qualified}")
    };
    if quals.is_empty() {
        format!("{head}({params})")
    } else {
        format!("{head}({params}) {quals}")
    }
}

/// Join non-empty scope parts with `::`
pub fn build_qualified_name(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("::")
}

/// Pick the return type, honoring `auto f() -> T`
pub fn effective_return_type(leading: &str, after_params: &str) -> String {
    let leading = clean_return_type(leading);
    match trailing_return(after_params) {
        Some(t) if leading == "auto" || leading.is_empty() => t,
        _ => leading,
    }
}
