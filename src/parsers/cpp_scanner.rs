//! Lexical C++ extractor.
//!
//! No grammar: comments, literals and preprocessor lines are blanked out
//! (offsets preserved), then a brace-counting walk tracks namespaces,
//! classes and bodies, and classifies each statement by how it ends.
//! Useful when tree-sitter chokes on macro-heavy code.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::core::{
    error::ExtractionError,
    model::{Access, DefinitionScan, LineSpan, RawDeclaration, RawDefinition, SkippedDefinition},
};
use crate::infra::{line_index::LineTable, utils::NameUtils};
use crate::parsers::{
    Extractor, build_qualified_name, clean_qualifiers, compose_signature, effective_return_type,
    has_static,
};

const NAME: &str = "scanner";

static NAMESPACE_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:inline\s+)?namespace\b\s*([\w:\s]*?)\s*$").expect("valid regex")
});

static LINKAGE_HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^extern\s*"[^"]*"\s*$"#).expect("valid regex"));

static CLASS_HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(class|struct|union)\b").expect("valid regex"));

static ACCESS_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(public|protected|private)\s*$").expect("valid regex"));

static DEFAULTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=\s*(?:default|delete)\b").expect("valid regex"));

static ATTRIBUTES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[.*?\]\]|alignas\s*\([^)]*\)|__declspec\s*\([^)]*\)").expect("valid regex")
});

/// Words followed by parentheses that never name a function
const PAREN_KEYWORDS: &[&str] = &[
    "decltype",
    "alignas",
    "alignof",
    "sizeof",
    "__attribute__",
    "__declspec",
    "noexcept",
    "throw",
    "static_assert",
    "if",
    "while",
    "for",
    "switch",
    "return",
    "void",
    "int",
    "char",
    "bool",
    "float",
    "double",
    "long",
    "short",
    "unsigned",
    "signed",
    "auto",
];

/// Statement prefixes that never declare a function
const NON_FUNCTION_PREFIXES: &[&str] = &[
    "typedef",
    "using",
    "friend",
    "static_assert",
    "enum",
    "template class",
    "template struct",
    "extern template",
];

#[derive(Debug, Default)]
pub struct ScannerExtractor;

impl ScannerExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for ScannerExtractor {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extract_declarations(&self, header: &str) -> Result<Vec<RawDeclaration>, ExtractionError> {
        Ok(scan(header)?.declarations)
    }

    fn extract_definitions(&self, source: &str) -> Result<DefinitionScan, ExtractionError> {
        let found = scan(source)?;
        Ok(DefinitionScan {
            definitions: found.definitions,
            skipped: found.skipped,
        })
    }
}

fn malformed(line: usize, message: &str) -> ExtractionError {
    ExtractionError::Malformed {
        extractor: NAME,
        line,
        message: message.to_string(),
    }
}

fn line_at(bytes: &[u8], pos: usize) -> usize {
    memchr::memchr_iter(b'\n', &bytes[..pos.min(bytes.len())]).count()
}

fn is_ident(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Blank comments, literal contents and preprocessor lines, keeping every
/// byte offset and newline in place.
pub fn mask(text: &str) -> Result<String, ExtractionError> {
    let b = text.as_bytes();
    let mut out = b.to_vec();
    let mut i = 0usize;
    let mut line_start = true;

    let blank = |out: &mut Vec<u8>, from: usize, to: usize| {
        for byte in &mut out[from..to] {
            if *byte != b'\n' {
                *byte = b' ';
            }
        }
    };

    while i < b.len() {
        let c = b[i];
        let next = b.get(i + 1).copied();

        match c {
            b'\n' => {
                line_start = true;
                i += 1;
            }

            b'/' if next == Some(b'/') => {
                let end = memchr::memchr(b'\n', &b[i..]).map_or(b.len(), |p| i + p);
                blank(&mut out, i, end);
                i = end;
            }

            b'/' if next == Some(b'*') => {
                let Some(rel) = memchr::memmem::find(&b[i + 2..], b"*/") else {
                    return Err(malformed(line_at(b, i), "unterminated block comment"));
                };
                let end = i + 2 + rel + 2;
                blank(&mut out, i, end);
                i = end;
            }

            b'#' if line_start => {
                // Preprocessor line, including backslash continuations
                let mut end = i;
                loop {
                    match memchr::memchr(b'\n', &b[end..]) {
                        Some(p) => {
                            let nl = end + p;
                            let before = b[..nl].trim_ascii_end();
                            if before.ends_with(b"\\") {
                                end = nl + 1;
                                continue;
                            }
                            end = nl;
                        }
                        None => end = b.len(),
                    }
                    break;
                }
                blank(&mut out, i, end);
                i = end;
            }

            b'"' => {
                line_start = false;
                let end = if raw_string_prefix(b, i) {
                    raw_string_end(b, i).ok_or_else(|| {
                        malformed(line_at(b, i), "unterminated raw string literal")
                    })?
                } else {
                    quoted_end(b, i, b'"')
                        .ok_or_else(|| malformed(line_at(b, i), "unterminated string literal"))?
                };
                blank(&mut out, i + 1, end - 1);
                i = end;
            }

            b'\'' => {
                line_start = false;
                if digit_separator(b, i) {
                    i += 1;
                    continue;
                }
                let end = quoted_end(b, i, b'\'').ok_or_else(|| {
                    malformed(line_at(b, i), "unterminated character literal")
                })?;
                blank(&mut out, i + 1, end - 1);
                i = end;
            }

            _ => {
                if !c.is_ascii_whitespace() {
                    line_start = false;
                }
                i += 1;
            }
        }
    }

    String::from_utf8(out).map_err(|e| malformed(0, &e.to_string()))
}

/// One past the closing quote of a literal opened at `open`
fn quoted_end(b: &[u8], open: usize, quote: u8) -> Option<usize> {
    let mut j = open + 1;
    while j < b.len() {
        match b[j] {
            b'\\' => j += 2,
            b'\n' => return None,
            c if c == quote => return Some(j + 1),
            _ => j += 1,
        }
    }
    None
}

/// `R"`, `u8R"`, `LR"` ... directly before the quote
fn raw_string_prefix(b: &[u8], quote: usize) -> bool {
    if quote == 0 || b[quote - 1] != b'R' {
        return false;
    }
    let mut k = quote - 1;
    while k > 0 && is_ident(b[k - 1]) {
        k -= 1;
    }
    matches!(&b[k..quote], b"R" | b"u8R" | b"uR" | b"UR" | b"LR")
}

/// One past the closing quote of `R"delim( ... )delim"`
fn raw_string_end(b: &[u8], quote: usize) -> Option<usize> {
    let open = quote + 1 + memchr::memchr(b'(', &b[quote + 1..])?;
    let delim = &b[quote + 1..open];
    let mut terminator = Vec::with_capacity(delim.len() + 2);
    terminator.push(b')');
    terminator.extend_from_slice(delim);
    terminator.push(b'"');
    let rel = memchr::memmem::find(&b[open + 1..], &terminator)?;
    Some(open + 1 + rel + terminator.len())
}

/// `1'000'000`: a quote inside a numeric literal
fn digit_separator(b: &[u8], i: usize) -> bool {
    if i == 0 || !b[i - 1].is_ascii_alphanumeric() {
        return false;
    }
    let mut k = i;
    while k > 0 && (is_ident(b[k - 1]) || b[k - 1] == b'\'') {
        k -= 1;
    }
    b[k].is_ascii_digit()
}

/// Skip a balanced group opened at `open`; returns the index of its closer
fn matching_close(b: &[u8], open: usize, open_c: u8, close_c: u8) -> Option<usize> {
    let mut depth = 0usize;
    for (j, &c) in b.iter().enumerate().skip(open) {
        if c == open_c {
            depth += 1;
        } else if c == close_c {
            depth -= 1;
            if depth == 0 {
                return Some(j);
            }
        }
    }
    None
}

/// A function head split at its parameter list
#[derive(Debug, Clone, PartialEq)]
struct Head {
    ret: String,
    name: String,
    params: String,
    after: String,
}

/// Find the parameter list in a statement head (masked text)
fn parse_head(text: &str) -> Option<Head> {
    let b = text.as_bytes();
    let mut angle = 0usize;
    let mut i = 0usize;

    while i < b.len() {
        match b[i] {
            // `operator<`, `operator>>=`: symbols, not brackets
            b'<' | b'>' if ends_with_word(text[..i].trim_end(), "operator") => {
                while i < b.len() && matches!(b[i], b'<' | b'>' | b'=') {
                    i += 1;
                }
            }
            b'<' => {
                angle += 1;
                i += 1;
            }
            b'>' => {
                angle = angle.saturating_sub(1);
                i += 1;
            }
            // `std::function<void(int)>` is a type, not a parameter list
            b'(' if angle > 0 => i = matching_close(b, i, b'(', b')').map_or(b.len(), |c| c + 1),
            b'(' => {
                let close = matching_close(b, i, b'(', b')')?;
                let before = text[..i].trim_end();

                // `operator()` names its own parens
                if ends_with_word(before, "operator") && text[i + 1..close].trim().is_empty() {
                    i = close + 1;
                    continue;
                }

                let Some(start) = name_start(before) else {
                    i = close + 1;
                    continue;
                };
                let name = NameUtils::compact(&before[start..]);
                if name.is_empty() || PAREN_KEYWORDS.contains(&name.as_str()) {
                    i = close + 1;
                    continue;
                }

                return Some(Head {
                    ret: before[..start].trim().to_string(),
                    name,
                    params: text[i + 1..close].trim().to_string(),
                    after: text[close + 1..].to_string(),
                });
            }
            // Attribute brackets never contain the parameter list
            b'[' => i = matching_close(b, i, b'[', b']').map_or(b.len(), |c| c + 1),
            _ => i += 1,
        }
    }
    None
}

fn ends_with_word(text: &str, word: &str) -> bool {
    text.strip_suffix(word)
        .is_some_and(|rest| !rest.bytes().last().is_some_and(is_ident))
}

/// Start of the (possibly qualified) name that ends `before`
fn name_start(before: &str) -> Option<usize> {
    let b = before.as_bytes();

    // Operator names: everything from the keyword on
    if let Some(k) = operator_keyword(before) {
        return Some(qualifier_start(b, k));
    }

    let end = b.len();
    let mut i = end;
    while i > 0 && is_ident(b[i - 1]) {
        i -= 1;
    }
    if i > 0 && b[i - 1] == b'~' {
        i -= 1;
    }
    if i == end || b[i..].first().is_some_and(u8::is_ascii_digit) {
        return None;
    }
    Some(qualifier_start(b, i))
}

/// Last `operator` keyword in `text`, if it starts a token
fn operator_keyword(text: &str) -> Option<usize> {
    let b = text.as_bytes();
    text.match_indices("operator")
        .map(|(k, _)| k)
        .filter(|&k| {
            (k == 0 || !is_ident(b[k - 1])) && !b.get(k + 8).copied().is_some_and(is_ident)
        })
        .last()
}

/// Extend a name starting at `i` backwards over `Scope::` / `Tmpl<..>::` prefixes
fn qualifier_start(b: &[u8], mut i: usize) -> usize {
    loop {
        let mut j = i;
        while j > 0 && b[j - 1].is_ascii_whitespace() {
            j -= 1;
        }
        if j < 2 || &b[j - 2..j] != b"::" {
            return i;
        }
        j -= 2;
        while j > 0 && b[j - 1].is_ascii_whitespace() {
            j -= 1;
        }

        // Template arguments: `Box<T>::get`
        if j > 0 && b[j - 1] == b'>' {
            let mut depth = 0usize;
            let mut k = j;
            while k > 0 {
                k -= 1;
                match b[k] {
                    b'>' => depth += 1,
                    b'<' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
            }
            j = k;
        }

        let seg_end = j;
        while j > 0 && is_ident(b[j - 1]) {
            j -= 1;
        }
        if j == seg_end {
            // Leading `::` (global scope)
            return j;
        }
        i = j;
    }
}

/// Drop a leading `template <...>` header
fn strip_template_prefix(text: &str) -> &str {
    let t = text.trim_start();
    let Some(rest) = t.strip_prefix("template") else {
        return t;
    };
    let rest_trim = rest.trim_start();
    if !rest_trim.starts_with('<') {
        return t;
    }
    let offset = t.len() - rest_trim.len();
    let b = t.as_bytes();
    match matching_close(b, offset, b'<', b'>') {
        Some(close) => strip_template_prefix(&t[close + 1..]),
        None => t,
    }
}

/// Class name from `class [attrs] Name [final] [: bases]`
fn class_name(head: &str) -> Option<String> {
    let head = ATTRIBUTES.replace_all(head, " ");
    let body = CLASS_HEAD.replace(head.trim(), "");
    let b = body.as_bytes();

    // Cut the base clause at the first single ':'
    let mut end = b.len();
    let mut k = 0;
    while k < b.len() {
        if b[k] == b':' {
            if b.get(k + 1) == Some(&b':') {
                k += 2;
                continue;
            }
            end = k;
            break;
        }
        k += 1;
    }

    let decl = body[..end].trim();
    let decl = decl.strip_suffix("final").map_or(decl, str::trim_end);

    // Last token at angle depth 0
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in decl.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            c if c.is_whitespace() && depth == 0 => start = i + 1,
            _ => {}
        }
    }
    let name = NameUtils::compact(&decl[start..]);
    (!name.is_empty()).then_some(name)
}

/// A single-colon `:` after the parameter list (constructor initializers)
fn has_init_list(after: &str) -> bool {
    let b = after.as_bytes();
    let mut k = 0;
    while k < b.len() {
        if b[k] == b':' {
            if b.get(k + 1) == Some(&b':') {
                k += 2;
                continue;
            }
            return true;
        }
        k += 1;
    }
    false
}

/// Top-level `=` outside parentheses (initializers, lambdas)
fn has_assignment(text: &str) -> bool {
    let b = text.as_bytes();
    let mut depth = 0i32;
    for (k, &c) in b.iter().enumerate() {
        match c {
            b'(' | b'[' | b'<' => depth += 1,
            b')' | b']' | b'>' => depth -= 1,
            b'=' if depth <= 0 => {
                let prev = k.checked_sub(1).map(|p| b[p]);
                let next = b.get(k + 1).copied();
                if matches!(prev, Some(b'=' | b'!' | b'<' | b'>')) || next == Some(b'=') {
                    continue;
                }
                // `operator=` is a name
                if text[..k].trim_end().ends_with("operator") {
                    continue;
                }
                return true;
            }
            _ => {}
        }
    }
    false
}

#[derive(Debug)]
struct PendingDefinition {
    head: Head,
    start_line: usize,
    namespaces: Vec<String>,
}

#[derive(Debug)]
enum Scope {
    Namespace(Option<String>),
    Linkage,
    Class { name: String, access: Access },
    /// A function body; `Some` when it is a namespace-scope definition
    Body(Option<PendingDefinition>),
    Other,
}

#[derive(Debug, Default)]
struct ScanOutput {
    declarations: Vec<RawDeclaration>,
    definitions: Vec<RawDefinition>,
    skipped: Vec<SkippedDefinition>,
}

struct Walker<'a> {
    masked: &'a str,
    lines: LineTable<'a>,
    stack: Vec<Scope>,
    out: ScanOutput,
}

fn scan(text: &str) -> Result<ScanOutput, ExtractionError> {
    let masked = mask(text)?;
    let mut walker = Walker {
        masked: &masked,
        lines: LineTable::build(&masked),
        stack: Vec::new(),
        out: ScanOutput::default(),
    };
    walker.run()?;
    Ok(walker.out)
}

impl Walker<'_> {
    fn in_body(&self) -> bool {
        matches!(self.stack.last(), Some(Scope::Body(_) | Scope::Other))
    }

    fn namespace_level(&self) -> bool {
        matches!(
            self.stack.last(),
            None | Some(Scope::Namespace(_) | Scope::Linkage)
        )
    }

    fn namespaces(&self) -> Vec<String> {
        self.stack
            .iter()
            .filter_map(|s| match s {
                Scope::Namespace(Some(n)) => Some(n.clone()),
                _ => None,
            })
            .collect()
    }

    fn classes(&self) -> Vec<String> {
        self.stack
            .iter()
            .filter_map(|s| match s {
                Scope::Class { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    fn run(&mut self) -> Result<(), ExtractionError> {
        let masked = self.masked;
        let b = masked.as_bytes();
        let mut i = 0usize;
        let mut stmt: Option<usize> = None;
        let mut paren = 0i32;

        while i < b.len() {
            let c = b[i];

            if self.in_body() {
                match c {
                    b'{' => self.stack.push(Scope::Other),
                    b'}' => self.close(i)?,
                    _ => {}
                }
                i += 1;
                continue;
            }

            match c {
                b'(' => paren += 1,
                b')' => paren = (paren - 1).max(0),

                b';' if paren == 0 => {
                    if let Some(start) = stmt.take() {
                        self.statement(start, i);
                    }
                }

                b':' if paren == 0 => {
                    let is_scope = b.get(i + 1) == Some(&b':') || (i > 0 && b[i - 1] == b':');
                    if !is_scope
                        && let Some(start) = stmt
                        && let Some(Scope::Class { access, .. }) = self.stack.last_mut()
                        && let Some(cap) = ACCESS_LABEL.captures(&masked[start..i])
                        && let Some(a) = Access::parse(&cap[1])
                    {
                        *access = a;
                        stmt = None;
                    }
                }

                b'{' if paren > 0 => {
                    // Brace initializer inside a default argument
                    i = matching_close(b, i, b'{', b'}').unwrap_or(b.len() - 1);
                }

                b'{' => {
                    let start = stmt.unwrap_or(i);
                    match self.open(start, i) {
                        Opened::Scope(scope) => {
                            self.stack.push(scope);
                            stmt = None;
                        }
                        Opened::BraceInit => {
                            i = matching_close(b, i, b'{', b'}').unwrap_or(b.len() - 1);
                        }
                    }
                }

                b'}' => {
                    self.close(i)?;
                    stmt = None;
                    paren = 0;
                }

                c if c.is_ascii_whitespace() => {}

                _ => {
                    if stmt.is_none() {
                        stmt = Some(i);
                    }
                }
            }
            i += 1;
        }

        // Bodies that never closed
        for scope in std::mem::take(&mut self.stack) {
            if let Scope::Body(Some(pending)) = scope {
                let name = build_qualified_name(
                    &pending
                        .namespaces
                        .iter()
                        .map(String::as_str)
                        .chain([pending.head.name.as_str()])
                        .collect::<Vec<_>>(),
                );
                self.out.skipped.push(SkippedDefinition {
                    name,
                    line: pending.start_line,
                    reason: "function body is not terminated".into(),
                });
            }
        }
        Ok(())
    }

    /// Classify the statement ending in `{` at `brace`
    fn open(&self, start: usize, brace: usize) -> Opened {
        let head = self.masked[start..brace].trim();

        if let Some(cap) = NAMESPACE_HEAD.captures(head) {
            let name = NameUtils::compact(&cap[1]);
            return Opened::Scope(Scope::Namespace((!name.is_empty()).then_some(name)));
        }
        if LINKAGE_HEAD.is_match(head) {
            return Opened::Scope(Scope::Linkage);
        }

        let unprefixed = strip_template_prefix(head);
        let no_attrs = ATTRIBUTES.replace_all(unprefixed, " ");
        if CLASS_HEAD.is_match(no_attrs.trim()) && !no_attrs.contains('(') {
            return match class_name(unprefixed) {
                Some(name) => {
                    let access = if no_attrs.trim_start().starts_with("class") {
                        Access::Private
                    } else {
                        Access::Public
                    };
                    Opened::Scope(Scope::Class { name, access })
                }
                None => Opened::Scope(Scope::Other),
            };
        }

        let Some(parsed) = parse_head(unprefixed) else {
            return Opened::Scope(Scope::Other);
        };
        if has_assignment(&parsed.ret) || !self.plausible(&parsed) {
            return Opened::Scope(Scope::Other);
        }

        // `X::X() : a_{1}, b_{2} {`: only the last brace opens the body
        if has_init_list(&parsed.after) {
            let before = self.masked[..brace].trim_end();
            if before
                .bytes()
                .last()
                .is_some_and(|c| is_ident(c) || c == b'>')
            {
                return Opened::BraceInit;
            }
        }

        if !self.namespace_level() {
            // Inline member function
            return Opened::Scope(Scope::Body(None));
        }

        let start_line = self.lines.line_of_byte(start);
        Opened::Scope(Scope::Body(Some(PendingDefinition {
            head: parsed,
            start_line,
            namespaces: self.namespaces(),
        })))
    }

    /// Constructors, destructors and conversions have no return type;
    /// anything else without one is a macro invocation
    fn plausible(&self, head: &Head) -> bool {
        if !head.ret.is_empty() {
            return true;
        }
        let segments = NameUtils::split_scope(&head.name);
        let simple = segments.last().map(String::as_str).unwrap_or_default();
        if simple.starts_with("operator") {
            return true;
        }
        let owner = match segments.len() {
            0 | 1 => self.classes().last().map(|c| NameUtils::simple_name(c)),
            n => Some(segments[n - 2].clone()),
        };
        owner.is_some_and(|o| {
            let base = o.split('<').next().unwrap_or(&o).to_string();
            simple.trim_start_matches('~') == base
        })
    }

    fn close(&mut self, at: usize) -> Result<(), ExtractionError> {
        let Some(scope) = self.stack.pop() else {
            return Err(malformed(self.lines.line_of_byte(at), "unbalanced '}'"));
        };

        if let Scope::Body(Some(pending)) = scope {
            let end_line = self.lines.line_of_byte(at);
            self.push_definition(
                &pending.head,
                &pending.namespaces,
                LineSpan::new(pending.start_line, end_line),
            );
        }
        Ok(())
    }

    fn push_definition(&mut self, head: &Head, namespaces: &[String], span: LineSpan) {
        let mut scope: Vec<&str> = namespaces.iter().map(String::as_str).collect();
        scope.push(&head.name);
        let qualified_name = build_qualified_name(&scope);

        let signature = compose_signature(
            &effective_return_type(&head.ret, &head.after),
            &qualified_name,
            &head.params,
            &clean_qualifiers(&definition_tail(&head.after)),
        );

        trace!(%signature, "definition");
        self.out.definitions.push(RawDefinition {
            simple_name: NameUtils::simple_name(&head.name),
            qualified_name,
            signature,
            span,
        });
    }

    /// Statement ending in `;` outside bodies: maybe a declaration
    fn statement(&mut self, start: usize, end: usize) {
        let text = self.masked[start..end].trim();
        let text = strip_template_prefix(text);

        if NON_FUNCTION_PREFIXES.iter().any(|p| text.starts_with(p)) {
            return;
        }
        let Some(head) = parse_head(text) else {
            return;
        };
        if has_assignment(&head.ret) || !self.plausible(&head) {
            return;
        }
        if DEFAULTED.is_match(&head.after) {
            // `X::X() = default;` outside the class defines it without a body
            if self.namespace_level() {
                let namespaces = self.namespaces();
                let span = LineSpan::new(self.lines.line_of_byte(start), self.lines.line_of_byte(end));
                self.push_definition(&head, &namespaces, span);
            }
            return;
        }
        // `void (*fp)(int)` and similar
        if head.name.contains('(') && !head.name.contains("operator") {
            return;
        }

        let namespaces = self.namespaces();
        let classes = self.classes();
        let access = self
            .stack
            .iter()
            .rev()
            .find_map(|s| match s {
                Scope::Class { access, .. } => Some(*access),
                _ => None,
            })
            .unwrap_or_default();

        let written = NameUtils::split_scope(&head.name);
        let owning_class = match classes.last() {
            Some(class) => Some(NameUtils::simple_name(class)),
            None if written.len() >= 2 => Some(written[written.len() - 2].clone()),
            None => None,
        };

        let mut scope: Vec<&str> = namespaces.iter().map(String::as_str).collect();
        scope.extend(classes.iter().map(String::as_str));
        scope.push(&head.name);
        let qualified_name = build_qualified_name(&scope);

        let signature = compose_signature(
            &effective_return_type(&head.ret, &head.after),
            &qualified_name,
            &head.params,
            &clean_qualifiers(&head.after),
        );

        self.out.declarations.push(RawDeclaration {
            simple_name: written.last().cloned().unwrap_or_default(),
            qualified_name,
            signature,
            access,
            is_static: has_static(&head.ret),
            owning_class,
            namespace_path: (!namespaces.is_empty()).then(|| namespaces.join("::")),
            line: self.lines.line_of_byte(start),
        });
    }
}

/// Qualifier text of a definition head, without the initializer list
fn definition_tail(after: &str) -> String {
    let b = after.as_bytes();
    let mut k = 0;
    while k < b.len() {
        if b[k] == b':' {
            if b.get(k + 1) == Some(&b':') {
                k += 2;
                continue;
            }
            return after[..k].to_string();
        }
        k += 1;
    }
    after.to_string()
}

enum Opened {
    Scope(Scope),
    BraceInit,
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = r#"#pragma once
// widget.h
namespace ui {
class Widget : public Base {
    Q_OBJECT
public:
    Widget();
    ~Widget();
    static Widget* make(const char* name = "a;b{");
    bool operator==(const Widget& other) const;
    int operator()(int) const;
    Widget(const Widget&) = delete;
    void inline_fn() { if (x) { y(); } }
protected:
    virtual int compute(int a, int b = 2) const = 0;
private:
    int count_ : 4;
    void reset();
};
void helper(int x);
}
"#;

    const SOURCE: &str = r#"#include "widget.h"
#define BRACE {

namespace ui {

/* Builds
   a widget */
Widget::Widget() : a_{1}, b_{2, 3} {
    const char* s = "}";
}

Widget::~Widget() {}

bool Widget::operator==(const Widget& other) const {
    return count_ == other.count_;
}

TEST(Widget, Works) {
}

template <typename T>
T twice(T v) {
    return v + v;
}

}

int Widget::compute(int a, int b) const
{
    auto l = [](int x) { return x; };
    return l(a) + b + 1'000;
}
"#;

    #[test]
    fn mask_blanks_comments_strings_and_directives() {
        let input = "#define X {\nint a = '{'; // }\nconst char* s = \"}\";\n";
        let m = mask(input).unwrap();
        assert!(!m.contains('{'));
        assert!(!m.contains('}'));
        assert_eq!(m.len(), input.len());
        assert_eq!(m.lines().count(), 3);
        assert!(mask("/* open").is_err());
        assert!(mask("const char* s = \"open\n;").is_err());
        assert_eq!(mask("int n = 1'000;").unwrap(), "int n = 1'000;");
        assert_eq!(
            mask(r#"auto r = R"x(a)"b)x";"#).unwrap(),
            format!("auto r = R\"{}\";", " ".repeat(8))
        );
    }

    #[test]
    fn parse_head_shapes() {
        let h = parse_head("static Widget* Widget::make(const char* n = \"\")").unwrap();
        assert_eq!(h.ret, "static Widget*");
        assert_eq!(h.name, "Widget::make");
        assert_eq!(h.params, "const char* n = \"\"");

        let h = parse_head("int Less::operator()(int a) const").unwrap();
        assert_eq!(h.name, "Less::operator()");
        assert_eq!(h.params, "int a");
        assert_eq!(h.after, " const");

        let h = parse_head("[[nodiscard]] Box<T>::Iter Box<T>::begin()").unwrap();
        assert_eq!(h.name, "Box<T>::begin");

        let h = parse_head("Widget::operator bool() const").unwrap();
        assert_eq!(h.name, "Widget::operator bool");

        let h = parse_head("std::function<void(int)> W::handler() const").unwrap();
        assert_eq!(h.ret, "std::function<void(int)>");
        assert_eq!(h.name, "W::handler");
        assert_eq!(h.params, "");

        let h = parse_head("bool Key::operator<(const Key& o) const").unwrap();
        assert_eq!(h.name, "Key::operator<");
        assert_eq!(h.params, "const Key& o");

        assert!(parse_head("int count").is_none());
    }

    #[test]
    fn header_declarations() {
        let decls = ScannerExtractor::new().extract_declarations(HEADER).unwrap();
        let names: Vec<_> = decls.iter().map(|d| d.qualified_name.as_str()).collect();
        assert_eq!(
            names,
            [
                "ui::Widget::Widget",
                "ui::Widget::~Widget",
                "ui::Widget::make",
                "ui::Widget::operator==",
                "ui::Widget::operator()",
                "ui::Widget::compute",
                "ui::Widget::reset",
                "ui::helper",
            ]
        );

        let find = |q: &str| decls.iter().find(|d| d.qualified_name == q).unwrap();
        assert_eq!(find("ui::Widget::Widget").access, Access::Public);
        assert_eq!(find("ui::Widget::compute").access, Access::Protected);
        assert_eq!(find("ui::Widget::reset").access, Access::Private);
        assert_eq!(find("ui::helper").access, Access::None);
        assert!(find("ui::Widget::make").is_static);
        assert_eq!(find("ui::Widget::make").signature, "Widget* ui::Widget::make(const char* name = \"    \")");
        assert_eq!(find("ui::Widget::compute").signature, "int ui::Widget::compute(int a, int b = 2) const");
        assert_eq!(find("ui::Widget::reset").line, 17);
    }

    #[test]
    fn source_definitions() {
        let scan = ScannerExtractor::new().extract_definitions(SOURCE).unwrap();
        let got: Vec<_> = scan
            .definitions
            .iter()
            .map(|d| (d.qualified_name.as_str(), d.span.start, d.span.end))
            .collect();
        assert_eq!(
            got,
            [
                ("ui::Widget::Widget", 7, 9),
                ("ui::Widget::~Widget", 11, 11),
                ("ui::Widget::operator==", 13, 15),
                ("ui::twice", 20, 23),
                ("Widget::compute", 27, 31),
            ]
        );
        assert_eq!(scan.definitions[0].signature, "ui::Widget::Widget()");
        assert_eq!(scan.definitions[4].signature, "int Widget::compute(int a, int b) const");
    }

    #[test]
    fn defaulted_definitions_outside_classes() {
        let source = "namespace ui {\n\nWidget::Widget() = default;\n\nclass Local {\n    Local() = default;\n};\n\nvoid Widget::draw() {\n}\n\n}\n";
        let scan = ScannerExtractor::new().extract_definitions(source).unwrap();
        let got: Vec<_> = scan
            .definitions
            .iter()
            .map(|d| (d.qualified_name.as_str(), d.span.start, d.span.end))
            .collect();
        assert_eq!(got, [("ui::Widget::Widget", 2, 2), ("ui::Widget::draw", 8, 9)]);
        assert_eq!(scan.definitions[0].signature, "ui::Widget::Widget()");
    }

    #[test]
    fn unbalanced_input() {
        let err = ScannerExtractor::new()
            .extract_definitions("void f() {}\n}\n")
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Malformed { line: 1, .. }));

        let scan = ScannerExtractor::new()
            .extract_definitions("void ok() {}\nvoid open() {\n  if (x) {\n")
            .unwrap();
        assert_eq!(scan.definitions.len(), 1);
        assert_eq!(scan.skipped.len(), 1);
        assert_eq!(scan.skipped[0].name, "open");
        assert_eq!(scan.skipped[0].line, 1);
    }
}
