//! Signature normalization.
//!
//! Declarations and definitions spell the same callable differently:
//! `void draw(const Canvas &c) const;` in the header versus
//! `void Widget::draw(Canvas& canvas) const {` in the source. `normalize`
//! maps both spellings to one canonical string. It is purely lexical: no
//! typedef or macro resolution, and two overloads that differ only in
//! stripped tokens collapse onto the same string (the declaration table
//! reports that instead of guessing).
//!
//! Canonical form: `ret qualified::name(type,type)quals` with
//! - no whitespace next to `::`, parens, commas, brackets or angle brackets,
//! - pointer/reference runs glued to the type and followed by one space,
//! - `const`/`volatile` removed from the return type and parameters,
//! - parameter names and default arguments removed.

use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;

static PUNCT_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(::|[(),])\s*").expect("valid regex"));

static TIDY_PUNCT_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(::|[(),<>\[\]])\s*").expect("valid regex"));

static PTR_REF_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([*&]+)\s*").expect("valid regex"));

static MULTI_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static CV_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:const|volatile)\b").expect("valid regex"));

/// Builtin type keywords: a trailing one of these is never a parameter name
const TYPE_KEYWORDS: &[&str] = &[
    "void", "bool", "char", "wchar_t", "char8_t", "char16_t", "char32_t", "short", "int", "long",
    "float", "double", "signed", "unsigned", "auto",
];

/// Keywords that make the following identifier part of the type
const ELABORATED: &[&str] = &["struct", "class", "enum", "union", "typename"];

/// Head tokens whose parenthesized group is not the parameter list
const PAREN_PREFIXES: &[&str] = &["decltype", "alignas", "__attribute__", "__declspec"];

/// Canonicalize a raw signature. Idempotent.
pub fn normalize(raw: &str) -> String {
    // Step 1: whitespace next to `::`, `(`, `)`, `,`
    let collapsed = PUNCT_WS.replace_all(raw.trim(), "$1");

    let Some(parts) = SignatureParts::split(&collapsed) else {
        return tidy(&strip_cv(&collapsed));
    };

    // Step 2 on the return type and name
    let head = tidy(&strip_cv(parts.head));

    // Steps 2-4 on every parameter
    let params = normalized_parameters(parts.params);

    // Trailing cv/ref qualifiers belong to the method, not its return type
    let tail = tidy(parts.tail);

    format!("{head}({}){tail}", params.join(","))
}

/// Canonicalize one parameter: cv-qualifiers, name and default removed.
pub fn normalize_parameter(param: &str) -> String {
    // The type/name shape is judged on the text before `= expr`; the
    // default clause itself is dropped
    let (declarator, _default) = split_default(param);
    let without_cv = strip_cv(declarator);
    let unnamed = strip_parameter_name(&without_cv);
    tidy(&unnamed)
}

/// Parameter types of a signature, normalized, in order.
pub fn parameter_types(signature: &str) -> Vec<String> {
    let collapsed = PUNCT_WS.replace_all(signature.trim(), "$1");
    match SignatureParts::split(&collapsed) {
        Some(parts) => normalized_parameters(parts.params),
        None => Vec::new(),
    }
}

/// Trailing method qualifiers (`const`, `&&`, ...) of a signature, normalized.
pub fn trailing_qualifiers(signature: &str) -> String {
    let collapsed = PUNCT_WS.replace_all(signature.trim(), "$1");
    match SignatureParts::split(&collapsed) {
        Some(parts) => tidy(parts.tail),
        None => String::new(),
    }
}

fn normalized_parameters(list: &str) -> Vec<String> {
    let params: Vec<String> = split_top_level(list, ',')
        .into_iter()
        .map(normalize_parameter)
        .filter(|p| !p.is_empty())
        .collect();

    // `f(void)` is `f()`
    if params.len() == 1 && params[0] == "void" {
        return Vec::new();
    }
    params
}

/// Return type + name, parameter list contents, trailing qualifiers
struct SignatureParts<'a> {
    head: &'a str,
    params: &'a str,
    tail: &'a str,
}

impl<'a> SignatureParts<'a> {
    /// The parameter list is the first `(` outside template arguments that
    /// is not an `operator()` name or a `decltype`-like group.
    fn split(sig: &'a str) -> Option<Self> {
        let bytes = sig.as_bytes();
        let mut angle = 0usize;
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                // `operator<`, `operator>>=`: symbols, not brackets
                b'<' | b'>' if ends_with_word(sig[..i].trim_end(), "operator") => {
                    while i < bytes.len() && matches!(bytes[i], b'<' | b'>' | b'=') {
                        i += 1;
                    }
                    continue;
                }
                b'<' => angle += 1,
                b'>' => angle = angle.saturating_sub(1),
                b'(' => {
                    let close = matching_paren(sig, i)?;
                    let before = sig[..i].trim_end();

                    // `std::function<void(int)>` in the return type
                    if angle > 0 {
                        i = close + 1;
                        continue;
                    }

                    // `operator()` names its own parens
                    if before.ends_with("operator") && close == i + 1 {
                        i = close + 1;
                        continue;
                    }

                    if PAREN_PREFIXES
                        .iter()
                        .any(|p| ends_with_word(before, p))
                    {
                        i = close + 1;
                        continue;
                    }

                    return Some(Self {
                        head: &sig[..i],
                        params: &sig[i + 1..close],
                        tail: &sig[close + 1..],
                    });
                }
                _ => {}
            }
            i += 1;
        }
        None
    }
}

fn ends_with_word(text: &str, word: &str) -> bool {
    text.strip_suffix(word).is_some_and(|rest| {
        !rest
            .chars()
            .last()
            .is_some_and(is_ident_char)
    })
}

/// Index of the ')' closing the '(' at `open`
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in text.bytes().enumerate().skip(open) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on `sep` outside brackets and quotes
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => depth = (depth - 1).max(0),
            _ if c == sep && depth == 0 => {
                out.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    out.push(&text[start..]);
    out
}

/// Split `type name = expr` at the top-level `=`
fn split_default(param: &str) -> (&str, Option<&str>) {
    let bytes = param.as_bytes();
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' | b'[' | b'{' | b'<' => depth += 1,
            b')' | b']' | b'}' | b'>' => depth = (depth - 1).max(0),
            b'=' if depth == 0 => {
                let prev = i.checked_sub(1).map(|p| bytes[p]);
                let next = bytes.get(i + 1).copied();
                // Skip comparison operators
                if matches!(prev, Some(b'=' | b'!' | b'<' | b'>')) || next == Some(b'=') {
                    continue;
                }
                return (&param[..i], Some(&param[i + 1..]));
            }
            _ => {}
        }
    }
    (param, None)
}

fn strip_cv(text: &str) -> String {
    CV_TOKEN.replace_all(text, " ").into_owned()
}

/// Drop trailing parameter names, keeping array suffixes: `int v[3]` -> `int[3]`
fn strip_parameter_name(param: &str) -> String {
    let param = param.trim();
    let (core, arrays) = split_array_suffix(param);
    let mut core = core.trim_end().to_string();

    while let Some(cut) = parameter_name_start(&core) {
        core.truncate(cut);
        let trimmed = core.trim_end().len();
        core.truncate(trimmed);
    }

    format!("{core}{arrays}")
}

/// Split trailing `[..]` groups off a parameter
fn split_array_suffix(param: &str) -> (&str, &str) {
    let mut end = param.len();
    loop {
        let head = param[..end].trim_end();
        if !head.ends_with(']') {
            break;
        }
        match head.rfind('[') {
            Some(open) => end = open,
            None => break,
        }
    }
    (&param[..end], &param[end..])
}

/// Byte offset where a trailing parameter name starts, if there is one
fn parameter_name_start(text: &str) -> Option<usize> {
    let start = text
        .char_indices()
        .rev()
        .take_while(|&(_, c)| is_ident_char(c))
        .last()
        .map(|(i, _)| i)?;

    let ident = &text[start..];
    if ident
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit())
    {
        return None;
    }
    if TYPE_KEYWORDS.contains(&ident) {
        return None;
    }

    let before = &text[..start];
    // `std::string`, `~Foo`: the identifier is part of a name
    if before.ends_with(':') || before.ends_with('~') {
        return None;
    }

    let rest = before.trim_end();
    let last = rest.chars().last()?;
    if is_ident_char(last) {
        // Whitespace-separated token pair: `Type name`
        let prev_word = rest
            .rsplit(|c: char| !is_ident_char(c))
            .next()
            .unwrap_or_default();
        if ELABORATED.contains(&prev_word) {
            return None;
        }
        return Some(start);
    }

    matches!(last, '*' | '&' | '>' | '.').then_some(start)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Canonical spacing
fn tidy(text: &str) -> String {
    let single = MULTI_WS.replace_all(text, " ");
    let ptr = PTR_REF_WS.replace_all(&single, "$1 ");
    let punct = TIDY_PUNCT_WS.replace_all(&ptr, "$1");
    punct
        .split(' ')
        .filter(|s| !s.is_empty())
        .join(" ")
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn cv_and_parameter_names_are_ignored() {
        assert_eq!(normalize("void f(const int x)"), normalize("void f(int)"));
        assert_eq!(normalize("void f(const int x)"), "void f(int)");
    }

    #[test]
    fn defaults_and_spacing_are_ignored() {
        assert_eq!(
            normalize("int g ( std::string s = \"x\" )"),
            normalize("int g(std::string)")
        );
        assert_eq!(normalize("int g(std::string)"), "int g(std::string)");
    }

    #[test]
    fn pointer_and_reference_spellings_agree() {
        let a = normalize("const Canvas & Widget::canvas(const Canvas &c, char *buf) const");
        let b = normalize("Canvas& Widget::canvas(Canvas& other, char* b)const");
        assert_eq!(a, b);
        assert_eq!(a, "Canvas& Widget::canvas(Canvas&,char*)const");
    }

    #[test]
    fn keyword_types_keep_their_last_token() {
        assert_eq!(normalize_parameter("unsigned int"), "unsigned int");
        assert_eq!(normalize_parameter("unsigned long long count"), "unsigned long long");
        assert_eq!(normalize_parameter("struct stat"), "struct stat");
        assert_eq!(normalize_parameter("Foo"), "Foo");
        assert_eq!(normalize_parameter("std::size_t"), "std::size_t");
    }

    #[test]
    fn templates_arrays_and_packs() {
        assert_eq!(
            normalize_parameter("const std::map<int, std::string> & table"),
            "std::map<int,std::string>&"
        );
        assert_eq!(normalize_parameter("int values[3]"), "int[3]");
        assert_eq!(normalize_parameter("Args&&... args"), "Args&&...");
        assert_eq!(normalize_parameter("int flags = A | B"), "int");
        assert_eq!(normalize_parameter("Point origin = Point(0, 0)"), "Point");
    }

    #[test]
    fn void_parameter_list_is_empty() {
        assert_eq!(normalize("void reset(void)"), normalize("void reset()"));
    }

    #[test]
    fn call_operator_and_decltype_heads() {
        assert_eq!(
            normalize("bool Less::operator()(const Key& a, const Key& b) const"),
            "bool Less::operator()(Key&,Key&)const"
        );
        assert_eq!(
            normalize("decltype(auto) get(int i)"),
            "decltype(auto) get(int)"
        );
    }

    #[test]
    fn function_types_in_template_arguments_are_not_parameters() {
        let sig = "std::function<void(int)> ui::W::handler() const";
        assert!(parameter_types(sig).is_empty());
        assert_eq!(trailing_qualifiers(sig), "const");
        assert_eq!(
            parameter_types("std::map<int, void(*)(char)> build(int n, bool b)"),
            vec!["int", "bool"]
        );
        assert_eq!(normalize(sig), normalize(&normalize(sig)));
    }

    #[test]
    fn comparison_operators_are_not_brackets() {
        assert_eq!(parameter_types("bool Key::operator<(const Key& o) const"), vec!["Key&"]);
        assert_eq!(
            parameter_types("bool operator>=(const Key& a, const Key& b)"),
            vec!["Key&", "Key&"]
        );
        assert_eq!(
            trailing_qualifiers("std::ostream& operator<<(std::ostream& os, int v)"),
            ""
        );
    }

    #[test]
    fn method_qualifiers_are_kept() {
        assert_ne!(normalize("int X::size() const"), normalize("int X::size()"));
        assert_eq!(trailing_qualifiers("int X::size() const"), "const");
        assert_eq!(parameter_types("void f(int a, char* b = nullptr)"), vec!["int", "char*"]);
    }

    #[test]
    fn substrings_of_const_survive() {
        assert_eq!(
            normalize("void f(const_iterator it, constexpr_t c)"),
            "void f(const_iterator,constexpr_t)"
        );
    }

    fn param_strategy() -> impl Strategy<Value = String> {
        (
            prop::sample::select(vec!["", "const ", "volatile "]),
            prop::sample::select(vec![
                "int",
                "unsigned int",
                "std::string",
                "Foo",
                "std::vector<int>",
                "char",
                "struct stat",
            ]),
            prop::sample::select(vec!["", "*", "&", " * ", "&&", " const*"]),
            prop::sample::select(vec!["", " x", " value", " _n2"]),
            prop::sample::select(vec!["", " = 0", " = \"a, b\"", " = Foo(1, 2)"]),
        )
            .prop_map(|(cv, ty, ptr, name, def)| format!("{cv}{ty}{ptr}{name}{def}"))
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(
            ret in prop::sample::select(vec!["void", "const int", "Foo*", "std::string &"]),
            name in prop::sample::select(vec!["f", "X::g", "ns::X::~X", "operator==", "X::operator()"]),
            params in prop::collection::vec(param_strategy(), 0..4),
            tail in prop::sample::select(vec!["", " const", " &&", "const &"]),
        ) {
            let raw = format!("{ret} {name} ( {} ){tail}", params.join(" , "));
            let once = normalize(&raw);
            prop_assert_eq!(normalize(&once), once.clone());
        }

        #[test]
        fn parameter_names_never_matter(p in param_strategy()) {
            let renamed = format!("void f({p})");
            let bare = format!("void f({})", normalize_parameter(&p));
            prop_assert_eq!(normalize(&renamed), normalize(&bare));
        }
    }
}
