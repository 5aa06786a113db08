//! Tree-sitter based C++ extractor.

use tracing::{debug, trace};
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, StreamingIterator, Tree};

use crate::core::{
    error::ExtractionError,
    model::{Access, DefinitionScan, LineSpan, RawDeclaration, RawDefinition, SkippedDefinition},
};
use crate::infra::utils::{NameUtils, TsNodeUtils};
use crate::parsers::{
    Extractor, build_qualified_name, clean_qualifiers, compose_signature, effective_return_type,
    has_static,
};

const NAME: &str = "tree-sitter";

/// Nodes a function definition may not sit inside to count as out-of-class
const NESTING_KINDS: &[&str] = &[
    "function_definition",
    "class_specifier",
    "struct_specifier",
    "union_specifier",
];

pub struct TreeSitterExtractor {
    language: Language,
    // Captures every function definition; nesting is filtered afterwards.
    definitions_query: Query,
}

impl TreeSitterExtractor {
    pub fn new() -> Result<Self, ExtractionError> {
        let language: Language = tree_sitter_cpp::LANGUAGE.into();

        let definitions_query =
            Query::new(&language, "(function_definition) @definition").map_err(|e| {
                ExtractionError::Setup {
                    extractor: NAME,
                    message: e.to_string(),
                }
            })?;

        Ok(Self {
            language,
            definitions_query,
        })
    }

    fn parse(&self, text: &str) -> Result<Tree, ExtractionError> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| ExtractionError::Setup {
                extractor: NAME,
                message: e.to_string(),
            })?;

        let tree = parser
            .parse(text, None)
            .ok_or(ExtractionError::Unparseable { extractor: NAME })?;

        if tree.root_node().has_error() {
            debug!("syntax errors in input; extracting what parsed");
        }
        Ok(tree)
    }
}

impl Extractor for TreeSitterExtractor {
    fn name(&self) -> &'static str {
        NAME
    }

    fn extract_declarations(&self, header: &str) -> Result<Vec<RawDeclaration>, ExtractionError> {
        let tree = self.parse(header)?;

        let mut walk = HeaderWalk {
            src: header,
            namespaces: Vec::new(),
            classes: Vec::new(),
            out: Vec::new(),
        };
        walk.scope(tree.root_node());

        Ok(walk.out)
    }

    fn extract_definitions(&self, source: &str) -> Result<DefinitionScan, ExtractionError> {
        let tree = self.parse(source)?;
        let bytes = source.as_bytes();

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.definitions_query, tree.root_node(), bytes);

        let mut scan = DefinitionScan::default();

        while let Some(m) = matches.next() {
            for cap in m.captures {
                let node = cap.node;

                if NESTING_KINDS
                    .iter()
                    .any(|k| TsNodeUtils::has_ancestor(node, k))
                {
                    continue;
                }

                match build_definition(node, source) {
                    Some(Ok(def)) => scan.definitions.push(def),
                    Some(Err(skipped)) => scan.skipped.push(skipped),
                    None => trace!(row = node.start_position().row, "not a named function"),
                }
            }
        }

        scan.definitions.sort_by_key(|d| d.span.start);
        Ok(scan)
    }
}

/// Name, parameter list and extent of a function declarator
struct FnParts<'t> {
    /// Written name, whitespace-compacted (`W::draw`, `operator bool`)
    name: String,
    /// Where the declarator proper starts (after pointer/reference tokens)
    start: usize,
    params: Node<'t>,
    /// End of the declarator (qualifiers and trailing return included)
    end: usize,
}

fn function_parts<'t>(declarator: Node<'t>, src: &str) -> Option<FnParts<'t>> {
    let mut cur = declarator;

    // Pointer/reference return types wrap the function declarator
    while matches!(
        cur.kind(),
        "pointer_declarator" | "reference_declarator" | "attributed_declarator"
    ) {
        cur = cur
            .child_by_field_name("declarator")
            .or_else(|| TsNodeUtils::named_children(cur).pop())?;
    }

    match cur.kind() {
        "function_declarator" => {
            let name = cur.child_by_field_name("declarator")?;
            // `void (*fp)(int)` is a variable
            if matches!(
                name.kind(),
                "parenthesized_declarator" | "pointer_declarator" | "reference_declarator"
            ) {
                return None;
            }
            Some(FnParts {
                name: NameUtils::compact(TsNodeUtils::text(name, src)),
                start: cur.start_byte(),
                params: cur.child_by_field_name("parameters")?,
                end: cur.end_byte(),
            })
        }
        // Conversion operators: `operator bool() const`, `X::operator int()`
        "operator_cast" | "qualified_identifier" => {
            let params = find_descendant(cur, "parameter_list")?;
            let name = TsNodeUtils::between(src, cur.start_byte(), params.start_byte());
            Some(FnParts {
                name: NameUtils::compact(name),
                start: cur.start_byte(),
                params,
                end: cur.end_byte(),
            })
        }
        _ => None,
    }
}

fn find_descendant<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    for child in TsNodeUtils::named_children(node) {
        if child.kind() == kind {
            return Some(child);
        }
        if let Some(found) = find_descendant(child, kind) {
            return Some(found);
        }
    }
    None
}

/// Parameter list text without the outer parentheses
fn params_text<'a>(params: Node, src: &'a str) -> &'a str {
    let t = TsNodeUtils::text(params, src).trim();
    t.strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .unwrap_or(t)
        .trim()
}

struct HeaderWalk<'a> {
    src: &'a str,
    namespaces: Vec<String>,
    classes: Vec<String>,
    out: Vec<RawDeclaration>,
}

impl HeaderWalk<'_> {
    /// Namespace-level container
    fn scope(&mut self, node: Node) {
        for child in TsNodeUtils::named_children(node) {
            match child.kind() {
                "namespace_definition" => {
                    let name = TsNodeUtils::field_text(child, "name", self.src)
                        .map(NameUtils::compact)
                        .filter(|n| !n.is_empty());
                    let pushed = name.is_some();
                    if let Some(name) = name {
                        self.namespaces.push(name);
                    }
                    if let Some(body) = child.child_by_field_name("body") {
                        self.scope(body);
                    }
                    if pushed {
                        self.namespaces.pop();
                    }
                }

                "declaration_list"
                | "linkage_specification"
                | "template_declaration"
                | "preproc_ifdef"
                | "preproc_if"
                | "preproc_else"
                | "preproc_elif"
                | "preproc_elifdef" => self.scope(child),

                "class_specifier" | "struct_specifier" | "union_specifier" => self.class(child),

                "declaration" | "type_definition" => {
                    self.nested_type(child);
                    if child.kind() == "declaration" {
                        self.declaration(child, Access::None);
                    }
                }

                // Bodies and friends never declare anything here
                _ => {}
            }
        }
    }

    /// `struct X { ... } x;` and `typedef struct { ... } X;`
    fn nested_type(&mut self, node: Node) {
        if let Some(ty) = node.child_by_field_name("type")
            && matches!(
                ty.kind(),
                "class_specifier" | "struct_specifier" | "union_specifier"
            )
        {
            self.class(ty);
        }
    }

    fn class(&mut self, node: Node) {
        let (Some(name), Some(body)) = (
            TsNodeUtils::field_text(node, "name", self.src),
            node.child_by_field_name("body"),
        ) else {
            // Forward declarations and anonymous aggregates
            return;
        };

        let mut access = if node.kind() == "class_specifier" {
            Access::Private
        } else {
            Access::Public
        };

        self.classes.push(NameUtils::compact(name));
        self.members(body, &mut access);
        self.classes.pop();
    }

    fn members(&mut self, body: Node, access: &mut Access) {
        for child in TsNodeUtils::named_children(body) {
            match child.kind() {
                "access_specifier" => {
                    if let Some(a) = Access::parse(TsNodeUtils::text(child, self.src)) {
                        *access = a;
                    }
                }

                "field_declaration" | "declaration" => {
                    self.nested_type(child);
                    self.declaration(child, *access);
                }

                "class_specifier" | "struct_specifier" | "union_specifier" => self.class(child),

                "template_declaration"
                | "preproc_ifdef"
                | "preproc_if"
                | "preproc_else"
                | "preproc_elif"
                | "preproc_elifdef" => self.members(child, access),

                // Inline bodies, `= default`/`= delete`, friends
                _ => {}
            }
        }
    }

    fn declaration(&mut self, node: Node, access: Access) {
        if TsNodeUtils::child_of_kind(node, "default_method_clause").is_some()
            || TsNodeUtils::child_of_kind(node, "delete_method_clause").is_some()
        {
            return;
        }

        let mut walker = node.walk();
        let declarators: Vec<Node> = node
            .children_by_field_name("declarator", &mut walker)
            .collect();

        let Some(first) = declarators.first() else {
            return;
        };
        // `static const Foo` of `static const Foo& get();`
        let type_text = TsNodeUtils::between(self.src, node.start_byte(), first.start_byte());

        for declarator in &declarators {
            let Some(parts) = function_parts(*declarator, self.src) else {
                continue;
            };

            let leading = format!(
                "{type_text}{}",
                TsNodeUtils::between(self.src, declarator.start_byte(), parts.start)
            );
            let after = TsNodeUtils::between(self.src, parts.params.end_byte(), parts.end);

            let written = NameUtils::split_scope(&parts.name);
            let simple_name = written.last().cloned().unwrap_or_default();

            let namespace_path = (!self.namespaces.is_empty()).then(|| self.namespaces.join("::"));
            let owning_class = match self.classes.last() {
                Some(class) => Some(NameUtils::simple_name(class)),
                None if written.len() >= 2 => Some(written[written.len() - 2].clone()),
                None => None,
            };

            let mut scope: Vec<&str> = self.namespaces.iter().map(String::as_str).collect();
            scope.extend(self.classes.iter().map(String::as_str));
            scope.push(&parts.name);
            let qualified_name = build_qualified_name(&scope);

            let signature = compose_signature(
                &effective_return_type(&leading, after),
                &qualified_name,
                params_text(parts.params, self.src),
                &clean_qualifiers(after),
            );

            trace!(%signature, ?access, "declaration");
            self.out.push(RawDeclaration {
                simple_name,
                qualified_name,
                signature,
                access,
                is_static: has_static(&leading),
                owning_class,
                namespace_path,
                line: node.start_position().row,
            });
        }
    }
}

/// `None` when the node is not a named function; `Err` when it is one
/// but its extent cannot be trusted
fn build_definition(node: Node, src: &str) -> Option<Result<RawDefinition, SkippedDefinition>> {
    let declarator = node.child_by_field_name("declarator")?;
    let parts = function_parts(declarator, src)?;

    let namespaces = enclosing_namespaces(node, src);
    let mut scope: Vec<&str> = namespaces.iter().map(String::as_str).collect();
    scope.push(&parts.name);
    let qualified_name = build_qualified_name(&scope);
    let simple_name = NameUtils::simple_name(&parts.name);

    // Template headers belong to the definition
    let mut outer = node;
    while let Some(p) = outer.parent()
        && p.kind() == "template_declaration"
    {
        outer = p;
    }
    let span = LineSpan::new(outer.start_position().row, node.end_position().row);

    if let Some(body) = node.child_by_field_name("body")
        && body.kind() == "compound_statement"
        && !closes(body)
    {
        return Some(Err(SkippedDefinition {
            name: qualified_name,
            line: span.start,
            reason: "function body is not terminated".into(),
        }));
    }

    let leading = format!(
        "{}{}",
        TsNodeUtils::between(src, node.start_byte(), declarator.start_byte()),
        TsNodeUtils::between(src, declarator.start_byte(), parts.start)
    );
    let after = TsNodeUtils::between(src, parts.params.end_byte(), parts.end);

    let signature = compose_signature(
        &effective_return_type(&leading, after),
        &qualified_name,
        params_text(parts.params, src),
        &clean_qualifiers(after),
    );

    Some(Ok(RawDefinition {
        simple_name,
        qualified_name,
        signature,
        span,
    }))
}

/// Body ends with a real (non-missing) `}`
fn closes(body: Node) -> bool {
    body.child_count()
        .checked_sub(1)
        .and_then(|i| body.child(i))
        .is_some_and(|last| last.kind() == "}" && !last.is_missing())
}

fn enclosing_namespaces(mut node: Node, src: &str) -> Vec<String> {
    let mut parts = Vec::new();
    while let Some(parent) = node.parent() {
        if parent.kind() == "namespace_definition"
            && let Some(name) = TsNodeUtils::field_text(parent, "name", src)
            && !name.trim().is_empty()
        {
            parts.push(NameUtils::compact(name));
        }
        node = parent;
    }
    parts.reverse();
    parts
}
