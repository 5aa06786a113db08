use tracing::trace;

use crate::{
    core::{
        decl_table::DeclarationTable,
        model::{DeclarationRecord, DefinitionRecord},
        normalize::{parameter_types, trailing_qualifiers},
    },
    infra::utils::NameUtils,
};

/// How a definition resolved against the declaration table
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome<'a>
{
    /// Normalized signatures are identical
    Exact(&'a DeclarationRecord),

    /// Same name, positionally equal parameter types
    ByParameters(&'a DeclarationRecord),

    /// More than one declaration fits equally well
    Ambiguous(usize),

    Unmatched,
}

impl<'a> MatchOutcome<'a>
{
    pub fn declaration(&self) -> Option<&'a DeclarationRecord>
    {
        match self {
            MatchOutcome::Exact(d) | MatchOutcome::ByParameters(d) => Some(d),
            _ => None,
        }
    }
}

/// Find the declaration a definition implements, if exactly one fits
pub fn match_definition<'a>(
    definition: &DefinitionRecord,
    table: &'a DeclarationTable,
) -> Option<&'a DeclarationRecord>
{
    resolve_definition(definition, table).declaration()
}

/// Full matching result, including ambiguity
pub fn resolve_definition<'a>(
    definition: &DefinitionRecord,
    table: &'a DeclarationTable,
) -> MatchOutcome<'a>
{
    // 1. Exact normalized signature
    if let Some(decl) = table.get(&definition.normalized_signature) {
        trace!(name = %definition.qualified_name, "exact match");
        return MatchOutcome::Exact(decl);
    }

    // 2. Overloads by name, compared on parameter types
    let candidates = candidates_for(definition, table);
    if candidates.is_empty() {
        return MatchOutcome::Unmatched;
    }

    let def_params = parameter_types(&definition.normalized_signature);
    let def_quals = trailing_qualifiers(&definition.normalized_signature);

    let hits: Vec<&DeclarationRecord> = candidates
        .into_iter()
        .filter(|decl| {
            parameter_types(&decl.normalized_signature) == def_params
                && trailing_qualifiers(&decl.normalized_signature) == def_quals
        })
        .collect();

    match hits.as_slice() {
        [] => MatchOutcome::Unmatched,
        [only] => {
            trace!(name = %definition.qualified_name, "parameter match");
            MatchOutcome::ByParameters(only)
        }
        many => MatchOutcome::Ambiguous(many.len()),
    }
}

/// Declarations sharing the definition's name. Out-of-class members of
/// class templates (`Box<T>::set`) are looked up without their arguments.
fn candidates_for<'a>(
    definition: &DefinitionRecord,
    table: &'a DeclarationTable,
) -> Vec<&'a DeclarationRecord>
{
    let key = NameUtils::scope_key(&definition.qualified_name);

    let exact = table.by_qualified_name(&key);
    if !exact.is_empty() {
        return exact;
    }

    let mut segments = NameUtils::split_scope(&key);
    let simple = segments
        .pop()
        .unwrap_or_default();
    let class = segments
        .pop()
        .filter(|s| !s.is_empty());

    let suffix = format!("::{key}");
    table
        .by_simple_name(&simple, class.as_deref())
        .into_iter()
        .filter(|decl| {
            let decl_key = NameUtils::scope_key(&decl.qualified_name);
            decl_key == key || decl_key.ends_with(&suffix)
        })
        .collect()
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::core::{
        model::{Access, LineSpan, RawDeclaration},
        normalize::normalize,
    };

    fn decl(
        qualified: &str,
        class: Option<&str>,
        signature: &str,
    ) -> RawDeclaration
    {
        RawDeclaration {
            simple_name: qualified
                .rsplit("::")
                .next()
                .unwrap_or(qualified)
                .to_string(),
            qualified_name: qualified.into(),
            signature: signature.into(),
            access: Access::Public,
            is_static: false,
            owning_class: class.map(str::to_string),
            namespace_path: None,
            line: 0,
        }
    }

    fn def(
        qualified: &str,
        signature: &str,
    ) -> DefinitionRecord
    {
        DefinitionRecord {
            qualified_name: qualified.into(),
            normalized_signature: normalize(signature),
            span: LineSpan::new(0, 0),
            body_start: 0,
            raw_text: String::new(),
            matched_declaration: None,
        }
    }

    fn table() -> DeclarationTable
    {
        DeclarationTable::build(vec![
            decl("ui::Widget::draw", Some("Widget"), "void ui::Widget::draw(int)"),
            decl("ui::Widget::draw", Some("Widget"), "void ui::Widget::draw(double)"),
            decl("ui::Widget::kind", Some("Widget"), "Kind ui::Widget::kind() const"),
            decl("helper", None, "int helper(const char* s)"),
        ])
        .unwrap()
    }

    #[test]
    fn exact_signature_wins()
    {
        let t = table();
        let d = def("ui::Widget::draw", "void ui::Widget::draw(const double value)");
        assert!(matches!(resolve_definition(&d, &t), MatchOutcome::Exact(_)));
        assert_eq!(
            match_definition(&d, &t)
                .unwrap()
                .header_order_index,
            1
        );
    }

    #[test]
    fn qualified_return_type_falls_back_to_parameters()
    {
        let t = table();
        let d = def("ui::Widget::kind", "Widget::Kind ui::Widget::kind() const");
        let outcome = resolve_definition(&d, &t);
        assert!(matches!(outcome, MatchOutcome::ByParameters(_)));
        assert_eq!(
            outcome
                .declaration()
                .unwrap()
                .header_order_index,
            2
        );
    }

    #[test]
    fn method_constness_must_agree()
    {
        let t = table();
        let d = def("ui::Widget::kind", "Widget::Kind ui::Widget::kind()");
        assert_eq!(resolve_definition(&d, &t), MatchOutcome::Unmatched);
    }

    #[test]
    fn suffix_candidates_cover_using_directives()
    {
        let t = table();
        let d = def("Widget::draw", "void Widget::draw(int n)");
        assert_eq!(
            match_definition(&d, &t)
                .unwrap()
                .header_order_index,
            0
        );
    }

    #[test]
    fn class_template_members_match_without_arguments()
    {
        let t = DeclarationTable::build(vec![
            decl("Box::get", Some("Box"), "T Box::get() const"),
            decl("Box::set", Some("Box"), "void Box::set(T v)"),
        ])
        .unwrap();

        let d = def("Box<T>::set", "void Box<T>::set(T value)");
        assert_eq!(
            match_definition(&d, &t)
                .unwrap()
                .header_order_index,
            1
        );
        let d = def("Box<T>::get", "T Box<T>::get() const");
        assert_eq!(
            match_definition(&d, &t)
                .unwrap()
                .header_order_index,
            0
        );
    }

    #[test]
    fn unknown_names_stay_unmatched()
    {
        let t = table();
        let d = def("ui::Widget::resize", "void ui::Widget::resize(int)");
        assert!(match_definition(&d, &t).is_none());
        let d = def("helper", "int helper(std::string)");
        assert!(match_definition(&d, &t).is_none());
    }

    #[test]
    fn equal_candidates_are_ambiguous()
    {
        let t = DeclarationTable::build(vec![
            decl("a::run", None, "int a::run(int)"),
            decl("b::run", None, "long b::run(int)"),
        ])
        .unwrap();
        let d = def("run", "short run(int x)");
        assert_eq!(resolve_definition(&d, &t), MatchOutcome::Ambiguous(2));
    }
}
