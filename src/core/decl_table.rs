use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    core::{
        error::EngineError,
        model::{DeclarationRecord, RawDeclaration},
        normalize::normalize,
    },
    infra::utils::NameUtils,
};

/// Header declarations for one run, keyed by normalized signature
#[derive(Debug, Clone, Default)]
pub struct DeclarationTable
{
    /// Normalized signature -> record, in header order
    by_signature: IndexMap<String, DeclarationRecord>,

    /// Qualified name (template arguments dropped) -> positions in
    /// `by_signature`
    by_qualified: HashMap<String, Vec<usize>>,

    /// (simple name, owning class), both template-free -> positions
    by_simple: HashMap<(String, Option<String>), Vec<usize>>,

    /// Raw signature per entry, for duplicate reports
    raw_signatures: Vec<String>,
}

impl DeclarationTable
{
    /// Normalize the extractor's records and index them.
    ///
    /// `header_order_index` is assigned here, 0-based, in traversal order.
    /// Two declarations normalizing to the same string are rejected:
    /// the qualified name is part of the signature, so only same-scope
    /// collisions can trigger it.
    pub fn build(records: Vec<RawDeclaration>) -> Result<Self, EngineError>
    {
        let mut table = DeclarationTable::default();

        for (index, raw) in records
            .into_iter()
            .enumerate()
        {
            let normalized = normalize(&raw.signature);

            if let Some(existing) = table
                .by_signature
                .get_index_of(&normalized)
            {
                return Err(EngineError::DuplicateSignature {
                    signature: normalized,
                    first: table.raw_signatures[existing].clone(),
                    second: raw.signature,
                });
            }

            let record = DeclarationRecord {
                simple_name: raw.simple_name,
                qualified_name: raw.qualified_name,
                normalized_signature: normalized.clone(),
                access: raw.access,
                is_static: raw.is_static,
                owning_class: raw.owning_class,
                namespace_path: raw.namespace_path,
                header_order_index: index,
            };

            let pos = table
                .by_signature
                .len();
            table
                .by_qualified
                .entry(NameUtils::scope_key(&record.qualified_name))
                .or_default()
                .push(pos);
            table
                .by_simple
                .entry(simple_key(
                    &record.simple_name,
                    record
                        .owning_class
                        .as_deref(),
                ))
                .or_default()
                .push(pos);
            table
                .raw_signatures
                .push(raw.signature);
            table
                .by_signature
                .insert(normalized, record);
        }

        debug!(
            declarations = table
                .by_signature
                .len(),
            "declaration table built"
        );
        Ok(table)
    }

    pub fn len(&self) -> usize
    {
        self.by_signature
            .len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.by_signature
            .is_empty()
    }

    /// Declarations in header order
    pub fn iter(&self) -> impl Iterator<Item = &DeclarationRecord>
    {
        self.by_signature
            .values()
    }

    /// Exact lookup by normalized signature
    pub fn get(
        &self,
        normalized_signature: &str,
    ) -> Option<&DeclarationRecord>
    {
        self.by_signature
            .get(normalized_signature)
    }

    /// All overloads sharing a qualified name
    pub fn by_qualified_name(
        &self,
        qualified_name: &str,
    ) -> Vec<&DeclarationRecord>
    {
        self.resolve(
            self.by_qualified
                .get(&NameUtils::scope_key(qualified_name)),
        )
    }

    /// Fallback candidates by unqualified name and class
    pub fn by_simple_name(
        &self,
        simple_name: &str,
        owning_class: Option<&str>,
    ) -> Vec<&DeclarationRecord>
    {
        self.resolve(
            self.by_simple
                .get(&simple_key(simple_name, owning_class)),
        )
    }

    fn resolve(
        &self,
        positions: Option<&Vec<usize>>,
    ) -> Vec<&DeclarationRecord>
    {
        positions
            .map(|idxs| {
                idxs.iter()
                    .filter_map(|&i| {
                        self.by_signature
                            .get_index(i)
                            .map(|(_, rec)| rec)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn simple_key(
    simple_name: &str,
    owning_class: Option<&str>,
) -> (String, Option<String>)
{
    (NameUtils::scope_key(simple_name), owning_class.map(NameUtils::scope_key))
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::core::model::Access;

    fn raw(
        qualified: &str,
        signature: &str,
        access: Access,
    ) -> RawDeclaration
    {
        let simple = qualified
            .rsplit("::")
            .next()
            .unwrap()
            .to_string();
        let class = qualified
            .rsplit_once("::")
            .map(|(scope, _)| {
                scope
                    .rsplit("::")
                    .next()
                    .unwrap()
                    .to_string()
            });
        RawDeclaration {
            simple_name: simple,
            qualified_name: qualified.into(),
            signature: signature.into(),
            access,
            is_static: false,
            owning_class: class,
            namespace_path: None,
            line: 0,
        }
    }

    #[test]
    fn assigns_header_order_and_indexes()
    {
        let table = DeclarationTable::build(vec![
            raw("W::draw", "void W::draw(int x)", Access::Public),
            raw("W::draw", "void W::draw(double)", Access::Public),
            raw("W::reset", "void W::reset()", Access::Private),
        ])
        .unwrap();

        assert_eq!(table.len(), 3);
        let order: Vec<_> = table
            .iter()
            .map(|d| d.header_order_index)
            .collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert_eq!(
            table
                .get("void W::draw(int)")
                .unwrap()
                .header_order_index,
            0
        );
        assert_eq!(
            table
                .by_qualified_name("W::draw")
                .len(),
            2
        );
        assert_eq!(
            table
                .by_simple_name("reset", Some("W"))
                .len(),
            1
        );
        assert!(
            table
                .by_simple_name("reset", None)
                .is_empty()
        );
    }

    #[test]
    fn template_arguments_do_not_split_lookups()
    {
        let table = DeclarationTable::build(vec![raw(
            "Box::set",
            "void Box::set(T v)",
            Access::Public,
        )])
        .unwrap();

        assert_eq!(
            table
                .by_qualified_name("Box<T>::set")
                .len(),
            1
        );
        assert_eq!(
            table
                .by_simple_name("set", Some("Box<T>"))
                .len(),
            1
        );
    }

    #[test]
    fn cv_only_overloads_are_rejected()
    {
        let err = DeclarationTable::build(vec![
            raw("K::f", "void K::f(int)", Access::Public),
            raw("K::f", "void K::f(const int)", Access::Public),
        ])
        .unwrap_err();

        match err {
            EngineError::DuplicateSignature {
                signature,
                first,
                second,
            } => {
                assert_eq!(signature, "void K::f(int)");
                assert_eq!(first, "void K::f(int)");
                assert_eq!(second, "void K::f(const int)");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn same_name_in_different_classes_is_fine()
    {
        let table = DeclarationTable::build(vec![
            raw("A::run", "void A::run()", Access::Public),
            raw("B::run", "void B::run()", Access::Public),
        ])
        .unwrap();
        assert_eq!(table.len(), 2);
    }
}
