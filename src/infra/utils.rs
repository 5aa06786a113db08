//! Utility helpers organized by small, focused structs.
//! All functions are associated fns to keep call sites
//! ergonomic, testable, and discoverable.

// Tree-sitter types for node helpers
use tree_sitter::Node;

/// C++ scoped-name helpers
pub struct NameUtils;

impl NameUtils
{
    /// Split `a::B<c::D>::operator<` into scope segments.
    ///
    /// `::` inside template arguments does not split, and everything from
    /// an `operator` token on is one segment.
    pub fn split_scope(name: &str) -> Vec<String>
    {
        // Drop whitespace around `::` first
        let compact = Self::compact(name);

        let mut out = Vec::new();
        let mut depth = 0i32;
        let mut start = 0usize;
        let bytes = compact.as_bytes();
        let mut i = 0usize;

        while i < bytes.len()
        {
            // Operator names swallow the rest (`operator<`, `operator()`)
            if depth == 0 && Self::operator_at(&compact, i)
            {
                break;
            }

            match bytes[i]
            {
                b'<' => depth += 1,
                b'>' => depth = (depth - 1).max(0),
                b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') =>
                {
                    out.push(compact[start..i].to_string());
                    i += 2;
                    start = i;
                    continue;
                }
                _ =>
                {}
            }
            i += 1;
        }

        out.push(compact[start..].to_string());
        out
    }

    /// Last scope segment (the simple name)
    pub fn simple_name(name: &str) -> String
    {
        Self::split_scope(name)
            .pop()
            .unwrap_or_default()
    }

    /// Lookup key for a scoped name: template arguments dropped from every
    /// segment, so `ns::Box<T>::set` and `ns::Box::set` agree. Operator
    /// segments are kept whole.
    pub fn scope_key(name: &str) -> String
    {
        Self::split_scope(name)
            .into_iter()
            .map(|segment| {
                if Self::operator_at(&segment, 0)
                {
                    return segment;
                }

                let mut depth = 0usize;
                segment
                    .chars()
                    .filter(|&c| match c
                    {
                        '<' =>
                        {
                            depth += 1;
                            false
                        }
                        '>' =>
                        {
                            depth = depth.saturating_sub(1);
                            false
                        }
                        _ => depth == 0,
                    })
                    .collect()
            })
            .collect::<Vec<String>>()
            .join("::")
    }

    /// Collapse whitespace and remove it around `::`
    pub fn compact(name: &str) -> String
    {
        let words: Vec<&str> = name
            .split_whitespace()
            .collect();
        words
            .join(" ")
            .replace(" ::", "::")
            .replace(":: ", "::")
    }

    /// True when an `operator` keyword starts at byte `i`
    fn operator_at(
        text: &str,
        i: usize,
    ) -> bool
    {
        let is_ident = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
        let bytes = text.as_bytes();

        // Must start a token
        if i > 0 && is_ident(bytes[i - 1])
        {
            return false;
        }

        // Must not continue into a longer identifier (`operator_count`)
        text[i..]
            .strip_prefix("operator")
            .is_some_and(|rest| {
                !rest
                    .bytes()
                    .next()
                    .is_some_and(is_ident)
            })
    }
}

/// Common Tree-sitter node helpers
pub struct TsNodeUtils;

impl TsNodeUtils
{
    /// Source text of a node; empty when offsets are not on char boundaries
    pub fn text<'a>(
        node: Node,
        src: &'a str,
    ) -> &'a str
    {
        src.get(node.start_byte()..node.end_byte())
            .unwrap_or_default()
    }

    /// Source text between two byte offsets
    pub fn between<'a>(
        src: &'a str,
        start: usize,
        end: usize,
    ) -> &'a str
    {
        if start > end
        {
            return "";
        }
        src.get(start..end)
            .unwrap_or_default()
    }

    /// Named children in source order
    pub fn named_children(node: Node<'_>) -> Vec<Node<'_>>
    {
        (0..node.named_child_count())
            .filter_map(|i| node.named_child(i))
            .collect()
    }

    /// First direct child (named or not) of the given kind
    pub fn child_of_kind<'a>(
        node: Node<'a>,
        kind: &str,
    ) -> Option<Node<'a>>
    {
        (0..node.child_count())
            .filter_map(|i| node.child(i))
            .find(|c| c.kind() == kind)
    }

    /// Check if `node` has an ancestor of the given kind
    pub fn has_ancestor(
        mut node: Node,
        kind: &str,
    ) -> bool
    {
        // Walk up parents until root
        while let Some(p) = node.parent()
        {
            if p.kind() == kind
            {
                return true;
            }

            node = p;
        }

        // No matching ancestor found
        false
    }

    /// Extract text of a child field if present
    pub fn field_text<'a>(
        node: Node,
        field: &str,
        src: &'a str,
    ) -> Option<&'a str>
    {
        // Locate the child by field name
        let child = node.child_by_field_name(field)?;

        Some(Self::text(child, src))
    }
}
