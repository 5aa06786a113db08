//! Comment attribution and block reconstruction.
//!
//! A function block is the definition proper plus the run of comment and
//! blank lines directly above it. Everything not claimed by a block is a
//! gap. Reconstruction only permutes contiguous line blocks; the single
//! exception is terminator repair when the input has no final newline.

use crate::{
    core::{layout::GapPolicy, model::LineSpan},
    infra::line_index::LineTable,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpanError {
    #[error("span {span} lies outside the {lines}-line file")]
    OutOfRange { span: LineSpan, lines: usize },

    #[error("spans {first} and {second} overlap")]
    Overlap { first: LineSpan, second: LineSpan },
}

fn is_comment_or_blank(content: &str) -> bool {
    let t = content.trim();
    t.is_empty() || t.starts_with("//") || t.starts_with("/*")
}

/// First line of the leading comment/blank run above `body_start`.
///
/// The run never reaches below `floor` (the first line after the previous
/// function). A line ending in `*/` pulls in its whole block comment when
/// that comment opens at the start of a line.
pub fn comment_run_start(lines: &LineTable<'_>, body_start: usize, floor: usize) -> usize {
    let mut start = body_start;

    while start > floor {
        let j = start - 1;
        let Some(content) = lines.content(j) else {
            break;
        };

        if is_comment_or_blank(content) {
            start = j;
            continue;
        }

        if content.trim_end().ends_with("*/") {
            match block_comment_opening(lines, j, floor) {
                Some(open) => {
                    start = open;
                    continue;
                }
                None => break,
            }
        }
        break;
    }
    start
}

/// Line where the block comment closing on `close` opens, if the opener
/// starts its line and sits at or above `floor`
fn block_comment_opening(lines: &LineTable<'_>, close: usize, floor: usize) -> Option<usize> {
    let mut k = close;
    loop {
        let content = lines.content(k)?;
        let search_in = if k == close {
            // The closing `*/` itself must not be read as an opener
            content.trim_end().trim_end_matches("*/")
        } else {
            content
        };
        if let Some(pos) = search_in.rfind("/*") {
            return content[..pos]
                .trim()
                .is_empty()
                .then_some(k);
        }
        if k == floor || k == 0 {
            return None;
        }
        k -= 1;
    }
}

/// Extend each body span over its leading comment run.
///
/// `bodies` must be disjoint and sorted by start line. Each extension is
/// clamped to the line after the preceding body, so the later function
/// keeps any lines both could claim.
pub fn extend_spans(lines: &LineTable<'_>, bodies: &[LineSpan]) -> Vec<LineSpan> {
    let mut floor = 0;
    bodies
        .iter()
        .map(|body| {
            let start = comment_run_start(lines, body.start, floor);
            floor = body.end + 1;
            LineSpan::new(start, body.end)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Gap(LineSpan),
    /// k-th function in file order
    Function(usize),
}

/// Reassemble `original` with `sorted_blocks` (extended function spans in
/// their target order) moved according to `policy`.
pub fn reconstruct(
    original: &str,
    sorted_blocks: &[LineSpan],
    policy: GapPolicy,
) -> Result<String, SpanError> {
    let lines = LineTable::build(original);
    let total = lines.line_count();

    let mut in_file_order: Vec<LineSpan> = sorted_blocks.to_vec();
    in_file_order.sort();

    for span in &in_file_order {
        if span.is_empty() || span.end >= total {
            return Err(SpanError::OutOfRange {
                span: *span,
                lines: total,
            });
        }
    }
    for pair in in_file_order.windows(2) {
        if pair[0].overlaps(&pair[1]) {
            return Err(SpanError::Overlap {
                first: pair[0],
                second: pair[1],
            });
        }
    }

    // Partition into gaps and function slots
    let mut segments = Vec::with_capacity(in_file_order.len() * 2 + 1);
    let mut cursor = 0;
    for (k, span) in in_file_order.iter().enumerate() {
        if span.start > cursor {
            segments.push(Segment::Gap(LineSpan::new(cursor, span.start - 1)));
        }
        segments.push(Segment::Function(k));
        cursor = span.end + 1;
    }
    if cursor < total {
        segments.push(Segment::Gap(LineSpan::new(cursor, total - 1)));
    }

    let gap_text = |span: LineSpan| lines.slice(span).unwrap_or_default();
    let block_text = |span: &LineSpan| lines.slice(*span).unwrap_or_default();

    let pieces: Vec<&str> = match policy {
        GapPolicy::Hoist => {
            let mut gaps = segments.iter().filter_map(|s| match s {
                Segment::Gap(span) => Some(*span),
                Segment::Function(_) => None,
            });
            let mut out = Vec::with_capacity(segments.len());
            let mut rest = Vec::new();

            if let Some(first) = gaps.next() {
                if first.start == 0 {
                    out.push(gap_text(first));
                } else {
                    rest.push(gap_text(first));
                }
            }
            rest.extend(gaps.map(gap_text));

            out.extend(sorted_blocks.iter().map(block_text));
            out.extend(rest);
            out
        }
        GapPolicy::InPlace => segments
            .iter()
            .map(|s| match s {
                Segment::Gap(span) => gap_text(*span),
                Segment::Function(k) => block_text(&sorted_blocks[*k]),
            })
            .collect(),
    };

    Ok(join_preserving_terminators(&pieces, &lines))
}

/// Concatenate pieces; a terminator-less piece that is no longer last gets
/// the file's dominant ending, and if the input had no final newline the
/// output drops its last terminator.
fn join_preserving_terminators(pieces: &[&str], lines: &LineTable<'_>) -> String {
    let ending = lines.dominant_ending().as_str();
    let mut out = String::with_capacity(lines.text().len() + ending.len());

    let last = pieces.len().saturating_sub(1);
    for (i, piece) in pieces.iter().enumerate() {
        out.push_str(piece);
        if i != last && !piece.is_empty() && !piece.ends_with('\n') {
            out.push_str(ending);
        }
    }

    if !lines.ends_with_newline() {
        if out.ends_with("\r\n") {
            out.truncate(out.len() - 2);
        } else if out.ends_with('\n') {
            out.truncate(out.len() - 1);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use proptest::prelude::*;

    use super::*;

    const SRC: &str = "\
#include \"w.h\"

// b does things
void W::b() {
}

/*
 * a is first
 */
void W::a() {
}
";

    #[test]
    fn comment_runs_attach_to_the_function_below() {
        let lines = LineTable::build(SRC);
        let spans = extend_spans(&lines, &[LineSpan::new(3, 4), LineSpan::new(9, 10)]);
        assert_eq!(spans, vec![LineSpan::new(1, 4), LineSpan::new(5, 10)]);
    }

    #[test]
    fn extension_stops_at_previous_function() {
        let text = "int a() {\n}\n// about b\nint b() {\n}\n";
        let lines = LineTable::build(text);
        let spans = extend_spans(&lines, &[LineSpan::new(0, 1), LineSpan::new(3, 4)]);
        assert_eq!(spans, vec![LineSpan::new(0, 1), LineSpan::new(2, 4)]);
    }

    #[test]
    fn trailing_block_comment_after_code_is_not_attached() {
        let text = "int x; /* note */\nvoid f() {\n}\n";
        let lines = LineTable::build(text);
        assert_eq!(comment_run_start(&lines, 1, 0), 1);
    }

    #[test]
    fn hoist_swaps_blocks_and_keeps_prologue() {
        let lines = LineTable::build(SRC);
        let spans = extend_spans(&lines, &[LineSpan::new(3, 4), LineSpan::new(9, 10)]);
        let out = reconstruct(SRC, &[spans[1], spans[0]], GapPolicy::Hoist).unwrap();
        assert_eq!(
            out,
            "\
#include \"w.h\"

/*
 * a is first
 */
void W::a() {
}

// b does things
void W::b() {
}
"
        );
    }

    #[test]
    fn hoist_moves_sandwiched_gaps_after_functions() {
        let text = "void b() {}\nint counter = 0;\nvoid a() {}\n";
        let out = reconstruct(
            text,
            &[LineSpan::new(2, 2), LineSpan::new(0, 0)],
            GapPolicy::Hoist,
        )
        .unwrap();
        assert_eq!(out, "void a() {}\nvoid b() {}\nint counter = 0;\n");
    }

    #[test]
    fn in_place_keeps_gaps_where_they_were() {
        let text = "void b() {}\nint counter = 0;\nvoid a() {}\n";
        let out = reconstruct(
            text,
            &[LineSpan::new(2, 2), LineSpan::new(0, 0)],
            GapPolicy::InPlace,
        )
        .unwrap();
        assert_eq!(out, "void a() {}\nint counter = 0;\nvoid b() {}\n");
    }

    #[test]
    fn missing_final_newline_is_preserved() {
        let text = "void b() {}\r\nvoid a() {}";
        let out = reconstruct(
            text,
            &[LineSpan::new(1, 1), LineSpan::new(0, 0)],
            GapPolicy::Hoist,
        )
        .unwrap();
        assert_eq!(out, "void a() {}\r\nvoid b() {}");
    }

    #[test]
    fn invalid_spans_are_rejected() {
        let text = "a\nb\n";
        assert!(matches!(
            reconstruct(text, &[LineSpan::new(1, 2)], GapPolicy::Hoist),
            Err(SpanError::OutOfRange { .. })
        ));
        assert!(matches!(
            reconstruct(
                text,
                &[LineSpan::new(0, 1), LineSpan::new(1, 1)],
                GapPolicy::Hoist
            ),
            Err(SpanError::Overlap { .. })
        ));
    }

    /// Lines, a set of disjoint spans over them, and a permutation of those spans
    fn layout_strategy() -> impl Strategy<Value = (Vec<String>, Vec<LineSpan>, Vec<usize>)> {
        prop::collection::vec("[a-z ]{0,6}", 1..30)
            .prop_flat_map(|lines| {
                let n = lines.len();
                (
                    Just(lines),
                    prop::collection::vec(any::<bool>(), n),
                    prop::collection::vec(any::<bool>(), n),
                )
            })
            .prop_flat_map(|(lines, starts, claimed)| {
                // Turn flags into disjoint runs of claimed lines
                let mut spans = Vec::new();
                let mut open: Option<usize> = None;
                for i in 0..lines.len() {
                    match (open, claimed[i]) {
                        (None, true) => open = Some(i),
                        (Some(s), true) if starts[i] && i > s => {
                            spans.push(LineSpan::new(s, i - 1));
                            open = Some(i);
                        }
                        (Some(s), false) => {
                            spans.push(LineSpan::new(s, i - 1));
                            open = None;
                        }
                        _ => {}
                    }
                }
                if let Some(s) = open {
                    spans.push(LineSpan::new(s, lines.len() - 1));
                }
                let order: Vec<usize> = (0..spans.len()).collect();
                (Just(lines), Just(spans), Just(order).prop_shuffle())
            })
    }

    proptest! {
        #[test]
        fn output_is_a_permutation_of_lines(
            (lines, spans, order) in layout_strategy(),
            in_place in any::<bool>(),
        ) {
            let text: String = lines.iter().map(|l| format!("{l}\n")).collect();
            let sorted: Vec<LineSpan> = order.iter().map(|&i| spans[i]).collect();
            let policy = if in_place { GapPolicy::InPlace } else { GapPolicy::Hoist };

            let out = reconstruct(&text, &sorted, policy).unwrap();

            let before: Vec<&str> = text.lines().sorted().collect();
            let after: Vec<&str> = out.lines().sorted().collect();
            prop_assert_eq!(before, after);
            prop_assert_eq!(out.len(), text.len());
        }
    }
}
