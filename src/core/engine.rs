//! Matching & reordering pipeline for one header/implementation pair.
//!
//! Stages run in a fixed order: extract header, extract source, match,
//! order, reconstruct. The engine never touches the filesystem; callers
//! hand it text and get text back, plus diagnostics and warnings.

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::{
    core::{
        decl_table::DeclarationTable,
        error::{EngineError, EngineWarning},
        layout::{LayoutRules, OrderKey, order_key, sort_definitions},
        matcher::{MatchOutcome, resolve_definition},
        model::{Access, DefinitionRecord, LineSpan, RawDefinition},
        normalize::normalize,
        reconstruct::{extend_spans, reconstruct},
    },
    infra::line_index::LineTable,
    parsers::Extractor,
};

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ExtractHeader,
    ExtractSource,
    Match,
    Order,
    Reconstruct,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::ExtractHeader => "extracting header declarations",
            Stage::ExtractSource => "extracting source definitions",
            Stage::Match => "matching definitions",
            Stage::Order => "ordering",
            Stage::Reconstruct => "reconstructing",
        }
    }
}

/// Optional stage-completion notifications
pub trait StageObserver {
    fn stage_done(&self, _stage: Stage) {}
}

/// Observer that ignores everything
pub struct NoopObserver;

impl StageObserver for NoopObserver {}

/// Where one matched definition ended up
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Placement {
    /// 1-based position in the new order
    pub position: usize,
    pub name: String,
    pub signature: String,
    pub access: Access,
    pub is_static: bool,
    pub priority: i64,
    pub header_index: usize,
    /// Original extended span (leading comments included)
    pub original: LineSpan,
}

/// Result of one run
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    /// Reconstructed implementation text
    pub output: String,

    /// False when the output equals the input
    pub changed: bool,

    /// Matched definitions in their new order
    pub placements: Vec<Placement>,

    /// Human-readable log of the run
    pub diagnostics: Vec<String>,

    pub warnings: Vec<EngineWarning>,
}

impl Outcome {
    fn unchanged(source: &str, diagnostics: Vec<String>, warnings: Vec<EngineWarning>) -> Self {
        Self {
            output: source.to_string(),
            changed: false,
            placements: Vec::new(),
            diagnostics,
            warnings,
        }
    }
}

pub struct Engine<'a> {
    extractor: &'a dyn Extractor,
    rules: &'a LayoutRules,
}

impl<'a> Engine<'a> {
    pub fn new(extractor: &'a dyn Extractor, rules: &'a LayoutRules) -> Self {
        Self { extractor, rules }
    }

    /// Reorder `source` to follow `header` without progress reporting
    pub fn reorder(&self, header: &str, source: &str) -> Result<Outcome, EngineError> {
        self.run(header, source, &NoopObserver)
    }

    #[instrument(skip_all, fields(extractor = self.extractor.name(), gap_policy = ?self.rules.gap_policy))]
    pub fn run(
        &self,
        header: &str,
        source: &str,
        observer: &dyn StageObserver,
    ) -> Result<Outcome, EngineError> {
        let mut diagnostics = Vec::new();
        let mut warnings = Vec::new();

        // 1. Header
        let declarations = self
            .extractor
            .extract_declarations(header)
            .map_err(|source| EngineError::Extraction {
                file: "header",
                source,
            })?;
        diagnostics.push(format!(
            "Found {} function declarations in header",
            declarations.len()
        ));
        for decl in &declarations {
            diagnostics.push(format!(
                "  - {} (Access: {}, Static: {})",
                decl.qualified_name, decl.access, decl.is_static
            ));
        }
        debug!(count = declarations.len(), "header extracted");
        observer.stage_done(Stage::ExtractHeader);

        // 2. Source
        let scan = self
            .extractor
            .extract_definitions(source)
            .map_err(|source| EngineError::Extraction {
                file: "source",
                source,
            })?;
        diagnostics.push(format!(
            "Found {} function implementations in source",
            scan.definitions.len()
        ));
        for def in &scan.definitions {
            diagnostics.push(format!("  - {} (Lines: {})", def.qualified_name, def.span));
        }
        debug!(count = scan.definitions.len(), skipped = scan.skipped.len(), "source extracted");
        observer.stage_done(Stage::ExtractSource);

        warnings.extend(scan.skipped.into_iter().map(|s| EngineWarning::SkippedDefinition {
            name: s.name,
            line: s.line,
            reason: s.reason,
        }));

        if declarations.is_empty() {
            warnings.push(EngineWarning::NoDeclarationsFound);
            return Ok(finish_unchanged(source, diagnostics, warnings));
        }

        let table = DeclarationTable::build(declarations)?;

        let lines = LineTable::build(source);
        let definitions = validate_spans(scan.definitions, lines.line_count(), &mut warnings);

        if definitions.is_empty() {
            warnings.push(EngineWarning::NoDefinitionsFound);
            return Ok(finish_unchanged(source, diagnostics, warnings));
        }

        // 3. Match
        let bodies: Vec<LineSpan> = definitions.iter().map(|d| d.span).collect();
        let extended = extend_spans(&lines, &bodies);

        let mut matched = Vec::new();
        for (raw, span) in definitions.into_iter().zip(extended) {
            let mut record = DefinitionRecord {
                qualified_name: raw.qualified_name,
                normalized_signature: normalize(&raw.signature),
                span,
                body_start: raw.span.start,
                raw_text: lines.slice(span).unwrap_or_default().to_string(),
                matched_declaration: None,
            };

            match resolve_definition(&record, &table) {
                MatchOutcome::Exact(decl) | MatchOutcome::ByParameters(decl) => {
                    diagnostics.push(format!(
                        "Matched {} -> {}",
                        record.qualified_name, decl.normalized_signature
                    ));
                    record.matched_declaration = Some(decl.clone());
                    matched.push(record);
                }
                MatchOutcome::Ambiguous(candidates) => {
                    diagnostics.push(format!("Ambiguous {}", record.qualified_name));
                    warnings.push(EngineWarning::AmbiguousDefinition {
                        name: record.qualified_name,
                        line: record.body_start,
                        candidates,
                    });
                }
                MatchOutcome::Unmatched => {
                    diagnostics.push(format!("No declaration for {}", record.qualified_name));
                    warnings.push(EngineWarning::UnmatchedDefinition {
                        name: record.qualified_name,
                        line: record.body_start,
                    });
                }
            }
        }
        debug!(matched = matched.len(), "definitions matched");
        observer.stage_done(Stage::Match);

        // 4. Order
        sort_definitions(&mut matched, self.rules);

        let placements: Vec<Placement> = matched
            .iter()
            .enumerate()
            .filter_map(|(i, def)| {
                let decl = def.matched_declaration.as_ref()?;
                let OrderKey { priority, tiebreak } = order_key(decl, self.rules);
                Some(Placement {
                    position: i + 1,
                    name: def.qualified_name.clone(),
                    signature: decl.normalized_signature.clone(),
                    access: decl.access,
                    is_static: decl.is_static,
                    priority,
                    header_index: tiebreak,
                    original: def.span,
                })
            })
            .collect();

        diagnostics.push("Final order:".to_string());
        for p in &placements {
            diagnostics.push(format!(
                "  {}. {} (priority {}, header #{})",
                p.position, p.name, p.priority, p.header_index
            ));
        }
        observer.stage_done(Stage::Order);

        // 5. Reconstruct
        let blocks: Vec<LineSpan> = matched.iter().map(|d| d.span).collect();
        let output = reconstruct(source, &blocks, self.rules.gap_policy)?;
        let changed = output != source;
        debug!(changed, "reconstructed");
        observer.stage_done(Stage::Reconstruct);

        for w in &warnings {
            warn!("{w}");
        }

        Ok(Outcome {
            output,
            changed,
            placements,
            diagnostics,
            warnings,
        })
    }
}

fn finish_unchanged(
    source: &str,
    diagnostics: Vec<String>,
    warnings: Vec<EngineWarning>,
) -> Outcome {
    for w in &warnings {
        warn!("{w}");
    }
    Outcome::unchanged(source, diagnostics, warnings)
}

/// Sort by start line and drop definitions whose span is empty, runs past
/// the end of the file, or overlaps an earlier one
fn validate_spans(
    mut definitions: Vec<RawDefinition>,
    line_count: usize,
    warnings: &mut Vec<EngineWarning>,
) -> Vec<RawDefinition> {
    definitions.sort_by_key(|d| d.span);

    let mut kept: Vec<RawDefinition> = Vec::with_capacity(definitions.len());
    for def in definitions {
        let reason = if def.span.is_empty() || def.span.end >= line_count {
            Some(format!("span {} is outside the file", def.span))
        } else {
            kept.last()
                .filter(|prev| prev.span.overlaps(&def.span))
                .map(|prev| format!("span {} overlaps {}", def.span, prev.qualified_name))
        };

        match reason {
            Some(reason) => warnings.push(EngineWarning::SkippedDefinition {
                name: def.qualified_name,
                line: def.span.start,
                reason,
            }),
            None => kept.push(def),
        }
    }
    kept
}
