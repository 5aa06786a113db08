//! `plan` command: explain the computed order without writing anything.

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use crate::{
    cli::{AppContext, PlanArgs},
    core::{
        engine::{Outcome, Placement},
        error::EngineWarning,
        reorder::{Setup, resolve_pair},
    },
    infra::io::read_file_smart,
};

#[derive(Serialize)]
struct PlanReport<'a> {
    header: String,
    source: String,
    changed: bool,
    placements: &'a [Placement],
    warnings: &'a [EngineWarning],
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Function")]
    name: String,
    #[tabled(rename = "Access")]
    access: String,
    #[tabled(rename = "Static")]
    is_static: String,
    #[tabled(rename = "Priority")]
    priority: i64,
    #[tabled(rename = "Header #")]
    header_index: usize,
    #[tabled(rename = "Lines")]
    lines: String,
}

impl From<&Placement> for PlanRow {
    fn from(p: &Placement) -> Self {
        Self {
            position: p.position,
            name: p.name.clone(),
            access: p.access.to_string(),
            is_static: if p.is_static { "yes" } else { "no" }.to_string(),
            priority: p.priority,
            header_index: p.header_index,
            lines: p.original.to_string(),
        }
    }
}

pub fn render_table(outcome: &Outcome) -> String {
    let rows: Vec<PlanRow> = outcome.placements.iter().map(PlanRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    table.to_string()
}

pub fn run(args: PlanArgs, ctx: &AppContext) -> Result<()> {
    let setup = Setup::new(&args.layout)?;
    let (header, source) = resolve_pair(&args.header, args.source.as_deref(), &setup.config)?;

    let header_text = read_file_smart(&header)?;
    let source_text = read_file_smart(&source)?;

    let outcome = setup
        .engine()
        .reorder(header_text.as_ref(), source_text.as_ref())
        .with_context(|| format!("Failed to plan {}", source.display()))?;

    if args.json {
        let report = PlanReport {
            header: header.display().to_string(),
            source: source.display().to_string(),
            changed: outcome.changed,
            placements: &outcome.placements,
            warnings: &outcome.warnings,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if ctx.verbose > 0 {
        for line in &outcome.diagnostics {
            println!("{line}");
        }
    }

    print_human(&outcome, &source, ctx);
    Ok(())
}

fn print_human(outcome: &Outcome, source: &Path, ctx: &AppContext) {
    if outcome.placements.is_empty() {
        println!("No matched definitions in {}", source.display());
    } else {
        println!("{}", render_table(outcome));
    }

    for w in &outcome.warnings {
        if ctx.no_color {
            println!("warning: {w}");
        } else {
            println!("{} {w}", "warning:".yellow());
        }
    }

    let status = if outcome.changed {
        "would be reordered"
    } else {
        "already in layout order"
    };
    if !ctx.quiet {
        println!("{}: {status}", source.display());
    }
}
