//! `reorder` command: one header/implementation pair.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use similar::TextDiff;
use tracing::{info, instrument};

use crate::{
    cli::{AppContext, LayoutArgs, ReorderArgs},
    core::{
        engine::{Engine, Outcome, Stage, StageObserver},
        error::{CheckFailed, EngineError, InputError},
        layout::LayoutRules,
        metrics::ContentMetrics,
    },
    infra::{
        config::{Config, load_config},
        io::{read_file_smart, write_atomic},
    },
    parsers::{Extractor, get_extractor},
};

/// Everything a command needs before reading any input
pub struct Setup {
    pub config: Config,
    pub rules: LayoutRules,
    pub extractor: Box<dyn Extractor>,
}

impl Setup {
    /// Load config (defaults when no file is present), compile rules and
    /// pick the extractor. A config file that does not deserialize and rule
    /// errors both surface here, before any file is read.
    pub fn new(args: &LayoutArgs) -> Result<Self> {
        let config = load_config().map_err(|e| EngineError::Config(format!("{e:#}")))?;
        let rules = config.layout_rules(args)?;
        let extractor = get_extractor(config.extractor(args))?;
        Ok(Self {
            config,
            rules,
            extractor,
        })
    }

    pub fn engine(&self) -> Engine<'_> {
        Engine::new(self.extractor.as_ref(), &self.rules)
    }
}

/// Validate the header and find its implementation file.
///
/// Without an explicit source, the first existing sibling with a source
/// extension is used (`widget.h` -> `widget.cpp`, `widget.cc`, ...).
pub fn resolve_pair(
    header: &Path,
    source: Option<&Path>,
    config: &Config,
) -> Result<(PathBuf, PathBuf), InputError> {
    if !config.is_header(header) {
        return Err(InputError::NotAHeader {
            path: header.to_path_buf(),
            expected: config.reorder.header_extensions.join("/."),
        });
    }
    if !header.is_file() {
        return Err(InputError::Missing {
            path: header.to_path_buf(),
        });
    }

    let source = match source {
        Some(path) => {
            if !config.is_source(path) {
                return Err(InputError::NotASource {
                    path: path.to_path_buf(),
                    expected: config.reorder.source_extensions.join("/."),
                });
            }
            if !path.is_file() {
                return Err(InputError::Missing {
                    path: path.to_path_buf(),
                });
            }
            path.to_path_buf()
        }
        None => config
            .reorder
            .source_extensions
            .iter()
            .map(|ext| header.with_extension(ext))
            .find(|p| p.is_file())
            .ok_or_else(|| InputError::NoSibling {
                header: header.to_path_buf(),
            })?,
    };

    Ok((header.to_path_buf(), source))
}

/// Spinner that shows the current pipeline stage
pub struct SpinnerObserver {
    bar: ProgressBar,
}

impl SpinnerObserver {
    pub fn new(ctx: &AppContext) -> Self {
        let bar = if ctx.quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
                pb.set_style(style);
            }
            pb.set_message(Stage::ExtractHeader.label());
            pb
        };
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl StageObserver for SpinnerObserver {
    fn stage_done(&self, stage: Stage) {
        let next = match stage {
            Stage::ExtractHeader => Stage::ExtractSource,
            Stage::ExtractSource => Stage::Match,
            Stage::Match => Stage::Order,
            Stage::Order | Stage::Reconstruct => Stage::Reconstruct,
        };
        self.bar.set_message(next.label());
        self.bar.tick();
    }
}

/// Where the result goes: `-o`, then `--output-dir`, then the configured
/// output directory, else the source itself
fn target_path(args: &ReorderArgs, config: &Config, source: &Path) -> PathBuf {
    if let Some(out) = &args.output {
        return out.clone();
    }
    let dir = args
        .output_dir
        .as_ref()
        .or(config.reorder.output_dir.as_ref());
    match (dir, source.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => source.to_path_buf(),
    }
}

pub fn unified_diff(old: &str, new: &str, path: &Path) -> String {
    let name = path.display().to_string();
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{name}"), &format!("b/{name}"))
        .to_string()
}

pub fn print_warnings(outcome: &Outcome, ctx: &AppContext) {
    if ctx.quiet {
        return;
    }
    for w in &outcome.warnings {
        if ctx.no_color {
            eprintln!("warning: {w}");
        } else {
            eprintln!("{} {w}", "warning:".yellow());
        }
    }
}

#[instrument(skip_all, fields(header = %args.header.display()))]
pub fn run(args: ReorderArgs, ctx: &AppContext) -> Result<()> {
    let setup = Setup::new(&args.layout)?;
    let (header, source) = resolve_pair(&args.header, args.source.as_deref(), &setup.config)?;

    let header_text = read_file_smart(&header)?;
    let source_text = read_file_smart(&source)?;
    let original = source_text.as_ref();

    let spinner = SpinnerObserver::new(ctx);
    let outcome = setup
        .engine()
        .run(header_text.as_ref(), original, &spinner)
        .with_context(|| format!("Failed to reorder {}", source.display()));
    spinner.finish();
    let outcome = outcome?;

    if ctx.verbose > 0 {
        for line in &outcome.diagnostics {
            println!("{line}");
        }
    }
    print_warnings(&outcome, ctx);

    let before = ContentMetrics::measure(original);
    let after = ContentMetrics::measure(&outcome.output);
    if ctx.verbose > 0 {
        println!("Before: {before}");
        println!("After:  {after}");
    }
    for drift in before.drift(&after) {
        eprintln!("warning: {drift}");
    }

    if args.diff && outcome.changed {
        print!("{}", unified_diff(original, &outcome.output, &source));
    }

    if args.check {
        if outcome.changed {
            if !ctx.quiet {
                println!("{} is not in layout order", source.display());
            }
            return Err(CheckFailed { count: 1 }.into());
        }
        if !ctx.quiet {
            println!("{} is in layout order", source.display());
        }
        return Ok(());
    }

    let target = target_path(&args, &setup.config, &source);

    if ctx.dry_run {
        if !args.diff {
            print!("{}", outcome.output);
        }
        if !ctx.quiet {
            eprintln!("Dry run completed. No files were modified.");
        }
        return Ok(());
    }

    if !outcome.changed && target == source {
        info!("already in layout order");
        if !ctx.quiet {
            println!("{} is already in layout order", source.display());
        }
        return Ok(());
    }

    if let Some(dir) = target.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    write_atomic(&target, outcome.output.as_bytes())?;

    if !ctx.quiet {
        let msg = format!("Successfully reordered functions in {}", target.display());
        if ctx.no_color {
            println!("✓ {msg}");
        } else {
            println!("{} {msg}", "✓".green());
        }
    }
    Ok(())
}
