//! `batch` command: every header/implementation pair under a directory,
//! processed in parallel.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use rayon::prelude::*;
use tracing::{instrument, warn};

use crate::{
    cli::{AppContext, BatchArgs},
    core::{
        error::CheckFailed,
        reorder::Setup,
    },
    infra::{
        config::Config,
        io::{read_file_smart, write_atomic},
        walk::FileWalker,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePair {
    pub header: PathBuf,
    pub source: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairStatus {
    Ordered,
    Reordered,
    /// `--check` or `--dry-run`: would be reordered
    Unsorted,
    Failed(String),
}

/// Pair each header with a same-stem source: the same directory first,
/// else the only same-stem source anywhere in the walk
pub fn pair_files(files: &[PathBuf], config: &Config) -> Vec<SourcePair> {
    let sources: Vec<&PathBuf> = files.iter().filter(|p| config.is_source(p)).collect();

    let mut by_stem: HashMap<&std::ffi::OsStr, Vec<&PathBuf>> = HashMap::new();
    for s in &sources {
        if let Some(stem) = s.file_stem() {
            by_stem.entry(stem).or_default().push(s);
        }
    }

    files
        .iter()
        .filter(|p| config.is_header(p))
        .filter_map(|header| {
            let stem = header.file_stem()?;
            let candidates = by_stem.get(stem)?;
            let same_dir = candidates
                .iter()
                .find(|s| s.parent() == header.parent());
            let source = match (same_dir, candidates.as_slice()) {
                (Some(s), _) => *s,
                (None, [only]) => *only,
                _ => return None,
            };
            Some(SourcePair {
                header: header.clone(),
                source: source.clone(),
            })
        })
        .collect()
}

fn process_pair(pair: &SourcePair, setup: &Setup, ctx: &AppContext, check: bool) -> PairStatus {
    let run = || -> Result<PairStatus> {
        let header = read_file_smart(&pair.header)?;
        let source = read_file_smart(&pair.source)?;
        let outcome = setup.engine().reorder(header.as_ref(), source.as_ref())?;

        if !outcome.changed {
            return Ok(PairStatus::Ordered);
        }
        if check || ctx.dry_run {
            return Ok(PairStatus::Unsorted);
        }
        write_atomic(&pair.source, outcome.output.as_bytes())?;
        Ok(PairStatus::Reordered)
    };

    run().unwrap_or_else(|e| {
        warn!(source = %pair.source.display(), "{e:#}");
        PairStatus::Failed(format!("{e:#}"))
    })
}

fn display_rel(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

#[instrument(skip_all, fields(root = %args.path.display()))]
pub fn run(args: BatchArgs, ctx: &AppContext) -> Result<()> {
    let setup = Setup::new(&args.layout)?;

    let mut ignores = setup.config.batch.ignore_patterns.clone();
    ignores.extend(args.ignore.iter().cloned());

    let walker = FileWalker::new(&ignores)?
        .with_include_hidden(args.hidden)
        .with_max_depth(args.max_depth);
    let files = walker.walk_with_filter(&args.path, |p| {
        setup.config.is_header(p) || setup.config.is_source(p)
    });
    let pairs = pair_files(&files, &setup.config);

    if pairs.is_empty() {
        if !ctx.quiet {
            println!("No header/implementation pairs under {}", args.path.display());
        }
        return Ok(());
    }

    let progress = if ctx.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(pairs.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    };

    let statuses: Vec<PairStatus> = pairs
        .par_iter()
        .map(|pair| {
            let status = process_pair(pair, &setup, ctx, args.check);
            progress.inc(1);
            status
        })
        .collect();
    progress.finish_and_clear();

    let mut reordered = 0;
    let mut ordered = 0;
    let mut unsorted = 0;
    let mut failed = 0;

    for (pair, status) in pairs.iter().zip(&statuses) {
        let name = display_rel(&pair.source, &args.path);
        match status {
            PairStatus::Ordered => ordered += 1,
            PairStatus::Reordered => {
                reordered += 1;
                if !ctx.quiet {
                    println!("reordered {name}");
                }
            }
            PairStatus::Unsorted => {
                unsorted += 1;
                if !ctx.quiet {
                    println!("not in layout order: {name}");
                }
            }
            PairStatus::Failed(msg) => {
                failed += 1;
                if ctx.no_color {
                    eprintln!("error: {name}: {msg}");
                } else {
                    eprintln!("{} {name}: {msg}", "error:".red());
                }
            }
        }
    }

    if !ctx.quiet {
        println!(
            "{} pairs: {reordered} reordered, {ordered} already ordered, {unsorted} unsorted, {failed} failed",
            pairs.len()
        );
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} pairs failed", pairs.len());
    }
    if args.check && unsorted > 0 {
        return Err(CheckFailed { count: unsorted }.into());
    }
    Ok(())
}
