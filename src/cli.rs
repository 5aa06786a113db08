use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::{core::layout::GapPolicy, parsers::ExtractorKind};

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
    pub verbose: u8,    // global -v count
}

#[derive(Parser)]
#[command(name = "cpplayout")]
#[command(
    about = "Reorders C++ function implementations to follow their header declarations and layout rules"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress spinners and non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without writing any file
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Print diagnostics (-v), debug logs (-vv), trace logs (-vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reorder one implementation file to follow its header
    Reorder(ReorderArgs),

    /// Show the computed order without rewriting anything
    Plan(PlanArgs),

    /// Reorder every header/source pair under a directory
    Batch(BatchArgs),

    /// Initialize a cpplayout.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Options shared by every command that runs the engine
#[derive(Args, Debug, Clone, Default)]
pub struct LayoutArgs {
    /// Layout rules file (JSON, TOML or YAML)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Declaration/definition extractor
    #[arg(long, value_enum)]
    pub extractor: Option<ExtractorKind>,

    /// Where non-function content goes after reordering
    #[arg(long, value_enum)]
    pub gap_policy: Option<GapPolicy>,
}

#[derive(Parser, Debug)]
pub struct ReorderArgs {
    /// Header file (.h, .hpp, .hh, .hxx)
    pub header: PathBuf,

    /// Implementation file; defaults to the header's sibling .cpp/.cc
    pub source: Option<PathBuf>,

    /// Write the result here instead of overwriting the source
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Write the result into this directory under the source's file name
    #[arg(long, value_name = "DIR", conflicts_with = "output")]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub layout: LayoutArgs,

    /// Print a unified diff of the change
    #[arg(long)]
    pub diff: bool,

    /// Exit with status 1 if the file is not already in layout order
    #[arg(long)]
    pub check: bool,
}

#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// Header file
    pub header: PathBuf,

    /// Implementation file; defaults to the header's sibling .cpp/.cc
    pub source: Option<PathBuf>,

    #[command(flatten)]
    pub layout: LayoutArgs,

    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct BatchArgs {
    /// Root directory to scan
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Additional glob patterns to ignore
    #[arg(short, long)]
    pub ignore: Vec<String>,

    /// Descend into hidden (dot) directories
    #[arg(long)]
    pub hidden: bool,

    /// Maximum directory depth below the root
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    #[command(flatten)]
    pub layout: LayoutArgs,

    /// Report unsorted pairs and exit with status 1 instead of rewriting
    #[arg(long)]
    pub check: bool,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; required unless --stdout is set
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
