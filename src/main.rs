use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use cpplayout::{
    cli::{AppContext, Cli, Commands},
    core::error::{CheckFailed, EngineError, ExtractionError, InputError},
    infra::logging,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
        verbose: cli.verbose,
    };

    // Already-installed subscriber is the only failure; keep going
    let _ = logging::init(ctx.verbose, ctx.no_color);

    match dispatch(cli.command, &ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = exit_code(&err);
            // --check reports its own findings on stdout
            if code != 1 || !ctx.quiet {
                eprintln!("Error: {err:#}");
            }
            ExitCode::from(code)
        }
    }
}

fn dispatch(command: Commands, ctx: &AppContext) -> Result<()> {
    match command {
        Commands::Reorder(args) => cpplayout::reorder_run(args, ctx),
        Commands::Plan(args) => cpplayout::plan_run(args, ctx),
        Commands::Batch(args) => cpplayout::batch_run(args, ctx),
        Commands::Init(args) => cpplayout::infra::config_init(args, ctx),
        Commands::Completions(args) => cpplayout::completion::run(args, ctx),
    }
}

/// 1 unsorted (--check), 2 duplicate signature, 3 bad input or config,
/// 4 everything else
fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if cause.is::<CheckFailed>() {
            return 1;
        }
        if let Some(engine) = cause.downcast_ref::<EngineError>() {
            return match engine {
                EngineError::DuplicateSignature { .. } => 2,
                EngineError::Extraction { .. } | EngineError::Config(_) => 3,
                EngineError::Span(_) => 4,
            };
        }
        if cause.is::<ExtractionError>() || cause.is::<InputError>() {
            return 3;
        }
    }
    4
}
