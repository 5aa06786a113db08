//! `cpplayout completions`: shell completion scripts via clap_complete.

use anyhow::{Context, Result, bail};
use clap::CommandFactory;
use clap_complete::{Generator, Shell as CompletionShell, generate};
use std::{fs, io::Write};

use crate::{
    cli::{AppContext, Cli, CompletionsArgs, Shell},
    infra::io::write_atomic,
};

pub const BIN_NAME: &str = "cpplayout";

impl From<Shell> for CompletionShell {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Bash => CompletionShell::Bash,
            Shell::Zsh => CompletionShell::Zsh,
            Shell::Fish => CompletionShell::Fish,
            Shell::PowerShell => CompletionShell::PowerShell,
            Shell::Elvish => CompletionShell::Elvish,
        }
    }
}

/// Render the completion script for `shell` into memory
fn render(shell: CompletionShell) -> Vec<u8> {
    let mut buf = Vec::new();
    generate(shell, &mut Cli::command(), BIN_NAME, &mut buf);
    buf
}

pub fn run(args: CompletionsArgs, ctx: &AppContext) -> Result<()> {
    let shell: CompletionShell = args.shell.into();
    let script = render(shell);

    if args.stdout {
        std::io::stdout()
            .lock()
            .write_all(&script)
            .context("write completion to stdout")?;
        return Ok(());
    }

    let Some(dir) = args.out_dir else {
        bail!("--out-dir is required unless --stdout is set");
    };
    let path = dir.join(shell.file_name(BIN_NAME));

    if ctx.dry_run {
        println!("Would write {shell} completion to {}", path.display());
        return Ok(());
    }

    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    write_atomic(&path, &script)?;

    if !ctx.quiet {
        eprintln!("Wrote {shell} completion to {}", path.display());
    }
    Ok(())
}
