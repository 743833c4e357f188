use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

fn main() -> ExitCode {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn try_main() -> anyhow::Result<()> {
    goodreads_backup::logging::init().context("init logging")?;

    let cli = goodreads_backup::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        goodreads_backup::cli::Command::Backup(args) => {
            goodreads_backup::backup::run(args).context("backup")?;
        }
    }

    Ok(())
}
