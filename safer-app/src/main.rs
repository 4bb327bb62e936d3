use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command, log_config};
use safer_common::observability::init_logging;
use std::process::ExitCode;

mod cli;
mod commands;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(target: "safer.app", error = %format!("{e:#}"), "command failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    // Env overrides file values.
    let cfg = cli.load_config()?;

    init_logging(log_config(&cfg.logging, cli.verbose))?;

    match cli.command {
        Command::Lookup(args) => commands::lookup(cfg, args),
        Command::CheckConfig => commands::check_config(&cfg),
    }
}
