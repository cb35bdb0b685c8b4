// src/bin/procline.rs

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use procline::{
    cli::{Cli, Commands, handlers},
    constants::CANCELLED_EXIT_CODE,
    system::{cancel::CancelError, executor::ExecutionError, settings_config},
};

/// Sets up logging, parses arguments, dispatches to the handler and maps
/// errors to exit codes.
fn main() {
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse()) {
        if let Some(exec_err) = e.downcast_ref::<ExecutionError>() {
            match exec_err {
                // Interrupted: exit silently, like a shell does.
                ExecutionError::Cancelled => std::process::exit(CANCELLED_EXIT_CODE),
                // The child already reported its own failure.
                ExecutionError::NonZeroExitStatus(_, code) => std::process::exit(*code),
                _ => {}
            }
        }
        if matches!(e.downcast_ref::<CancelError>(), Some(CancelError::Cancelled)) {
            std::process::exit(CANCELLED_EXIT_CODE);
        }

        eprintln!("\n{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);
    let settings = settings_config::load_settings(cli.config.as_deref())
        .context("Could not load procline settings")?;

    match cli.command {
        Commands::Split(args) => handlers::split::handle(args, &settings),
        Commands::Join(args) => handlers::join::handle(args, &settings),
        Commands::Expand(args) => handlers::expand::handle(args, &settings),
        Commands::Run(args) => handlers::run::handle(args, &settings),
    }
}
