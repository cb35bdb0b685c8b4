use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Argument structs for each subcommand.
pub mod args;
/// One handler per subcommand.
pub mod handlers;

/// procline: split, rebuild and expand command lines, and run them with
/// Ctrl+C handled the way a console shell does.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = None,
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Read settings from this file instead of `<config dir>/procline/settings.toml`.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// The `procline` subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split a command line into arguments and print them as a JSON array.
    Split(args::SplitArgs),
    /// Join arguments into a command line a child process will split back.
    Join(args::JoinArgs),
    /// Expand `$NAME$` placeholders from the environment.
    Expand(args::ExpandArgs),
    /// Split, expand and launch a command line, killing it on Ctrl+C.
    Run(args::RunArgs),
}
