// src/cli/args.rs
use clap::Args;
use std::path::PathBuf;

/// Arguments of `procline split`.
#[derive(Args, Debug, Default)]
pub struct SplitArgs {
    /// The command line to split.
    pub line: String,

    /// Stop splitting after this many arguments; the rest joins the last one.
    #[arg(long)]
    pub max_args: Option<usize>,

    /// Pass `^x` pairs through untouched.
    #[arg(long)]
    pub caret_escapes: bool,
}

/// Arguments of `procline join`.
#[derive(Args, Debug, Default)]
pub struct JoinArgs {
    /// Do not wrap arguments containing spaces in quotes.
    #[arg(long)]
    pub no_quotes: bool,

    /// Copy arguments verbatim instead of escaping backslashes and quotes.
    #[arg(long)]
    pub raw: bool,

    /// The arguments to join.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Arguments of `procline expand`.
#[derive(Args, Debug, Default)]
pub struct ExpandArgs {
    /// The template to expand.
    pub template: String,

    /// Placeholder delimiter. Defaults to the configured one (`$`).
    #[arg(long, short)]
    pub delimiter: Option<char>,

    /// Keep `^` escape characters in the output.
    #[arg(long)]
    pub preserve_escapes: bool,
}

/// Arguments of `procline run`.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Working directory for the child process.
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Start with Ctrl+C ignored; closing the terminal still cancels.
    #[arg(long)]
    pub ignore_cancel: bool,

    /// The command to run: either one quoted command line (`"echo \"a b\""`)
    /// or the program and its arguments as separate words (`echo "a b"`).
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    pub line: Vec<String>,
}
