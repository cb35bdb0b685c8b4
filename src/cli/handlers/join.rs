use crate::cli::args::JoinArgs;
use crate::core::cmdline;
use crate::models::Settings;
use anyhow::Result;

/// Assembles the arguments. The flags can only turn quoting and escaping off.
pub fn join(args: &JoinArgs, settings: &Settings) -> Result<String> {
    let enclose = settings.cmdline.enclose_in_quotes && !args.no_quotes;
    let escapes = settings.cmdline.apply_child_process_escapes && !args.raw;
    Ok(cmdline::assemble_strings(&args.args, enclose, escapes)?)
}

/// Entry point for `procline join`.
pub fn handle(args: JoinArgs, settings: &Settings) -> Result<()> {
    println!("{}", join(&args, settings)?);
    Ok(())
}
