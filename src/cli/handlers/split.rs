use crate::cli::args::SplitArgs;
use crate::core::cmdline;
use crate::models::Settings;
use anyhow::Result;

/// Splits `line` using the CLI flags, falling back to `settings`.
pub fn split(args: &SplitArgs, settings: &Settings) -> Result<Vec<String>> {
    let max_args = args
        .max_args
        .unwrap_or_else(|| settings.cmdline.effective_max_args());
    let caret_escapes = args.caret_escapes || settings.cmdline.caret_escapes;
    let list = cmdline::tokenize(&args.line, max_args, caret_escapes)?;
    log::debug!("Split {:?} into {} arguments.", args.line, list.len());
    Ok(list.to_strings())
}

/// Entry point for `procline split`.
pub fn handle(args: SplitArgs, settings: &Settings) -> Result<()> {
    let parts = split(&args, settings)?;
    println!("{}", serde_json::to_string_pretty(&parts)?);
    Ok(())
}
