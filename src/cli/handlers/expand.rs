use crate::cli::args::ExpandArgs;
use crate::cli::handlers::commons::{self, EnvContext};
use crate::models::Settings;
use anyhow::Result;

/// Entry point for `procline expand`. Unset variables are printed as written.
pub fn handle(args: ExpandArgs, settings: &Settings) -> Result<()> {
    let delimiter = args.delimiter.unwrap_or(settings.expand.delimiter);
    let preserve_escapes = args.preserve_escapes || settings.expand.preserve_escapes;
    let env = EnvContext::from_process(delimiter);
    let expanded = commons::expand_with_env(
        &args.template,
        &settings.expand,
        delimiter,
        preserve_escapes,
        &env,
    )?;
    println!("{}", expanded);
    Ok(())
}
