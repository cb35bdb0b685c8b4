use crate::cli::args::RunArgs;
use crate::cli::handlers::commons::{self, EnvContext};
use crate::core::cmdline;
use crate::models::Settings;
use crate::system::cancel::{self, Cancellation};
use crate::system::executor::{self, ExecutionError};
use anyhow::{Context, Result};
use scopeguard::defer;
use std::time::Duration;

/// Splits `line` and expands placeholders in every argument.
pub fn prepare_arguments(line: &str, settings: &Settings, env: &EnvContext) -> Result<Vec<String>> {
    let list = cmdline::tokenize(
        line,
        settings.cmdline.effective_max_args(),
        settings.cmdline.caret_escapes,
    )?;
    list.iter()
        .map(|arg| {
            commons::expand_with_env(
                arg.as_str(),
                &settings.expand,
                settings.expand.delimiter,
                settings.expand.preserve_escapes,
                env,
            )
            .map_err(Into::into)
        })
        .collect()
}

/// The command line `procline run` works on.
///
/// A single word is taken as a whole command line, quoting included. Several
/// words have already been split by the invoking shell, so they are assembled
/// back into a line that splits into the same words.
pub fn command_line(words: &[String], settings: &Settings) -> Result<String> {
    match words {
        [line] => Ok(line.clone()),
        _ => Ok(cmdline::assemble_strings(
            words,
            true,
            settings.cmdline.apply_child_process_escapes,
        )?),
    }
}

/// Runs the command under `cancellation`, mapping a non-zero exit code to an error.
pub fn run_line(
    args: &RunArgs,
    settings: &Settings,
    env: &EnvContext,
    cancellation: &Cancellation,
) -> Result<()> {
    let line = command_line(&args.line, settings)?;
    let argv = prepare_arguments(&line, settings, env)
        .with_context(|| format!("Could not prepare command line '{}'", line))?;
    log::debug!("Prepared arguments: {:?}", argv);

    let poll_interval = Duration::from_millis(settings.cancel.poll_interval_ms.max(1));
    let status = executor::execute_args(&argv, args.cwd.as_deref(), cancellation, poll_interval)?;
    if status.success() {
        return Ok(());
    }
    // A child killed by a signal has no code; report it as a plain failure.
    let code = status.code().unwrap_or(1);
    Err(ExecutionError::NonZeroExitStatus(line, code).into())
}

/// Entry point for `procline run`.
pub fn handle(args: RunArgs, settings: &Settings) -> Result<()> {
    let cancellation = cancel::global();
    cancellation.enable(args.ignore_cancel || settings.cancel.ignore_initially)?;
    defer! {
        if let Err(e) = cancellation.disable() {
            log::warn!("Could not remove the console control handler: {}", e);
        }
    }

    let env = EnvContext::from_process(settings.expand.delimiter);
    run_line(&args, settings, &env, cancellation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::console::DetachedConsole;
    use std::sync::Arc;

    fn env() -> EnvContext {
        EnvContext::new(
            [("GREETING".to_string(), "hello world".to_string())],
            '$',
        )
    }

    #[test]
    fn test_prepare_expands_each_argument() {
        let argv = prepare_arguments(r#"echo "$GREETING$" $UNSET$"#, &Settings::default(), &env()).unwrap();
        assert_eq!(argv, vec!["echo", "hello world", "$UNSET$"]);
    }

    #[test]
    fn test_expansion_happens_after_splitting() {
        // The expanded value contains a space but stays one argument.
        let argv = prepare_arguments("echo $GREETING$", &Settings::default(), &env()).unwrap();
        assert_eq!(argv, vec!["echo", "hello world"]);
    }

    #[test]
    fn test_separate_words_keep_their_spaces() {
        let words = vec!["echo".to_string(), "a b".to_string(), "$GREETING$".to_string()];
        let line = command_line(&words, &Settings::default()).unwrap();
        assert_eq!(line, r#"echo "a b" $GREETING$"#);

        let argv = prepare_arguments(&line, &Settings::default(), &env()).unwrap();
        assert_eq!(argv, vec!["echo", "a b", "hello world"]);
    }

    #[test]
    fn test_single_word_is_a_whole_command_line() {
        let words = vec![r#"echo "a b" c"#.to_string()];
        let line = command_line(&words, &Settings::default()).unwrap();
        let argv = prepare_arguments(&line, &Settings::default(), &env()).unwrap();
        assert_eq!(argv, vec!["echo", "a b", "c"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_line_reports_exit_code() {
        let cancellation = Cancellation::new(Arc::new(DetachedConsole::new()));
        let args = RunArgs {
            line: vec!["sh".to_string(), "-c".to_string(), "exit 4".to_string()],
            ..RunArgs::default()
        };
        let err = run_line(&args, &Settings::default(), &env(), &cancellation).unwrap_err();
        match err.downcast_ref::<ExecutionError>() {
            Some(ExecutionError::NonZeroExitStatus(_, code)) => assert_eq!(*code, 4),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_run_line_succeeds() {
        let cancellation = Cancellation::new(Arc::new(DetachedConsole::new()));
        let args = RunArgs {
            line: vec!["true".to_string()],
            ..RunArgs::default()
        };
        assert!(run_line(&args, &Settings::default(), &env(), &cancellation).is_ok());
    }
}
