// src/system/executor.rs

use crate::core::cmdline;
use crate::core::string_view::ViewError;
use crate::system::cancel::Cancellation;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Child, Command as StdCommand, ExitStatus};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while launching or waiting for a child process.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// There was no program to run.
    #[error("No command specified to run.")]
    EmptyCommand,
    /// Spawning or waiting failed; holds the command line.
    #[error("Command '{0}' could not be executed: {1}")]
    CommandFailed(String, std::io::Error),
    /// The child command line could not be built.
    #[error("Could not build the child command line: {0}")]
    View(#[from] ViewError),
    /// The child ran and exited with a non-zero code.
    #[error("Command '{0}' exited with code {1}.")]
    NonZeroExitStatus(String, i32),
    /// Cancellation fired; the child was killed.
    #[error("Operation was cancelled by the user.")]
    Cancelled,
}

/// Launches `args[0]` with the remaining arguments and waits for it, killing it
/// if `cancellation` fires first.
///
/// On Windows the child receives exactly the string [`cmdline::assemble`]
/// builds, quoted and escaped for its C runtime. If the program is not found
/// there, the whole line is retried through `cmd /C` so shell builtins work.
pub fn execute_args<S: AsRef<str>>(
    args: &[S],
    cwd: Option<&Path>,
    cancellation: &Cancellation,
    poll_interval: Duration,
) -> Result<ExitStatus, ExecutionError> {
    let (program, rest) = args.split_first().ok_or(ExecutionError::EmptyCommand)?;
    let program = program.as_ref();
    if program.is_empty() {
        return Err(ExecutionError::EmptyCommand);
    }
    cancellation
        .check()
        .map_err(|_| ExecutionError::Cancelled)?;

    let full_line = cmdline::assemble_strings(args, true, true)?;
    log::debug!("Launching: {}", full_line);

    let mut command = StdCommand::new(program);
    add_arguments(&mut command, rest)?;
    if let Some(dir) = cwd {
        command.current_dir(dunce::simplified(dir));
    }

    let child = match command.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == ErrorKind::NotFound && cfg!(windows) => {
            log::debug!("Command '{}' not found. Retrying with cmd /C.", program);
            let mut fallback = StdCommand::new("cmd");
            fallback.arg("/C");
            add_raw_line(&mut fallback, &full_line);
            if let Some(dir) = cwd {
                fallback.current_dir(dunce::simplified(dir));
            }
            fallback
                .spawn()
                .map_err(|e| ExecutionError::CommandFailed(full_line.clone(), e))?
        }
        Err(e) => return Err(ExecutionError::CommandFailed(full_line, e)),
    };

    wait_cancellable(child, &full_line, cancellation, poll_interval)
}

#[cfg(windows)]
fn add_arguments<S: AsRef<str>>(command: &mut StdCommand, rest: &[S]) -> Result<(), ViewError> {
    if !rest.is_empty() {
        add_raw_line(command, &cmdline::assemble_strings(rest, true, true)?);
    }
    Ok(())
}

#[cfg(not(windows))]
fn add_arguments<S: AsRef<str>>(command: &mut StdCommand, rest: &[S]) -> Result<(), ViewError> {
    command.args(rest.iter().map(AsRef::as_ref));
    Ok(())
}

#[cfg(windows)]
fn add_raw_line(command: &mut StdCommand, line: &str) {
    use std::os::windows::process::CommandExt;
    command.raw_arg(line);
}

#[cfg(not(windows))]
fn add_raw_line(command: &mut StdCommand, line: &str) {
    command.arg(line);
}

/// Polls the child until it exits, waking early when cancellation is signalled.
fn wait_cancellable(
    mut child: Child,
    command_line: &str,
    cancellation: &Cancellation,
    poll_interval: Duration,
) -> Result<ExitStatus, ExecutionError> {
    let event = cancellation.get_event();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if cancellation.is_cancelled() {
                    log::debug!(
                        "Cancellation requested, killing child process (PID: {})...",
                        child.id()
                    );
                    if let Err(e) = child.kill() {
                        log::warn!("Failed to kill child process {}: {}", child.id(), e);
                    }
                    child.wait().ok();
                    return Err(ExecutionError::Cancelled);
                }
                event.wait_timeout(poll_interval);
            }
            Err(e) => {
                return Err(ExecutionError::CommandFailed(command_line.to_string(), e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::console::DetachedConsole;
    use std::sync::Arc;

    fn cancellation() -> Cancellation {
        Cancellation::new(Arc::new(DetachedConsole::new()))
    }

    #[test]
    fn test_empty_command_is_rejected() {
        let empty: [&str; 0] = [];
        let result = execute_args(&empty, None, &cancellation(), Duration::from_millis(10));
        assert!(matches!(result, Err(ExecutionError::EmptyCommand)));

        let blank = execute_args(&[""], None, &cancellation(), Duration::from_millis(10));
        assert!(matches!(blank, Err(ExecutionError::EmptyCommand)));
    }

    #[test]
    fn test_already_cancelled_does_not_launch() {
        let cancel = cancellation();
        cancel.set();
        let result = execute_args(
            &["definitely-not-a-real-program"],
            None,
            &cancel,
            Duration::from_millis(10),
        );
        assert!(matches!(result, Err(ExecutionError::Cancelled)));
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_program_fails_to_launch() {
        let result = execute_args(
            &["procline-no-such-program", "arg"],
            None,
            &cancellation(),
            Duration::from_millis(10),
        );
        assert!(matches!(result, Err(ExecutionError::CommandFailed(_, _))));
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_child_and_reports_status() {
        let cancel = cancellation();
        let ok = execute_args(&["sh", "-c", "exit 0"], None, &cancel, Duration::from_millis(10));
        assert!(ok.unwrap().success());

        let failed = execute_args(&["sh", "-c", "exit 3"], None, &cancel, Duration::from_millis(10));
        assert_eq!(failed.unwrap().code(), Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_cancellation_kills_running_child() {
        let cancel = Arc::new(cancellation());
        let trigger = Arc::clone(&cancel);
        let setter = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            trigger.set();
        });

        let started = std::time::Instant::now();
        let result = execute_args(&["sleep", "30"], None, &cancel, Duration::from_millis(20));
        setter.join().unwrap();

        assert!(matches!(result, Err(ExecutionError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
