// src/cli/handlers/commons.rs

// Shared by the `expand` and `run` handlers.

use crate::core::expander::{self, ExpandOutput};
use crate::core::string_view::{StringView, ViewError};
use crate::models::ExpandSettings;
use std::collections::HashMap;

/// A snapshot of the environment for placeholder resolution. Taking a
/// snapshot keeps the resolver's answers stable if it has to be retried.
#[derive(Debug, Clone)]
pub struct EnvContext {
    vars: HashMap<String, String>,
    delimiter: char,
}

impl EnvContext {
    /// Builds a context from explicit name/value pairs. Unknown names are
    /// written back wrapped in `delimiter`.
    pub fn new(vars: impl IntoIterator<Item = (String, String)>, delimiter: char) -> Self {
        Self {
            vars: vars
                .into_iter()
                .map(|(key, value)| (normalize_key(&key), value))
                .collect(),
            delimiter,
        }
    }

    /// Snapshots the process environment. Entries whose name or value is not
    /// valid Unicode cannot be named in a template and are skipped.
    pub fn from_process(delimiter: char) -> Self {
        let vars = std::env::vars_os().filter_map(|(key, value)| {
            match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => Some((key, value)),
                (key, _) => {
                    log::debug!("Skipping non-Unicode environment entry {:?}.", key);
                    None
                }
            }
        });
        Self::new(vars, delimiter)
    }

    /// Looks a variable up by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(&normalize_key(name)).map(String::as_str)
    }
}

/// Environment names are case-insensitive on Windows.
fn normalize_key(key: &str) -> String {
    if cfg!(windows) {
        key.to_uppercase()
    } else {
        key.to_string()
    }
}

/// Writes the variable's value, or the placeholder itself when it is not set.
pub fn resolve_env(name: &str, out: &mut ExpandOutput<'_>, env: &EnvContext) -> usize {
    match env.get(name) {
        Some(value) => out.write_str(value),
        None => out.push(env.delimiter) + out.write_str(name) + out.push(env.delimiter),
    }
}

/// Expands `template` against `env` with the configured delimiter and buffer size.
pub fn expand_with_env(
    template: &str,
    settings: &ExpandSettings,
    delimiter: char,
    preserve_escapes: bool,
    env: &EnvContext,
) -> Result<String, ViewError> {
    let mut output = StringView::new();
    output.allocate(settings.initial_capacity)?;
    expander::expand(
        template,
        delimiter,
        preserve_escapes,
        resolve_env,
        env,
        &mut output,
    )?;
    Ok(output.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> EnvContext {
        EnvContext::new(
            [
                ("HOME".to_string(), "/home/ada".to_string()),
                ("EMPTY".to_string(), String::new()),
            ],
            '$',
        )
    }

    #[test]
    fn test_known_and_unknown_variables() {
        let settings = ExpandSettings::default();
        let result =
            expand_with_env("$HOME$/bin:$MISSING$:[$EMPTY$]", &settings, '$', false, &env())
                .unwrap();
        assert_eq!(result, "/home/ada/bin:$MISSING$:[]");
    }

    #[cfg(unix)]
    #[test]
    #[allow(unsafe_code)]
    fn test_from_process_skips_non_unicode_values() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        // SAFETY: only this test touches these variable names.
        unsafe {
            std::env::set_var("PROCLINE_TEST_NOT_UTF8", OsStr::from_bytes(b"\xff\xfe"));
            std::env::set_var("PROCLINE_TEST_PLAIN", "ok");
        }

        let env = EnvContext::from_process('$');

        assert_eq!(env.get("PROCLINE_TEST_NOT_UTF8"), None);
        assert_eq!(env.get("PROCLINE_TEST_PLAIN"), Some("ok"));
        unsafe {
            std::env::remove_var("PROCLINE_TEST_NOT_UTF8");
            std::env::remove_var("PROCLINE_TEST_PLAIN");
        }
    }

    #[test]
    fn test_unknown_variable_retry_keeps_output_intact() {
        // A tiny buffer forces the unknown-name fallback through the grow path.
        let settings = ExpandSettings {
            initial_capacity: 2,
            ..ExpandSettings::default()
        };
        let result = expand_with_env("x$SOME_LONG_NAME$y", &settings, '$', false, &env()).unwrap();
        assert_eq!(result, "x$SOME_LONG_NAME$y");
    }
}
