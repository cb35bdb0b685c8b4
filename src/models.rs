// src/models.rs

use crate::constants::{DEFAULT_DELIMITER, DEFAULT_EXPAND_CAPACITY, DEFAULT_POLL_INTERVAL_MS};
use serde::{Deserialize, Serialize};

// --- `settings.toml` MODELS ---

/// The deserialized structure of `settings.toml`. Every section and field is optional.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// `[cmdline]` section.
    pub cmdline: CmdlineSettings,
    /// `[expand]` section.
    pub expand: ExpandSettings,
    /// `[cancel]` section.
    pub cancel: CancelSettings,
}

/// How command lines are split and rebuilt.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CmdlineSettings {
    /// Upper bound on the number of arguments; unlimited when absent.
    pub max_args: Option<usize>,
    /// Pass `^x` pairs through the tokenizer untouched.
    pub caret_escapes: bool,
    /// Quote arguments that contain spaces when assembling.
    pub enclose_in_quotes: bool,
    /// Escape backslashes and quotes for the child's C runtime.
    pub apply_child_process_escapes: bool,
}

impl Default for CmdlineSettings {
    fn default() -> Self {
        Self {
            max_args: None,
            caret_escapes: false,
            enclose_in_quotes: true,
            apply_child_process_escapes: true,
        }
    }
}

impl CmdlineSettings {
    /// The argument limit, `usize::MAX` when none is configured.
    pub fn effective_max_args(&self) -> usize {
        self.max_args.unwrap_or(usize::MAX)
    }
}

/// How `$NAME$` placeholders are expanded.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ExpandSettings {
    /// Character that opens and closes a placeholder.
    pub delimiter: char,
    /// Keep `^` escape characters in the output.
    pub preserve_escapes: bool,
    /// Starting size of the output buffer, in code units.
    pub initial_capacity: usize,
}

impl Default for ExpandSettings {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            preserve_escapes: false,
            initial_capacity: DEFAULT_EXPAND_CAPACITY,
        }
    }
}

/// How `procline run` reacts to Ctrl+C.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CancelSettings {
    /// Start with user interrupts ignored (terminal closure still cancels).
    pub ignore_initially: bool,
    /// How often a running child is polled, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for CancelSettings {
    fn default() -> Self {
        Self {
            ignore_initially: false,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_fill_defaults() {
        let toml_str = r#"
            [expand]
            delimiter = "%"

            [cmdline]
            max_args = 3
        "#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.expand.delimiter, '%');
        assert_eq!(settings.expand.initial_capacity, DEFAULT_EXPAND_CAPACITY);
        assert_eq!(settings.cmdline.effective_max_args(), 3);
        assert!(settings.cmdline.enclose_in_quotes);
        assert_eq!(settings.cancel, CancelSettings::default());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let toml_str = r#"
            [cancel]
            ignore_initialy = true # Typo: should be `ignore_initially`
        "#;
        let result: Result<Settings, _> = toml::from_str(toml_str);
        assert!(result.is_err(), "Should fail due to unknown field");
        let error_msg = result.unwrap_err().to_string();
        assert!(
            error_msg.contains("unknown field `ignore_initialy`"),
            "Error message was: {}",
            error_msg
        );
    }

    #[test]
    fn test_default_settings_survive_toml() {
        let text = toml::to_string_pretty(&Settings::default()).unwrap();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, Settings::default());
    }
}
