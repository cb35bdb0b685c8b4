// src/constants.rs

/// The character that makes the next character literal data, both for the
/// caret-aware tokenizer and for the variable expander.
pub const ESCAPE_CHAR: char = '^';

/// The default placeholder delimiter used by the variable expander (`$NAME$`).
pub const DEFAULT_DELIMITER: char = '$';

/// Initial size, in code units, of an expander output buffer that was handed in empty.
pub const DEFAULT_EXPAND_CAPACITY: usize = 256;

/// Factor by which an expander output buffer grows when a resolver needs more room.
pub const EXPAND_GROWTH_FACTOR: usize = 4;

/// How often the executor polls a running child for completion or cancellation.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Exit code reported when an operation was cancelled by the user.
pub const CANCELLED_EXIT_CODE: i32 = 130;

/// The name of the directory (under the system config dir) holding procline settings.
pub const CONFIG_DIR_NAME: &str = "procline";

/// The name of the settings file inside the config directory.
pub const SETTINGS_FILENAME: &str = "settings.toml";

// --- Console input mode bits (same values as the Win32 console API) ---

/// Ctrl+C is raised as a signal instead of being returned as input.
pub const ENABLE_PROCESSED_INPUT: u32 = 0x0001;
/// Reads return only when a carriage return is entered.
pub const ENABLE_LINE_INPUT: u32 = 0x0002;
/// Characters are echoed as they are read.
pub const ENABLE_ECHO_INPUT: u32 = 0x0004;

/// The mode an interactive front-end forces on while cancellation is enabled.
pub const INTERACTIVE_INPUT_MODE: u32 =
    ENABLE_PROCESSED_INPUT | ENABLE_LINE_INPUT | ENABLE_ECHO_INPUT;

// --- Console control codes ---

/// Ctrl+C was pressed.
pub const CTRL_C_EVENT: u32 = 0;
/// Ctrl+Break was pressed.
pub const CTRL_BREAK_EVENT: u32 = 1;
/// The console window is being closed.
pub const CTRL_CLOSE_EVENT: u32 = 2;
/// The user is logging off.
pub const CTRL_LOGOFF_EVENT: u32 = 5;
/// The system is shutting down.
pub const CTRL_SHUTDOWN_EVENT: u32 = 6;

/// Number of state transitions kept (with call stacks) in debug builds.
pub const TRANSITION_HISTORY_LEN: usize = 16;
