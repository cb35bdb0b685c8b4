//! # System Interaction Layer
//!
//! The boundary between the pure transforms in `core` and the operating system.
//!
//! ## Modules
//!
//! - **`cancel`**: the process-wide cancellation service. It owns the manual-reset
//!   cancellation event and keeps the console control handler, the inherited
//!   "ignore Ctrl+C" attribute and the console input mode in step with it.
//! - **`console`**: the OS seam for console control (Win32, POSIX and a detached host).
//! - **`executor`**: launches a child process from an argument vector and kills it when
//!   cancellation fires.
//! - **`settings_config`**: loads `settings.toml`, writing the defaults on first use.

/// Cancellation service.
pub mod cancel;
/// Console control hosts.
pub mod console;
/// Child process execution.
pub mod executor;
/// Settings file loading.
pub mod settings_config;
