//! # Core
//!
//! Pure text transforms with no process-wide state.
//!
//! - **`string_view`**: character ranges with explicit length and capacity that may share
//!   a reference-counted buffer.
//! - **`cmdline`**: command line to argument vector and back, bit-exact with what a C
//!   runtime expects.
//! - **`expander`**: `$NAME$` placeholder expansion through a caller-supplied resolver.
//! - **`paths`**: location of the settings directory.

/// Command line tokenizer and assembler.
pub mod cmdline;
/// Placeholder expansion.
pub mod expander;
/// Configuration paths.
pub mod paths;
/// Shared, length-tracked string views.
pub mod string_view;
