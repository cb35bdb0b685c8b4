//! procline: the process boundary of a console shell.
//!
//! Text becomes an argument vector ([`core::cmdline::tokenize`]), placeholders in
//! it are rewritten ([`core::expander::expand`]), the vector becomes the string a
//! child process sees ([`core::cmdline::assemble`]), and an interactive
//! cancellation signal is delivered to cooperating consumers
//! ([`system::cancel::Cancellation`]).

/// Command-line interface: clap definitions and handlers.
pub mod cli;
/// Shared constants.
pub mod constants;
/// Pure text transforms.
pub mod core;
/// Settings file models.
pub mod models;
/// Operating system boundary.
pub mod system;
