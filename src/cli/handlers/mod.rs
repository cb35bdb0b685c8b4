// src/cli/handlers/mod.rs

// One module per subcommand.

/// Environment context and expansion helpers shared by handlers.
pub mod commons;
/// `procline expand`.
pub mod expand;
/// `procline join`.
pub mod join;
/// `procline run`.
pub mod run;
/// `procline split`.
pub mod split;
