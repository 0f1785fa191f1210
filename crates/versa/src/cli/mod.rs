//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the versa binary.

mod commands;
mod dbinit;
mod prompt;
mod run;

pub use commands::{Cli, Commands};
pub use dbinit::{init_database, init_database_command};
pub use run::run_bot;
