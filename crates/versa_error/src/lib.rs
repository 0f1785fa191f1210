//! Error types for the Versa bot framework.
//!
//! Every error follows the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines the specific error condition
//! - `*Error` struct wraps the kind with source location tracking
//! - constructors use `#[track_caller]` so the location is captured automatically
//!
//! All of them convert into [`VersaError`], so `?` works across the workspace.
//!
//! # Examples
//!
//! ```
//! use versa_error::{ConfigError, VersaResult};
//!
//! fn read_token() -> VersaResult<String> {
//!     Err(ConfigError::new("BOT_TOKEN is not set"))?
//! }
//!
//! assert!(read_token().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod command;
mod config;
mod database;
mod discord;
mod error;

pub use cache::{CacheError, CacheErrorKind};
pub use command::{CommandError, CommandErrorKind};
pub use config::ConfigError;
pub use database::{DatabaseError, DatabaseErrorKind};
pub use discord::{DiscordError, DiscordErrorKind};
pub use error::{VersaError, VersaErrorKind, VersaResult};
