//! Runtime of the Versa Discord bot framework.
//!
//! A bot is a [`Core`] holding the settings, database adapter, cache and the
//! loaded extensions. The [`VersaHandler`] turns gateway events into command
//! invocations and listener calls.
//!
//! # Extensions
//!
//! Features live in extensions implementing [`Extension`]. Extensions are
//! registered at compile time in an [`ExtensionRegistry`] and selected by
//! name from `extensions.txt` and `local_extensions.txt`. The built-in
//! `essentials` extension is always loaded first.
//!
//! # Database
//!
//! [`Database`] wraps serenity objects together with their stored rows.
//! Users are opt-in: wrapping a user without a record fails until the user
//! registers.

#![warn(missing_docs)]

mod client;
mod command;
mod config;
mod controller;
mod db;
mod events;
mod extension;
mod handler;
mod logging;
mod runtime;

pub mod extensions;

pub use client::VersaBot;
pub use command::{
    Args, BucketIds, BucketType, Check, CheckInput, CommandContext, CommandRegistry, CommandSpec,
    Cooldown, CooldownBuckets, MAX_MESSAGE_LEN, RegisteredCommand, command_prefixes,
    match_prefix, mention_prefixes, run_checks, split_message,
};
pub use config::{
    DEFAULT_LANGUAGE, DEFAULT_NAMESPACE, DatabaseSettings, ENV_VARS, EXTENSIONS_FILE,
    LOCAL_EXTENSIONS_FILE, Overrides, RunMode, Settings, config_key, load_dotenv,
    read_extension_list,
};
pub use controller::Controller;
pub use db::{
    Database, DiscordModel, IntoUser, RegisterOutcome, UnregisterOutcome, Wrapped, channel_kind,
};
pub use events::Event;
pub use extension::{Extension, ExtensionFactory, ExtensionRegistry, Version};
pub use handler::{ErrorReply, VersaHandler, error_reply, owner_ids, registration_prompt};
pub use logging::{default_directive, init_logging};
pub use runtime::{
    Core, FALLBACK_PREFIX, IncomingMessage, Invocation, LoadedExtension, YES_EMOJI,
};

/// Version of the framework.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
