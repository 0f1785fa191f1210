//! Command declarations.

use super::{Check, Cooldown};
use derive_getters::Getters;

/// A command an extension offers.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use versa_core::{BucketType, Check, CommandSpec, Cooldown};
///
/// let spec = CommandSpec::new("set_status")
///     .with_help("Sets the bot status.")
///     .with_check(Check::IsOwner)
///     .with_cooldown(Cooldown::new(1, Duration::from_secs(5), BucketType::User));
/// assert_eq!(spec.name(), "set_status");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct CommandSpec {
    name: String,
    aliases: Vec<String>,
    help: Option<String>,
    usage: Option<String>,
    checks: Vec<Check>,
    cooldown: Option<Cooldown>,
    hidden: bool,
}

impl CommandSpec {
    /// Command called `name` with no checks and no cooldown.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            help: None,
            usage: None,
            checks: Vec::new(),
            cooldown: None,
            hidden: false,
        }
    }

    /// Add an alternative name.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Set the help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Set the argument synopsis shown by `help`, e.g. `<prefix>...`.
    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    /// Require `check` to pass.
    pub fn with_check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    /// Rate limit invocations.
    pub fn with_cooldown(mut self, cooldown: Cooldown) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    /// Leave the command out of the help listing.
    pub fn hide(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Name and aliases.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// One-line signature, e.g. `!set_prefixes <prefix>...`.
    pub fn signature(&self, prefix: &str) -> String {
        match &self.usage {
            Some(usage) => format!("{}{} {}", prefix, self.name, usage),
            None => format!("{}{}", prefix, self.name),
        }
    }
}
