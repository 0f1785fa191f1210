//! Lookup from command names to the extensions that own them.

use super::{CommandSpec, CooldownBuckets};
use std::collections::HashMap;
use tracing::debug;
use versa_error::{CommandError, CommandErrorKind};

/// A registered command and the extension it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredCommand {
    /// Owning extension
    pub extension: String,
    /// Declaration
    pub spec: CommandSpec,
}

/// All commands of the loaded extensions.
///
/// Names and aliases share one namespace; registering a name twice is an
/// error.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: Vec<RegisteredCommand>,
    lookup: HashMap<String, usize>,
}

impl CommandRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `spec` for `extension`.
    ///
    /// # Errors
    ///
    /// Returns a duplicate-command error when the name or an alias is taken;
    /// the registry is left unchanged in that case.
    #[track_caller]
    pub fn register(&mut self, extension: &str, spec: CommandSpec) -> Result<(), CommandError> {
        let mut seen = Vec::new();
        for name in spec.names() {
            if self.lookup.contains_key(name) || seen.contains(&name) {
                return Err(CommandError::new(CommandErrorKind::DuplicateCommand(
                    name.to_string(),
                )));
            }
            seen.push(name);
        }

        let index = self.commands.len();
        for name in spec.names() {
            self.lookup.insert(name.to_string(), index);
        }
        debug!(extension, command = %spec.name(), "Registered command");
        self.commands.push(RegisteredCommand {
            extension: extension.to_string(),
            spec,
        });
        Ok(())
    }

    /// Command called `name` (by name or alias).
    pub fn resolve(&self, name: &str) -> Option<&RegisteredCommand> {
        self.lookup.get(name).map(|&index| &self.commands[index])
    }

    /// Command called `name`, failing with a not-found error.
    #[track_caller]
    pub fn require(&self, name: &str) -> Result<&RegisteredCommand, CommandError> {
        self.resolve(name)
            .ok_or_else(|| CommandError::new(CommandErrorKind::CommandNotFound(name.to_string())))
    }

    /// Commands in registration order.
    pub fn commands(&self) -> impl Iterator<Item = &RegisteredCommand> {
        self.commands.iter()
    }

    /// Commands of one extension in registration order.
    pub fn commands_of<'a>(
        &'a self,
        extension: &'a str,
    ) -> impl Iterator<Item = &'a RegisteredCommand> + 'a {
        self.commands
            .iter()
            .filter(move |command| command.extension == extension)
    }

    /// Number of commands (aliases not counted).
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no command is registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Cooldown buckets for every command declaring a cooldown.
    pub fn cooldowns(&self) -> CooldownBuckets {
        let mut buckets = CooldownBuckets::new();
        for command in &self.commands {
            if let Some(cooldown) = command.spec.cooldown() {
                buckets.insert(command.spec.name(), *cooldown);
            }
        }
        buckets
    }
}
