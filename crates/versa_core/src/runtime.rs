//! Bot runtime state shared by the event handler and the extensions.

use crate::command::{
    Args, BucketIds, Check, CheckInput, CommandRegistry, CooldownBuckets, command_prefixes,
    match_prefix, run_checks,
};
use crate::db::Database;
use crate::extension::{Extension, Version};
use crate::{Controller, Event, RunMode, Settings};
use futures::future::join_all;
use serenity::all::{Context, UserId};
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use tokio::sync::RwLock;
use tracing::{Instrument, debug, info, instrument, warn};
use versa_cache::Cache;
use versa_database::CoreSettingsRow;
use versa_error::{CommandError, CommandErrorKind, ConfigError, VersaResult};

/// Reaction users confirm registration prompts with.
pub const YES_EMOJI: &str = "✅";

/// Prefix used when the stored prefixes cannot be read.
pub const FALLBACK_PREFIX: &str = "!";

/// A loaded extension and its parsed version.
#[derive(Clone)]
pub struct LoadedExtension {
    /// Extension instance
    pub extension: Arc<dyn Extension>,
    /// Parsed version
    pub version: Version,
}

/// Message fields the dispatcher looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Raw message text
    pub content: String,
    /// Author id
    pub author_id: u64,
    /// Whether the author is a bot
    pub author_is_bot: bool,
    /// Guild id, `None` in direct messages
    pub guild_id: Option<u64>,
    /// Channel id
    pub channel_id: u64,
}

impl From<&serenity::all::Message> for IncomingMessage {
    fn from(message: &serenity::all::Message) -> Self {
        Self {
            content: message.content.clone(),
            author_id: message.author.id.get(),
            author_is_bot: message.author.bot,
            guild_id: message.guild_id.map(|id| id.get()),
            channel_id: message.channel_id.get(),
        }
    }
}

/// A command that passed prefix matching, checks and cooldowns.
pub struct Invocation {
    /// Extension owning the command
    pub extension: Arc<dyn Extension>,
    /// Registered command name
    pub command: String,
    /// Name or alias used
    pub invoked_with: String,
    /// Matched prefix
    pub prefix: String,
    /// Arguments after the command name
    pub args: Args,
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("extension", &self.extension.name())
            .field("command", &self.command)
            .field("invoked_with", &self.invoked_with)
            .field("prefix", &self.prefix)
            .finish()
    }
}

/// Runtime of one bot.
pub struct Core {
    settings: Settings,
    core_settings: RwLock<CoreSettingsRow>,
    db: Database,
    cache: Cache,
    extensions: Vec<LoadedExtension>,
    commands: CommandRegistry,
    cooldowns: CooldownBuckets,
    owners: RwLock<HashSet<u64>>,
    bot_user_id: OnceLock<u64>,
}

impl std::fmt::Debug for Core {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Core")
            .field("namespace", &self.settings.namespace)
            .field("mode", &self.settings.mode)
            .field(
                "extensions",
                &self
                    .extensions
                    .iter()
                    .map(|loaded| loaded.extension.name())
                    .collect::<Vec<_>>(),
            )
            .field("commands", &self.commands.len())
            .finish()
    }
}

impl Core {
    /// Assemble the runtime.
    ///
    /// # Errors
    ///
    /// Fails when an extension has an invalid version, two extensions share
    /// a name, or two commands share a name or alias.
    #[instrument(skip_all, fields(namespace = %settings.namespace))]
    pub fn new(
        settings: Settings,
        core_settings: CoreSettingsRow,
        db: Database,
        cache: Cache,
        extensions: Vec<Arc<dyn Extension>>,
    ) -> VersaResult<Self> {
        let mut commands = CommandRegistry::new();
        let mut loaded: Vec<LoadedExtension> = Vec::with_capacity(extensions.len());

        for extension in extensions {
            let name = extension.name().to_string();
            if loaded.iter().any(|other| other.extension.name() == name) {
                return Err(ConfigError::new(format!("Extension loaded twice: {name}")).into());
            }
            let version = Version::parse(extension.version())?;
            for spec in extension.commands() {
                commands.register(&name, spec)?;
            }
            info!(extension = %name, version = %version, "Loaded extension");
            loaded.push(LoadedExtension { extension, version });
        }

        let cooldowns = commands.cooldowns();
        Ok(Self {
            settings,
            core_settings: RwLock::new(core_settings),
            db,
            cache,
            extensions: loaded,
            commands,
            cooldowns,
            owners: RwLock::new(HashSet::new()),
            bot_user_id: OnceLock::new(),
        })
    }

    /// Namespace of this bot.
    pub fn namespace(&self) -> &str {
        &self.settings.namespace
    }

    /// Production or test.
    pub fn mode(&self) -> RunMode {
        self.settings.mode
    }

    /// Resolved settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Database adapter.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Key-value cache.
    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Loaded extensions in load order.
    pub fn extensions(&self) -> &[LoadedExtension] {
        &self.extensions
    }

    /// Loaded extension called `name`.
    pub fn extension(&self, name: &str) -> Option<&LoadedExtension> {
        self.extensions
            .iter()
            .find(|loaded| loaded.extension.name() == name)
    }

    /// Registered commands.
    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// Cooldown state.
    pub fn cooldowns(&self) -> &CooldownBuckets {
        &self.cooldowns
    }

    /// Handle for the extension called `extension`.
    pub fn controller(self: &Arc<Self>, extension: &str) -> Controller {
        Controller::new(Arc::clone(self), extension)
    }

    // ------------------------------------------------------------------
    // Core settings
    // ------------------------------------------------------------------

    /// Snapshot of the stored settings row.
    pub async fn core_settings(&self) -> CoreSettingsRow {
        self.core_settings.read().await.clone()
    }

    /// Configured command prefixes.
    pub async fn prefixes(&self) -> Vec<String> {
        match self.core_settings.read().await.prefixes() {
            Ok(prefixes) => prefixes,
            Err(e) => {
                warn!(error = %e, "Stored prefixes are unreadable, using fallback");
                vec![FALLBACK_PREFIX.to_string()]
            }
        }
    }

    /// First configured prefix, used in hints like "use `!register`".
    pub async fn default_prefix(&self) -> String {
        self.prefixes()
            .await
            .into_iter()
            .next()
            .unwrap_or_else(|| FALLBACK_PREFIX.to_string())
    }

    /// Bot description shown by `help`.
    pub async fn description(&self) -> String {
        self.core_settings.read().await.description.clone()
    }

    /// Activity status, if any.
    pub async fn status(&self) -> Option<String> {
        self.core_settings.read().await.status.clone()
    }

    async fn update_settings<F>(&self, update: F) -> VersaResult<()>
    where
        F: FnOnce(&mut CoreSettingsRow) -> VersaResult<()>,
    {
        let mut guard = self.core_settings.write().await;
        let mut row = guard.clone();
        update(&mut row)?;
        *guard = self.db.save_core_settings(row).await?;
        Ok(())
    }

    /// Replace the command prefixes.
    ///
    /// # Errors
    ///
    /// Rejects an empty list and empty prefixes.
    #[instrument(skip(self), fields(namespace = %self.namespace()))]
    pub async fn set_prefixes(&self, prefixes: Vec<String>) -> VersaResult<()> {
        if prefixes.is_empty() || prefixes.iter().any(|prefix| prefix.trim().is_empty()) {
            return Err(CommandError::new(CommandErrorKind::InvalidArgument {
                command: "set_prefixes".to_string(),
                arg_name: "prefixes".to_string(),
                reason: "at least one non-empty prefix is required".to_string(),
            })
            .into());
        }
        self.update_settings(|row| Ok(row.set_prefixes(&prefixes)?))
            .await?;
        info!(?prefixes, "Updated prefixes");
        Ok(())
    }

    /// Replace the bot description.
    #[instrument(skip(self, description), fields(namespace = %self.namespace()))]
    pub async fn set_description(&self, description: String) -> VersaResult<()> {
        self.update_settings(|row| {
            row.description = description;
            Ok(())
        })
        .await?;
        info!("Updated description");
        Ok(())
    }

    /// Replace or clear the activity status.
    #[instrument(skip(self), fields(namespace = %self.namespace()))]
    pub async fn set_status(&self, status: Option<String>) -> VersaResult<()> {
        self.update_settings(|row| {
            row.status = status;
            Ok(())
        })
        .await?;
        info!("Updated status");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    /// Ids of the application owners.
    pub async fn owners(&self) -> HashSet<u64> {
        self.owners.read().await.clone()
    }

    /// Replace the application owners.
    pub async fn set_owners(&self, owners: HashSet<u64>) {
        debug!(count = owners.len(), "Updated owners");
        *self.owners.write().await = owners;
    }

    /// Whether `user_id` owns the application.
    pub async fn is_owner(&self, user_id: u64) -> bool {
        self.owners.read().await.contains(&user_id)
    }

    /// User id of the bot account, known once the gateway is ready.
    pub fn bot_user_id(&self) -> Option<u64> {
        self.bot_user_id.get().copied()
    }

    /// Record the bot account id; later calls are ignored.
    pub fn set_bot_user_id(&self, user_id: u64) {
        if self.bot_user_id.set(user_id).is_err() {
            debug!("Bot user id already known");
        }
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Resolve a message to a command invocation.
    ///
    /// Returns `Ok(None)` for messages that are not commands: bot authors,
    /// no matching prefix, or a bare prefix.
    ///
    /// # Errors
    ///
    /// Unknown commands, failed checks and exhausted cooldowns are returned
    /// as command errors; staff lookups may fail with database errors.
    #[instrument(skip(self, message), fields(author_id = message.author_id))]
    pub async fn prepare_invocation(
        &self,
        message: &IncomingMessage,
    ) -> VersaResult<Option<Invocation>> {
        if message.author_is_bot {
            return Ok(None);
        }

        let prefixes = command_prefixes(&self.prefixes().await, self.bot_user_id());
        let Some((prefix, rest)) = match_prefix(&message.content, &prefixes) else {
            return Ok(None);
        };

        let mut args = Args::new(rest);
        let Some(invoked_with) = args.next() else {
            return Ok(None);
        };

        let registered = self.commands.require(&invoked_with)?;
        let command = registered.spec.name().to_string();

        let checks = registered.spec.checks();
        let author_is_staff = if checks.contains(&Check::BotStaffOnly) {
            self.db.is_staff(UserId::new(message.author_id)).await?
        } else {
            false
        };
        let owners = self.owners().await;
        run_checks(
            &command,
            checks,
            &CheckInput {
                author_id: message.author_id,
                in_guild: message.guild_id.is_some(),
                mode: self.mode(),
                owners: &owners,
                author_is_staff,
            },
        )?;

        self.cooldowns.check(
            &command,
            &BucketIds {
                user: message.author_id,
                guild: message.guild_id,
                channel: message.channel_id,
            },
        )?;

        let extension = self
            .extension(&registered.extension)
            .map(|loaded| Arc::clone(&loaded.extension))
            .ok_or_else(|| CommandError::new(CommandErrorKind::CommandNotFound(command.clone())))?;

        debug!(command = %command, extension = %registered.extension, "Resolved command");
        Ok(Some(Invocation {
            extension,
            command,
            invoked_with,
            prefix,
            args,
        }))
    }

    /// Deliver `event` to every extension's listener.
    ///
    /// Listeners run concurrently. Failures are logged and do not stop
    /// delivery to the other extensions.
    pub async fn dispatch_event(self: &Arc<Self>, ctx: &Context, event: &Event) {
        let listeners = self.extensions.iter().map(|loaded| {
            let controller = self.controller(loaded.extension.name());
            let span = controller.span().clone();
            async move {
                if let Err(e) = loaded.extension.on_event(ctx, event, &controller).await {
                    warn!(
                        extension = %loaded.extension.name(),
                        event = event.name(),
                        error = %e,
                        "Listener failed"
                    );
                }
            }
            .instrument(span)
        });
        join_all(listeners).await;
    }
}
