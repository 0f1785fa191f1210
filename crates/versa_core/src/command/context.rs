//! Invocation context handed to extensions.

use crate::{Controller, Core};
use serenity::all::{ChannelId, Context, GuildId, Message, User};
use std::sync::Arc;
use tracing::debug;
use versa_error::{DiscordError, VersaResult};

/// Longest message Discord accepts.
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Everything a command needs to respond.
#[derive(Clone)]
pub struct CommandContext {
    /// Serenity context of the triggering event
    pub serenity: Context,
    /// Message that invoked the command
    pub message: Message,
    /// Prefix the message started with
    pub prefix: String,
    /// Name or alias the command was invoked with
    pub invoked_with: String,
    /// Registered command name
    pub command: String,
    /// Handle of the extension owning the command
    pub controller: Controller,
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("message_id", &self.message.id)
            .field("prefix", &self.prefix)
            .field("invoked_with", &self.invoked_with)
            .field("command", &self.command)
            .field("extension", &self.controller.extension_name())
            .finish()
    }
}

impl CommandContext {
    /// Bot runtime.
    pub fn core(&self) -> &Arc<Core> {
        self.controller.core()
    }

    /// Message author.
    pub fn author(&self) -> &User {
        &self.message.author
    }

    /// Guild the command was invoked in, `None` in direct messages.
    pub fn guild_id(&self) -> Option<GuildId> {
        self.message.guild_id
    }

    /// Channel the command was invoked in.
    pub fn channel_id(&self) -> ChannelId {
        self.message.channel_id
    }

    /// Reply in the invoking channel.
    pub async fn send(&self, content: impl Into<String>) -> VersaResult<Message> {
        let content = content.into();
        debug!(channel_id = %self.channel_id(), len = content.len(), "Sending reply");
        Ok(self
            .channel_id()
            .say(&self.serenity.http, content)
            .await
            .map_err(DiscordError::from)?)
    }

    /// Reply with text of any length, split at line breaks into several
    /// messages when needed.
    pub async fn send_long(&self, content: &str) -> VersaResult<()> {
        for chunk in split_message(content, MAX_MESSAGE_LEN) {
            self.send(chunk).await?;
        }
        Ok(())
    }

    /// Show the typing indicator in the invoking channel.
    pub async fn typing(&self) -> VersaResult<()> {
        self.channel_id()
            .broadcast_typing(&self.serenity.http)
            .await
            .map_err(DiscordError::from)?;
        Ok(())
    }
}

/// Split `content` into pieces of at most `limit` bytes, preferring line
/// breaks.
pub fn split_message(content: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in content.split_inclusive('\n') {
        if current.len() + line.len() > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        let mut line = line;
        while line.len() > limit {
            let mut cut = limit;
            while !line.is_char_boundary(cut) {
                cut -= 1;
            }
            chunks.push(line[..cut].to_string());
            line = &line[cut..];
        }
        current.push_str(line);
    }
    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}
