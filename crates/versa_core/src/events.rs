//! Gateway events forwarded to extension listeners.

use serenity::all::{GuildId, Message, Reaction, Ready};

/// Event delivered to [`Extension::on_event`](crate::Extension::on_event).
#[derive(Debug, Clone)]
pub enum Event {
    /// The gateway session is ready.
    Ready(Box<Ready>),
    /// A message was posted where the bot can read it.
    Message(Box<Message>),
    /// A reaction was added to a message.
    ReactionAdd(Box<Reaction>),
    /// A guild became available.
    GuildCreate(GuildId),
}

impl Event {
    /// Event name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Ready(_) => "ready",
            Event::Message(_) => "message",
            Event::ReactionAdd(_) => "reaction_add",
            Event::GuildCreate(_) => "guild_create",
        }
    }
}
