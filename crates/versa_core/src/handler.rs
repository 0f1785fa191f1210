//! Serenity event handler for Versa bots.
//!
//! Turns gateway events into command invocations and listener calls, and
//! reports command failures back to the channel they came from.

use crate::command::CommandContext;
use crate::runtime::{IncomingMessage, YES_EMOJI};
use crate::{Core, Event};
use serenity::all::{
    ActivityData, CurrentApplicationInfo, Guild, MembershipState, Mentionable, Message, Reaction,
    ReactionType, Ready,
};
use serenity::async_trait;
use serenity::client::{Context, EventHandler};
use serenity::model::gateway::GatewayIntents;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{Instrument, debug, error, info, warn};
use versa_database::{MessageRow, now, to_db_id};
use versa_error::{CommandErrorKind, DiscordError, VersaError, VersaErrorKind, VersaResult};

/// How a failed invocation is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorReply {
    /// Say nothing.
    Ignore,
    /// Reply with this text.
    Reply(String),
    /// Ask the author to register.
    PromptRegistration,
}

/// Decide how to report `err` to the author.
pub fn error_reply(err: &VersaError, prefix: &str) -> ErrorReply {
    match err.kind() {
        VersaErrorKind::Command(command_error) => match &command_error.kind {
            CommandErrorKind::CommandNotFound(_) => ErrorReply::Ignore,
            CommandErrorKind::MissingArgument { command, arg_name } => ErrorReply::Reply(format!(
                "Missing argument `{arg_name}`. See `{prefix}help {command}`."
            )),
            CommandErrorKind::InvalidArgument {
                arg_name, reason, ..
            } => ErrorReply::Reply(format!("Invalid value for `{arg_name}`: {reason}")),
            CommandErrorKind::CheckFailed { .. } => {
                ErrorReply::Reply("You are not allowed to use this command here.".to_string())
            }
            CommandErrorKind::OnCooldown { retry_after_ms, .. } => ErrorReply::Reply(format!(
                "This command is on cooldown. Try again in {:.2}s.",
                *retry_after_ms as f64 / 1000.0
            )),
            CommandErrorKind::DuplicateCommand(_) => {
                ErrorReply::Reply("Something went wrong while running this command.".to_string())
            }
        },
        VersaErrorKind::Database(db_error) if db_error.is_user_missing() => {
            ErrorReply::PromptRegistration
        }
        VersaErrorKind::Database(db_error) if db_error.is_user_inactive() => {
            ErrorReply::Reply(format!(
                "You have unregistered from my system. Use `{prefix}register` if you \
                 want to use this command."
            ))
        }
        _ => ErrorReply::Reply("Something went wrong while running this command.".to_string()),
    }
}

/// Text of the prompt sent to users without a record.
pub fn registration_prompt(mention: &str, prefix: &str) -> String {
    format!(
        "{mention}, I need to store data related to your Discord ID to run this command. \
         React with {YES_EMOJI} to this message to register, or use `{prefix}register`. \
         You can always use `{prefix}unregister` to delete that data again."
    )
}

/// Owners of the application: accepted team members, or the sole owner.
pub fn owner_ids(info: &CurrentApplicationInfo) -> HashSet<u64> {
    match &info.team {
        Some(team) => team
            .members
            .iter()
            .filter(|member| member.membership_state == MembershipState::Accepted)
            .map(|member| member.user.id.get())
            .collect(),
        None => info.owner.iter().map(|owner| owner.id.get()).collect(),
    }
}

/// Event handler of a Versa bot.
pub struct VersaHandler {
    core: Arc<Core>,
}

impl VersaHandler {
    /// Create a handler for `core`.
    pub fn new(core: Arc<Core>) -> Self {
        Self { core }
    }

    /// Gateway intents the framework needs.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MEMBERS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::GUILD_MESSAGE_REACTIONS
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::DIRECT_MESSAGE_REACTIONS
            | GatewayIntents::MESSAGE_CONTENT
    }

    async fn run_command(&self, ctx: &Context, msg: &Message) -> VersaResult<()> {
        let Some(invocation) = self
            .core
            .prepare_invocation(&IncomingMessage::from(msg))
            .await?
        else {
            return Ok(());
        };

        let controller = self.core.controller(invocation.extension.name());
        let span = controller.span().clone();
        let command_ctx = CommandContext {
            serenity: ctx.clone(),
            message: msg.clone(),
            prefix: invocation.prefix,
            invoked_with: invocation.invoked_with,
            command: invocation.command,
            controller,
        };

        info!(
            command = %command_ctx.command,
            author_id = %msg.author.id,
            "Invoking command"
        );
        invocation
            .extension
            .invoke(command_ctx, invocation.args)
            .instrument(span)
            .await
    }

    async fn report_error(&self, ctx: &Context, msg: &Message, err: VersaError) {
        let prefix = self.core.default_prefix().await;
        match error_reply(&err, &prefix) {
            ErrorReply::Ignore => debug!(error = %err, "Ignoring command error"),
            ErrorReply::Reply(text) => {
                if !matches!(err.kind(), VersaErrorKind::Command(_)) {
                    error!(error = %err, "Command failed");
                }
                if let Err(e) = msg.channel_id.say(&ctx.http, text).await {
                    warn!(error = %e, "Failed to report command error");
                }
            }
            ErrorReply::PromptRegistration => {
                if let Err(e) = self.prompt_registration(ctx, msg, &prefix).await {
                    warn!(error = %e, "Failed to send registration prompt");
                }
            }
        }
    }

    async fn prompt_registration(
        &self,
        ctx: &Context,
        msg: &Message,
        prefix: &str,
    ) -> VersaResult<()> {
        let text = registration_prompt(&msg.author.mention().to_string(), prefix);
        let prompt = msg
            .channel_id
            .say(&ctx.http, text)
            .await
            .map_err(DiscordError::from)?;

        let now = now();
        let row = MessageRow {
            id: to_db_id(prompt.id.get()),
            channel_id: to_db_id(prompt.channel_id.get()),
            guild_id: prompt.guild_id.map(|id| to_db_id(id.get())),
            author_id: to_db_id(prompt.author.id.get()),
            created_at: now,
            updated_at: now,
        };
        self.core
            .db()
            .begin_registration(msg.author.id, row)
            .await?;

        prompt
            .react(ctx, ReactionType::Unicode(YES_EMOJI.to_string()))
            .await
            .map_err(DiscordError::from)?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for VersaHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            user = %ready.user.name,
            guilds = ready.guilds.len(),
            namespace = %self.core.namespace(),
            "Bot is ready"
        );
        self.core.set_bot_user_id(ready.user.id.get());

        match ctx.http.get_current_application_info().await {
            Ok(info) => self.core.set_owners(owner_ids(&info)).await,
            Err(e) => warn!(error = %e, "Failed to fetch application owners"),
        }

        if let Some(status) = self.core.status().await {
            ctx.set_activity(Some(ActivityData::playing(status)));
        }

        self.core
            .dispatch_event(&ctx, &Event::Ready(Box::new(ready)))
            .await;
    }

    async fn message(&self, ctx: Context, msg: Message) {
        self.core
            .dispatch_event(&ctx, &Event::Message(Box::new(msg.clone())))
            .await;

        if let Err(err) = self.run_command(&ctx, &msg).await {
            self.report_error(&ctx, &msg, err).await;
        }
    }

    async fn reaction_add(&self, ctx: Context, reaction: Reaction) {
        self.core
            .dispatch_event(&ctx, &Event::ReactionAdd(Box::new(reaction)))
            .await;
    }

    async fn guild_create(&self, ctx: Context, guild: Guild, _is_new: Option<bool>) {
        let guild_id = guild.id;
        match self.core.db().wrap_guild(guild).await {
            Ok(wrapped) => debug!(
                guild_id = %guild_id,
                existed_already = wrapped.existed_already(),
                "Wrapped guild"
            ),
            Err(e) => error!(guild_id = %guild_id, error = %e, "Failed to store guild"),
        }

        self.core
            .dispatch_event(&ctx, &Event::GuildCreate(guild_id))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use versa_error::{CommandError, ConfigError, DatabaseError, DatabaseErrorKind};

    #[test]
    fn test_unknown_command_is_silent() {
        let err: VersaError =
            CommandError::new(CommandErrorKind::CommandNotFound("nope".to_string())).into();
        assert_eq!(error_reply(&err, "!"), ErrorReply::Ignore);
    }

    #[test]
    fn test_missing_user_prompts_registration() {
        let err: VersaError = DatabaseError::new(DatabaseErrorKind::UserDoesNotExist(1)).into();
        assert_eq!(error_reply(&err, "!"), ErrorReply::PromptRegistration);
    }

    #[test]
    fn test_inactive_user_is_pointed_to_register() {
        let err: VersaError = DatabaseError::new(DatabaseErrorKind::InactiveUser(1)).into();
        match error_reply(&err, "?") {
            ErrorReply::Reply(text) => assert!(text.contains("`?register`")),
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn test_cooldown_reply_in_seconds() {
        let err: VersaError = CommandError::new(CommandErrorKind::OnCooldown {
            command: "help".to_string(),
            retry_after_ms: 250,
        })
        .into();
        assert_eq!(
            error_reply(&err, "!"),
            ErrorReply::Reply("This command is on cooldown. Try again in 0.25s.".to_string())
        );
    }

    #[test]
    fn test_other_errors_get_generic_reply() {
        let err: VersaError = ConfigError::new("boom").into();
        match error_reply(&err, "!") {
            ErrorReply::Reply(text) => assert!(!text.contains("boom")),
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn test_registration_prompt_mentions_emoji_and_commands() {
        let text = registration_prompt("<@1>", "!");
        assert!(text.starts_with("<@1>"));
        assert!(text.contains(YES_EMOJI));
        assert!(text.contains("`!register`"));
        assert!(text.contains("`!unregister`"));
    }
}
