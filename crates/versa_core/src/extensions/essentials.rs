//! Commands every bot ships with: help, ping, bot settings and GDPR
//! registration.

use crate::command::{Args, BucketType, Check, CommandContext, CommandSpec, Cooldown};
use crate::db::{RegisterOutcome, UnregisterOutcome};
use crate::runtime::YES_EMOJI;
use crate::{Controller, Core, Event, Extension};
use async_trait::async_trait;
use serenity::all::{
    ActivityData, Context, CreateMessage, Mentionable, Reaction, ReactionType,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use versa_error::{CommandError, CommandErrorKind, DiscordError, VersaResult};

/// Name the extension registers under.
pub const NAME: &str = "essentials";

/// Built-in extension.
#[derive(Debug, Default)]
pub struct Essentials;

/// Factory for the extension registry.
pub fn factory() -> Arc<dyn Extension> {
    Arc::new(Essentials)
}

/// Full command listing.
pub fn help_listing(core: &Core, description: &str, prefix: &str) -> String {
    let mut text = String::new();
    if !description.is_empty() {
        text.push_str(description);
        text.push_str("\n\n");
    }

    for loaded in core.extensions() {
        let name = loaded.extension.name();
        let commands: Vec<_> = core
            .commands()
            .commands_of(name)
            .filter(|command| !command.spec.hidden())
            .collect();
        if commands.is_empty() {
            continue;
        }

        text.push_str(&format!("**{}** {}\n", name, loaded.version));
        if let Some(about) = loaded.extension.description() {
            text.push_str(about);
            text.push('\n');
        }
        for command in commands {
            let summary = command
                .spec
                .help()
                .as_deref()
                .and_then(|help| help.lines().next())
                .unwrap_or("");
            text.push_str(&format!("`{}` {}\n", command.spec.signature(prefix), summary));
        }
        text.push('\n');
    }

    text.push_str(&format!(
        "Use `{prefix}help <command>` for more information on a command."
    ));
    text
}

/// Help of a single command, `None` when no such command exists.
pub fn command_help(core: &Core, prefix: &str, name: &str) -> Option<String> {
    let command = core.commands().resolve(name)?;
    let spec = &command.spec;
    let mut text = format!("`{}`", spec.signature(prefix));
    if !spec.aliases().is_empty() {
        let aliases: Vec<String> = spec
            .aliases()
            .iter()
            .map(|alias| format!("`{prefix}{alias}`"))
            .collect();
        text.push_str(&format!("\nAliases: {}", aliases.join(", ")));
    }
    if let Some(help) = spec.help() {
        text.push_str("\n\n");
        text.push_str(help);
    }
    Some(text)
}

/// Reply to `register`.
pub fn register_reply(outcome: RegisterOutcome, prefix: &str) -> String {
    match outcome {
        RegisterOutcome::AlreadyRegistered => "You are already registered in my system!".to_string(),
        RegisterOutcome::Registered => format!(
            "You are now registered. Thank you for using my commands and functions!\n\n\
             If you ever change your mind, just use `{prefix}unregister` to remove yourself \
             from my system, which will irreversibly and immediately delete all data related \
             to your Discord ID from my system."
        ),
    }
}

/// Reply to `unregister`.
pub fn unregister_reply(outcome: UnregisterOutcome, prefix: &str) -> String {
    match outcome {
        UnregisterOutcome::AlreadyUnregistered => "You are already unregistered!".to_string(),
        UnregisterOutcome::Removed => format!(
            "You have been successfully removed from my system! You will have to use \
             `{prefix}register` if you change your mind to enable storing data related to \
             your Discord user ID again."
        ),
    }
}

/// Confirmation sent after a registration prompt was accepted.
pub fn confirmation_text(user: &str, prefix: &str) -> String {
    format!(
        "{user}, you have now been registered! Remember, you can use `{prefix}unregister` \
         to immediately delete all data related to your Discord ID from my system."
    )
}

impl Essentials {
    async fn help(&self, ctx: &CommandContext, mut args: Args) -> VersaResult<()> {
        let core = ctx.core();
        let text = match args.next() {
            Some(name) => command_help(core, &ctx.prefix, &name)
                .unwrap_or_else(|| format!("No command called `{name}` found.")),
            None => help_listing(core, &core.description().await, &ctx.prefix),
        };
        ctx.send_long(&text).await
    }

    async fn ping(&self, ctx: &CommandContext) -> VersaResult<()> {
        let start = Instant::now();
        ctx.typing().await?;
        let elapsed = start.elapsed().as_millis();
        ctx.send(format!("Pong.\nTime: {elapsed}ms")).await?;
        Ok(())
    }

    async fn set_prefixes(&self, ctx: &CommandContext, mut args: Args) -> VersaResult<()> {
        let prefixes = args.remaining();
        if prefixes.is_empty() {
            return Err(CommandError::new(CommandErrorKind::MissingArgument {
                command: ctx.command.clone(),
                arg_name: "prefixes".to_string(),
            })
            .into());
        }
        ctx.core().set_prefixes(prefixes).await?;
        ctx.send("Done.").await?;
        Ok(())
    }

    async fn set_description(&self, ctx: &CommandContext, mut args: Args) -> VersaResult<()> {
        let description = args.required_rest(&ctx.command, "description")?;
        ctx.core().set_description(description).await?;
        ctx.send("Done.").await?;
        Ok(())
    }

    async fn set_status(&self, ctx: &CommandContext, mut args: Args) -> VersaResult<()> {
        let status = args.required_rest(&ctx.command, "status")?;
        ctx.core().set_status(Some(status.clone())).await?;
        ctx.serenity.set_activity(Some(ActivityData::playing(status)));
        ctx.send("Done.").await?;
        Ok(())
    }

    async fn register(&self, ctx: &CommandContext) -> VersaResult<()> {
        let outcome = ctx.controller.db().register_user(ctx.author().id).await?;
        ctx.send(register_reply(outcome, &ctx.prefix)).await?;
        Ok(())
    }

    async fn unregister(&self, ctx: &CommandContext) -> VersaResult<()> {
        let outcome = ctx
            .controller
            .db()
            .unregister_user(ctx.author().id)
            .await?;
        ctx.send(unregister_reply(outcome, &ctx.prefix)).await?;
        Ok(())
    }

    async fn on_reaction_add(
        &self,
        ctx: &Context,
        reaction: &Reaction,
        controller: &Controller,
    ) -> VersaResult<()> {
        let Some(user_id) = reaction.user_id else {
            return Ok(());
        };
        let core = controller.core();
        if core.bot_user_id() == Some(user_id.get()) {
            return Ok(());
        }
        if !matches!(&reaction.emoji, ReactionType::Unicode(name) if name == YES_EMOJI) {
            return Ok(());
        }

        if !controller
            .db()
            .confirm_registration(user_id, reaction.message_id)
            .await?
        {
            debug!(user_id = %user_id, "Reaction is not on a registration prompt");
            return Ok(());
        }

        let prefix = core.default_prefix().await;
        let name = match user_id.to_user(ctx).await {
            Ok(user) => user.name,
            Err(_) => user_id.mention().to_string(),
        };
        let dm = CreateMessage::new().content(confirmation_text(&name, &prefix));
        if let Err(e) = user_id.direct_message(ctx, dm).await {
            warn!(user_id = %user_id, error = %e, "Direct message failed, confirming in channel");
            reaction
                .channel_id
                .say(
                    &ctx.http,
                    confirmation_text(&user_id.mention().to_string(), &prefix),
                )
                .await
                .map_err(DiscordError::from)?;
        }
        info!(user_id = %user_id, "Registered user via reaction");
        Ok(())
    }
}

#[async_trait]
impl Extension for Essentials {
    fn name(&self) -> &str {
        NAME
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> Option<&str> {
        Some("Core commands")
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("help")
                .with_usage("[command]")
                .with_help("Shows the commands or details of one command.")
                .with_cooldown(Cooldown::new(
                    1,
                    Duration::from_millis(500),
                    BucketType::User,
                )),
            CommandSpec::new("ping").with_help("Calculates the ping time."),
            CommandSpec::new("set_prefixes")
                .with_usage("<prefix>...")
                .with_help("Sets the command prefixes.")
                .with_check(Check::IsOwner),
            CommandSpec::new("set_description")
                .with_usage("<description>")
                .with_help("Sets the bot description.")
                .with_check(Check::IsOwner),
            CommandSpec::new("set_status")
                .with_usage("<status>")
                .with_help("Sets the bot status.")
                .with_check(Check::IsOwner),
            CommandSpec::new("register").with_help("Registers you in my system."),
            CommandSpec::new("unregister").with_help("Removes you from my system."),
        ]
    }

    async fn invoke(&self, ctx: CommandContext, args: Args) -> VersaResult<()> {
        match ctx.command.as_str() {
            "help" => self.help(&ctx, args).await,
            "ping" => self.ping(&ctx).await,
            "set_prefixes" => self.set_prefixes(&ctx, args).await,
            "set_description" => self.set_description(&ctx, args).await,
            "set_status" => self.set_status(&ctx, args).await,
            "register" => self.register(&ctx).await,
            "unregister" => self.unregister(&ctx).await,
            other => Err(CommandError::new(CommandErrorKind::CommandNotFound(other.to_string())).into()),
        }
    }

    async fn on_event(
        &self,
        ctx: &Context,
        event: &Event,
        controller: &Controller,
    ) -> VersaResult<()> {
        match event {
            Event::ReactionAdd(reaction) => self.on_reaction_add(ctx, reaction, controller).await,
            _ => Ok(()),
        }
    }
}
