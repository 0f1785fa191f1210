//! Discord client setup and lifecycle management.

use crate::{Core, VersaHandler};
use serenity::Client;
use std::sync::Arc;
use tracing::{info, instrument};
use versa_error::{DiscordError, DiscordErrorKind};

/// Discord client running a Versa bot.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use versa_core::{Core, VersaBot};
///
/// # async fn example(core: Arc<Core>) -> Result<(), Box<dyn std::error::Error>> {
/// let token = std::env::var("BOT_TOKEN")?;
/// let mut bot = VersaBot::new(core, &token).await?;
/// bot.start().await?;
/// # Ok(())
/// # }
/// ```
pub struct VersaBot {
    client: Client,
    core: Arc<Core>,
}

impl VersaBot {
    /// Build the serenity client for `core`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or the client fails to
    /// initialize.
    #[instrument(skip(core, token), fields(namespace = %core.namespace()))]
    pub async fn new(core: Arc<Core>, token: &str) -> Result<Self, DiscordError> {
        if token.trim().is_empty() {
            return Err(DiscordError::new(DiscordErrorKind::InvalidToken));
        }

        let handler = VersaHandler::new(Arc::clone(&core));
        let intents = VersaHandler::intents();
        info!("Building Serenity client with intents: {:?}", intents);

        let client = Client::builder(token, intents)
            .event_handler(handler)
            .await
            .map_err(|e| {
                DiscordError::new(DiscordErrorKind::ConnectionFailed(format!(
                    "Failed to build client: {}",
                    e
                )))
            })?;

        Ok(Self { client, core })
    }

    /// Connect and run until the client shuts down.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway connection fails.
    #[instrument(skip(self), fields(namespace = %self.core.namespace()))]
    pub async fn start(&mut self) -> Result<(), DiscordError> {
        info!("Starting Discord bot");
        self.client.start().await.map_err(|e| {
            DiscordError::new(DiscordErrorKind::ConnectionFailed(format!(
                "Client error: {}",
                e
            )))
        })
    }

    /// Runtime of this bot.
    pub fn core(&self) -> &Arc<Core> {
        &self.core
    }
}
