//! Bot startup command handler.

use super::prompt;
use super::{Cli, init_database};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use versa_cache::Cache;
use versa_core::{Core, Database, ExtensionRegistry, Settings, VersaBot, load_dotenv};
use versa_database::{Backend, DEFAULT_POOL_SIZE, DbPool};
use versa_error::{ConfigError, VersaResult};

fn announce_dbinit() {
    println!("Running `versa dbinit`");
}

fn announce_ready() {
    println!("You can now use `versa` to run your Discord versa instance.");
}

/// Resolve settings, prompting for missing values and saving them.
fn resolve_settings(cli: &Cli, root: &Path) -> VersaResult<Settings> {
    let mode = cli.mode();
    if let Some(path) = load_dotenv(root, mode)? {
        info!(path = %path.display(), "Loaded environment file");
    }
    let mut settings = Settings::load(mode, root, &cli.overrides())?;

    if settings.needs_database_details() {
        prompt::database_details(&mut settings)?;
    }
    if settings.needs_cache_details() {
        prompt::cache_details(&mut settings)?;
    }
    if settings.needs_bot_token() {
        prompt::bot_token(&mut settings)?;
    }
    settings.save_env_file()?;
    Ok(settings)
}

/// `versa run`: start the bot.
#[instrument(skip(cli), fields(mode = %cli.mode()))]
pub async fn run_bot(cli: &Cli) -> VersaResult<()> {
    let root = Path::new(".");
    let settings = resolve_settings(cli, root)?;

    if settings.database.backend == Backend::Sqlite && !settings.sqlite_path().exists() {
        announce_dbinit();
        init_database(&settings)?;
        announce_ready();
        return Ok(());
    }

    let extensions = ExtensionRegistry::builtin().load_lists(root)?;

    let pool = DbPool::connect(
        settings.database.backend,
        &settings.database_url()?,
        DEFAULT_POOL_SIZE,
    )?;
    let db = Database::new(pool);

    let (mut core_settings, created) = match db.core_settings(&settings.namespace).await {
        Ok(found) => found,
        Err(e) if settings.database.backend != Backend::Sqlite => {
            warn!(error = %e, "Reading the bot settings failed, initializing the database");
            announce_dbinit();
            init_database(&settings)?;
            announce_ready();
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    if created {
        prompt::first_run_settings(&mut core_settings)?;
        core_settings = db.save_core_settings(core_settings).await?;
    }

    let cache = Cache::from_settings(settings.namespace.clone(), &settings.cache)?;
    let token = settings
        .bot_token
        .clone()
        .ok_or_else(|| ConfigError::new("BOT_TOKEN is not set"))?;

    let core = Arc::new(Core::new(settings, core_settings, db, cache, extensions)?);
    let mut bot = VersaBot::new(Arc::clone(&core), &token).await?;
    if let Err(e) = bot.start().await {
        error!(error = %e, "Bot stopped with an error");
        return Err(e.into());
    }
    Ok(())
}
