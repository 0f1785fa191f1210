//! Interactive prompts for settings that are still missing.

use dialoguer::{Input, Password, theme::ColorfulTheme};
use versa_core::Settings;
use versa_database::CoreSettingsRow;
use versa_error::{ConfigError, VersaResult};

fn prompt_error(err: dialoguer::Error) -> ConfigError {
    ConfigError::new(format!("Prompt failed: {err}"))
}

fn ask(theme: &ColorfulTheme, prompt: &str, default: Option<String>) -> Result<String, ConfigError> {
    let mut input = Input::<String>::with_theme(theme).with_prompt(prompt);
    if let Some(default) = default {
        input = input.default(default);
    }
    input.interact_text().map_err(prompt_error)
}

fn ask_optional(theme: &ColorfulTheme, prompt: &str) -> Result<Option<String>, ConfigError> {
    let value = Input::<String>::with_theme(theme)
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_error)?;
    Ok(Some(value).filter(|value| !value.is_empty()))
}

fn ask_secret(theme: &ColorfulTheme, prompt: &str) -> Result<Option<String>, ConfigError> {
    let value = Password::with_theme(theme)
        .with_prompt(prompt)
        .allow_empty_password(true)
        .interact()
        .map_err(prompt_error)?;
    Ok(Some(value).filter(|value| !value.is_empty()))
}

fn ask_port(theme: &ColorfulTheme, prompt: &str, default: Option<u16>) -> Result<Option<u16>, ConfigError> {
    let mut input = Input::<u16>::with_theme(theme).with_prompt(prompt);
    if let Some(default) = default {
        input = input.default(default);
    }
    Ok(Some(input.interact_text().map_err(prompt_error)?))
}

fn ask_number(theme: &ColorfulTheme, prompt: &str, default: u32) -> Result<u32, ConfigError> {
    Input::<u32>::with_theme(theme)
        .with_prompt(prompt)
        .default(default)
        .interact_text()
        .map_err(prompt_error)
}

/// Ask for the database connection details not set yet.
pub fn database_details(settings: &mut Settings) -> Result<(), ConfigError> {
    let theme = ColorfulTheme::default();
    let db = &mut settings.database;
    println!("Enter the {} connection details.", db.backend);

    if db.name.is_none() {
        db.name = Some(ask(&theme, "Database name", Some("versa".to_string()))?);
    }
    if db.user.is_none() {
        db.user = ask_optional(&theme, "Database user")?;
    }
    if db.password.is_none() {
        db.password = ask_secret(&theme, "Database password")?;
    }
    if db.host.is_none() {
        db.host = Some(ask(&theme, "Database host", Some("localhost".to_string()))?);
    }
    if db.port.is_none() {
        db.port = ask_port(&theme, "Database port", db.effective_port())?;
    }
    Ok(())
}

/// Ask for the cache connection details not set yet.
pub fn cache_details(settings: &mut Settings) -> Result<(), ConfigError> {
    let theme = ColorfulTheme::default();
    let cache = &mut settings.cache;
    println!("Enter the {} cache connection details.", cache.cache_type);

    if cache.host.is_none() {
        cache.host = Some(ask(&theme, "Cache host", Some("localhost".to_string()))?);
    }
    if cache.port.is_none() {
        cache.port = ask_port(&theme, "Cache port", cache.effective_port())?;
    }
    if cache.password.is_none() {
        cache.password = ask_secret(&theme, "Cache password")?;
    }
    cache.db = ask_number(&theme, "Cache number", cache.db)?;
    Ok(())
}

/// Ask for the bot token.
pub fn bot_token(settings: &mut Settings) -> Result<(), ConfigError> {
    let theme = ColorfulTheme::default();
    let token = Password::with_theme(&theme)
        .with_prompt("Discord bot token")
        .interact()
        .map_err(prompt_error)?;
    settings.bot_token = Some(token.trim().to_string());
    Ok(())
}

/// Ask for the prefix and description of a freshly created bot.
pub fn first_run_settings(row: &mut CoreSettingsRow) -> VersaResult<()> {
    let theme = ColorfulTheme::default();
    println!("Looks like this is the first run of this bot.");

    let prefix = ask(&theme, "Command prefix", Some("!".to_string()))?;
    let prefix = match prefix.trim() {
        "" => "!",
        prefix => prefix,
    };
    row.set_prefixes(&[prefix])?;
    row.description = ask_optional(&theme, "Bot description")?.unwrap_or_default();
    Ok(())
}
