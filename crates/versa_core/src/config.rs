//! Bot configuration.
//!
//! Settings come from three layers, lowest precedence first:
//! - built-in defaults
//! - environment variables (optionally loaded from `.prodenv` / `.testenv`)
//! - overrides passed on the command line
//!
//! The resolved values can be written back to the dotenv file of the run
//! mode so the next start does not prompt again.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use versa_cache::{CacheSettings, CacheType};
use versa_database::Backend;
use versa_error::ConfigError;

/// Environment variables read into [`Settings`].
pub const ENV_VARS: &[&str] = &[
    "NAMESPACE",
    "LANGUAGE",
    "DB_TYPE",
    "DB_NAME",
    "DB_USER",
    "DB_PASSWORD",
    "DB_HOST",
    "DB_PORT",
    "CACHE_TYPE",
    "CACHE_HOST",
    "CACHE_PORT",
    "CACHE_PASSWORD",
    "CACHE_DB",
    "BOT_TOKEN",
];

/// Namespace used when `NAMESPACE` is unset.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Interface language used when `LANGUAGE` is unset.
pub const DEFAULT_LANGUAGE: &str = "en_US";

/// Extension list shipped with the application.
pub const EXTENSIONS_FILE: &str = "extensions.txt";

/// Extension list of extensions living in the application directory.
pub const LOCAL_EXTENSIONS_FILE: &str = "local_extensions.txt";

/// Command-line overrides keyed by environment variable name.
pub type Overrides = BTreeMap<String, String>;

/// Production or test run.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RunMode {
    /// Live bot
    #[default]
    Production,
    /// Development bot with debug logging and test-only commands
    Test,
}

impl RunMode {
    /// Pick the mode from the `--prod/--test` switch.
    pub fn from_prod_flag(prod: bool) -> Self {
        if prod {
            RunMode::Production
        } else {
            RunMode::Test
        }
    }

    /// Whether this is a test run.
    pub fn is_test(&self) -> bool {
        matches!(self, RunMode::Test)
    }

    /// Dotenv file name for this mode.
    pub fn env_file(&self) -> &'static str {
        match self {
            RunMode::Production => ".prodenv",
            RunMode::Test => ".testenv",
        }
    }

    /// SQLite database file name for this mode.
    pub fn sqlite_file(&self) -> &'static str {
        match self {
            RunMode::Production => "db.sqlite3",
            RunMode::Test => "test_db.sqlite3",
        }
    }
}

/// Database connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Backend type
    #[serde(rename = "type", default)]
    pub backend: Backend,
    /// Database name
    #[serde(default)]
    pub name: Option<String>,
    /// Database user
    #[serde(default)]
    pub user: Option<String>,
    /// Database password
    #[serde(default)]
    pub password: Option<String>,
    /// Server host
    #[serde(default)]
    pub host: Option<String>,
    /// Server port
    #[serde(default)]
    pub port: Option<u16>,
}

impl DatabaseSettings {
    /// Whether a server backend is selected without a host to reach it.
    pub fn needs_connection_details(&self) -> bool {
        self.backend != Backend::Sqlite && self.host.is_none()
    }

    /// Configured port, falling back to the backend default.
    pub fn effective_port(&self) -> Option<u16> {
        self.port.or_else(|| self.backend.default_port())
    }

    /// Path of the SQLite database file for `mode` under `root`.
    pub fn sqlite_path(root: &Path, mode: RunMode) -> PathBuf {
        root.join(mode.sqlite_file())
    }

    /// Connection string for the configured backend.
    ///
    /// SQLite gets the file path; PostgreSQL gets a libpq keyword/value
    /// string so passwords need no URL encoding.
    ///
    /// # Errors
    ///
    /// Returns an error when a server backend has no host or no database
    /// name.
    #[track_caller]
    pub fn url(&self, root: &Path, mode: RunMode) -> Result<String, ConfigError> {
        match self.backend {
            Backend::Sqlite => Ok(Self::sqlite_path(root, mode).to_string_lossy().into_owned()),
            Backend::Postgres => {
                let host = self
                    .host
                    .as_deref()
                    .ok_or_else(|| ConfigError::new("DB_HOST is required for postgres"))?;
                let name = self
                    .name
                    .as_deref()
                    .ok_or_else(|| ConfigError::new("DB_NAME is required for postgres"))?;

                let mut parts = vec![
                    format!("host={}", quote_conninfo(host)),
                    format!("dbname={}", quote_conninfo(name)),
                ];
                if let Some(port) = self.effective_port() {
                    parts.push(format!("port={port}"));
                }
                if let Some(user) = &self.user {
                    parts.push(format!("user={}", quote_conninfo(user)));
                }
                if let Some(password) = &self.password {
                    parts.push(format!("password={}", quote_conninfo(password)));
                }
                Ok(parts.join(" "))
            }
        }
    }
}

fn quote_conninfo(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

/// Resolved bot settings.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    /// Production or test
    pub mode: RunMode,
    /// Application root directory
    pub root: PathBuf,
    /// Namespace of the core settings row
    pub namespace: String,
    /// Interface language
    pub language: String,
    /// Database connection
    pub database: DatabaseSettings,
    /// Cache backend
    pub cache: CacheSettings,
    /// Discord bot token
    pub bot_token: Option<String>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("mode", &self.mode)
            .field("root", &self.root)
            .field("namespace", &self.namespace)
            .field("language", &self.language)
            .field("database_type", &self.database.backend)
            .field("database_host", &self.database.host)
            .field("cache_type", &self.cache.cache_type)
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    namespace: String,
    language: String,
    db: DatabaseSettings,
    cache: CacheSettings,
    #[serde(default)]
    bot: BotSection,
}

#[derive(Debug, Default, Deserialize)]
struct BotSection {
    #[serde(default)]
    token: Option<String>,
}

/// Configuration key of an environment variable (`DB_HOST` -> `db.host`).
pub fn config_key(var: &str) -> String {
    var.to_lowercase().replace('_', ".")
}

fn config_error(err: config::ConfigError) -> ConfigError {
    ConfigError::new(err.to_string())
}

impl Settings {
    /// Resolve settings from the process environment and `overrides`.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be parsed, e.g. an unknown
    /// `DB_TYPE` or a non-numeric port.
    #[instrument(skip(overrides), fields(mode = %mode))]
    pub fn load(mode: RunMode, root: &Path, overrides: &Overrides) -> Result<Self, ConfigError> {
        let vars = ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok().map(|value| (name.to_string(), value)))
            .collect::<Vec<_>>();
        Self::from_vars(mode, root, vars, overrides)
    }

    /// Resolve settings from explicit variables instead of the process
    /// environment.
    ///
    /// Variables not listed in [`ENV_VARS`] are ignored.
    pub fn from_vars<I>(
        mode: RunMode,
        root: &Path,
        vars: I,
        overrides: &Overrides,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let source: config::Map<String, String> = vars
            .into_iter()
            .filter(|(name, _)| ENV_VARS.contains(&name.as_str()))
            .collect();

        let mut builder = config::Config::builder()
            .set_default("namespace", DEFAULT_NAMESPACE)
            .map_err(config_error)?
            .set_default("language", DEFAULT_LANGUAGE)
            .map_err(config_error)?
            .set_default("db.type", Backend::default().to_string())
            .map_err(config_error)?
            .set_default("cache.type", CacheType::default().to_string())
            .map_err(config_error)?
            .set_default("cache.db", 0)
            .map_err(config_error)?
            .add_source(
                config::Environment::default()
                    .separator("_")
                    .ignore_empty(true)
                    .source(Some(source)),
            );

        for (name, value) in overrides {
            if value.is_empty() {
                continue;
            }
            debug!(var = %name, "Applying command-line override");
            builder = builder
                .set_override(config_key(name), value.as_str())
                .map_err(config_error)?;
        }

        let raw: RawSettings = builder
            .build()
            .map_err(config_error)?
            .try_deserialize()
            .map_err(config_error)?;

        Ok(Self {
            mode,
            root: root.to_path_buf(),
            namespace: raw.namespace,
            language: raw.language,
            database: raw.db,
            cache: raw.cache,
            bot_token: raw.bot.token.filter(|token| !token.is_empty()),
        })
    }

    /// Whether the database host and credentials must be prompted for.
    pub fn needs_database_details(&self) -> bool {
        self.database.needs_connection_details()
    }

    /// Whether the cache host and credentials must be prompted for.
    pub fn needs_cache_details(&self) -> bool {
        self.cache.needs_connection_details()
    }

    /// Whether the bot token must be prompted for.
    pub fn needs_bot_token(&self) -> bool {
        self.bot_token.is_none()
    }

    /// Database connection string.
    pub fn database_url(&self) -> Result<String, ConfigError> {
        self.database.url(&self.root, self.mode)
    }

    /// Path of the SQLite file used by this run mode.
    pub fn sqlite_path(&self) -> PathBuf {
        DatabaseSettings::sqlite_path(&self.root, self.mode)
    }

    /// Path of the dotenv file used by this run mode.
    pub fn env_file_path(&self) -> PathBuf {
        self.root.join(self.mode.env_file())
    }

    /// Resolved values as environment variables, unset values skipped.
    pub fn to_env_vars(&self) -> Vec<(&'static str, String)> {
        let db = &self.database;
        let cache = &self.cache;
        let optional = [
            ("DB_NAME", db.name.clone()),
            ("DB_USER", db.user.clone()),
            ("DB_PASSWORD", db.password.clone()),
            ("DB_HOST", db.host.clone()),
            ("DB_PORT", db.port.map(|port| port.to_string())),
            ("CACHE_HOST", cache.host.clone()),
            ("CACHE_PORT", cache.port.map(|port| port.to_string())),
            ("CACHE_PASSWORD", cache.password.clone()),
            ("BOT_TOKEN", self.bot_token.clone()),
        ];

        let mut vars = vec![
            ("NAMESPACE", self.namespace.clone()),
            ("LANGUAGE", self.language.clone()),
            ("DB_TYPE", db.backend.to_string()),
            ("CACHE_TYPE", cache.cache_type.to_string()),
            ("CACHE_DB", cache.db.to_string()),
        ];
        vars.extend(
            optional
                .into_iter()
                .filter_map(|(name, value)| value.map(|value| (name, value))),
        );
        vars
    }

    /// Write the resolved values to the dotenv file of the run mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    #[instrument(skip(self), fields(mode = %self.mode))]
    pub fn save_env_file(&self) -> Result<PathBuf, ConfigError> {
        let path = self.env_file_path();
        let contents = self
            .to_env_vars()
            .into_iter()
            .map(|(name, value)| format!("{}={}\n", name, quote_env_value(&value)))
            .collect::<String>();
        std::fs::write(&path, contents)
            .map_err(|e| ConfigError::new(format!("Failed to write {}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Saved configuration");
        Ok(path)
    }
}

fn quote_env_value(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Load the dotenv file of `mode` from `root` into the process environment.
///
/// Variables already present in the environment are kept. Returns the
/// loaded path, or `None` when the file does not exist.
pub fn load_dotenv(root: &Path, mode: RunMode) -> Result<Option<PathBuf>, ConfigError> {
    let path = root.join(mode.env_file());
    if !path.is_file() {
        debug!(path = %path.display(), "No dotenv file");
        return Ok(None);
    }
    dotenvy::from_path(&path)
        .map_err(|e| ConfigError::new(format!("Failed to load {}: {}", path.display(), e)))?;
    debug!(path = %path.display(), "Loaded dotenv file");
    Ok(Some(path))
}

/// Read an extension list file.
///
/// One extension name per line; blank lines and `#` comments are skipped.
/// A missing file is an empty list.
pub fn read_extension_list(path: &Path) -> Result<Vec<String>, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(ConfigError::new(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )));
        }
    };

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let settings =
            Settings::from_vars(RunMode::Test, Path::new("/bot"), vars(&[]), &Overrides::new())
                .unwrap();
        assert_eq!(settings.namespace, "default");
        assert_eq!(settings.language, "en_US");
        assert_eq!(settings.database.backend, Backend::Sqlite);
        assert_eq!(settings.cache.cache_type, CacheType::Simple);
        assert!(settings.needs_bot_token());
        assert!(!settings.needs_database_details());
        assert!(!settings.needs_cache_details());
    }

    #[test]
    fn test_overrides_beat_environment() {
        let env = vars(&[("DB_TYPE", "postgres"), ("DB_HOST", "env-host"), ("DB_PORT", "6543")]);
        let mut overrides = Overrides::new();
        overrides.insert("DB_HOST".to_string(), "cli-host".to_string());

        let settings =
            Settings::from_vars(RunMode::Production, Path::new("/bot"), env, &overrides).unwrap();
        assert_eq!(settings.database.backend, Backend::Postgres);
        assert_eq!(settings.database.host.as_deref(), Some("cli-host"));
        assert_eq!(settings.database.port, Some(6543));
    }

    #[test]
    fn test_numeric_password_stays_text() {
        let env = vars(&[("DB_PASSWORD", "12345"), ("BOT_TOKEN", "abc.def")]);
        let settings =
            Settings::from_vars(RunMode::Test, Path::new("/bot"), env, &Overrides::new()).unwrap();
        assert_eq!(settings.database.password.as_deref(), Some("12345"));
        assert_eq!(settings.bot_token.as_deref(), Some("abc.def"));
    }

    #[test]
    fn test_unknown_backend_is_error() {
        let env = vars(&[("DB_TYPE", "oracle")]);
        assert!(
            Settings::from_vars(RunMode::Test, Path::new("/bot"), env, &Overrides::new()).is_err()
        );
    }

    #[test]
    fn test_missing_details_detection() {
        let env = vars(&[("DB_TYPE", "postgres"), ("CACHE_TYPE", "redis")]);
        let settings =
            Settings::from_vars(RunMode::Test, Path::new("/bot"), env, &Overrides::new()).unwrap();
        assert!(settings.needs_database_details());
        assert!(settings.needs_cache_details());
    }

    #[test]
    fn test_cache_number_is_read_and_saved() {
        let env = vars(&[("CACHE_TYPE", "redis"), ("CACHE_HOST", "cache.internal")]);
        let mut overrides = Overrides::new();
        overrides.insert("CACHE_DB".to_string(), "5".to_string());

        let settings =
            Settings::from_vars(RunMode::Test, Path::new("/bot"), env, &overrides).unwrap();
        assert_eq!(settings.cache.db, 5);
        assert!(
            settings
                .to_env_vars()
                .contains(&("CACHE_DB", "5".to_string()))
        );
    }

    #[test]
    fn test_database_urls() {
        let sqlite = DatabaseSettings::default();
        assert_eq!(
            sqlite.url(Path::new("/bot"), RunMode::Test).unwrap(),
            "/bot/test_db.sqlite3"
        );

        let postgres = DatabaseSettings {
            backend: Backend::Postgres,
            name: Some("versa".to_string()),
            user: Some("bot".to_string()),
            password: Some("it's".to_string()),
            host: Some("localhost".to_string()),
            port: None,
        };
        assert_eq!(
            postgres.url(Path::new("/bot"), RunMode::Production).unwrap(),
            r"host='localhost' dbname='versa' port=5432 user='bot' password='it\'s'"
        );

        let no_host = DatabaseSettings {
            host: None,
            ..postgres
        };
        assert!(no_host.url(Path::new("/bot"), RunMode::Production).is_err());
    }

    #[test]
    fn test_env_vars_skip_unset_values() {
        let settings = Settings::from_vars(
            RunMode::Test,
            Path::new("/bot"),
            vars(&[("BOT_TOKEN", "token")]),
            &Overrides::new(),
        )
        .unwrap();
        let names: Vec<&str> = settings.to_env_vars().iter().map(|(name, _)| *name).collect();
        assert!(names.contains(&"BOT_TOKEN"));
        assert!(names.contains(&"DB_TYPE"));
        assert!(!names.contains(&"DB_HOST"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let settings = Settings::from_vars(
            RunMode::Test,
            Path::new("/bot"),
            vars(&[("BOT_TOKEN", "super-secret")]),
            &Overrides::new(),
        )
        .unwrap();
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_mode_files() {
        assert_eq!(RunMode::from_prod_flag(true).env_file(), ".prodenv");
        assert_eq!(RunMode::from_prod_flag(false).sqlite_file(), "test_db.sqlite3");
        assert!(RunMode::Test.is_test());
    }
}
