//! CLI command definitions.

use clap::{Parser, Subcommand};
use versa_core::{Overrides, RunMode};

/// Versa - run a Discord bot built from extensions
#[derive(Parser, Debug)]
#[command(name = "versa")]
#[command(about = "Run a Versa Discord bot from the current directory", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute, `run` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Run the production bot (default)
    #[arg(long, global = true, overrides_with = "test")]
    pub prod: bool,

    /// Run the test bot with its own dotenv file and database
    #[arg(long, global = true, overrides_with = "prod")]
    pub test: bool,

    /// Namespace of the bot settings
    #[arg(long, global = true)]
    pub namespace: Option<String>,

    /// Database backend
    #[arg(long, global = true, value_parser = ["sqlite", "postgres"])]
    pub db_type: Option<String>,

    /// Database name
    #[arg(long, global = true)]
    pub db_name: Option<String>,

    /// Database user
    #[arg(long, global = true)]
    pub db_user: Option<String>,

    /// Database password
    #[arg(long, global = true)]
    pub db_password: Option<String>,

    /// Database host
    #[arg(long, global = true)]
    pub db_host: Option<String>,

    /// Database port
    #[arg(long, global = true)]
    pub db_port: Option<u16>,

    /// Cache backend
    #[arg(long, global = true, value_parser = ["simple", "redis"])]
    pub cache_type: Option<String>,

    /// Cache host
    #[arg(long, global = true)]
    pub cache_host: Option<String>,

    /// Cache port
    #[arg(long, global = true)]
    pub cache_port: Option<u16>,

    /// Cache password
    #[arg(long, global = true)]
    pub cache_password: Option<String>,

    /// Cache database number
    #[arg(long, global = true)]
    pub cache_db: Option<u32>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Commands {
    /// Start the bot
    #[default]
    Run,

    /// Create the database schema
    Dbinit,
}

impl Cli {
    /// Selected run mode.
    pub fn mode(&self) -> RunMode {
        RunMode::from_prod_flag(!self.test)
    }

    /// Flags as settings overrides, keyed by environment variable name.
    pub fn overrides(&self) -> Overrides {
        let values = [
            ("NAMESPACE", self.namespace.clone()),
            ("DB_TYPE", self.db_type.clone()),
            ("DB_NAME", self.db_name.clone()),
            ("DB_USER", self.db_user.clone()),
            ("DB_PASSWORD", self.db_password.clone()),
            ("DB_HOST", self.db_host.clone()),
            ("DB_PORT", self.db_port.map(|port| port.to_string())),
            ("CACHE_TYPE", self.cache_type.clone()),
            ("CACHE_HOST", self.cache_host.clone()),
            ("CACHE_PORT", self.cache_port.map(|port| port.to_string())),
            ("CACHE_PASSWORD", self.cache_password.clone()),
            ("CACHE_DB", self.cache_db.map(|db| db.to_string())),
        ];

        values
            .into_iter()
            .filter_map(|(name, value)| value.map(|value| (name.to_string(), value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_production_run() {
        let cli = Cli::try_parse_from(["versa"]).unwrap();
        assert_eq!(cli.mode(), RunMode::Production);
        assert_eq!(cli.command.unwrap_or_default(), Commands::Run);
        assert!(cli.overrides().is_empty());
    }

    #[test]
    fn test_last_mode_flag_wins() {
        let cli = Cli::try_parse_from(["versa", "--prod", "--test"]).unwrap();
        assert_eq!(cli.mode(), RunMode::Test);

        let cli = Cli::try_parse_from(["versa", "--test", "--prod"]).unwrap();
        assert_eq!(cli.mode(), RunMode::Production);
    }

    #[test]
    fn test_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "versa",
            "dbinit",
            "--db-type",
            "postgres",
            "--db-port",
            "6543",
            "--namespace",
            "beta",
        ])
        .unwrap();

        assert_eq!(cli.command, Some(Commands::Dbinit));
        let overrides = cli.overrides();
        assert_eq!(overrides.get("DB_TYPE").map(String::as_str), Some("postgres"));
        assert_eq!(overrides.get("DB_PORT").map(String::as_str), Some("6543"));
        assert_eq!(overrides.get("NAMESPACE").map(String::as_str), Some("beta"));
        assert!(!overrides.contains_key("DB_HOST"));
    }

    #[test]
    fn test_cache_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "versa",
            "--cache-type",
            "redis",
            "--cache-host",
            "cache.internal",
            "--cache-db",
            "4",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.get("CACHE_TYPE").map(String::as_str), Some("redis"));
        assert_eq!(overrides.get("CACHE_HOST").map(String::as_str), Some("cache.internal"));
        assert_eq!(overrides.get("CACHE_DB").map(String::as_str), Some("4"));
        assert!(Cli::try_parse_from(["versa", "--cache-db", "-1"]).is_err());
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        assert!(Cli::try_parse_from(["versa", "--db-type", "mysql"]).is_err());
    }
}
