//! Database schema initialization.

use super::Cli;
use super::prompt;
use std::io::Write;
use std::path::Path;
use tracing::{info, instrument};
use versa_core::{Settings, load_dotenv};
use versa_database::{DEFAULT_POOL_SIZE, DbPool, run_migrations};
use versa_error::{ConfigError, VersaResult};

fn announce_start(out: &mut impl Write) -> Result<(), ConfigError> {
    write!(out, "Initializing database... ")
        .and_then(|()| out.flush())
        .map_err(|e| ConfigError::new(format!("Failed to write progress: {e}")))
}

/// Connect to the configured database and apply pending migrations.
#[instrument(skip(settings), fields(backend = %settings.database.backend))]
pub fn init_database(settings: &Settings) -> VersaResult<()> {
    announce_start(&mut std::io::stdout())?;
    let pool = DbPool::connect(
        settings.database.backend,
        &settings.database_url()?,
        DEFAULT_POOL_SIZE,
    )?;
    let applied = run_migrations(&pool)?;
    println!("OK");
    info!(migrations = applied.len(), "Database initialized");
    Ok(())
}

/// `versa dbinit`: prompt for missing database details, then initialize.
pub fn init_database_command(cli: &Cli) -> VersaResult<()> {
    let root = Path::new(".");
    load_dotenv(root, cli.mode())?;
    let mut settings = Settings::load(cli.mode(), root, &cli.overrides())?;

    if settings.needs_database_details() {
        prompt::database_details(&mut settings)?;
        settings.save_env_file()?;
    }

    init_database(&settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct Unflushable(Vec<u8>);

    impl Write for Unflushable {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_progress_is_flushed() {
        let mut out = Vec::new();
        announce_start(&mut out).unwrap();
        assert_eq!(out, b"Initializing database... ");
    }

    #[test]
    fn test_flush_failure_is_reported() {
        let err = announce_start(&mut Unflushable(Vec::new())).unwrap_err();
        assert!(err.to_string().contains("closed"));
    }
}
