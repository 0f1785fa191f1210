//! Versa CLI binary.
//!
//! Launches a Discord bot from the current directory:
//! - Resolve settings from dotenv files, the environment and flags
//! - Prompt for whatever is still missing and save it for next time
//! - Initialize the database schema

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, init_database_command, run_bot};

    let cli = Cli::parse();

    versa_core::init_logging(cli.mode(), cli.verbose)?;

    match cli.command.clone().unwrap_or_default() {
        Commands::Run => run_bot(&cli).await?,
        Commands::Dbinit => init_database_command(&cli)?,
    }

    Ok(())
}
