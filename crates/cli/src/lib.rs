//! Arbor CLI library
//!
//! This library contains all the CLI logic for arbor, making it reusable
//! for testing and integration with other tools.

pub mod cmd;
pub mod command;
pub mod common;
pub mod error;

use anyhow::{Context, Result};
use arbor_config::Config;
use arbor_core::Error as ArborError;
use arbor_tree::BootstrapRequest;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use command::Command;
use common::Runtime;
use error::CommandError;

/// Arbor - an identity and authorization tree
#[derive(Debug, Parser)]
#[command(name = "arbor")]
#[command(about = "Manage the arbor identity tree")]
#[command(version)]
#[command(long_about = "Manage the arbor identity tree

Entities and groups are stored in a single tree. Every change runs through a
configurable chain of hooks, and plugins can observe or veto each one.

Examples:
  • arbor --bootstrap root:hunter2 info
      → Create the superuser on an empty tree

  • arbor entity new alice --secret s3cret
      → Create an entity with a secret

  • arbor group new ops --managed-by admins
      → Create a group managed by another group

  • arbor token issue alice --secret s3cret
      → Authenticate and print a bearer token

Exit status:
  0 success, 2 bad input or configuration, 3 authentication refused,
  4 unknown record or conflict, 1 anything else")]
pub struct Cli {
    /// Path to the config file
    #[arg(long, env = "ARBOR_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output (shows DEBUG level logs)
    #[arg(short, long)]
    pub verbose: bool,

    /// Write logs to a file (useful for debugging)
    #[arg(long, env = "ARBOR_LOG_FILE", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Create or reset the superuser before running the command
    #[arg(long, value_name = "ID:SECRET", env = "ARBOR_BOOTSTRAP", hide_env_values = true)]
    pub bootstrap: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for arbor CLI
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage entities
    #[command(subcommand)]
    Entity(cmd::entity::EntityCommands),

    /// Manage groups
    #[command(subcommand)]
    Group(cmd::group::GroupCommands),

    /// Issue and validate tokens
    #[command(subcommand)]
    Token(cmd::token::TokenCommands),

    /// Display backends, plugins and chain layouts
    Info(cmd::info::InfoCommand),

    /// Write the effective configuration to a file
    WriteConfig(cmd::write_config::WriteConfigCommand),
}

/// Execute the command based on the command type
///
/// Only commands that touch the tree start a [`Runtime`].
fn execute_command(
    command: &Commands,
    config: Config,
    bootstrap: Option<&BootstrapRequest>,
) -> Result<()> {
    let start = |config| Runtime::start(config, bootstrap).context("Failed to start arbor runtime");

    match command {
        Commands::Entity(entity_cmd) => entity_cmd.execute(&start(config)?)?,
        Commands::Group(group_cmd) => group_cmd.execute(&start(config)?)?,
        Commands::Token(token_cmd) => token_cmd.execute(&start(config)?)?,
        Commands::Info(info_cmd) => {
            info_cmd.execute(&start(config)?)?;
        }
        Commands::WriteConfig(write_cmd) => {
            write_cmd.run(&config)?;
        }
    }
    Ok(())
}

/// Main entry point for the CLI logic
///
/// # Errors
///
/// Returns an error if:
/// - Logging initialization fails
/// - Configuration loading fails
/// - The runtime cannot be started (backends, chains, bootstrap)
/// - Command execution fails
pub fn run(cli: Cli) -> Result<()> {
    arbor_config::logging::init(cli.verbose, cli.log_file.as_deref())?;

    let config = Config::discover(cli.config.as_deref()).context("Failed to load configuration")?;
    let bootstrap = cli
        .bootstrap
        .as_deref()
        .map(BootstrapRequest::parse)
        .transpose()?;

    execute_command(&cli.command, config, bootstrap.as_ref())
}

/// Exit status for a failed run
///
/// | Code | Meaning |
/// |------|---------|
/// | 1 | anything not listed below |
/// | 2 | bad arguments, bootstrap input or configuration |
/// | 3 | authentication refused |
/// | 4 | unknown record, duplicate or dangling reference |
pub fn exit_code(error: &anyhow::Error) -> u8 {
    for cause in error.chain() {
        if let Some(command_error) = cause.downcast_ref::<CommandError>() {
            match command_error {
                CommandError::InvalidArgument(_) => return 2,
                CommandError::Arbor(e) => return arbor_exit_code(e),
                _ => {}
            }
        }
        if let Some(e) = cause.downcast_ref::<ArborError>() {
            return arbor_exit_code(e);
        }
    }
    1
}

fn arbor_exit_code(error: &ArborError) -> u8 {
    match error {
        ArborError::InvalidRequest(_)
        | ArborError::BootstrapDisabled(_)
        | ArborError::Config(_)
        | ArborError::ChainConfig(_)
        | ArborError::UnknownHook(_)
        | ArborError::UnknownChain(_)
        | ArborError::UnknownBackend { .. }
        | ArborError::DuplicateRegistration { .. } => 2,
        ArborError::AuthenticationFailure | ArborError::EntityLocked(_) | ArborError::Token(_) => 3,
        e if e.is_not_found()
            || e.is_duplicate()
            || matches!(e, ArborError::ReferentialIntegrity(_)) =>
        {
            4
        }
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_entity_new() {
        let cli = Cli::try_parse_from([
            "arbor",
            "--bootstrap",
            "root:pw",
            "entity",
            "new",
            "alice",
            "--number",
            "4",
        ])
        .unwrap();
        assert_eq!(cli.bootstrap.as_deref(), Some("root:pw"));
        match cli.command {
            Commands::Entity(cmd::entity::EntityCommands::New { id, number, .. }) => {
                assert_eq!(id, "alice");
                assert_eq!(number, Some(4));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_capability() {
        let cli = Cli::try_parse_from([
            "arbor",
            "group",
            "add-capability",
            "ops",
            "modify-group-members",
        ])
        .unwrap();
        match cli.command {
            Commands::Group(cmd::group::GroupCommands::AddCapability { name, capability }) => {
                assert_eq!(name, "ops");
                assert_eq!(capability, arbor_core::Capability::ModifyGroupMembers);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_exit_codes() {
        let unknown = CommandError::from(ArborError::UnknownEntity("alice".into()));
        assert_eq!(exit_code(&anyhow::Error::from(unknown)), 4);

        let denied = CommandError::from(ArborError::AuthenticationFailure);
        assert_eq!(exit_code(&anyhow::Error::from(denied)), 3);

        let bad = CommandError::invalid_argument("no FILE");
        assert_eq!(exit_code(&anyhow::Error::from(bad)), 2);

        let startup = anyhow::Error::new(ArborError::Config("no key".into()))
            .context("Failed to start arbor runtime");
        assert_eq!(exit_code(&startup), 2);

        let storage = anyhow::Error::new(ArborError::Storage("disk full".into()));
        assert_eq!(exit_code(&storage), 1);
        assert_eq!(exit_code(&anyhow::anyhow!("plain")), 1);
    }

    #[test]
    fn test_write_config_runs_without_runtime() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("arbor.toml");
        let cli = Cli::try_parse_from(["arbor", "write-config", path.to_str().unwrap()]).unwrap();

        // An unknown storage backend would fail Runtime::start
        let mut config = Config::default();
        config.db.backend = "nowhere".into();
        execute_command(&cli.command, config, None).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_parse_rejects_unknown_capability() {
        assert!(
            Cli::try_parse_from(["arbor", "entity", "add-capability", "alice", "FLY"]).is_err()
        );
    }
}
