//! Write-config command
//!
//! Writes the effective configuration so it can be edited by hand.

use arbor_config::Config;
use clap::Args;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

use crate::error::{CommandError, Result};

/// Write the effective configuration to a file
#[derive(Debug, Args)]
pub struct WriteConfigCommand {
    /// Destination (defaults to the standard config location)
    #[arg(value_name = "FILE")]
    pub path: Option<PathBuf>,

    /// Replace an existing file
    #[arg(short, long)]
    pub force: bool,
}

impl WriteConfigCommand {
    /// Write `config`, returning the path written to
    pub fn run(&self, config: &Config) -> Result<PathBuf> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => arbor_config::default_config_file().ok_or_else(|| {
                CommandError::invalid_argument(
                    "cannot determine the default config location; pass a FILE",
                )
            })?,
        };
        write_to(config, &path, self.force)?;
        println!("{} {}", "Wrote".green(), path.display());
        Ok(path)
    }
}

fn write_to(config: &Config, path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(CommandError::invalid_argument(format!(
            "{} already exists (use --force to replace it)",
            path.display()
        )));
    }
    config.save(path)?;
    tracing::debug!(path = %path.display(), "Wrote configuration");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.plugin.timeout_ms = 250;
        let command = WriteConfigCommand {
            path: Some(path.clone()),
            force: false,
        };
        assert_eq!(command.run(&config).unwrap(), path);

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.plugin.timeout_ms, 250);
    }

    #[test]
    fn test_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();

        let err = write_to(&Config::default(), &path, false).unwrap_err();
        assert!(matches!(err, CommandError::InvalidArgument(_)));

        write_to(&Config::default(), &path, true).unwrap();
        assert!(Config::load(&path).is_ok());
    }
}
