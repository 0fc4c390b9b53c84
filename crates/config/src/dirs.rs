//! Default directory layout
//!
//! - data: `<data_dir>/arbor` (database and runtime files)
//! - config: `<config_dir>/arbor/config.toml`

use std::path::PathBuf;

/// Application directory name
pub const APP_NAME: &str = "arbor";

/// File name of the redb database inside the home directory
pub const DB_FILE_NAME: &str = "arbor.redb";

/// Get the arbor data directory
#[must_use]
pub fn data_dir() -> Option<PathBuf> {
    ::dirs::data_dir().map(|d| d.join(APP_NAME))
}

/// Get the arbor config directory
#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    ::dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Get the default config file path
#[must_use]
pub fn default_config_file() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}
