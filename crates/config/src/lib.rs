//! Configuration management for arbor
//!
//! This crate handles:
//! - Configuration loading, validation and writing
//! - Chain directives (where hooks are inserted into chains)
//! - Default directory layout
//! - Logging initialization

pub mod chains;
pub mod config;
pub mod dirs;
pub mod logging;

// Re-export error types from core
pub use arbor_core::{Error, Result};

// Re-export main types
pub use chains::{ChainDirective, ChainsConfig, InsertPosition};
pub use config::{
    Config, CoreConfig, CryptoConfig, DbConfig, PluginConfig, PluginEntry, TokenConfig,
};
pub use dirs::{data_dir, default_config_file};
