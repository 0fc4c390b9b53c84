//! Configuration management
//!
//! This module handles loading, validating and writing arbor configuration.
//!
//! ```toml
//! [core]
//! home = "~/.local/share/arbor"
//!
//! [db]
//! backend = "redb"
//!
//! [crypto]
//! backend = "argon2"
//!
//! [token]
//! backend = "jwt"
//! key = "change-me"
//! lifetime_secs = 3600
//!
//! [plugin]
//! timeout_ms = 5000
//!
//! [[plugin.list]]
//! kind = "builtin"
//! name = "audit"
//!
//! [[plugin.list]]
//! kind = "process"
//! name = "ldap-sync"
//! command = "arbor-ldap-sync"
//! args = ["--realm", "EXAMPLE"]
//! ```

use crate::Result;
use crate::chains::{ChainDirective, ChainsConfig};
use arbor_core::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an alternate config file
pub const CONFIG_ENV: &str = "ARBOR_CONFIG";

/// Core section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Directory holding the database and other runtime files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<PathBuf>,
}

/// Storage section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    /// Storage backend name (`redb` or `memory`)
    #[serde(default = "default_db_backend")]
    pub backend: String,

    /// Database file; defaults to `<home>/arbor.redb`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: default_db_backend(),
            path: None,
        }
    }
}

/// Secret hashing section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoConfig {
    /// Crypto backend name (`argon2` or `nocrypto`)
    #[serde(default = "default_crypto_backend")]
    pub backend: String,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            backend: default_crypto_backend(),
        }
    }
}

/// Token section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Token backend name
    #[serde(default = "default_token_backend")]
    pub backend: String,

    /// Signing key; tokens cannot be issued without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Issuer claim
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Token lifetime in seconds
    #[serde(default = "default_lifetime_secs")]
    pub lifetime_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            backend: default_token_backend(),
            key: None,
            issuer: default_issuer(),
            lifetime_secs: default_lifetime_secs(),
        }
    }
}

/// One configured plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PluginEntry {
    /// A plugin compiled into this binary
    Builtin {
        /// Registered builtin name
        name: String,
    },
    /// A plugin running as a child process
    Process {
        /// Name used in logs and errors
        name: String,
        /// Executable, resolved through `PATH` when not a path
        command: String,
        /// Extra arguments
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
    },
}

impl PluginEntry {
    /// Name of the plugin
    pub fn name(&self) -> &str {
        match self {
            Self::Builtin { name } | Self::Process { name, .. } => name,
        }
    }
}

/// Plugin section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Upper bound for any single plugin call
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Plugins in invocation order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub list: Vec<PluginEntry>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            list: Vec::new(),
        }
    }
}

impl PluginConfig {
    /// Timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Arbor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Core section
    #[serde(default)]
    pub core: CoreConfig,

    /// Storage section
    #[serde(default)]
    pub db: DbConfig,

    /// Crypto section
    #[serde(default)]
    pub crypto: CryptoConfig,

    /// Token section
    #[serde(default)]
    pub token: TokenConfig,

    /// Plugin section
    #[serde(default)]
    pub plugin: PluginConfig,

    /// Chain overrides
    #[serde(default)]
    pub chains: ChainsConfig,

    /// File this configuration was read from (not serialized)
    #[serde(skip)]
    source: Option<PathBuf>,
}

fn default_db_backend() -> String {
    "redb".to_string()
}

fn default_crypto_backend() -> String {
    "argon2".to_string()
}

fn default_token_backend() -> String {
    "jwt".to_string()
}

fn default_issuer() -> String {
    "arbor".to_string()
}

fn default_lifetime_secs() -> u64 {
    3600
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Config {
    /// Load configuration from a file
    ///
    /// Relative paths inside the file are resolved against its directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        let mut config = Self::from_toml_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse config file {}: {e}", path.display()))
        })?;

        if let Some(parent) = path.parent() {
            config.resolve_relative_paths(parent);
        }
        config.source = Some(path.to_path_buf());

        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.message().to_string()))
    }

    /// Pick the config file to read
    ///
    /// Order: explicit path, then the value of [`CONFIG_ENV`], then the
    /// default location. Only the default location may be absent.
    pub fn locate(explicit: Option<&Path>, env_value: Option<String>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Some(value) = env_value.filter(|v| !v.is_empty()) {
            return Some(PathBuf::from(value));
        }
        crate::dirs::default_config_file().filter(|p| p.exists())
    }

    /// Locate, load and validate the configuration
    ///
    /// A missing default file yields the built-in defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let config = match Self::locate(explicit, std::env::var(CONFIG_ENV).ok()) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading configuration");
                Self::load(path)?
            }
            None => {
                tracing::debug!("No configuration file found, using defaults");
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.plugin.timeout_ms == 0 {
            return Err(Error::Config(
                "plugin.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.token.lifetime_secs == 0 {
            return Err(Error::Config(
                "token.lifetime_secs must be greater than zero".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for entry in &self.plugin.list {
            if entry.name().is_empty() {
                return Err(Error::Config("plugin name cannot be empty".to_string()));
            }
            if !seen.insert(entry.name()) {
                return Err(Error::Config(format!(
                    "plugin '{}' is configured more than once",
                    entry.name()
                )));
            }
            if let PluginEntry::Process { name, command, .. } = entry
                && command.trim().is_empty()
            {
                return Err(Error::Config(format!("plugin '{name}' has no command")));
            }
        }

        for (kind, directives) in [("entity", &self.chains.entity), ("group", &self.chains.group)]
        {
            validate_directives(kind, directives)?;
        }

        Ok(())
    }

    /// Serialize the effective configuration
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))
    }

    /// Write the configuration to a file, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!(
                    "Failed to create config directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        fs::write(path, content).map_err(|e| {
            Error::Config(format!("Failed to write config file {}: {e}", path.display()))
        })
    }

    /// File this configuration was loaded from
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Runtime home directory
    pub fn home_dir(&self) -> Result<PathBuf> {
        self.core
            .home
            .clone()
            .or_else(crate::dirs::data_dir)
            .ok_or_else(|| Error::Config("cannot determine arbor home directory".to_string()))
    }

    /// Database file used by file-backed storage
    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.db.path {
            Some(path) => Ok(path.clone()),
            None => Ok(self.home_dir()?.join(crate::dirs::DB_FILE_NAME)),
        }
    }

    fn resolve_relative_paths(&mut self, base_dir: &Path) {
        if let Some(ref home) = self.core.home {
            self.core.home = Some(Self::resolve_path(home, base_dir));
        }
        if let Some(ref path) = self.db.path {
            self.db.path = Some(Self::resolve_path(path, base_dir));
        }
    }

    /// Expand `~/` and resolve relative paths against `base_dir`
    fn resolve_path(path: &Path, base_dir: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();

        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = ::dirs::home_dir() {
                return home.join(stripped);
            }
        } else if path_str == "~"
            && let Some(home) = ::dirs::home_dir()
        {
            return home;
        }

        if path.is_relative() {
            base_dir.join(path)
        } else {
            path.to_path_buf()
        }
    }
}

fn validate_directives(kind: &str, directives: &[ChainDirective]) -> Result<()> {
    for directive in directives {
        if directive.chain.trim().is_empty() {
            return Err(Error::Config(format!(
                "{kind} chain directive for hook '{}' has an empty chain name",
                directive.hook
            )));
        }
        if directive.hook.trim().is_empty() {
            return Err(Error::Config(format!(
                "{kind} chain directive for chain '{}' has an empty hook name",
                directive.chain
            )));
        }
        if directive.position.anchor().is_some_and(|a| a.trim().is_empty()) {
            return Err(Error::Config(format!(
                "{kind} chain directive '{directive}' has an empty anchor"
            )));
        }
    }
    Ok(())
}
