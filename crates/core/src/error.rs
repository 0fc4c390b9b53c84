//! Base error types for arbor
//!
//! Every layer (storage, crypto, hooks, plugins, tree) reports through this
//! one taxonomy so that a hook error can travel back to the caller verbatim.

use std::time::Duration;
use thiserror::Error;

/// Base error type for shared functionality
#[derive(Error, Debug)]
pub enum Error {
    /// No entity with the requested ID or number exists
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// No group with the requested name or number exists
    #[error("Unknown group: {0}")]
    UnknownGroup(String),

    /// An entity with this ID already exists
    #[error("Duplicate entity ID: {0}")]
    DuplicateEntityId(String),

    /// An entity with this number already exists
    #[error("Duplicate entity number: {0}")]
    DuplicateEntityNumber(i32),

    /// A group with this name already exists
    #[error("Duplicate group name: {0}")]
    DuplicateGroupName(String),

    /// A group with this number already exists
    #[error("Duplicate group number: {0}")]
    DuplicateGroupNumber(i32),

    /// The mutation would leave a dangling reference behind
    #[error("Referential integrity violation: {0}")]
    ReferentialIntegrity(String),

    /// Backend failure (serialization, I/O); not user actionable
    #[error("Storage error: {0}")]
    Storage(String),

    /// Secret did not match
    #[error("Authentication failure")]
    AuthenticationFailure,

    /// The entity is locked and cannot authenticate
    #[error("Entity is locked: {0}")]
    EntityLocked(String),

    /// A plugin rejected the request or failed
    #[error("Plugin '{plugin}' failed: {message}")]
    Plugin {
        /// Name of the plugin that failed
        plugin: String,
        /// Message reported by the plugin
        message: String,
    },

    /// A plugin did not answer within the configured bound
    #[error("Plugin '{plugin}' timed out after {}ms", after.as_millis())]
    PluginTimeout {
        /// Name of the plugin that timed out
        plugin: String,
        /// Configured bound that was exceeded
        after: Duration,
    },

    /// Malformed request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Bootstrap was requested after it was disabled
    #[error("Bootstrap is disabled: {0}")]
    BootstrapDisabled(String),

    /// The request was cancelled before it completed
    #[error("Request cancelled before {0}")]
    Cancelled(String),

    /// No hook constructor is registered under this name
    #[error("Unknown hook: {0}")]
    UnknownHook(String),

    /// No chain is configured under this name
    #[error("Unknown chain: {0}")]
    UnknownChain(String),

    /// Chain directives could not be resolved
    #[error("Chain configuration error: {0}")]
    ChainConfig(String),

    /// A name was registered twice
    #[error("'{name}' is already registered as a {kind}")]
    DuplicateRegistration {
        /// What kind of registry rejected the name
        kind: &'static str,
        /// The rejected name
        name: String,
    },

    /// No backend is registered under this name
    #[error("Unknown {kind} backend '{name}'")]
    UnknownBackend {
        /// What kind of backend was requested
        kind: &'static str,
        /// The requested name
        name: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token issuance or validation failed
    #[error("Token error: {0}")]
    Token(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for the not-found family
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::UnknownEntity(_) | Error::UnknownGroup(_))
    }

    /// True for the duplicate family
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            Error::DuplicateEntityId(_)
                | Error::DuplicateEntityNumber(_)
                | Error::DuplicateGroupName(_)
                | Error::DuplicateGroupNumber(_)
        )
    }

    /// Build a plugin failure
    pub fn plugin(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Plugin {
            plugin: plugin.into(),
            message: message.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
