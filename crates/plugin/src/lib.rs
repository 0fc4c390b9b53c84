//! # Arbor Plugin
//!
//! Extensions consulted while chains run.
//!
//! A [`Plugin`] is either compiled in ([`BuiltinPlugins`]) or a child process
//! speaking line-delimited JSON ([`ProcessPlugin`]). The [`PluginManager`]
//! loads the configured plugins, registers one hook per automatic action with
//! the tree's hook registries, and runs every loaded plugin as a pipeline when
//! one of those hooks fires.

pub mod builtin;
pub mod manager;
pub mod plugin;
pub mod process;

pub use builtin::{AuditPlugin, BuiltinPlugins, PluginConstructor};
pub use manager::PluginManager;
pub use plugin::{Action, ENTITY_ACTIONS, GROUP_ACTIONS, Plugin, PluginOpts, PluginResult};
pub use process::ProcessPlugin;
