//! Plugins compiled into the binary

use crate::plugin::{Plugin, PluginOpts, PluginResult};
use arbor_core::{Registry, Result};
use std::sync::Arc;

/// Builds a builtin plugin
pub type PluginConstructor = fn() -> Arc<dyn Plugin>;

/// Builtin plugins by name
pub struct BuiltinPlugins {
    inner: Registry<PluginConstructor>,
}

impl Default for BuiltinPlugins {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl BuiltinPlugins {
    /// No builtins
    pub fn new() -> Self {
        Self {
            inner: Registry::new("builtin plugin"),
        }
    }

    /// Every plugin shipped with arbor
    pub fn with_defaults() -> Self {
        let mut plugins = Self::new();
        // Fresh registry, cannot collide
        let _ = plugins.register(AuditPlugin::NAME, AuditPlugin::construct);
        plugins
    }

    /// Register a builtin under `name`
    pub fn register(&mut self, name: &str, constructor: PluginConstructor) -> Result<()> {
        self.inner.register(name, constructor)
    }

    /// Construct the builtin called `name`
    pub fn construct(&self, name: &str) -> Result<Arc<dyn Plugin>> {
        Ok((self.inner.get(name)?)())
    }

    /// Builtin names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.names()
    }
}

impl std::fmt::Debug for BuiltinPlugins {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.inner, f)
    }
}

/// Logs every action and passes the record through untouched
#[derive(Debug, Default)]
pub struct AuditPlugin;

impl AuditPlugin {
    /// Registered name
    pub const NAME: &'static str = "audit";

    fn construct() -> Arc<dyn Plugin> {
        Arc::new(Self)
    }
}

impl Plugin for AuditPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&self) -> Result<()> {
        tracing::debug!("Audit plugin ready");
        Ok(())
    }

    fn shutdown(&self) {
        tracing::debug!("Audit plugin stopped");
    }

    fn process_entity(&self, opts: &PluginOpts) -> Result<PluginResult> {
        tracing::info!(
            target: "arbor::audit",
            action = %opts.action,
            id = opts.entity.as_ref().map(|e| e.id.as_str()),
            "Entity event"
        );
        Ok(opts.passthrough())
    }

    fn process_group(&self, opts: &PluginOpts) -> Result<PluginResult> {
        tracing::info!(
            target: "arbor::audit",
            action = %opts.action,
            name = opts.group.as_ref().map(|g| g.name.as_str()),
            "Group event"
        );
        Ok(opts.passthrough())
    }
}
