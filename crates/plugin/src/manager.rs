//! Plugin manager
//!
//! Owns every loaded plugin, runs them as a pipeline, and weaves them into
//! the tree's chains through one hook per automatic action.

use crate::builtin::BuiltinPlugins;
use crate::plugin::{Action, ENTITY_ACTIONS, GROUP_ACTIONS, Plugin, PluginOpts, PluginResult};
use crate::process::ProcessPlugin;
use arbor_config::{ChainDirective, PluginEntry};
use arbor_core::{Entity, EntityDelta, Error, Group, GroupDelta, Result};
use arbor_tree::{CancelToken, Hook, HookRegistry, RefContext};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Loaded plugins, in load order
pub struct PluginManager {
    plugins: RwLock<IndexMap<String, Arc<dyn Plugin>>>,
    timeout: Duration,
    shut_down: AtomicBool,
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("plugins", &self.names())
            .field("timeout", &self.timeout)
            .field("shut_down", &self.shut_down.load(Ordering::SeqCst))
            .finish()
    }
}

impl PluginManager {
    /// Manager with no plugins; every plugin call is bounded by `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self {
            plugins: RwLock::new(IndexMap::new()),
            timeout,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Names of the loaded plugins, in invocation order
    pub fn names(&self) -> Vec<String> {
        self.plugins.read().keys().cloned().collect()
    }

    /// Number of loaded plugins
    pub fn len(&self) -> usize {
        self.plugins.read().len()
    }

    /// True if no plugin is loaded
    pub fn is_empty(&self) -> bool {
        self.plugins.read().is_empty()
    }

    /// Construct, initialize and keep every configured plugin
    ///
    /// A plugin that cannot be constructed or initialized is logged and
    /// skipped. Returns the number of plugins loaded.
    pub fn load_plugins(&self, entries: &[PluginEntry], builtins: &BuiltinPlugins) -> usize {
        let mut loaded = 0;
        for entry in entries {
            tracing::trace!(plugin = entry.name(), "Loading plugin");
            let result = self
                .construct(entry, builtins)
                .and_then(|plugin| self.add_plugin(plugin));
            match result {
                Ok(()) => loaded += 1,
                Err(e) => {
                    tracing::warn!(plugin = entry.name(), error = %e, "Error loading plugin");
                }
            }
        }
        tracing::debug!(loaded, configured = entries.len(), "Plugins loaded");
        loaded
    }

    fn construct(&self, entry: &PluginEntry, builtins: &BuiltinPlugins) -> Result<Arc<dyn Plugin>> {
        match entry {
            PluginEntry::Builtin { name } => builtins.construct(name),
            PluginEntry::Process {
                name,
                command,
                args,
            } => Ok(Arc::new(ProcessPlugin::new(
                name.as_str(),
                command,
                args.clone(),
                self.timeout,
            )?)),
        }
    }

    /// Initialize `plugin` and append it to the pipeline
    pub fn add_plugin(&self, plugin: Arc<dyn Plugin>) -> Result<()> {
        let name = plugin.name().to_string();
        if self.plugins.read().contains_key(&name) {
            return Err(Error::DuplicateRegistration {
                kind: "plugin",
                name,
            });
        }

        self.call(&plugin, |p| p.init())?;

        let mut plugins = self.plugins.write();
        if plugins.contains_key(&name) {
            drop(plugins);
            plugin.shutdown();
            return Err(Error::DuplicateRegistration {
                kind: "plugin",
                name,
            });
        }
        plugins.insert(name.clone(), plugin);
        tracing::info!(plugin = %name, "Plugin loaded");
        Ok(())
    }

    /// Run `f` against `plugin` on a worker thread, bounded by the timeout
    ///
    /// On timeout the worker is abandoned; its eventual result is dropped.
    fn call<T, F>(&self, plugin: &Arc<dyn Plugin>, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Plugin) -> Result<T> + Send + 'static,
    {
        let name = plugin.name().to_string();
        let worker = Arc::clone(plugin);
        let (tx, rx) = mpsc::channel();

        thread::Builder::new()
            .name(format!("plugin-{name}"))
            .spawn(move || {
                let _ = tx.send(f(worker.as_ref()));
            })?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(Error::PluginTimeout {
                plugin: name,
                after: self.timeout,
            }),
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::plugin(name, "plugin call panicked"))
            }
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn Plugin>> {
        self.plugins.read().values().cloned().collect()
    }

    /// Pass an entity through every plugin in order
    ///
    /// Each plugin sees the previous plugin's output. The first error stops
    /// the pipeline, and `cancel` is checked before every plugin.
    pub fn invoke_entity_processing(
        &self,
        mut opts: PluginOpts,
        cancel: &CancelToken,
    ) -> Result<PluginResult> {
        for plugin in self.snapshot() {
            check_cancelled(&plugin, cancel)?;
            let start = Instant::now();
            tracing::trace!(plugin = plugin.name(), action = %opts.action, "Calling plugin");

            let input = opts.clone();
            let result = self.call(&plugin, move |p| p.process_entity(&input))?;
            if let Some(entity) = result.entity {
                opts.entity = Some(entity);
            }

            tracing::trace!(
                plugin = plugin.name(),
                elapsed_ms = start.elapsed().as_millis(),
                "Plugin finished"
            );
        }
        Ok(opts.passthrough())
    }

    /// Pass a group through every plugin in order
    ///
    /// Each plugin sees the previous plugin's output. The first error stops
    /// the pipeline, and `cancel` is checked before every plugin.
    pub fn invoke_group_processing(
        &self,
        mut opts: PluginOpts,
        cancel: &CancelToken,
    ) -> Result<PluginResult> {
        for plugin in self.snapshot() {
            check_cancelled(&plugin, cancel)?;
            let start = Instant::now();
            tracing::trace!(plugin = plugin.name(), action = %opts.action, "Calling plugin");

            let input = opts.clone();
            let result = self.call(&plugin, move |p| p.process_group(&input))?;
            if let Some(group) = result.group {
                opts.group = Some(group);
            }

            tracing::trace!(
                plugin = plugin.name(),
                elapsed_ms = start.elapsed().as_millis(),
                "Plugin finished"
            );
        }
        Ok(opts.passthrough())
    }

    /// Shut every plugin down; only the first call does anything
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            tracing::debug!("Plugins already shut down");
            return;
        }

        tracing::debug!("Shutting down plugins");
        let plugins: Vec<_> = self.plugins.write().drain(..).collect();
        for (name, plugin) in plugins {
            tracing::debug!(plugin = %name, "Plugin shutdown");
            if let Err(e) = self.call(&plugin, |p| {
                p.shutdown();
                Ok(())
            }) {
                tracing::warn!(plugin = %name, error = %e, "Plugin shutdown failed");
            }
        }
    }

    /// Install one entity hook per automatic entity action
    pub fn register_entity_hooks(
        self: &Arc<Self>,
        registry: &mut HookRegistry<Entity>,
    ) -> Result<()> {
        for action in ENTITY_ACTIONS {
            let manager = Arc::clone(self);
            tracing::trace!(%action, "Registering entity plugin hook");
            registry.register(action.hook_name(), move |_refs: &RefContext| {
                Ok(Arc::new(EntityPluginHook {
                    action,
                    manager: Arc::clone(&manager),
                }) as Arc<dyn Hook<Entity>>)
            })?;
        }
        Ok(())
    }

    /// Install one group hook per automatic group action
    pub fn register_group_hooks(
        self: &Arc<Self>,
        registry: &mut HookRegistry<Group>,
    ) -> Result<()> {
        for action in GROUP_ACTIONS {
            let manager = Arc::clone(self);
            tracing::trace!(%action, "Registering group plugin hook");
            registry.register(action.hook_name(), move |_refs: &RefContext| {
                Ok(Arc::new(GroupPluginHook {
                    action,
                    manager: Arc::clone(&manager),
                }) as Arc<dyn Hook<Group>>)
            })?;
        }
        Ok(())
    }

    /// Where the entity plugin hooks go
    pub fn entity_chain_directives(&self) -> Vec<ChainDirective> {
        directives(&ENTITY_ACTIONS)
    }

    /// Where the group plugin hooks go
    pub fn group_chain_directives(&self) -> Vec<ChainDirective> {
        directives(&GROUP_ACTIONS)
    }
}

fn check_cancelled(plugin: &Arc<dyn Plugin>, cancel: &CancelToken) -> Result<()> {
    if cancel.is_cancelled() {
        tracing::debug!(plugin = plugin.name(), "Plugin pipeline cancelled");
        return Err(Error::Cancelled(format!("plugin '{}'", plugin.name())));
    }
    Ok(())
}

fn directives(actions: &[Action]) -> Vec<ChainDirective> {
    actions
        .iter()
        .flat_map(|action| {
            action
                .chains()
                .iter()
                .map(move |chain| ChainDirective::append(*chain, action.hook_name()))
        })
        .collect()
}

/// Hands the working entity to the plugin pipeline
struct EntityPluginHook {
    action: Action,
    manager: Arc<PluginManager>,
}

impl Hook<Entity> for EntityPluginHook {
    fn name(&self) -> &str {
        self.action.hook_name()
    }

    fn run(&self, working: &mut Entity, _delta: &EntityDelta, cancel: &CancelToken) -> Result<()> {
        let opts = PluginOpts::entity(self.action, working.clone());
        let result = self.manager.invoke_entity_processing(opts, cancel)?;
        if let Some(entity) = result.entity {
            *working = entity;
        }
        Ok(())
    }
}

/// Hands the working group to the plugin pipeline
struct GroupPluginHook {
    action: Action,
    manager: Arc<PluginManager>,
}

impl Hook<Group> for GroupPluginHook {
    fn name(&self) -> &str {
        self.action.hook_name()
    }

    fn run(&self, working: &mut Group, _delta: &GroupDelta, cancel: &CancelToken) -> Result<()> {
        let opts = PluginOpts::group(self.action, working.clone());
        let result = self.manager.invoke_group_processing(opts, cancel)?;
        if let Some(group) = result.group {
            *working = group;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Counts calls; can fail, stall, tag the meta field or cancel the run
    #[derive(Default)]
    struct Stub {
        name: String,
        calls: AtomicUsize,
        shutdowns: AtomicUsize,
        fail: bool,
        stall: Option<Duration>,
        tag: Option<String>,
        cancels: Option<CancelToken>,
    }

    impl Stub {
        fn named(name: &str) -> Self {
            Self {
                name: name.to_string(),
                ..Self::default()
            }
        }
    }

    impl Plugin for Stub {
        fn name(&self) -> &str {
            &self.name
        }

        fn init(&self) -> Result<()> {
            if self.fail {
                return Err(Error::plugin(&self.name, "init refused"));
            }
            Ok(())
        }

        fn shutdown(&self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }

        fn process_entity(&self, opts: &PluginOpts) -> Result<PluginResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(stall) = self.stall {
                thread::sleep(stall);
            }
            if self.fail {
                return Err(Error::plugin(&self.name, "processing refused"));
            }
            if let Some(cancel) = &self.cancels {
                cancel.cancel();
            }
            let mut entity = opts.entity.clone().unwrap();
            if let Some(tag) = &self.tag {
                let meta = entity.meta.unwrap_or_default();
                entity.meta = Some(format!("{meta}{tag}"));
            }
            Ok(PluginResult {
                entity: Some(entity),
                group: None,
            })
        }

        fn process_group(&self, opts: &PluginOpts) -> Result<PluginResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(opts.passthrough())
        }
    }

    fn opts() -> PluginOpts {
        PluginOpts::entity(Action::EntityUpdate, Entity::new("alice"))
    }

    #[test]
    fn test_no_plugins_returns_input() {
        let manager = PluginManager::new(Duration::from_secs(1));
        let result = manager.invoke_entity_processing(opts(), &CancelToken::new()).unwrap();
        assert_eq!(result.entity, opts().entity);
    }

    #[test]
    fn test_pipeline_feeds_output_forward() {
        let manager = PluginManager::new(Duration::from_secs(1));
        for tag in ["a", "b", "c"] {
            manager
                .add_plugin(Arc::new(Stub {
                    tag: Some(tag.to_string()),
                    ..Stub::named(tag)
                }))
                .unwrap();
        }
        let result = manager.invoke_entity_processing(opts(), &CancelToken::new()).unwrap();
        assert_eq!(result.entity.unwrap().meta.as_deref(), Some("abc"));
    }

    #[test]
    fn test_second_plugin_error_stops_pipeline() {
        let manager = PluginManager::new(Duration::from_secs(1));
        let first = Arc::new(Stub::named("first"));
        let second = Arc::new(Stub::named("second"));
        let third = Arc::new(Stub::named("third"));
        manager.add_plugin(first.clone()).unwrap();
        manager.add_plugin(second.clone()).unwrap();
        manager.add_plugin(third.clone()).unwrap();

        // Flip the second plugin to failing after it loaded
        let failing = Arc::new(Stub {
            fail: true,
            ..Stub::named("second")
        });
        manager.plugins.write().insert("second".into(), failing.clone());

        let err = manager.invoke_entity_processing(opts(), &CancelToken::new()).unwrap_err();
        assert_eq!(err.to_string(), "Plugin 'second' failed: processing refused");
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
        assert_eq!(third.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_between_plugins() {
        let manager = PluginManager::new(Duration::from_secs(1));
        let cancel = CancelToken::new();
        let first = Arc::new(Stub {
            cancels: Some(cancel.clone()),
            ..Stub::named("first")
        });
        let second = Arc::new(Stub::named("second"));
        manager.add_plugin(first.clone()).unwrap();
        manager.add_plugin(second.clone()).unwrap();

        let err = manager.invoke_entity_processing(opts(), &cancel).unwrap_err();
        assert!(matches!(err, Error::Cancelled(ref at) if at == "plugin 'second'"));
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_timeout() {
        let manager = PluginManager::new(Duration::from_millis(50));
        manager
            .add_plugin(Arc::new(Stub {
                stall: Some(Duration::from_millis(500)),
                ..Stub::named("slow")
            }))
            .unwrap();

        let err = manager.invoke_entity_processing(opts(), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, Error::PluginTimeout { ref plugin, .. } if plugin == "slow"));
    }

    #[test]
    fn test_failed_init_is_skipped() {
        let manager = PluginManager::new(Duration::from_secs(1));
        let err = manager
            .add_plugin(Arc::new(Stub {
                fail: true,
                ..Stub::named("broken")
            }))
            .unwrap_err();
        assert!(matches!(err, Error::Plugin { .. }));
        assert!(manager.is_empty());

        let entries = vec![
            PluginEntry::Builtin {
                name: "audit".into(),
            },
            PluginEntry::Builtin {
                name: "missing".into(),
            },
            PluginEntry::Builtin {
                name: "audit".into(),
            },
        ];
        let loaded = manager.load_plugins(&entries, &BuiltinPlugins::with_defaults());
        assert_eq!(loaded, 1);
        assert_eq!(manager.names(), vec!["audit"]);
    }

    #[test]
    fn test_shutdown_runs_once() {
        let manager = PluginManager::new(Duration::from_secs(1));
        let stub = Arc::new(Stub::named("stub"));
        manager.add_plugin(stub.clone()).unwrap();

        manager.shutdown();
        manager.shutdown();
        assert_eq!(stub.shutdowns.load(Ordering::SeqCst), 1);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_directives_cover_actions() {
        let manager = PluginManager::new(Duration::from_secs(1));
        let entity = manager.entity_chain_directives();
        assert!(entity.iter().any(|d| d.chain == "LOCK" && d.hook == "plugin-entity-lock"));
        assert_eq!(
            entity
                .iter()
                .filter(|d| d.hook == "plugin-entity-update")
                .count(),
            5
        );
        let group = manager.group_chain_directives();
        assert!(group
            .iter()
            .any(|d| d.chain == "SET-MANAGING-GROUP" && d.hook == "plugin-group-update"));
    }
}
