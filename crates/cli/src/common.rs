//! Process-wide state shared by every command

use arbor_config::Config;
use arbor_core::{Result, TokenService};
use arbor_plugin::{BuiltinPlugins, PluginManager};
use arbor_tree::{BootstrapRequest, RefContext, Tree, TreeBuilder};
use std::sync::Arc;

/// Everything a command needs: configuration, the tree and its plugins
///
/// Built once by [`Runtime::start`]. Dropping the runtime shuts the plugins
/// down.
pub struct Runtime {
    /// Effective configuration
    pub config: Arc<Config>,
    /// The tree
    pub tree: Arc<Tree>,
    /// Loaded plugins
    pub plugins: Arc<PluginManager>,
    storage_backend: String,
    crypto_backend: String,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("storage", &self.storage_backend)
            .field("crypto", &self.crypto_backend)
            .field("plugins", &self.plugins)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    /// Bring up storage, crypto, plugins and the tree
    ///
    /// When `bootstrap` is given the superuser is created before bootstrap is
    /// disabled. Bootstrap is always disabled before this returns.
    pub fn start(config: Config, bootstrap: Option<&BootstrapRequest>) -> Result<Self> {
        let storage = arbor_db::open(&arbor_db::default_registry(), &config)?;
        let crypto = arbor_crypto::open_hasher(&arbor_crypto::default_hashers(), &config)?;

        let plugins = Arc::new(PluginManager::new(config.plugin.timeout()));
        plugins.load_plugins(&config.plugin.list, &BuiltinPlugins::with_defaults());

        let mut builder = TreeBuilder::new(RefContext::new(storage, crypto))?;
        plugins.register_entity_hooks(builder.entity_hooks_mut())?;
        plugins.register_group_hooks(builder.group_hooks_mut())?;
        let tree = builder
            .chains(&config.chains)
            .entity_directives(plugins.entity_chain_directives())
            .group_directives(plugins.group_chain_directives())
            .build()?;

        let runtime = Self {
            storage_backend: config.db.backend.clone(),
            crypto_backend: config.crypto.backend.clone(),
            config: Arc::new(config),
            tree: Arc::new(tree),
            plugins,
        };

        let bootstrapped = match bootstrap {
            Some(request) => runtime.tree.bootstrap(&request.id, &request.secret).map(|_| ()),
            None => Ok(()),
        };
        runtime.tree.disable_bootstrap();
        bootstrapped?;

        tracing::debug!(?runtime, "Runtime started");
        Ok(runtime)
    }

    /// Token service named in the configuration
    ///
    /// Built on demand so commands that never touch tokens do not need a key.
    pub fn token_service(&self) -> Result<Arc<dyn TokenService>> {
        arbor_crypto::open_token_service(&arbor_crypto::default_token_services(), &self.config)
    }

    /// Storage backend name
    pub fn storage_backend(&self) -> &str {
        &self.storage_backend
    }

    /// Secret hasher backend name
    pub fn crypto_backend(&self) -> &str {
        &self.crypto_backend
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.plugins.shutdown();
    }
}
