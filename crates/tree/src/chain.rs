//! Chain assembly and execution

use crate::context::RefContext;
use crate::hook::{Hook, HookRegistry, Record};
use arbor_config::{ChainDirective, InsertPosition};
use arbor_core::{Error, Result};
use indexmap::IndexMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Cooperative cancellation flag checked before every hook
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; visible to every clone
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once [`cancel`](Self::cancel) has been called
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Collects directives and builds [`Chains`] from them
///
/// # Examples
///
/// ```ignore
/// let mut builder = ChainBuilder::<Entity>::new();
/// builder
///     .configure("LOCK", "load-entity", InsertPosition::Append)
///     .configure("LOCK", "lock-entity", InsertPosition::Append)
///     .configure("LOCK", "audit", InsertPosition::Before("lock-entity".into()));
/// let chains = builder.build(&registry, &refs)?;
/// ```
pub struct ChainBuilder<R: Record> {
    directives: Vec<ChainDirective>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Default for ChainBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> ChainBuilder<R> {
    /// Create a builder with no directives
    pub fn new() -> Self {
        Self {
            directives: Vec::new(),
            _record: PhantomData,
        }
    }

    /// Insert `hook` into `chain` at `position`
    pub fn configure(
        &mut self,
        chain: impl Into<String>,
        hook: impl Into<String>,
        position: InsertPosition,
    ) -> &mut Self {
        self.directives
            .push(ChainDirective::new(chain, hook, position));
        self
    }

    /// Add prepared directives, in order
    pub fn extend<I>(&mut self, directives: I) -> &mut Self
    where
        I: IntoIterator<Item = ChainDirective>,
    {
        self.directives.extend(directives);
        self
    }

    /// Resolve directives into chain layouts (hook names only)
    ///
    /// Directives anchored on a hook that a later directive adds are retried
    /// until no further progress is possible.
    pub fn layout(&self) -> Result<IndexMap<String, Vec<String>>> {
        let mut chains: IndexMap<String, Vec<String>> = IndexMap::new();
        let mut pending: Vec<&ChainDirective> = Vec::new();

        for directive in &self.directives {
            if directive.position.anchor() == Some(directive.hook.as_str()) {
                return Err(Error::ChainConfig(format!(
                    "{} chain directive '{directive}' is anchored on itself",
                    R::KIND
                )));
            }
            pending.push(directive);
        }

        while !pending.is_empty() {
            let before = pending.len();
            pending.retain(|directive| !apply(&mut chains, directive));

            if pending.len() == before {
                let unresolved = pending
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(Error::ChainConfig(format!(
                    "unresolvable or cyclic {} chain directives: {unresolved}",
                    R::KIND
                )));
            }
        }

        Ok(chains)
    }

    /// Validate the directives and construct every hook
    pub fn build(&self, registry: &HookRegistry<R>, refs: &RefContext) -> Result<Chains<R>> {
        for directive in &self.directives {
            if !registry.contains(&directive.hook) {
                return Err(Error::UnknownHook(format!(
                    "{} '{}' (chain {})",
                    R::KIND,
                    directive.hook,
                    directive.chain
                )));
            }
        }

        let layout = self.layout()?;

        let mut chains = IndexMap::with_capacity(layout.len());
        for (chain, hook_names) in layout {
            let hooks = hook_names
                .iter()
                .map(|name| registry.construct(name, refs))
                .collect::<Result<Vec<_>>>()?;
            tracing::debug!(
                kind = R::KIND,
                chain = %chain,
                hooks = ?hook_names,
                "Built chain"
            );
            chains.insert(chain, hooks);
        }

        Ok(Chains { chains })
    }
}

/// Apply one directive; false if its anchor is not in place yet
fn apply(chains: &mut IndexMap<String, Vec<String>>, directive: &ChainDirective) -> bool {
    let hook = directive.hook.clone();
    match &directive.position {
        InsertPosition::Append => {
            chains.entry(directive.chain.clone()).or_default().push(hook);
            true
        }
        InsertPosition::Prepend => {
            chains
                .entry(directive.chain.clone())
                .or_default()
                .insert(0, hook);
            true
        }
        InsertPosition::After(anchor) | InsertPosition::Before(anchor) => {
            let Some(hooks) = chains.get_mut(&directive.chain) else {
                return false;
            };
            let Some(index) = hooks.iter().position(|h| h == anchor) else {
                return false;
            };
            let at = if matches!(directive.position, InsertPosition::After(_)) {
                index + 1
            } else {
                index
            };
            hooks.insert(at, hook);
            true
        }
    }
}

/// Built, immutable chains for one record kind
pub struct Chains<R: Record> {
    chains: IndexMap<String, Vec<Arc<dyn Hook<R>>>>,
}

impl<R: Record> Chains<R> {
    /// Run `chain` over `working`
    ///
    /// Hooks run strictly in order. The first error is returned unchanged and
    /// the remaining hooks are skipped.
    #[tracing::instrument(skip(self, working, delta, cancel), fields(kind = R::KIND))]
    pub fn run(
        &self,
        chain: &str,
        working: &mut R,
        delta: &R::Delta,
        cancel: &CancelToken,
    ) -> Result<()> {
        let hooks = self
            .chains
            .get(chain)
            .ok_or_else(|| Error::UnknownChain(format!("{} {chain}", R::KIND)))?;

        tracing::debug!(hook_count = hooks.len(), "Running chain");
        let chain_start = Instant::now();

        for hook in hooks {
            if cancel.is_cancelled() {
                tracing::debug!(hook_name = hook.name(), "Chain cancelled");
                return Err(Error::Cancelled(format!(
                    "hook '{}' in chain {chain}",
                    hook.name()
                )));
            }

            let span = tracing::debug_span!("hook_execution", hook_name = hook.name());
            let _guard = span.enter();

            let start = Instant::now();
            if let Err(e) = hook.run(working, delta, cancel) {
                tracing::debug!(
                    error = %e,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Hook failed"
                );
                return Err(e);
            }
            tracing::trace!(elapsed_ms = start.elapsed().as_millis(), "Hook finished");
        }

        tracing::debug!(
            elapsed_ms = chain_start.elapsed().as_millis(),
            "Chain completed"
        );
        Ok(())
    }

    /// True if `chain` is configured
    pub fn contains(&self, chain: &str) -> bool {
        self.chains.contains_key(chain)
    }

    /// Hook names of `chain`, in execution order
    pub fn hook_names(&self, chain: &str) -> Option<Vec<&str>> {
        self.chains
            .get(chain)
            .map(|hooks| hooks.iter().map(|h| h.name()).collect())
    }

    /// Configured chain names
    pub fn chain_names(&self) -> impl Iterator<Item = &str> {
        self.chains.keys().map(String::as_str)
    }
}

impl<R: Record> std::fmt::Debug for Chains<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (chain, hooks) in &self.chains {
            map.entry(chain, &hooks.iter().map(|h| h.name()).collect::<Vec<_>>());
        }
        map.finish()
    }
}
