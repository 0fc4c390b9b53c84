//! Hook contract and registry

use crate::chain::CancelToken;
use crate::context::RefContext;
use arbor_core::{Entity, EntityDelta, Error, Group, GroupDelta, Registry, Result};
use std::sync::Arc;

/// A record kind that chains operate on
pub trait Record: Clone + Default + Send + Sync + 'static {
    /// Requested change type for this record
    type Delta: Send + Sync;

    /// Short name used in logs
    const KIND: &'static str;

    /// Name of the hook registry for this kind, used in errors
    const HOOK_KIND: &'static str;
}

impl Record for Entity {
    type Delta = EntityDelta;
    const KIND: &'static str = "entity";
    const HOOK_KIND: &'static str = "entity hook";
}

impl Record for Group {
    type Delta = GroupDelta;
    const KIND: &'static str = "group";
    const HOOK_KIND: &'static str = "group hook";
}

/// A named step in a chain
pub trait Hook<R: Record>: Send + Sync {
    /// Registered name of this hook
    fn name(&self) -> &str;

    /// Validate or mutate the working copy
    ///
    /// The chain checks `cancel` before every hook; hooks that do several
    /// slow steps can check it between them.
    fn run(&self, working: &mut R, delta: &R::Delta, cancel: &CancelToken) -> Result<()>;
}

/// Builds a hook for the given collaborators
pub type HookConstructor<R> =
    Arc<dyn Fn(&RefContext) -> Result<Arc<dyn Hook<R>>> + Send + Sync>;

/// Plain function usable as a hook body
pub type HookFn<R> = fn(&RefContext, &mut R, &<R as Record>::Delta) -> Result<()>;

/// Hook backed by a plain function
struct FnHook<R: Record> {
    name: &'static str,
    refs: RefContext,
    body: HookFn<R>,
}

impl<R: Record> Hook<R> for FnHook<R> {
    fn name(&self) -> &str {
        self.name
    }

    fn run(&self, working: &mut R, delta: &R::Delta, _cancel: &CancelToken) -> Result<()> {
        (self.body)(&self.refs, working, delta)
    }
}

/// Name → constructor table for one record kind
pub struct HookRegistry<R: Record> {
    inner: Registry<HookConstructor<R>>,
}

impl<R: Record> Default for HookRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> HookRegistry<R> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            inner: Registry::new(R::HOOK_KIND),
        }
    }

    /// Register a constructor; a name can only be registered once
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F) -> Result<()>
    where
        F: Fn(&RefContext) -> Result<Arc<dyn Hook<R>>> + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::trace!(kind = R::KIND, hook = %name, "Registering hook");
        self.inner.register(name, Arc::new(constructor))
    }

    /// Register a stateless function hook
    pub fn register_fn(&mut self, name: &'static str, body: HookFn<R>) -> Result<()> {
        self.register(name, move |refs: &RefContext| {
            Ok(Arc::new(FnHook {
                name,
                refs: refs.clone(),
                body,
            }) as Arc<dyn Hook<R>>)
        })
    }

    /// Construct the hook registered under `name`
    pub fn construct(&self, name: &str, refs: &RefContext) -> Result<Arc<dyn Hook<R>>> {
        let constructor = self
            .inner
            .get(name)
            .map_err(|_| Error::UnknownHook(format!("{} '{name}'", R::KIND)))?;
        constructor(refs)
    }

    /// True if `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains(name)
    }

    /// Registered hook names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.names()
    }
}

impl<R: Record> std::fmt::Debug for HookRegistry<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.inner, f)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use arbor_crypto::NoCrypto;
    use arbor_db::MemDb;

    fn refs() -> RefContext {
        RefContext::new(Arc::new(MemDb::new()), Arc::new(NoCrypto))
    }

    fn mark_locked(_refs: &RefContext, working: &mut Entity, _delta: &EntityDelta) -> Result<()> {
        working.locked = true;
        Ok(())
    }

    #[test]
    fn test_register_fn_and_construct() {
        let mut registry = HookRegistry::<Entity>::new();
        registry.register_fn("mark-locked", mark_locked).unwrap();

        let hook = registry.construct("mark-locked", &refs()).unwrap();
        assert_eq!(hook.name(), "mark-locked");

        let mut entity = Entity::new("alice");
        hook.run(&mut entity, &EntityDelta::default(), &CancelToken::new()).unwrap();
        assert!(entity.locked);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = HookRegistry::<Entity>::new();
        registry.register_fn("mark-locked", mark_locked).unwrap();
        let err = registry.register_fn("mark-locked", mark_locked).unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateRegistration {
                kind: "entity hook",
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_hook() {
        let registry = HookRegistry::<Group>::new();
        let err = registry.construct("nope", &refs()).err().unwrap();
        assert!(matches!(err, Error::UnknownHook(_)));
    }

    #[test]
    fn test_constructor_failure_propagates() {
        let mut registry = HookRegistry::<Group>::new();
        registry
            .register("broken", |_refs: &RefContext| {
                Err(Error::Config("missing setting".into()))
            })
            .unwrap();
        assert!(matches!(
            registry.construct("broken", &refs()),
            Err(Error::Config(_))
        ));
    }
}
