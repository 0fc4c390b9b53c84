//! Lifecycle entry points over entities and groups

use crate::chain::{CancelToken, ChainBuilder, Chains};
use crate::context::RefContext;
use crate::defaults::{self, REQUIRED_ENTITY_CHAINS, REQUIRED_GROUP_CHAINS, names};
use crate::hook::{HookRegistry, Record};
use crate::locks::{KeyLocks, LockKey};
use arbor_config::{ChainDirective, ChainsConfig};
use arbor_core::{Capability, Entity, EntityDelta, Error, Group, GroupDelta, Result};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Allowed entity IDs and group names
static NAME_PATTERN: Lazy<regex::Regex> = Lazy::new(|| {
    regex::Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._@+-]*$").expect("Failed to compile name regex")
});

fn validate_name(kind: &str, name: &str) -> Result<()> {
    if NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(Error::InvalidRequest(format!("invalid {kind} '{name}'")))
    }
}

/// An entity change holds the entity and, when it names one, the group
fn entity_keys(id: &str, group: Option<&str>) -> Vec<LockKey> {
    let mut keys = vec![LockKey::entity(id)];
    if let Some(group) = group.filter(|g| !g.is_empty()) {
        keys.push(LockKey::group(group));
    }
    keys
}

/// A group change holds the group and any other group it points at
fn group_keys(name: &str, managed_by: Option<&str>) -> Vec<LockKey> {
    let mut keys = vec![LockKey::group(name)];
    if let Some(manager) = managed_by.filter(|m| !m.is_empty() && *m != name) {
        keys.push(LockKey::group(manager));
    }
    keys
}

/// Parsed `ID:SECRET` bootstrap argument
#[derive(Clone, PartialEq, Eq)]
pub struct BootstrapRequest {
    /// Superuser entity ID
    pub id: String,
    /// Plaintext secret
    pub secret: String,
}

impl BootstrapRequest {
    /// Parse `ID:SECRET`; the secret may itself contain colons
    pub fn parse(value: &str) -> Result<Self> {
        match value.split_once(':') {
            Some((id, secret)) if !id.is_empty() && !secret.is_empty() => Ok(Self {
                id: id.to_string(),
                secret: secret.to_string(),
            }),
            _ => Err(Error::InvalidRequest(
                "bootstrap expects ID:SECRET with both parts non-empty".to_string(),
            )),
        }
    }
}

impl fmt::Debug for BootstrapRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapRequest")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// The tree of entities and groups
///
/// One instance is shared by every request handler. Mutations of the same
/// record key never overlap; creates of one kind are additionally serialized
/// so number allocation cannot race.
pub struct Tree {
    refs: RefContext,
    entity_chains: Chains<Entity>,
    group_chains: Chains<Group>,
    locks: KeyLocks,
    entity_create: Mutex<()>,
    group_create: Mutex<()>,
    bootstrap_enabled: AtomicBool,
    bootstrap_lock: Mutex<()>,
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("refs", &self.refs)
            .field("entity_chains", &self.entity_chains)
            .field("group_chains", &self.group_chains)
            .field("bootstrap_enabled", &self.bootstrap_enabled())
            .finish_non_exhaustive()
    }
}

fn require_chains<R: Record>(chains: &Chains<R>, required: &[&str]) -> Result<()> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| !chains.contains(name))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::ChainConfig(format!(
            "missing required {} chains: {}",
            R::KIND,
            missing.join(", ")
        )))
    }
}

impl Tree {
    /// Assemble a tree from built chains
    ///
    /// Fails if a chain the lifecycle entry points depend on is missing.
    /// Bootstrap starts enabled.
    pub fn new(
        refs: RefContext,
        entity_chains: Chains<Entity>,
        group_chains: Chains<Group>,
    ) -> Result<Self> {
        require_chains(&entity_chains, REQUIRED_ENTITY_CHAINS)?;
        require_chains(&group_chains, REQUIRED_GROUP_CHAINS)?;

        Ok(Self {
            refs,
            entity_chains,
            group_chains,
            locks: KeyLocks::new(),
            entity_create: Mutex::new(()),
            group_create: Mutex::new(()),
            bootstrap_enabled: AtomicBool::new(true),
            bootstrap_lock: Mutex::new(()),
        })
    }

    /// Collaborators shared with the hooks
    pub fn refs(&self) -> &RefContext {
        &self.refs
    }

    /// Built entity chains
    pub fn entity_chains(&self) -> &Chains<Entity> {
        &self.entity_chains
    }

    /// Built group chains
    pub fn group_chains(&self) -> &Chains<Group> {
        &self.group_chains
    }

    // ---- creation ----

    fn next_entity_number(&self) -> Result<i32> {
        let storage = self.refs.storage();
        let mut highest = 0;
        for id in storage.discover_entity_ids()? {
            match storage.load_entity(&id) {
                Ok(entity) => highest = highest.max(entity.number),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        highest
            .checked_add(1)
            .ok_or_else(|| Error::InvalidRequest("entity numbers exhausted".to_string()))
    }

    fn next_group_number(&self) -> Result<i32> {
        let storage = self.refs.storage();
        let mut highest = 0;
        for name in storage.discover_group_names()? {
            match storage.load_group(&name) {
                Ok(group) => highest = highest.max(group.number),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        highest
            .checked_add(1)
            .ok_or_else(|| Error::InvalidRequest("group numbers exhausted".to_string()))
    }

    /// Create an entity
    ///
    /// A negative `number` allocates one past the highest number in use.
    pub fn new_entity(&self, id: &str, number: i32, secret: Option<&str>) -> Result<Entity> {
        self.create_entity(id, number, secret, &CancelToken::new())
    }

    /// Create an entity, giving up if `cancel` fires before it is saved
    #[tracing::instrument(skip(self, secret, cancel))]
    pub fn create_entity(
        &self,
        id: &str,
        number: i32,
        secret: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<Entity> {
        validate_name("entity ID", id)?;

        let _create = self.entity_create.lock();
        let _key = self.locks.lock(LockKey::entity(id));

        let number = if number < 0 {
            self.next_entity_number()?
        } else {
            number
        };
        let delta = EntityDelta {
            number: Some(number),
            secret: secret.map(str::to_string),
            ..EntityDelta::for_id(id)
        };

        let mut working = Entity::default();
        self.entity_chains
            .run(names::CREATE, &mut working, &delta, cancel)?;

        if working.id != id || working.number != number {
            return Err(Error::ChainConfig(format!(
                "entity chain {} produced '{}' #{} instead of '{id}' #{number}",
                names::CREATE,
                working.id,
                working.number
            )));
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled(format!("persisting entity '{id}'")));
        }
        self.refs.storage().save_entity(&working)?;

        tracing::info!(id, number = working.number, "Created entity");
        Ok(working)
    }

    /// Create a group
    ///
    /// A negative `number` allocates one past the highest number in use.
    pub fn new_group(
        &self,
        name: &str,
        display_name: &str,
        managed_by: Option<&str>,
        number: i32,
    ) -> Result<Group> {
        self.create_group(name, display_name, managed_by, number, &CancelToken::new())
    }

    /// Create a group, giving up if `cancel` fires before it is saved
    ///
    /// The managing group stays locked until the new group is saved, so it
    /// cannot be deleted in between.
    #[tracing::instrument(skip(self, cancel))]
    pub fn create_group(
        &self,
        name: &str,
        display_name: &str,
        managed_by: Option<&str>,
        number: i32,
        cancel: &CancelToken,
    ) -> Result<Group> {
        validate_name("group name", name)?;

        let _create = self.group_create.lock();
        let _keys = self.locks.lock_many(group_keys(name, managed_by));

        let number = if number < 0 {
            self.next_group_number()?
        } else {
            number
        };
        let delta = GroupDelta {
            number: Some(number),
            display_name: Some(display_name.to_string()),
            managed_by: managed_by.map(str::to_string),
            ..GroupDelta::for_name(name)
        };

        let mut working = Group::default();
        self.group_chains
            .run(names::CREATE, &mut working, &delta, cancel)?;

        if working.name != name || working.number != number {
            return Err(Error::ChainConfig(format!(
                "group chain {} produced '{}' #{} instead of '{name}' #{number}",
                names::CREATE,
                working.name,
                working.number
            )));
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled(format!("persisting group '{name}'")));
        }
        self.refs.storage().save_group(&working)?;

        tracing::info!(name, number = working.number, "Created group");
        Ok(working)
    }

    // ---- bootstrap ----

    fn ensure_bootstrap_enabled(&self) -> Result<()> {
        if self.bootstrap_enabled() {
            Ok(())
        } else {
            Err(Error::BootstrapDisabled(
                "bootstrap was disabled at startup".to_string(),
            ))
        }
    }

    /// Create or reset the superuser `id` with `secret` and `GLOBAL_ROOT`
    ///
    /// Succeeds at most once; bootstrap is disabled afterwards.
    pub fn bootstrap(&self, id: &str, secret: &str) -> Result<Entity> {
        self.bootstrap_with_cancel(id, secret, &CancelToken::new())
    }

    /// [`bootstrap`](Self::bootstrap), giving up if `cancel` fires first
    ///
    /// A cancelled bootstrap stays enabled.
    #[tracing::instrument(skip(self, secret, cancel))]
    pub fn bootstrap_with_cancel(
        &self,
        id: &str,
        secret: &str,
        cancel: &CancelToken,
    ) -> Result<Entity> {
        self.ensure_bootstrap_enabled()?;
        if secret.is_empty() {
            return Err(Error::InvalidRequest(
                "bootstrap requires a non-empty secret".to_string(),
            ));
        }
        validate_name("entity ID", id)?;

        let _bootstrap = self.bootstrap_lock.lock();
        // Another caller may have finished while we waited
        self.ensure_bootstrap_enabled()?;

        match self.refs.storage().load_entity(id) {
            Ok(_) => tracing::debug!(id, "Bootstrap entity exists"),
            Err(e) if e.is_not_found() => {
                self.create_entity(id, -1, None, cancel)?;
            }
            Err(e) => return Err(e),
        }

        let delta = EntityDelta {
            secret: Some(secret.to_string()),
            capability: Some(Capability::GlobalRoot),
            ..EntityDelta::for_id(id)
        };
        let entity = self.mutate_entity(names::BOOTSTRAP_SERVER, &delta, cancel)?;

        self.bootstrap_enabled.store(false, Ordering::SeqCst);
        tracing::warn!(id, "Bootstrap complete, superuser granted GLOBAL_ROOT");
        Ok(entity)
    }

    /// Turn bootstrap off for the rest of the process lifetime
    pub fn disable_bootstrap(&self) {
        let _bootstrap = self.bootstrap_lock.lock();
        if self.bootstrap_enabled.swap(false, Ordering::SeqCst) {
            tracing::debug!("Bootstrap disabled");
        }
    }

    /// True until bootstrap succeeds or is disabled
    pub fn bootstrap_enabled(&self) -> bool {
        self.bootstrap_enabled.load(Ordering::SeqCst)
    }

    // ---- deletion ----

    /// Remove an entity, running its DESTROY chain first if configured
    pub fn delete_entity(&self, id: &str) -> Result<()> {
        self.remove_entity(id, &CancelToken::new())
    }

    /// [`delete_entity`](Self::delete_entity), giving up if `cancel` fires first
    #[tracing::instrument(skip(self, cancel))]
    pub fn remove_entity(&self, id: &str, cancel: &CancelToken) -> Result<()> {
        let _key = self.locks.lock(LockKey::entity(id));

        if self.entity_chains.contains(names::DESTROY) {
            let mut working = Entity::default();
            self.entity_chains.run(
                names::DESTROY,
                &mut working,
                &EntityDelta::for_id(id),
                cancel,
            )?;
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled(format!("removing entity '{id}'")));
        }
        self.refs.storage().delete_entity(id)?;

        tracing::info!(id, "Deleted entity");
        Ok(())
    }

    /// Remove a group, running its DESTROY chain first if configured
    ///
    /// Entities that were direct members lose the membership.
    pub fn delete_group(&self, name: &str) -> Result<()> {
        self.remove_group(name, &CancelToken::new())
    }

    /// [`delete_group`](Self::delete_group), giving up if `cancel` fires first
    #[tracing::instrument(skip(self, cancel))]
    pub fn remove_group(&self, name: &str, cancel: &CancelToken) -> Result<()> {
        let _key = self.locks.lock(LockKey::group(name));

        if self.group_chains.contains(names::DESTROY) {
            let mut working = Group::default();
            self.group_chains.run(
                names::DESTROY,
                &mut working,
                &GroupDelta::for_name(name),
                cancel,
            )?;
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled(format!("removing group '{name}'")));
        }
        self.refs.storage().delete_group(name)?;

        let pruned = self.prune_memberships(name)?;
        tracing::info!(name, pruned, "Deleted group");
        Ok(())
    }

    fn prune_memberships(&self, group: &str) -> Result<usize> {
        let storage = self.refs.storage();
        let mut pruned = 0;
        for id in storage.discover_entity_ids()? {
            let _key = self.locks.lock(LockKey::entity(id.as_str()));
            let mut entity = match storage.load_entity(&id) {
                Ok(entity) => entity,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };
            if entity.groups.remove(group) {
                storage.save_entity(&entity)?;
                pruned += 1;
            }
        }
        Ok(pruned)
    }

    // ---- reads ----

    /// Stored entity by ID
    pub fn fetch_entity(&self, id: &str) -> Result<Entity> {
        self.refs.storage().load_entity(id)
    }

    /// Stored group by name
    pub fn fetch_group(&self, name: &str) -> Result<Group> {
        self.refs.storage().load_group(name)
    }

    /// Every stored entity, ordered by ID
    pub fn list_entities(&self) -> Result<Vec<Entity>> {
        let storage = self.refs.storage();
        let mut entities = Vec::new();
        for id in storage.discover_entity_ids()? {
            match storage.load_entity(&id) {
                Ok(entity) => entities.push(entity),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(entities)
    }

    /// Every stored group, ordered by name
    pub fn list_groups(&self) -> Result<Vec<Group>> {
        let storage = self.refs.storage();
        let mut groups = Vec::new();
        for name in storage.discover_group_names()? {
            match storage.load_group(&name) {
                Ok(group) => groups.push(group),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(groups)
    }

    /// Sorted IDs of the entities directly in `name`
    pub fn group_members(&self, name: &str) -> Result<Vec<String>> {
        self.refs.storage().load_group(name)?;

        let mut members: Vec<String> = self
            .list_entities()?
            .into_iter()
            .filter(|entity| entity.groups.contains(name))
            .map(|entity| entity.id)
            .collect();
        members.sort();
        Ok(members)
    }

    // ---- generic mutation ----

    fn mutate_entity(
        &self,
        chain: &str,
        delta: &EntityDelta,
        cancel: &CancelToken,
    ) -> Result<Entity> {
        let id = delta.require_id()?;
        let _keys = self.locks.lock_many(entity_keys(id, delta.group.as_deref()));

        let mut working = Entity::default();
        self.entity_chains.run(chain, &mut working, delta, cancel)?;

        if working.id != id {
            return Err(Error::ChainConfig(format!(
                "entity chain {chain} did not load '{id}'"
            )));
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled(format!("persisting entity '{id}'")));
        }
        self.refs.storage().save_entity(&working)?;
        Ok(working)
    }

    fn mutate_group(&self, chain: &str, delta: &GroupDelta, cancel: &CancelToken) -> Result<Group> {
        let name = delta.require_name()?;
        let _keys = self
            .locks
            .lock_many(group_keys(name, delta.managed_by.as_deref()));

        let mut working = Group::default();
        self.group_chains.run(chain, &mut working, delta, cancel)?;

        if working.name != name {
            return Err(Error::ChainConfig(format!(
                "group chain {chain} did not load '{name}'"
            )));
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled(format!("persisting group '{name}'")));
        }
        self.refs.storage().save_group(&working)?;
        Ok(working)
    }

    /// Run an entity chain over an existing entity and persist the result
    ///
    /// Creation and removal have dedicated entry points and are rejected here.
    #[tracing::instrument(skip(self, delta, cancel), fields(id = ?delta.id))]
    pub fn modify_entity(
        &self,
        chain: &str,
        delta: &EntityDelta,
        cancel: &CancelToken,
    ) -> Result<Entity> {
        if chain == names::CREATE || chain == names::DESTROY {
            return Err(Error::InvalidRequest(format!(
                "entity chain {chain} cannot be run as a modification"
            )));
        }
        self.mutate_entity(chain, delta, cancel)
    }

    /// Run a group chain over an existing group and persist the result
    ///
    /// Creation and removal have dedicated entry points and are rejected here.
    #[tracing::instrument(skip(self, delta, cancel), fields(name = ?delta.name))]
    pub fn modify_group(
        &self,
        chain: &str,
        delta: &GroupDelta,
        cancel: &CancelToken,
    ) -> Result<Group> {
        if chain == names::CREATE || chain == names::DESTROY {
            return Err(Error::InvalidRequest(format!(
                "group chain {chain} cannot be run as a modification"
            )));
        }
        self.mutate_group(chain, delta, cancel)
    }

    // ---- entity operations ----

    fn entity_op(&self, chain: &str, delta: EntityDelta) -> Result<Entity> {
        self.modify_entity(chain, &delta, &CancelToken::new())
    }

    /// Lock an entity
    pub fn lock_entity(&self, id: &str) -> Result<Entity> {
        self.entity_op(names::LOCK, EntityDelta::for_id(id))
    }

    /// Unlock an entity
    pub fn unlock_entity(&self, id: &str) -> Result<Entity> {
        self.entity_op(names::UNLOCK, EntityDelta::for_id(id))
    }

    /// Replace an entity's secret
    pub fn set_entity_secret(&self, id: &str, secret: &str) -> Result<Entity> {
        self.entity_op(
            names::SET_SECRET,
            EntityDelta {
                secret: Some(secret.to_string()),
                ..EntityDelta::for_id(id)
            },
        )
    }

    /// Check a secret against an unlocked entity
    ///
    /// Nothing is persisted.
    #[tracing::instrument(skip(self, secret))]
    pub fn validate_secret(&self, id: &str, secret: &str) -> Result<Entity> {
        let delta = EntityDelta {
            secret: Some(secret.to_string()),
            ..EntityDelta::for_id(id)
        };
        let mut working = Entity::default();
        self.entity_chains.run(
            names::VALIDATE_IDENTITY,
            &mut working,
            &delta,
            &CancelToken::new(),
        )?;
        Ok(working)
    }

    /// Grant an entity a capability
    pub fn add_entity_capability(&self, id: &str, capability: Capability) -> Result<Entity> {
        self.entity_op(
            names::SET_CAPABILITY,
            EntityDelta {
                capability: Some(capability),
                ..EntityDelta::for_id(id)
            },
        )
    }

    /// Revoke a capability from an entity
    pub fn drop_entity_capability(&self, id: &str, capability: Capability) -> Result<Entity> {
        self.entity_op(
            names::DROP_CAPABILITY,
            EntityDelta {
                capability: Some(capability),
                ..EntityDelta::for_id(id)
            },
        )
    }

    /// Make an entity a direct member of `group`
    pub fn add_entity_to_group(&self, id: &str, group: &str) -> Result<Entity> {
        self.entity_op(
            names::ADD_GROUP,
            EntityDelta {
                group: Some(group.to_string()),
                ..EntityDelta::for_id(id)
            },
        )
    }

    /// Remove a direct membership
    pub fn remove_entity_from_group(&self, id: &str, group: &str) -> Result<Entity> {
        self.entity_op(
            names::DEL_GROUP,
            EntityDelta {
                group: Some(group.to_string()),
                ..EntityDelta::for_id(id)
            },
        )
    }

    /// Set the display name; empty clears it
    pub fn update_entity_meta(&self, id: &str, meta: &str) -> Result<Entity> {
        self.entity_op(
            names::UPDATE_META,
            EntityDelta {
                meta: Some(meta.to_string()),
                ..EntityDelta::for_id(id)
            },
        )
    }

    // ---- group operations ----

    fn group_op(&self, chain: &str, delta: GroupDelta) -> Result<Group> {
        self.modify_group(chain, &delta, &CancelToken::new())
    }

    /// Change or clear (`None`) the managing group
    pub fn set_managing_group(&self, name: &str, managed_by: Option<&str>) -> Result<Group> {
        self.group_op(
            names::SET_MANAGING_GROUP,
            GroupDelta {
                managed_by: managed_by.map(str::to_string),
                ..GroupDelta::for_name(name)
            },
        )
    }

    /// Grant a group a capability
    pub fn add_group_capability(&self, name: &str, capability: Capability) -> Result<Group> {
        self.group_op(
            names::SET_CAPABILITY,
            GroupDelta {
                capability: Some(capability),
                ..GroupDelta::for_name(name)
            },
        )
    }

    /// Revoke a capability from a group
    pub fn drop_group_capability(&self, name: &str, capability: Capability) -> Result<Group> {
        self.group_op(
            names::DROP_CAPABILITY,
            GroupDelta {
                capability: Some(capability),
                ..GroupDelta::for_name(name)
            },
        )
    }

    /// Set the display name
    pub fn update_group_meta(&self, name: &str, display_name: &str) -> Result<Group> {
        self.group_op(
            names::UPDATE_META,
            GroupDelta {
                display_name: Some(display_name.to_string()),
                ..GroupDelta::for_name(name)
            },
        )
    }
}

/// Wires hook registries and chain directives into a [`Tree`]
///
/// # Examples
///
/// ```ignore
/// let tree = TreeBuilder::new(refs)?
///     .chains(&config.chains)
///     .entity_directives(plugins.entity_chain_directives())
///     .build()?;
/// ```
pub struct TreeBuilder {
    refs: RefContext,
    entity_hooks: HookRegistry<Entity>,
    group_hooks: HookRegistry<Group>,
    overrides: ChainsConfig,
    entity_extra: Vec<ChainDirective>,
    group_extra: Vec<ChainDirective>,
}

impl TreeBuilder {
    /// Builder with the built-in hooks and chain layouts
    pub fn new(refs: RefContext) -> Result<Self> {
        Ok(Self {
            refs,
            entity_hooks: HookRegistry::<Entity>::with_defaults()?,
            group_hooks: HookRegistry::<Group>::with_defaults()?,
            overrides: ChainsConfig::default(),
            entity_extra: Vec::new(),
            group_extra: Vec::new(),
        })
    }

    /// Entity hook registry, for registering additional hooks
    pub fn entity_hooks_mut(&mut self) -> &mut HookRegistry<Entity> {
        &mut self.entity_hooks
    }

    /// Group hook registry, for registering additional hooks
    pub fn group_hooks_mut(&mut self) -> &mut HookRegistry<Group> {
        &mut self.group_hooks
    }

    /// Configured chain layouts; each named chain replaces its built-in layout
    #[must_use]
    pub fn chains(mut self, config: &ChainsConfig) -> Self {
        self.overrides = config.clone();
        self
    }

    /// Directives applied after the built-in and configured layouts
    #[must_use]
    pub fn entity_directives<I>(mut self, directives: I) -> Self
    where
        I: IntoIterator<Item = ChainDirective>,
    {
        self.entity_extra.extend(directives);
        self
    }

    /// Directives applied after the built-in and configured layouts
    #[must_use]
    pub fn group_directives<I>(mut self, directives: I) -> Self
    where
        I: IntoIterator<Item = ChainDirective>,
    {
        self.group_extra.extend(directives);
        self
    }

    /// Build every chain and the tree
    pub fn build(self) -> Result<Tree> {
        let mut entity = ChainBuilder::<Entity>::new();
        entity.extend(defaults::merge(
            defaults::entity_directives(),
            &self.overrides.entity,
            self.entity_extra,
        ));

        let mut group = ChainBuilder::<Group>::new();
        group.extend(defaults::merge(
            defaults::group_directives(),
            &self.overrides.group,
            self.group_extra,
        ));

        let entity_chains = entity.build(&self.entity_hooks, &self.refs)?;
        let group_chains = group.build(&self.group_hooks, &self.refs)?;
        Tree::new(self.refs, entity_chains, group_chains)
    }
}
