//! Entity hooks

use crate::context::RefContext;
use crate::hook::HookRegistry;
use arbor_core::{Capability, Entity, EntityDelta, Error, Result};

/// Register every entity hook
pub fn register(registry: &mut HookRegistry<Entity>) -> Result<()> {
    registry.register_fn("fail-on-existing-entity", fail_on_existing_entity)?;
    registry.register_fn("load-entity", load_entity)?;
    registry.register_fn("set-entity-id", set_entity_id)?;
    registry.register_fn("set-entity-number", set_entity_number)?;
    registry.register_fn("set-entity-secret", set_entity_secret)?;
    registry.register_fn("validate-entity-secret", validate_entity_secret)?;
    registry.register_fn("validate-entity-unlocked", validate_entity_unlocked)?;
    registry.register_fn("lock-entity", lock_entity)?;
    registry.register_fn("unlock-entity", unlock_entity)?;
    registry.register_fn("set-entity-capability", set_entity_capability)?;
    registry.register_fn("drop-entity-capability", drop_entity_capability)?;
    registry.register_fn("add-direct-group", add_direct_group)?;
    registry.register_fn("del-direct-group", del_direct_group)?;
    registry.register_fn("set-entity-meta", set_entity_meta)?;
    Ok(())
}

fn require_capability(delta: &EntityDelta) -> Result<Capability> {
    delta
        .capability
        .ok_or_else(|| Error::InvalidRequest("a capability is required".to_string()))
}

fn require_group(delta: &EntityDelta) -> Result<&str> {
    match delta.group.as_deref() {
        Some(group) if !group.is_empty() => Ok(group),
        _ => Err(Error::InvalidRequest("a group name is required".to_string())),
    }
}

/// Fail if the requested ID is already stored
pub fn fail_on_existing_entity(
    refs: &RefContext,
    _working: &mut Entity,
    delta: &EntityDelta,
) -> Result<()> {
    let id = delta.require_id()?;
    match refs.storage().load_entity(id) {
        Ok(_) => Err(Error::DuplicateEntityId(id.to_string())),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Replace the working copy with the stored entity
pub fn load_entity(refs: &RefContext, working: &mut Entity, delta: &EntityDelta) -> Result<()> {
    *working = refs.storage().load_entity(delta.require_id()?)?;
    Ok(())
}

fn set_entity_id(_refs: &RefContext, working: &mut Entity, delta: &EntityDelta) -> Result<()> {
    working.id = delta.require_id()?.to_string();
    Ok(())
}

/// Take the requested number unless another entity owns it
fn set_entity_number(refs: &RefContext, working: &mut Entity, delta: &EntityDelta) -> Result<()> {
    let Some(number) = delta.number else {
        return Ok(());
    };

    match refs.storage().load_entity_number(number) {
        Ok(owner) if owner.id != working.id => {
            return Err(Error::DuplicateEntityNumber(number));
        }
        Ok(_) => {}
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e),
    }

    working.number = number;
    Ok(())
}

fn set_entity_secret(refs: &RefContext, working: &mut Entity, delta: &EntityDelta) -> Result<()> {
    if let Some(plain) = delta.secret.as_deref() {
        working.secret = Some(refs.crypto().secure_secret(plain)?);
    }
    Ok(())
}

fn validate_entity_secret(
    refs: &RefContext,
    working: &mut Entity,
    delta: &EntityDelta,
) -> Result<()> {
    let plain = delta
        .secret
        .as_deref()
        .ok_or_else(|| Error::InvalidRequest("a secret is required".to_string()))?;
    let secured = working
        .secret
        .as_deref()
        .ok_or(Error::AuthenticationFailure)?;
    refs.crypto().verify_secret(plain, secured)
}

fn validate_entity_unlocked(
    _refs: &RefContext,
    working: &mut Entity,
    _delta: &EntityDelta,
) -> Result<()> {
    if working.locked {
        return Err(Error::EntityLocked(working.id.clone()));
    }
    Ok(())
}

fn lock_entity(_refs: &RefContext, working: &mut Entity, _delta: &EntityDelta) -> Result<()> {
    working.locked = true;
    Ok(())
}

fn unlock_entity(_refs: &RefContext, working: &mut Entity, _delta: &EntityDelta) -> Result<()> {
    working.locked = false;
    Ok(())
}

fn set_entity_capability(
    _refs: &RefContext,
    working: &mut Entity,
    delta: &EntityDelta,
) -> Result<()> {
    working.capabilities.insert(require_capability(delta)?);
    Ok(())
}

fn drop_entity_capability(
    _refs: &RefContext,
    working: &mut Entity,
    delta: &EntityDelta,
) -> Result<()> {
    working.capabilities.remove(&require_capability(delta)?);
    Ok(())
}

/// Join a group; the group must exist
fn add_direct_group(refs: &RefContext, working: &mut Entity, delta: &EntityDelta) -> Result<()> {
    let group = require_group(delta)?;
    refs.storage().load_group(group)?;
    working.groups.insert(group.to_string());
    Ok(())
}

fn del_direct_group(_refs: &RefContext, working: &mut Entity, delta: &EntityDelta) -> Result<()> {
    working.groups.remove(require_group(delta)?);
    Ok(())
}

/// Empty metadata clears the display name
fn set_entity_meta(_refs: &RefContext, working: &mut Entity, delta: &EntityDelta) -> Result<()> {
    if let Some(meta) = delta.meta.as_deref() {
        working.meta = (!meta.is_empty()).then(|| meta.to_string());
    }
    Ok(())
}
