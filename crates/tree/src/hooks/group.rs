//! Group hooks

use crate::context::RefContext;
use crate::hook::HookRegistry;
use arbor_core::{Capability, Error, Group, GroupDelta, Result};

/// Register every group hook
pub fn register(registry: &mut HookRegistry<Group>) -> Result<()> {
    registry.register_fn("fail-on-existing-group", fail_on_existing_group)?;
    registry.register_fn("load-group", load_group)?;
    registry.register_fn("set-group-name", set_group_name)?;
    registry.register_fn("set-group-number", set_group_number)?;
    registry.register_fn("set-group-display-name", set_group_display_name)?;
    registry.register_fn("set-managing-group", set_managing_group)?;
    registry.register_fn("set-group-capability", set_group_capability)?;
    registry.register_fn("drop-group-capability", drop_group_capability)?;
    registry.register_fn("fail-on-managed-dependents", fail_on_managed_dependents)?;
    Ok(())
}

fn require_capability(delta: &GroupDelta) -> Result<Capability> {
    delta
        .capability
        .ok_or_else(|| Error::InvalidRequest("a capability is required".to_string()))
}

/// Fail if the requested name is already stored
pub fn fail_on_existing_group(
    refs: &RefContext,
    _working: &mut Group,
    delta: &GroupDelta,
) -> Result<()> {
    let name = delta.require_name()?;
    match refs.storage().load_group(name) {
        Ok(_) => Err(Error::DuplicateGroupName(name.to_string())),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Replace the working copy with the stored group
pub fn load_group(refs: &RefContext, working: &mut Group, delta: &GroupDelta) -> Result<()> {
    *working = refs.storage().load_group(delta.require_name()?)?;
    Ok(())
}

fn set_group_name(_refs: &RefContext, working: &mut Group, delta: &GroupDelta) -> Result<()> {
    working.name = delta.require_name()?.to_string();
    Ok(())
}

fn set_group_number(refs: &RefContext, working: &mut Group, delta: &GroupDelta) -> Result<()> {
    let Some(number) = delta.number else {
        return Ok(());
    };

    match refs.storage().load_group_number(number) {
        Ok(owner) if owner.name != working.name => {
            return Err(Error::DuplicateGroupNumber(number));
        }
        Ok(_) => {}
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e),
    }

    working.number = number;
    Ok(())
}

fn set_group_display_name(
    _refs: &RefContext,
    working: &mut Group,
    delta: &GroupDelta,
) -> Result<()> {
    if let Some(display_name) = &delta.display_name {
        working.display_name.clone_from(display_name);
    }
    Ok(())
}

/// Point the group at its manager
///
/// An absent or empty manager clears the field. The group's own name is a
/// valid self-reference. Any other name must resolve to a stored group; if
/// it does not, the field keeps its previous value.
pub fn set_managing_group(
    refs: &RefContext,
    working: &mut Group,
    delta: &GroupDelta,
) -> Result<()> {
    let own_name = if working.name.is_empty() {
        delta.name.as_deref().unwrap_or_default()
    } else {
        working.name.as_str()
    };

    match delta.managed_by.as_deref() {
        None | Some("") => {
            working.managed_by = None;
        }
        Some(manager) if manager == own_name => {
            working.managed_by = Some(manager.to_string());
        }
        Some(manager) => {
            refs.storage().load_group(manager)?;
            working.managed_by = Some(manager.to_string());
        }
    }
    Ok(())
}

fn set_group_capability(
    _refs: &RefContext,
    working: &mut Group,
    delta: &GroupDelta,
) -> Result<()> {
    working.capabilities.insert(require_capability(delta)?);
    Ok(())
}

fn drop_group_capability(
    _refs: &RefContext,
    working: &mut Group,
    delta: &GroupDelta,
) -> Result<()> {
    working.capabilities.remove(&require_capability(delta)?);
    Ok(())
}

/// Refuse to remove a group that other groups are managed by
pub fn fail_on_managed_dependents(
    refs: &RefContext,
    working: &mut Group,
    _delta: &GroupDelta,
) -> Result<()> {
    let storage = refs.storage();
    for name in storage.discover_group_names()? {
        if name == working.name {
            continue;
        }
        let group = match storage.load_group(&name) {
            Ok(group) => group,
            // Deleted since discovery
            Err(e) if e.is_not_found() => continue,
            Err(e) => return Err(e),
        };
        if group.managed_by.as_deref() == Some(working.name.as_str()) {
            return Err(Error::ReferentialIntegrity(format!(
                "group '{}' is managed by '{}'",
                group.name, working.name
            )));
        }
    }
    Ok(())
}
