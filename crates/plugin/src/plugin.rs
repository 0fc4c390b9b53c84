//! Plugin contract

use arbor_core::{Entity, Group, Result};
use arbor_tree::defaults::names;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle action a plugin is asked to process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Entity created
    #[serde(rename = "PLUGIN-ENTITY-CREATE")]
    EntityCreate,
    /// Entity about to be removed
    #[serde(rename = "PLUGIN-ENTITY-DESTROY")]
    EntityDestroy,
    /// Entity locked
    #[serde(rename = "PLUGIN-ENTITY-LOCK")]
    EntityLock,
    /// Entity unlocked
    #[serde(rename = "PLUGIN-ENTITY-UNLOCK")]
    EntityUnlock,
    /// Entity secret replaced
    #[serde(rename = "PLUGIN-ENTITY-SECRET-CHANGE")]
    EntitySecretChange,
    /// Any other entity change
    #[serde(rename = "PLUGIN-ENTITY-UPDATE")]
    EntityUpdate,
    /// Group created
    #[serde(rename = "PLUGIN-GROUP-CREATE")]
    GroupCreate,
    /// Group about to be removed
    #[serde(rename = "PLUGIN-GROUP-DESTROY")]
    GroupDestroy,
    /// Any other group change
    #[serde(rename = "PLUGIN-GROUP-UPDATE")]
    GroupUpdate,
}

/// Actions woven into entity chains
pub const ENTITY_ACTIONS: [Action; 6] = [
    Action::EntityCreate,
    Action::EntityDestroy,
    Action::EntityLock,
    Action::EntityUnlock,
    Action::EntitySecretChange,
    Action::EntityUpdate,
];

/// Actions woven into group chains
pub const GROUP_ACTIONS: [Action; 3] = [
    Action::GroupCreate,
    Action::GroupDestroy,
    Action::GroupUpdate,
];

impl Action {
    /// Wire name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EntityCreate => "PLUGIN-ENTITY-CREATE",
            Self::EntityDestroy => "PLUGIN-ENTITY-DESTROY",
            Self::EntityLock => "PLUGIN-ENTITY-LOCK",
            Self::EntityUnlock => "PLUGIN-ENTITY-UNLOCK",
            Self::EntitySecretChange => "PLUGIN-ENTITY-SECRET-CHANGE",
            Self::EntityUpdate => "PLUGIN-ENTITY-UPDATE",
            Self::GroupCreate => "PLUGIN-GROUP-CREATE",
            Self::GroupDestroy => "PLUGIN-GROUP-DESTROY",
            Self::GroupUpdate => "PLUGIN-GROUP-UPDATE",
        }
    }

    /// Name of the hook that hands this action to the plugins
    pub fn hook_name(self) -> &'static str {
        match self {
            Self::EntityCreate => "plugin-entity-create",
            Self::EntityDestroy => "plugin-entity-destroy",
            Self::EntityLock => "plugin-entity-lock",
            Self::EntityUnlock => "plugin-entity-unlock",
            Self::EntitySecretChange => "plugin-entity-secret-change",
            Self::EntityUpdate => "plugin-entity-update",
            Self::GroupCreate => "plugin-group-create",
            Self::GroupDestroy => "plugin-group-destroy",
            Self::GroupUpdate => "plugin-group-update",
        }
    }

    /// Chains the hook is appended to
    pub fn chains(self) -> &'static [&'static str] {
        match self {
            Self::EntityCreate | Self::GroupCreate => &[names::CREATE],
            Self::EntityDestroy | Self::GroupDestroy => &[names::DESTROY],
            Self::EntityLock => &[names::LOCK],
            Self::EntityUnlock => &[names::UNLOCK],
            Self::EntitySecretChange => &[names::SET_SECRET],
            Self::EntityUpdate => &[
                names::UPDATE_META,
                names::SET_CAPABILITY,
                names::DROP_CAPABILITY,
                names::ADD_GROUP,
                names::DEL_GROUP,
            ],
            Self::GroupUpdate => &[
                names::SET_MANAGING_GROUP,
                names::UPDATE_META,
                names::SET_CAPABILITY,
                names::DROP_CAPABILITY,
            ],
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to a plugin call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginOpts {
    /// What happened
    pub action: Action,
    /// Working entity, for entity actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<Entity>,
    /// Working group, for group actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Group>,
}

impl PluginOpts {
    /// Options for an entity action
    pub fn entity(action: Action, entity: Entity) -> Self {
        Self {
            action,
            entity: Some(entity),
            group: None,
        }
    }

    /// Options for a group action
    pub fn group(action: Action, group: Group) -> Self {
        Self {
            action,
            entity: None,
            group: Some(group),
        }
    }

    /// Result that hands the input record back unchanged
    pub fn passthrough(&self) -> PluginResult {
        PluginResult {
            entity: self.entity.clone(),
            group: self.group.clone(),
        }
    }
}

/// Output of a plugin call
///
/// A record left out of the result means the plugin did not change it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginResult {
    /// Processed entity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<Entity>,
    /// Processed group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Group>,
}

/// An extension consulted during chain execution
///
/// Calls may block; the manager bounds each one with its timeout.
pub trait Plugin: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Prepare the plugin; a plugin that fails here is not loaded
    fn init(&self) -> Result<()>;

    /// Release resources; best-effort
    fn shutdown(&self);

    /// Process an entity action
    fn process_entity(&self, opts: &PluginOpts) -> Result<PluginResult>;

    /// Process a group action
    fn process_group(&self, opts: &PluginOpts) -> Result<PluginResult>;
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_action_wire_name() {
        for action in ENTITY_ACTIONS.into_iter().chain(GROUP_ACTIONS) {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.as_str()));
            assert_eq!(
                action.hook_name(),
                action.as_str().to_ascii_lowercase()
            );
        }
    }

    #[test]
    fn test_opts_json_shape() {
        let opts = PluginOpts::entity(Action::EntityLock, Entity::new("alice"));
        let value = serde_json::to_value(&opts).unwrap();
        assert_eq!(value["action"], "PLUGIN-ENTITY-LOCK");
        assert_eq!(value["entity"]["id"], "alice");
        assert!(value.get("group").is_none());
    }

    #[test]
    fn test_empty_result_parses() {
        let result: PluginResult = serde_json::from_str("{}").unwrap();
        assert_eq!(result, PluginResult::default());
    }
}
