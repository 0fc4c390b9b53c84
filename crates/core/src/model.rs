//! Entity and Group records
//!
//! Records are plain data. Every mutation of a persisted record goes through
//! a chain run in the tree crate; deltas carry only the requested changes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A named permission that can be granted to entities and groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    /// Unrestricted access to the whole tree
    GlobalRoot,
    /// May create entities
    CreateEntity,
    /// May destroy entities
    DestroyEntity,
    /// May change entity metadata
    ModifyEntityMeta,
    /// May change another entity's secret
    ChangeEntitySecret,
    /// May lock entities
    LockEntity,
    /// May unlock entities
    UnlockEntity,
    /// May create groups
    CreateGroup,
    /// May destroy groups
    DestroyGroup,
    /// May change group metadata
    ModifyGroupMeta,
    /// May change group membership
    ModifyGroupMembers,
}

impl Capability {
    /// All capabilities in declaration order
    pub const ALL: [Capability; 11] = [
        Capability::GlobalRoot,
        Capability::CreateEntity,
        Capability::DestroyEntity,
        Capability::ModifyEntityMeta,
        Capability::ChangeEntitySecret,
        Capability::LockEntity,
        Capability::UnlockEntity,
        Capability::CreateGroup,
        Capability::DestroyGroup,
        Capability::ModifyGroupMeta,
        Capability::ModifyGroupMembers,
    ];

    /// Wire name of the capability
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::GlobalRoot => "GLOBAL_ROOT",
            Capability::CreateEntity => "CREATE_ENTITY",
            Capability::DestroyEntity => "DESTROY_ENTITY",
            Capability::ModifyEntityMeta => "MODIFY_ENTITY_META",
            Capability::ChangeEntitySecret => "CHANGE_ENTITY_SECRET",
            Capability::LockEntity => "LOCK_ENTITY",
            Capability::UnlockEntity => "UNLOCK_ENTITY",
            Capability::CreateGroup => "CREATE_GROUP",
            Capability::DestroyGroup => "DESTROY_GROUP",
            Capability::ModifyGroupMeta => "MODIFY_GROUP_META",
            Capability::ModifyGroupMembers => "MODIFY_GROUP_MEMBERS",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        Capability::ALL
            .into_iter()
            .find(|cap| cap.as_str() == wanted)
            .ok_or_else(|| Error::InvalidRequest(format!("unknown capability '{s}'")))
    }
}

/// A principal in the tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier
    pub id: String,
    /// Unique number
    pub number: i32,
    /// Opaque secured secret produced by a [`SecretHasher`](crate::SecretHasher)
    pub secret: Option<String>,
    /// Directly granted capabilities
    pub capabilities: BTreeSet<Capability>,
    /// Names of groups this entity is a direct member of
    pub groups: BTreeSet<String>,
    /// Locked entities cannot authenticate
    pub locked: bool,
    /// Free-form display name
    pub meta: Option<String>,
}

impl Entity {
    /// Create an empty entity with the given ID
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// A named collection of entities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Unique name
    pub name: String,
    /// Unique number
    pub number: i32,
    /// Human readable name
    pub display_name: String,
    /// Name of the group that manages this one; may name itself
    pub managed_by: Option<String>,
    /// Directly granted capabilities
    pub capabilities: BTreeSet<Capability>,
}

impl Group {
    /// Create an empty group with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Requested change to an entity
///
/// Only the fields that are `Some` are acted upon by hooks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDelta {
    /// Target entity ID
    pub id: Option<String>,
    /// Requested number
    pub number: Option<i32>,
    /// Plaintext secret to secure or verify
    pub secret: Option<String>,
    /// Capability to grant or drop
    pub capability: Option<Capability>,
    /// Group to join or leave
    pub group: Option<String>,
    /// New display name
    pub meta: Option<String>,
}

impl EntityDelta {
    /// Delta targeting an existing entity
    pub fn for_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// The target ID, or an invalid request error
    pub fn require_id(&self) -> Result<&str> {
        match self.id.as_deref() {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(Error::InvalidRequest("entity ID is required".to_string())),
        }
    }
}

/// Requested change to a group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDelta {
    /// Target group name
    pub name: Option<String>,
    /// Requested number
    pub number: Option<i32>,
    /// New display name
    pub display_name: Option<String>,
    /// New manager; `Some("")` clears it
    pub managed_by: Option<String>,
    /// Capability to grant or drop
    pub capability: Option<Capability>,
}

impl GroupDelta {
    /// Delta targeting an existing group
    pub fn for_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// The target name, or an invalid request error
    pub fn require_name(&self) -> Result<&str> {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(Error::InvalidRequest("group name is required".to_string())),
        }
    }
}
