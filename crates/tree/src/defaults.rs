//! Chain names and built-in chain layouts

use arbor_config::ChainDirective;
use std::collections::HashSet;

/// Chain names shared by entities and groups
pub mod names {
    /// Record creation
    pub const CREATE: &str = "CREATE";
    /// Record removal (optional)
    pub const DESTROY: &str = "DESTROY";
    /// Grant a capability
    pub const SET_CAPABILITY: &str = "SET-CAPABILITY";
    /// Revoke a capability
    pub const DROP_CAPABILITY: &str = "DROP-CAPABILITY";
    /// Change display metadata
    pub const UPDATE_META: &str = "UPDATE-META";

    /// Entity: first-start superuser setup
    pub const BOOTSTRAP_SERVER: &str = "BOOTSTRAP-SERVER";
    /// Entity: change secret
    pub const SET_SECRET: &str = "SET-SECRET";
    /// Entity: check secret and lock state
    pub const VALIDATE_IDENTITY: &str = "VALIDATE-IDENTITY";
    /// Entity: lock
    pub const LOCK: &str = "LOCK";
    /// Entity: unlock
    pub const UNLOCK: &str = "UNLOCK";
    /// Entity: join a group
    pub const ADD_GROUP: &str = "ADD-GROUP";
    /// Entity: leave a group
    pub const DEL_GROUP: &str = "DEL-GROUP";

    /// Group: change the managing group
    pub const SET_MANAGING_GROUP: &str = "SET-MANAGING-GROUP";
}

use names::{
    ADD_GROUP, BOOTSTRAP_SERVER, CREATE, DEL_GROUP, DESTROY, DROP_CAPABILITY, LOCK,
    SET_CAPABILITY, SET_MANAGING_GROUP, SET_SECRET, UNLOCK, UPDATE_META, VALIDATE_IDENTITY,
};

const ENTITY_CHAINS: &[(&str, &[&str])] = &[
    (
        CREATE,
        &[
            "fail-on-existing-entity",
            "set-entity-id",
            "set-entity-number",
            "set-entity-secret",
        ],
    ),
    (
        BOOTSTRAP_SERVER,
        &[
            "load-entity",
            "set-entity-secret",
            "unlock-entity",
            "set-entity-capability",
        ],
    ),
    (DESTROY, &["load-entity"]),
    (SET_SECRET, &["load-entity", "set-entity-secret"]),
    (
        VALIDATE_IDENTITY,
        &[
            "load-entity",
            "validate-entity-unlocked",
            "validate-entity-secret",
        ],
    ),
    (LOCK, &["load-entity", "lock-entity"]),
    (UNLOCK, &["load-entity", "unlock-entity"]),
    (SET_CAPABILITY, &["load-entity", "set-entity-capability"]),
    (DROP_CAPABILITY, &["load-entity", "drop-entity-capability"]),
    (ADD_GROUP, &["load-entity", "add-direct-group"]),
    (DEL_GROUP, &["load-entity", "del-direct-group"]),
    (UPDATE_META, &["load-entity", "set-entity-meta"]),
];

const GROUP_CHAINS: &[(&str, &[&str])] = &[
    (
        CREATE,
        &[
            "fail-on-existing-group",
            "set-group-name",
            "set-group-number",
            "set-group-display-name",
            "set-managing-group",
        ],
    ),
    (DESTROY, &["load-group", "fail-on-managed-dependents"]),
    (SET_MANAGING_GROUP, &["load-group", "set-managing-group"]),
    (SET_CAPABILITY, &["load-group", "set-group-capability"]),
    (DROP_CAPABILITY, &["load-group", "drop-group-capability"]),
    (UPDATE_META, &["load-group", "set-group-display-name"]),
];

/// Entity chains the tree cannot run without
pub const REQUIRED_ENTITY_CHAINS: &[&str] = &[
    CREATE,
    BOOTSTRAP_SERVER,
    SET_SECRET,
    VALIDATE_IDENTITY,
    LOCK,
    UNLOCK,
    SET_CAPABILITY,
    DROP_CAPABILITY,
    ADD_GROUP,
    DEL_GROUP,
    UPDATE_META,
];

/// Group chains the tree cannot run without
pub const REQUIRED_GROUP_CHAINS: &[&str] = &[
    CREATE,
    SET_MANAGING_GROUP,
    SET_CAPABILITY,
    DROP_CAPABILITY,
    UPDATE_META,
];

fn expand(table: &[(&str, &[&str])]) -> Vec<ChainDirective> {
    table
        .iter()
        .flat_map(|(chain, hooks)| {
            hooks
                .iter()
                .map(move |hook| ChainDirective::append(*chain, *hook))
        })
        .collect()
}

/// Built-in entity chain layout
pub fn entity_directives() -> Vec<ChainDirective> {
    expand(ENTITY_CHAINS)
}

/// Built-in group chain layout
pub fn group_directives() -> Vec<ChainDirective> {
    expand(GROUP_CHAINS)
}

/// Combine built-in, configured and extra directives
///
/// A chain named in `overrides` replaces the built-in layout of that chain
/// only. `extra` (plugin hooks) is applied last.
pub fn merge(
    defaults: Vec<ChainDirective>,
    overrides: &[ChainDirective],
    extra: Vec<ChainDirective>,
) -> Vec<ChainDirective> {
    let overridden: HashSet<&str> = overrides.iter().map(|d| d.chain.as_str()).collect();

    defaults
        .into_iter()
        .filter(|d| !overridden.contains(d.chain.as_str()))
        .chain(overrides.iter().cloned())
        .chain(extra)
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use arbor_config::InsertPosition;

    #[test]
    fn test_required_chains_have_defaults() {
        let entity: HashSet<String> = entity_directives().into_iter().map(|d| d.chain).collect();
        for chain in REQUIRED_ENTITY_CHAINS {
            assert!(entity.contains(*chain), "missing entity chain {chain}");
        }
        let group: HashSet<String> = group_directives().into_iter().map(|d| d.chain).collect();
        for chain in REQUIRED_GROUP_CHAINS {
            assert!(group.contains(*chain), "missing group chain {chain}");
        }
    }

    #[test]
    fn test_override_replaces_one_chain() {
        let overrides = vec![ChainDirective::append(LOCK, "lock-entity")];
        let extra = vec![ChainDirective::new(
            UNLOCK,
            "audit",
            InsertPosition::Prepend,
        )];
        let merged = merge(entity_directives(), &overrides, extra);

        let lock: Vec<_> = merged
            .iter()
            .filter(|d| d.chain == LOCK)
            .map(|d| d.hook.as_str())
            .collect();
        assert_eq!(lock, vec!["lock-entity"]);

        let unlock: Vec<_> = merged
            .iter()
            .filter(|d| d.chain == UNLOCK)
            .map(|d| d.hook.as_str())
            .collect();
        assert_eq!(unlock, vec!["load-entity", "unlock-entity", "audit"]);
    }
}
