//! Chain directives
//!
//! A directive names a hook, the chain it joins and where it goes:
//!
//! ```toml
//! [[chains.entity]]
//! chain = "CREATE"
//! hook = "audit-create"
//! position = { after = "set-entity-id" }
//!
//! [[chains.group]]
//! chain = "DESTROY"
//! hook = "fail-on-managed-dependents"
//! position = "prepend"
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a hook is inserted into its chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InsertPosition {
    /// At the end of the chain
    #[default]
    Append,
    /// At the start of the chain
    Prepend,
    /// Directly after the named hook
    After(String),
    /// Directly before the named hook
    Before(String),
}

impl InsertPosition {
    /// The hook this position is anchored on, if any
    pub fn anchor(&self) -> Option<&str> {
        match self {
            Self::After(anchor) | Self::Before(anchor) => Some(anchor),
            Self::Append | Self::Prepend => None,
        }
    }
}

impl fmt::Display for InsertPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Append => f.write_str("append"),
            Self::Prepend => f.write_str("prepend"),
            Self::After(anchor) => write!(f, "after {anchor}"),
            Self::Before(anchor) => write!(f, "before {anchor}"),
        }
    }
}

/// Insert `hook` into `chain` at `position`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDirective {
    /// Chain name, e.g. `CREATE`
    pub chain: String,
    /// Hook name, e.g. `set-entity-secret`
    pub hook: String,
    /// Insertion point
    #[serde(default)]
    pub position: InsertPosition,
}

impl ChainDirective {
    /// Directive with an explicit position
    pub fn new(
        chain: impl Into<String>,
        hook: impl Into<String>,
        position: InsertPosition,
    ) -> Self {
        Self {
            chain: chain.into(),
            hook: hook.into(),
            position,
        }
    }

    /// Directive that appends `hook` to `chain`
    pub fn append(chain: impl Into<String>, hook: impl Into<String>) -> Self {
        Self::new(chain, hook, InsertPosition::Append)
    }
}

impl fmt::Display for ChainDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.chain, self.hook, self.position)
    }
}

/// Per-kind chain overrides
///
/// A chain named here replaces the built-in layout for that chain only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainsConfig {
    /// Entity chain directives
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity: Vec<ChainDirective>,

    /// Group chain directives
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group: Vec<ChainDirective>,
}
