//! Built-in hooks
//!
//! Every built-in hook is a plain function registered under a fixed name.
//! They fall into a few families:
//!
//! - existence guards (`fail-on-existing-*`): fail if the key is taken
//! - loaders (`load-*`): replace the working copy with the stored record
//! - setters: copy one delta field onto the working copy
//! - validators: check the working copy against the delta

pub mod entity;
pub mod group;

use crate::hook::HookRegistry;
use arbor_core::{Entity, Group, Result};

impl HookRegistry<Entity> {
    /// Registry with every built-in entity hook
    pub fn with_defaults() -> Result<Self> {
        let mut registry = Self::new();
        entity::register(&mut registry)?;
        Ok(registry)
    }
}

impl HookRegistry<Group> {
    /// Registry with every built-in group hook
    pub fn with_defaults() -> Result<Self> {
        let mut registry = Self::new();
        group::register(&mut registry)?;
        Ok(registry)
    }
}
