//! Collaborator contracts for the tree
//!
//! The tree never talks to a concrete database, hashing scheme or token
//! format. It depends on these traits, and implementations are picked at
//! startup from a [`Registry`](crate::Registry).
//!
//! All contracts are object safe and `Send + Sync` so a single instance can
//! be shared across request threads behind an `Arc`.

use crate::Result;
use crate::model::{Capability, Entity, Group};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Persistence for entities and groups
///
/// Each call is atomic on its own. Lookups of a missing record fail with
/// [`Error::UnknownEntity`](crate::Error::UnknownEntity) or
/// [`Error::UnknownGroup`](crate::Error::UnknownGroup), which callers must be
/// able to tell apart from [`Error::Storage`](crate::Error::Storage).
///
/// # Examples
///
/// ```ignore
/// fn exists(storage: &dyn Storage, id: &str) -> Result<bool> {
///     match storage.load_entity(id) {
///         Ok(_) => Ok(true),
///         Err(e) if e.is_not_found() => Ok(false),
///         Err(e) => Err(e),
///     }
/// }
/// ```
pub trait Storage: Send + Sync {
    /// All stored entity IDs, sorted
    fn discover_entity_ids(&self) -> Result<Vec<String>>;

    /// Load an entity by ID
    fn load_entity(&self, id: &str) -> Result<Entity>;

    /// Load an entity by number
    fn load_entity_number(&self, number: i32) -> Result<Entity>;

    /// Insert or replace an entity, keyed by ID
    fn save_entity(&self, entity: &Entity) -> Result<()>;

    /// Remove an entity by ID
    fn delete_entity(&self, id: &str) -> Result<()>;

    /// All stored group names, sorted
    fn discover_group_names(&self) -> Result<Vec<String>>;

    /// Load a group by name
    fn load_group(&self, name: &str) -> Result<Group>;

    /// Load a group by number
    fn load_group_number(&self, number: i32) -> Result<Group>;

    /// Insert or replace a group, keyed by name
    fn save_group(&self, group: &Group) -> Result<()>;

    /// Remove a group by name
    fn delete_group(&self, name: &str) -> Result<()>;
}

/// Turns plaintext secrets into opaque stored form and checks them
pub trait SecretHasher: Send + Sync {
    /// Name of this backend (e.g., "argon2")
    fn name(&self) -> &str;

    /// Secure a plaintext secret
    fn secure_secret(&self, plain: &str) -> Result<String>;

    /// Check a plaintext secret against its secured form
    ///
    /// Fails with [`Error::AuthenticationFailure`](crate::Error::AuthenticationFailure)
    /// on mismatch.
    fn verify_secret(&self, plain: &str, secured: &str) -> Result<()>;
}

/// Claims carried by an issued token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Entity the token was issued to
    pub entity_id: String,
    /// Capabilities held at issue time
    pub capabilities: BTreeSet<Capability>,
}

/// Issues and validates bearer tokens
pub trait TokenService: Send + Sync {
    /// Name of this backend (e.g., "jwt")
    fn name(&self) -> &str;

    /// Issue a token for the given claims
    fn issue(&self, claims: &TokenClaims) -> Result<String>;

    /// Validate a token and return its claims
    fn validate(&self, token: &str) -> Result<TokenClaims>;
}
