//! Core types and contracts for arbor
//!
//! This is the foundation crate that all other arbor crates depend on.
//! It provides:
//! - The error taxonomy shared by the tree, storage, crypto and plugins
//! - The Entity / Group data model and their deltas
//! - Collaborator contracts (Storage, SecretHasher, TokenService)
//! - A named factory registry used for backend selection
//!
//! This crate has no dependencies on other arbor crates.

pub mod error;
pub mod model;
pub mod registry;
pub mod traits;

pub use error::{Error, Result};
pub use model::{Capability, Entity, EntityDelta, Group, GroupDelta};
pub use registry::Registry;
pub use traits::{SecretHasher, Storage, TokenClaims, TokenService};
