//! Shared collaborators handed to hook constructors

use arbor_core::{SecretHasher, Storage};
use std::sync::Arc;

/// Storage and crypto handles for hooks
///
/// Cheap to clone; every hook that needs a collaborator keeps its own copy.
#[derive(Clone)]
pub struct RefContext {
    storage: Arc<dyn Storage>,
    crypto: Arc<dyn SecretHasher>,
}

impl RefContext {
    /// Bundle the collaborators
    pub fn new(storage: Arc<dyn Storage>, crypto: Arc<dyn SecretHasher>) -> Self {
        Self { storage, crypto }
    }

    /// Storage backend
    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Secret hasher
    pub fn crypto(&self) -> &dyn SecretHasher {
        self.crypto.as_ref()
    }
}

impl std::fmt::Debug for RefContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefContext")
            .field("crypto", &self.crypto.name())
            .finish_non_exhaustive()
    }
}
