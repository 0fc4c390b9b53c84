//! Named factory registry
//!
//! Backends are selected by name from configuration. Instead of a global
//! table, each kind of backend gets its own `Registry` built at startup and
//! passed by reference to whoever needs it.

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// Ordered name → factory table that rejects duplicate names
pub struct Registry<F> {
    kind: &'static str,
    entries: IndexMap<String, F>,
}

impl<F> Registry<F> {
    /// Create an empty registry; `kind` names it in error messages
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: IndexMap::new(),
        }
    }

    /// What this registry holds
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Register a factory under `name`
    pub fn register(&mut self, name: impl Into<String>, factory: F) -> Result<()> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(Error::DuplicateRegistration {
                kind: self.kind,
                name,
            });
        }
        self.entries.insert(name, factory);
        Ok(())
    }

    /// Look up a factory by name
    pub fn get(&self, name: &str) -> Result<&F> {
        self.entries.get(name).ok_or_else(|| Error::UnknownBackend {
            kind: self.kind,
            name: name.to_string(),
        })
    }

    /// True if `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of registered factories
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<F> std::fmt::Debug for Registry<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("names", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;

    type Factory = fn() -> u32;

    #[test]
    fn test_register_and_get() {
        let mut reg: Registry<Factory> = Registry::new("number");
        reg.register("one", || 1).unwrap();
        reg.register("two", || 2).unwrap();

        assert_eq!((reg.get("two").unwrap())(), 2);
        assert_eq!(reg.names().collect::<Vec<_>>(), vec!["one", "two"]);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut reg: Registry<Factory> = Registry::new("number");
        reg.register("one", || 1).unwrap();

        let err = reg.register("one", || 11).unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateRegistration { kind: "number", ref name } if name == "one"
        ));
        assert_eq!((reg.get("one").unwrap())(), 1);
    }

    #[test]
    fn test_unknown_backend() {
        let reg: Registry<Factory> = Registry::new("storage");
        let err = reg.get("cassandra").unwrap_err();
        assert_eq!(err.to_string(), "Unknown storage backend 'cassandra'");
    }
}
