//! Per-key mutation locks
//!
//! A mutation holds the lock on its record key from the first hook until the
//! record is persisted. Keys are released when the guard drops, so the set of
//! held keys never outgrows the number of in-flight mutations.

use parking_lot::{Condvar, Mutex};
use std::collections::BTreeSet;
use std::fmt;

/// Record key a mutation serializes on
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockKey {
    /// Entity by ID
    Entity(String),
    /// Group by name
    Group(String),
}

impl LockKey {
    /// Entity key
    pub fn entity(id: impl Into<String>) -> Self {
        Self::Entity(id.into())
    }

    /// Group key
    pub fn group(name: impl Into<String>) -> Self {
        Self::Group(name.into())
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(id) => write!(f, "entity:{id}"),
            Self::Group(name) => write!(f, "group:{name}"),
        }
    }
}

/// Set of held keys
#[derive(Debug, Default)]
pub struct KeyLocks {
    held: Mutex<BTreeSet<LockKey>>,
    released: Condvar,
}

impl KeyLocks {
    /// No keys held
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `key` is free, then hold it
    pub fn lock(&self, key: LockKey) -> KeyGuard<'_> {
        self.lock_many(vec![key])
    }

    /// Hold several keys at once
    ///
    /// Keys are taken together under one critical section, so two callers
    /// asking for overlapping sets cannot deadlock each other.
    pub fn lock_many(&self, keys: Vec<LockKey>) -> KeyGuard<'_> {
        let keys: BTreeSet<LockKey> = keys.into_iter().collect();
        let mut held = self.held.lock();
        while keys.iter().any(|key| held.contains(key)) {
            self.released.wait(&mut held);
        }
        held.extend(keys.iter().cloned());
        tracing::trace!(keys = ?keys, "Acquired key locks");

        KeyGuard { locks: self, keys }
    }

    /// True if `key` is currently held
    pub fn is_held(&self, key: &LockKey) -> bool {
        self.held.lock().contains(key)
    }

    /// Number of keys currently held
    pub fn held_count(&self) -> usize {
        self.held.lock().len()
    }
}

/// Releases its keys on drop
#[must_use = "the keys are released as soon as the guard is dropped"]
pub struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    keys: BTreeSet<LockKey>,
}

impl fmt::Debug for KeyGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyGuard").field("keys", &self.keys).finish()
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.locks.held.lock();
        for key in &self.keys {
            held.remove(key);
        }
        drop(held);
        self.locks.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_released_on_drop() {
        let locks = KeyLocks::new();
        let key = LockKey::entity("foo");
        {
            let _guard = locks.lock(key.clone());
            assert!(locks.is_held(&key));
        }
        assert!(!locks.is_held(&key));
        assert_eq!(locks.held_count(), 0);
    }

    #[test]
    fn test_distinct_keys_do_not_block() {
        let locks = KeyLocks::new();
        let _a = locks.lock(LockKey::entity("a"));
        let _b = locks.lock(LockKey::entity("b"));
        let _g = locks.lock(LockKey::group("a"));
        assert_eq!(locks.held_count(), 3);
    }

    #[test]
    fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let peak = Arc::clone(&peak);
                thread::spawn(move || {
                    let _guard = locks.lock(LockKey::entity("shared"));
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(locks.held_count(), 0);
    }

    #[test]
    fn test_lock_many_dedups() {
        let locks = KeyLocks::new();
        let guard = locks.lock_many(vec![
            LockKey::group("b"),
            LockKey::group("a"),
            LockKey::group("b"),
        ]);
        assert_eq!(locks.held_count(), 2);
        drop(guard);
        assert_eq!(locks.held_count(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(LockKey::entity("foo").to_string(), "entity:foo");
        assert_eq!(LockKey::group("ops").to_string(), "group:ops");
    }
}
