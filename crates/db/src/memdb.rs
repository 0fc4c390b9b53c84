//! In-memory storage

use arbor_core::{Entity, Error, Group, Result, Storage};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Storage held entirely in memory
///
/// Records are cloned in and out, so callers never alias stored state.
#[derive(Debug, Default)]
pub struct MemDb {
    entities: RwLock<BTreeMap<String, Entity>>,
    groups: RwLock<BTreeMap<String, Group>>,
}

impl MemDb {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemDb {
    fn discover_entity_ids(&self) -> Result<Vec<String>> {
        Ok(self.entities.read().keys().cloned().collect())
    }

    fn load_entity(&self, id: &str) -> Result<Entity> {
        self.entities
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::UnknownEntity(id.to_string()))
    }

    fn load_entity_number(&self, number: i32) -> Result<Entity> {
        self.entities
            .read()
            .values()
            .find(|e| e.number == number)
            .cloned()
            .ok_or_else(|| Error::UnknownEntity(format!("number {number}")))
    }

    fn save_entity(&self, entity: &Entity) -> Result<()> {
        self.entities
            .write()
            .insert(entity.id.clone(), entity.clone());
        Ok(())
    }

    fn delete_entity(&self, id: &str) -> Result<()> {
        match self.entities.write().remove(id) {
            Some(_) => Ok(()),
            None => Err(Error::UnknownEntity(id.to_string())),
        }
    }

    fn discover_group_names(&self) -> Result<Vec<String>> {
        Ok(self.groups.read().keys().cloned().collect())
    }

    fn load_group(&self, name: &str) -> Result<Group> {
        self.groups
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownGroup(name.to_string()))
    }

    fn load_group_number(&self, number: i32) -> Result<Group> {
        self.groups
            .read()
            .values()
            .find(|g| g.number == number)
            .cloned()
            .ok_or_else(|| Error::UnknownGroup(format!("number {number}")))
    }

    fn save_group(&self, group: &Group) -> Result<()> {
        self.groups
            .write()
            .insert(group.name.clone(), group.clone());
        Ok(())
    }

    fn delete_group(&self, name: &str) -> Result<()> {
        match self.groups.write().remove(name) {
            Some(_) => Ok(()),
            None => Err(Error::UnknownGroup(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_discover_entities() {
        let db = MemDb::new();
        assert!(db.discover_entity_ids().unwrap().is_empty());

        db.save_entity(&Entity::new("foo")).unwrap();
        assert_eq!(db.discover_entity_ids().unwrap(), vec!["foo".to_string()]);
    }

    #[test]
    fn test_discover_groups() {
        let db = MemDb::new();
        assert!(db.discover_group_names().unwrap().is_empty());

        db.save_group(&Group::new("foo")).unwrap();
        assert_eq!(db.discover_group_names().unwrap(), vec!["foo".to_string()]);
    }

    #[test]
    fn test_group_lifecycle() {
        let db = MemDb::new();
        assert!(db.load_group("foo").unwrap_err().is_not_found());

        let mut group = Group::new("foo");
        group.display_name = "Foo".into();
        db.save_group(&group).unwrap();
        assert_eq!(db.load_group("foo").unwrap(), group);

        db.delete_group("foo").unwrap();
        assert!(matches!(db.load_group("foo"), Err(Error::UnknownGroup(_))));
    }

    #[test]
    fn test_saved_copy_is_detached() {
        let db = MemDb::new();
        let mut entity = Entity::new("foo");
        db.save_entity(&entity).unwrap();

        entity.locked = true;
        assert!(!db.load_entity("foo").unwrap().locked);
    }
}
