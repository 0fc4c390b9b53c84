//! Record encoding for byte-oriented backends

use arbor_core::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Serialize a record to bytes using bincode
pub fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(record, bincode::config::standard())
        .map_err(|e| Error::Storage(format!("Failed to encode record: {e}")))
}

/// Deserialize a record from bytes using bincode
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map(|(record, _len)| record)
        .map_err(|e| Error::Storage(format!("Failed to decode record: {e}")))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use arbor_core::{Capability, Entity};

    #[test]
    fn test_entity_survives_encoding() {
        let mut entity = Entity::new("alice");
        entity.number = 7;
        entity.secret = Some("$argon2id$...".into());
        entity.capabilities.insert(Capability::GlobalRoot);
        entity.groups.insert("admins".into());
        entity.locked = true;

        let bytes = encode(&entity).unwrap();
        let back: Entity = decode(&bytes).unwrap();
        assert_eq!(back, entity);
    }

    #[test]
    fn test_garbage_is_storage_error() {
        let err = decode::<Entity>(&[0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }
}
