//! Slug-keyed place-identity cache, persisted as `place-identities.json`.
//!
//! At most one identity per slug. The whole map is rewritten after every
//! change. Entries have no TTL: place identifiers are stable, and only an
//! explicit re-resolution pass replaces one.

use super::types::PlaceIdentity;
use crate::error::Result;
use crate::store::DocumentStore;
use std::collections::BTreeMap;
use std::rc::Rc;

pub const PLACE_CACHE_FILE: &str = "place-identities.json";

pub struct PlaceCache {
    store: Rc<dyn DocumentStore>,
    entries: BTreeMap<String, PlaceIdentity>,
}

impl PlaceCache {
    /// Load the cache from the store. A missing document is an empty cache;
    /// an unreadable one is an error, so a corrupt file is never silently
    /// replaced by an empty one.
    pub fn load(store: Rc<dyn DocumentStore>) -> Result<Self> {
        let entries = match store.read(PLACE_CACHE_FILE)? {
            Some(text) => serde_json::from_str(&text)?,
            None => BTreeMap::new(),
        };
        Ok(Self { store, entries })
    }

    pub fn get(&self, slug: &str) -> Option<&PlaceIdentity> {
        self.entries.get(slug)
    }

    /// Insert only if the slug has no entry yet. Returns whether it was inserted.
    pub fn insert_new(&mut self, slug: &str, identity: PlaceIdentity) -> Result<bool> {
        if self.entries.contains_key(slug) {
            return Ok(false);
        }
        self.entries.insert(slug.to_string(), identity);
        self.persist()?;
        Ok(true)
    }

    /// Replace an entry. Used only by the re-resolution pass.
    pub fn replace(&mut self, slug: &str, identity: PlaceIdentity) -> Result<Option<PlaceIdentity>> {
        let previous = self.entries.insert(slug.to_string(), identity);
        self.persist()?;
        Ok(previous)
    }

    fn persist(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        self.store.write(PLACE_CACHE_FILE, &json)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FileStore, MemoryStore};
    use tempfile::TempDir;

    fn identity(id: &str) -> PlaceIdentity {
        PlaceIdentity {
            place_id: id.into(),
            name: "Hostice".into(),
            address: "Hostice, Slovensko".into(),
            query: Some("Hostice, okres Zvolen, Slovensko".into()),
            resolved_at: None,
        }
    }

    #[test]
    fn test_insert_new_never_overwrites() {
        let store = Rc::new(MemoryStore::new());
        let mut cache = PlaceCache::load(store.clone()).unwrap();

        assert!(cache.insert_new("hostice-zvolen", identity("A")).unwrap());
        assert!(!cache.insert_new("hostice-zvolen", identity("B")).unwrap());
        assert_eq!(cache.get("hostice-zvolen").unwrap().place_id, "A");
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn test_replace_returns_previous() {
        let store = Rc::new(MemoryStore::new());
        let mut cache = PlaceCache::load(store).unwrap();
        cache.insert_new("hostice-kosice", identity("A")).unwrap();

        let previous = cache.replace("hostice-kosice", identity("B")).unwrap();
        assert_eq!(previous.unwrap().place_id, "A");
        assert_eq!(cache.get("hostice-kosice").unwrap().place_id, "B");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_persistence_across_loads() {
        let dir = TempDir::new().unwrap();
        let store: Rc<dyn DocumentStore> = Rc::new(FileStore::new(dir.path()));
        {
            let mut cache = PlaceCache::load(store.clone()).unwrap();
            cache.insert_new("zvolen", identity("Z1")).unwrap();
        }
        let cache = PlaceCache::load(store).unwrap();
        assert_eq!(cache.get("zvolen").unwrap().place_id, "Z1");
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let store = Rc::new(MemoryStore::new());
        store.insert(PLACE_CACHE_FILE, "{not json");
        assert!(PlaceCache::load(store).is_err());
    }
}
