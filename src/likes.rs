use crate::storage::{self, KeyValueStore, StorageError};
use std::rc::Rc;

pub const LIKES_KEY: &str = "valo-collective-likes";

/// Post ids the visitor has liked on the collective feed.
pub struct LikeLedger {
    liked: Vec<String>,
    storage: Rc<dyn KeyValueStore>,
}

impl LikeLedger {
    pub fn load(storage: Rc<dyn KeyValueStore>) -> Self {
        let mut liked: Vec<String> = storage::load_list_or_default(storage.as_ref(), LIKES_KEY);
        let mut seen = std::collections::HashSet::new();
        liked.retain(|id| seen.insert(id.clone()));
        Self { liked, storage }
    }

    pub fn is_liked(&self, id: &str) -> bool {
        self.liked.iter().any(|liked| liked == id)
    }

    pub fn liked(&self) -> &[String] {
        &self.liked
    }

    /// Flips the like on `id` and persists. Returns the new state. A failed
    /// write leaves the ledger as it was.
    pub fn toggle(&mut self, id: &str) -> Result<bool, StorageError> {
        let previous = self.liked.clone();
        let now_liked = match self.liked.iter().position(|liked| liked == id) {
            Some(index) => {
                self.liked.remove(index);
                false
            }
            None => {
                self.liked.push(id.to_string());
                true
            }
        };
        if let Err(err) = storage::save_json(self.storage.as_ref(), LIKES_KEY, &self.liked) {
            self.liked = previous;
            return Err(err);
        }
        Ok(now_liked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn toggle_persists_across_reload() {
        let storage = Rc::new(MemoryStore::new());
        let mut ledger = LikeLedger::load(storage.clone());
        assert!(ledger.toggle("post-3").unwrap());
        assert!(ledger.toggle("post-7").unwrap());
        assert!(!ledger.toggle("post-3").unwrap());

        let reloaded = LikeLedger::load(storage);
        assert_eq!(reloaded.liked(), &["post-7".to_string()]);
        assert!(reloaded.is_liked("post-7"));
        assert!(!reloaded.is_liked("post-3"));
    }

    struct ReadOnlyStore(MemoryStore);

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, key: &str) -> storage::Result<Option<String>> {
            self.0.get(key)
        }

        fn set(&self, key: &str, _value: &str) -> storage::Result<()> {
            Err(StorageError::Io {
                path: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    #[test]
    fn failed_write_keeps_ledger_in_sync() {
        let inner = MemoryStore::new();
        inner.set(LIKES_KEY, r#"["post-2"]"#).unwrap();
        let storage = Rc::new(ReadOnlyStore(inner));
        let mut ledger = LikeLedger::load(storage.clone());

        assert!(ledger.toggle("post-1").is_err());
        assert!(ledger.toggle("post-2").is_err());
        assert_eq!(ledger.liked(), &["post-2".to_string()]);
        assert_eq!(LikeLedger::load(storage).liked(), ledger.liked());
    }

    #[test]
    fn corrupt_likes_degrade_to_empty() {
        let storage = Rc::new(MemoryStore::new());
        storage.set(LIKES_KEY, "[1, 2").unwrap();
        let ledger = LikeLedger::load(storage);
        assert!(ledger.liked().is_empty());
    }
}
