//! Thread-safe in-memory [`KeyValueStore`] for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{KeyValueStore, StoreError},
};

/// Storage backend that keeps values in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryKeyValueStore(Arc<RwLock<HashMap<String, String>>>);
impl MemoryKeyValueStore {
	/// Number of keys currently stored.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl KeyValueStore for MemoryKeyValueStore {
	fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		Ok(self.0.read().get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
		self.0.write().insert(key.to_owned(), value.to_owned());

		Ok(())
	}

	fn delete(&self, key: &str) -> Result<(), StoreError> {
		self.0.write().remove(key);

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn set_get_delete() {
		let store = MemoryKeyValueStore::default();

		assert_eq!(store.get("missing"), Ok(None));

		store.set("k", "v").expect("Memory set should succeed.");

		assert_eq!(store.get("k"), Ok(Some("v".into())));
		assert_eq!(store.len(), 1);

		store.delete("k").expect("Memory delete should succeed.");
		store.delete("k").expect("Deleting a missing key should succeed.");

		assert!(store.is_empty());
	}
}
