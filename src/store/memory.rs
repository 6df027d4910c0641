//! Thread-safe in-memory [`SessionStore`] implementation for tests and dry runs.

// self
use crate::{
	_prelude::*,
	store::{SessionStore, StoreError, StoreFuture, StoreKey, StoreValue},
};

type StoreMap = Arc<RwLock<BTreeMap<StoreKey, StoreValue>>>;

/// Storage backend that keeps entries in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Seeds a store with the provided entries.
	pub fn with_entries<I>(entries: I) -> Self
	where
		I: IntoIterator<Item = (StoreKey, StoreValue)>,
	{
		Self(Arc::new(RwLock::new(entries.into_iter().collect())))
	}

	/// Returns a copy of every stored entry.
	pub fn snapshot(&self) -> BTreeMap<StoreKey, StoreValue> {
		self.0.read().clone()
	}

	fn save_now(map: StoreMap, entries: Vec<(StoreKey, StoreValue)>) -> Result<(), StoreError> {
		map.write().extend(entries);

		Ok(())
	}
}
impl SessionStore for MemoryStore {
	fn fetch<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<StoreValue>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(key).cloned()) })
	}

	fn save_all(&self, entries: Vec<(StoreKey, StoreValue)>) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::save_now(map, entries) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn save_all_overwrites_and_keeps_other_entries() {
		let store = MemoryStore::with_entries([
			(StoreKey::CLIENT_ID, StoreValue::from("client")),
			(StoreKey::TOKEN, StoreValue::from("old")),
		]);

		store
			.save_all(vec![
				(StoreKey::TOKEN, StoreValue::from("new")),
				(StoreKey::REFRESH_TOKEN, StoreValue::from("refresh")),
			])
			.await
			.expect("Saving entries into the memory store should succeed.");

		let snapshot = store.snapshot();

		assert_eq!(snapshot.len(), 3);
		assert_eq!(snapshot.get(&StoreKey::TOKEN), Some(&StoreValue::from("new")));
		assert_eq!(snapshot.get(&StoreKey::CLIENT_ID), Some(&StoreValue::from("client")));
	}

	#[tokio::test]
	async fn fetch_returns_none_for_missing_key() {
		let store = MemoryStore::default();
		let value = store
			.fetch(&StoreKey::LAST_API_REQUEST)
			.await
			.expect("Fetching from an empty memory store should succeed.");

		assert!(value.is_none());
	}
}
