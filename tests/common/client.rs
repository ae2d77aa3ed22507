//! Client side of the end-to-end tests

use media_tracker::collection::{BackendClient, Collection, LocalStorage, MemoryLocalStorage};
use std::sync::Arc;

/// A `Collection` facade whose local storage the test can inspect.
pub struct TestClient {
    pub collection: Collection,
    pub storage: Arc<MemoryLocalStorage>,
}

impl TestClient {
    pub fn new(base_url: &str) -> Self {
        let storage = Arc::new(MemoryLocalStorage::new());
        let backend = Arc::new(BackendClient::new(base_url).expect("Failed to build backend client"));
        let collection = Collection::new(storage.clone(), backend);
        TestClient {
            collection,
            storage,
        }
    }

    /// Raw value of a local storage key.
    pub fn stored(&self, key: &str) -> Option<String> {
        self.storage.get_item(key).expect("Failed to read local storage")
    }
}
