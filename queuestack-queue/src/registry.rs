//! Caller-owned registry of named queue stores

use queuestack_core::NamedStore;
use std::sync::Arc;
use tracing::info;

use crate::options::StoreSettings;
use crate::seed::QueueSeed;
use crate::storage::{Queue, QueueError, QueueStore};

/// Maps store names to shared [`QueueStore`] handles
#[derive(Default)]
pub struct QueueRegistry {
    stores: NamedStore<Arc<QueueStore>>,
}

impl QueueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from seeds and register it, replacing any store of the
    /// same name
    pub fn init(&self, name: &str, seeds: Vec<QueueSeed>) -> Result<Arc<QueueStore>, QueueError> {
        self.init_with(name, seeds, StoreSettings::default())
    }

    pub fn init_with(
        &self,
        name: &str,
        seeds: Vec<QueueSeed>,
        settings: StoreSettings,
    ) -> Result<Arc<QueueStore>, QueueError> {
        let store = Arc::new(QueueStore::from_seed(name, seeds, settings)?);
        if let Some(previous) = self.stores.insert(name, Arc::clone(&store)) {
            info!(store = %name, "Replacing registered store");
            previous.close();
        }
        Ok(store)
    }

    /// Open a registered store and return a handle to it
    pub fn open(&self, name: &str) -> Result<Arc<QueueStore>, QueueError> {
        let store = self
            .stores
            .get_cloned(name)
            .ok_or_else(|| QueueError::StoreNotFound(name.to_string()))?;
        store.open();
        Ok(store)
    }

    pub fn close(&self, name: &str) -> Result<(), QueueError> {
        self.stores
            .get_cloned(name)
            .ok_or_else(|| QueueError::StoreNotFound(name.to_string()))?
            .close();
        Ok(())
    }

    /// Unregister a store, closing it. Returns whether one was registered.
    pub fn dispose(&self, name: &str) -> bool {
        match self.stores.remove(name) {
            Some((_, store)) => {
                store.close();
                info!(store = %name, "Disposed store");
                true
            }
            None => false,
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.stores.names()
    }

    pub fn clear(&self) {
        for name in self.stores.names() {
            self.dispose(&name);
        }
    }

    /// Raw queue state of a registered store, for verification in tests only
    #[doc(hidden)]
    pub fn data(&self, name: &str) -> Result<Vec<Queue>, QueueError> {
        self.stores
            .get_cloned(name)
            .map(|store| store.snapshot())
            .ok_or_else(|| QueueError::StoreNotFound(name.to_string()))
    }
}
