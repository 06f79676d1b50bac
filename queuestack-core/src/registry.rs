//! Name-keyed state management

use dashmap::DashMap;

/// Thread-safe map of named instances
///
/// Owned by the caller and passed by reference, so several independent
/// registries can coexist in one process.
pub struct NamedStore<T> {
    data: DashMap<String, T>,
}

impl<T> Default for NamedStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NamedStore<T> {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }

    /// Register a value, returning the one it replaced
    pub fn insert(&self, name: impl Into<String>, value: T) -> Option<T> {
        self.data.insert(name.into(), value)
    }

    /// Remove a value by name
    pub fn remove(&self, name: &str) -> Option<(String, T)> {
        self.data.remove(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.data.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl<T: Clone> NamedStore<T> {
    /// Get a clone of the value, releasing the map guard immediately
    pub fn get_cloned(&self, name: &str) -> Option<T> {
        self.data.get(name).map(|e| e.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct TestState {
        counter: i32,
    }

    #[test]
    fn test_insert_and_get() {
        let store: NamedStore<TestState> = NamedStore::new();
        store.insert("testdb", TestState { counter: 42 });

        let state = store.get_cloned("testdb").unwrap();
        assert_eq!(state.counter, 42);
    }

    #[test]
    fn test_insert_overwrites() {
        let store: NamedStore<TestState> = NamedStore::new();
        store.insert("testdb", TestState { counter: 1 });
        let previous = store.insert("testdb", TestState { counter: 2 });

        assert_eq!(previous.unwrap().counter, 1);
        assert_eq!(store.get_cloned("testdb").unwrap().counter, 2);
        assert_eq!(store.names(), vec!["testdb".to_string()]);
    }

    #[test]
    fn test_remove_and_names() {
        let store: NamedStore<TestState> = NamedStore::new();
        store.insert("b", TestState::default());
        store.insert("a", TestState::default());

        assert_eq!(store.names(), vec!["a".to_string(), "b".to_string()]);
        assert!(store.remove("a").is_some());
        assert!(store.remove("a").is_none());
        assert!(store.get_cloned("a").is_none());
        assert_eq!(store.names(), vec!["b".to_string()]);
    }

    #[test]
    fn test_get_cloned_shares_arc() {
        let store: NamedStore<Arc<i32>> = NamedStore::new();
        let value = Arc::new(7);
        store.insert("x", Arc::clone(&value));

        let fetched = store.get_cloned("x").unwrap();
        assert!(Arc::ptr_eq(&fetched, &value));
        assert!(store.get_cloned("y").is_none());
    }
}
