//! In-memory queue storage

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use queuestack_core::{ErrorCode, QueueStackError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;
use tracing::{debug, info};

use crate::options::{OrderingMode, QueueOptions, ReceiveOptions, StoreSettings};
use crate::seed::QueueSeed;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("The queue {0} was not found.")]
    QueueNotFound(String),
    #[error("A queue named {0} already exists.")]
    DuplicateQueue(String),
    #[error("The store {0} was not found.")]
    StoreNotFound(String),
    #[error("The store {0} is closed.")]
    StoreClosed(String),
    #[error("Invalid seed: {0}")]
    InvalidSeed(String),
    #[error("The store {0} has no item ids left.")]
    IdsExhausted(String),
}

impl QueueError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::QueueNotFound(_) => ErrorCode::QueueNotFound,
            Self::DuplicateQueue(_) => ErrorCode::DuplicateQueue,
            Self::StoreNotFound(_) => ErrorCode::StoreNotFound,
            Self::StoreClosed(_) => ErrorCode::StoreClosed,
            Self::InvalidSeed(_) => ErrorCode::InvalidSeed,
            Self::IdsExhausted(_) => ErrorCode::IdsExhausted,
        }
    }

    /// The queue or store name the error refers to, if any
    pub fn resource(&self) -> Option<&str> {
        match self {
            Self::QueueNotFound(name)
            | Self::DuplicateQueue(name)
            | Self::StoreNotFound(name)
            | Self::StoreClosed(name)
            | Self::IdsExhausted(name) => Some(name),
            Self::InvalidSeed(_) => None,
        }
    }
}

impl From<QueueError> for QueueStackError {
    fn from(err: QueueError) -> Self {
        let envelope = QueueStackError::new(err.code(), err.to_string());
        match err.resource() {
            Some(resource) => envelope.with_resource(resource),
            None => envelope,
        }
    }
}

/// A single enqueued message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub message: Value,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

impl Item {
    pub fn new(id: String, message: Value) -> Self {
        Self {
            id,
            message,
            timestamp: Utc::now(),
            read: false,
        }
    }

    pub fn meta(&self) -> ItemMeta {
        ItemMeta {
            id: self.id.clone(),
            timestamp: self.timestamp,
            read: self.read,
        }
    }
}

/// Item metadata returned by `peek`; the payload is withheld
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemMeta {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Queue {
    pub name: String,
    pub options: QueueOptions,
    pub items: VecDeque<Item>,
}

impl Queue {
    pub fn new(name: String, options: QueueOptions) -> Self {
        Self {
            name,
            options,
            items: VecDeque::new(),
        }
    }

    fn is_candidate(&self, item: &Item, options: ReceiveOptions) -> bool {
        self.options.auto_delete || options.include_read || !item.read
    }

    /// Storage positions of the items `receive` would return, in delivery order
    fn select(&self, count: usize, options: ReceiveOptions) -> Vec<usize> {
        let candidates = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| self.is_candidate(item, options))
            .map(|(pos, _)| pos);

        match self.options.ordering_mode {
            OrderingMode::Fifo => candidates.take(count).collect(),
            OrderingMode::Lifo => candidates.rev().take(count).collect(),
        }
    }

    fn peek(&self, count: usize, options: ReceiveOptions) -> Vec<ItemMeta> {
        self.select(count, options)
            .into_iter()
            .map(|pos| self.items[pos].meta())
            .collect()
    }

    /// Returned records reflect the item as it was before this receive
    fn receive(&mut self, count: usize, options: ReceiveOptions) -> Vec<Item> {
        let selected = self.select(count, options);
        if selected.is_empty() {
            return Vec::new();
        }

        if !self.options.auto_delete {
            let received = selected.iter().map(|&pos| self.items[pos].clone()).collect();
            for &pos in &selected {
                self.items[pos].read = true;
            }
            return received;
        }

        let slots: HashMap<usize, usize> = selected
            .iter()
            .enumerate()
            .map(|(slot, &pos)| (pos, slot))
            .collect();
        let mut received: Vec<Option<Item>> = vec![None; selected.len()];
        let mut remaining = VecDeque::with_capacity(self.items.len() - selected.len());

        for (pos, item) in std::mem::take(&mut self.items).into_iter().enumerate() {
            match slots.get(&pos) {
                Some(&slot) => received[slot] = Some(item),
                None => remaining.push_back(item),
            }
        }

        self.items = remaining;
        received.into_iter().flatten().collect()
    }
}

/// Lifecycle state of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StoreState {
    Open,
    Closed,
}

/// Store-wide id allocator
///
/// Explicit numeric ids seen while seeding push the next id past them, so
/// every allocated id exceeds every id already in the store. `next` is
/// `None` once `u64::MAX` has been handed out or observed.
#[derive(Debug)]
struct IdAllocator {
    next: Option<u64>,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: Some(0) }
    }
}

impl IdAllocator {
    fn allocate(&mut self) -> Option<String> {
        let id = self.next?;
        self.next = id.checked_add(1);
        Some(id.to_string())
    }

    /// Reserve `count` consecutive ids, or none at all
    fn allocate_many(&mut self, count: usize) -> Option<Vec<String>> {
        if count == 0 {
            return Some(Vec::new());
        }
        let first = self.next?;
        let last = first.checked_add(u64::try_from(count - 1).ok()?)?;
        self.next = last.checked_add(1);
        Some((first..=last).map(|id| id.to_string()).collect())
    }

    fn observe(&mut self, id: &str) {
        if let (Some(next), Ok(n)) = (self.next, id.parse::<u64>()) {
            self.next = n.checked_add(1).map(|after| next.max(after));
        }
    }
}

#[derive(Debug)]
struct StoreInner {
    queues: Vec<Queue>,
    ids: IdAllocator,
    state: StoreState,
}

impl StoreInner {
    fn queue(&self, name: &str) -> Result<&Queue, QueueError> {
        self.queues
            .iter()
            .find(|q| q.name == name)
            .ok_or_else(|| QueueError::QueueNotFound(name.to_string()))
    }

    fn queue_mut(&mut self, name: &str) -> Result<&mut Queue, QueueError> {
        self.queues
            .iter_mut()
            .find(|q| q.name == name)
            .ok_or_else(|| QueueError::QueueNotFound(name.to_string()))
    }
}

/// A named collection of queues sharing one id allocator
///
/// All state sits behind a single lock, so every operation is atomic with
/// respect to every other.
#[derive(Debug)]
pub struct QueueStore {
    name: String,
    settings: StoreSettings,
    inner: RwLock<StoreInner>,
}

impl QueueStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_settings(name, StoreSettings::default())
    }

    pub fn with_settings(name: impl Into<String>, settings: StoreSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            inner: RwLock::new(StoreInner {
                queues: Vec::new(),
                ids: IdAllocator::default(),
                state: StoreState::Closed,
            }),
        }
    }

    /// Build a store from seed queues
    ///
    /// Seed items without an id consume ids from the allocator in seed
    /// order, before any `send`.
    pub fn from_seed(
        name: impl Into<String>,
        seeds: Vec<QueueSeed>,
        settings: StoreSettings,
    ) -> Result<Self, QueueError> {
        let store = Self::with_settings(name, settings);
        {
            let mut inner = store.inner.write();
            let mut seen = HashSet::new();

            for seed in seeds {
                if inner.queues.iter().any(|q| q.name == seed.name) {
                    return Err(QueueError::DuplicateQueue(seed.name));
                }

                let mut queue = Queue::new(seed.name, seed.options);
                for item in seed.items {
                    let id = match item.id {
                        Some(id) => {
                            inner.ids.observe(&id);
                            id
                        }
                        None => inner.ids.allocate().ok_or_else(|| {
                            QueueError::InvalidSeed(format!(
                                "no id left for an item in queue {}",
                                queue.name
                            ))
                        })?,
                    };
                    if !seen.insert(id.clone()) {
                        return Err(QueueError::InvalidSeed(format!(
                            "duplicate item id {} in queue {}",
                            id, queue.name
                        )));
                    }
                    queue.items.push_back(Item {
                        id,
                        message: item.message,
                        timestamp: item.timestamp.unwrap_or_else(Utc::now),
                        read: item.read.unwrap_or(false),
                    });
                }
                inner.queues.push(queue);
            }

            info!(
                store = %store.name,
                queues = inner.queues.len(),
                next_id = ?inner.ids.next,
                "Seeded store"
            );
        }
        Ok(store)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> StoreSettings {
        self.settings
    }

    pub fn state(&self) -> StoreState {
        self.inner.read().state
    }

    pub fn is_open(&self) -> bool {
        self.state() == StoreState::Open
    }

    /// Mark the store open; idempotent
    pub fn open(&self) -> &Self {
        let mut inner = self.inner.write();
        if inner.state != StoreState::Open {
            info!(store = %self.name, "Opening store");
            inner.state = StoreState::Open;
        }
        self
    }

    /// Mark the store closed; idempotent, keeps all data
    pub fn close(&self) {
        let mut inner = self.inner.write();
        if inner.state != StoreState::Closed {
            info!(store = %self.name, "Closing store");
            inner.state = StoreState::Closed;
        }
    }

    fn check_open(&self, inner: &StoreInner) -> Result<(), QueueError> {
        if self.settings.reject_when_closed && inner.state == StoreState::Closed {
            return Err(QueueError::StoreClosed(self.name.clone()));
        }
        Ok(())
    }

    pub fn create_queue(&self, name: &str, options: QueueOptions) -> Result<(), QueueError> {
        let mut inner = self.inner.write();
        self.check_open(&inner)?;

        if inner.queues.iter().any(|q| q.name == name) {
            return Err(QueueError::DuplicateQueue(name.to_string()));
        }

        info!(
            store = %self.name,
            queue = %name,
            ordering = ?options.ordering_mode,
            auto_delete = options.auto_delete,
            "Creating queue"
        );
        inner.queues.push(Queue::new(name.to_string(), options));
        Ok(())
    }

    pub fn delete_queue(&self, name: &str) -> Result<(), QueueError> {
        let mut inner = self.inner.write();
        self.check_open(&inner)?;
        inner.queue(name)?;

        info!(store = %self.name, queue = %name, "Deleting queue");
        inner.queues.retain(|q| q.name != name);
        Ok(())
    }

    /// Remove every item, keeping the queue and its options
    pub fn purge_queue(&self, name: &str) -> Result<(), QueueError> {
        let mut inner = self.inner.write();
        self.check_open(&inner)?;
        let queue = inner.queue_mut(name)?;

        info!(store = %self.name, queue = %name, purged = queue.items.len(), "Purging queue");
        queue.items.clear();
        Ok(())
    }

    /// Queue names in creation order
    pub fn get_queues(&self) -> Vec<String> {
        self.inner.read().queues.iter().map(|q| q.name.clone()).collect()
    }

    /// Append messages at the tail, returning their new ids in input order
    pub fn send<I, M>(&self, name: &str, messages: I) -> Result<Vec<String>, QueueError>
    where
        I: IntoIterator<Item = M>,
        M: Into<Value>,
    {
        let messages: Vec<Value> = messages.into_iter().map(Into::into).collect();

        let mut inner = self.inner.write();
        self.check_open(&inner)?;
        inner.queue(name)?;

        let ids = inner
            .ids
            .allocate_many(messages.len())
            .ok_or_else(|| QueueError::IdsExhausted(self.name.clone()))?;
        let batch = ids
            .iter()
            .cloned()
            .zip(messages)
            .map(|(id, message)| Item::new(id, message));

        inner.queue_mut(name)?.items.extend(batch);

        debug!(store = %self.name, queue = %name, ids = ?ids, "Sent messages");
        Ok(ids)
    }

    pub fn send_one(&self, name: &str, message: impl Into<Value>) -> Result<String, QueueError> {
        let mut ids = self.send(name, [message.into()])?;
        Ok(ids.remove(0))
    }

    /// Take up to `count` eligible items
    ///
    /// Auto-delete queues drop the returned items; read-tracking queues keep
    /// them and mark them read. LIFO queues return newest first.
    pub fn receive(
        &self,
        name: &str,
        count: usize,
        options: ReceiveOptions,
    ) -> Result<Vec<Item>, QueueError> {
        let mut inner = self.inner.write();
        self.check_open(&inner)?;
        let queue = inner.queue_mut(name)?;

        let items = queue.receive(count, options);
        debug!(
            store = %self.name,
            queue = %name,
            count = items.len(),
            auto_delete = queue.options.auto_delete,
            "Received messages"
        );
        Ok(items)
    }

    /// Same selection as `receive` without touching storage
    pub fn peek(
        &self,
        name: &str,
        count: usize,
        options: ReceiveOptions,
    ) -> Result<Vec<ItemMeta>, QueueError> {
        let inner = self.inner.read();
        self.check_open(&inner)?;
        Ok(inner.queue(name)?.peek(count, options))
    }

    /// Items whose id is requested, in storage order; unknown ids are skipped
    pub fn get_messages<I, S>(&self, name: &str, ids: I) -> Result<Vec<Item>, QueueError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wanted: HashSet<String> = ids.into_iter().map(|id| id.as_ref().to_string()).collect();

        let inner = self.inner.read();
        self.check_open(&inner)?;
        Ok(inner
            .queue(name)?
            .items
            .iter()
            .filter(|item| wanted.contains(&item.id))
            .cloned()
            .collect())
    }

    pub fn remove_messages<I, S>(&self, name: &str, ids: I) -> Result<(), QueueError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let doomed: HashSet<String> = ids.into_iter().map(|id| id.as_ref().to_string()).collect();

        let mut inner = self.inner.write();
        self.check_open(&inner)?;
        let queue = inner.queue_mut(name)?;

        let before = queue.items.len();
        queue.items.retain(|item| !doomed.contains(&item.id));

        debug!(
            store = %self.name,
            queue = %name,
            removed = before - queue.items.len(),
            "Removed messages"
        );
        Ok(())
    }

    /// Raw copy of every queue, for verification in tests only
    #[doc(hidden)]
    pub fn snapshot(&self) -> Vec<Queue> {
        self.inner.read().queues.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_allocator_sequence() {
        let mut ids = IdAllocator::default();
        assert_eq!(ids.allocate().as_deref(), Some("0"));
        assert_eq!(ids.allocate_many(2), Some(vec!["1".to_string(), "2".to_string()]));
        assert_eq!(ids.allocate_many(0), Some(Vec::new()));
        assert_eq!(ids.allocate().as_deref(), Some("3"));
    }

    #[test]
    fn test_id_allocator_skips_observed_ids() {
        let mut ids = IdAllocator::default();
        ids.observe("13");
        ids.observe("abc");
        ids.observe("2");
        assert_eq!(ids.allocate().as_deref(), Some("14"));
    }

    #[test]
    fn test_id_allocator_stops_at_u64_max() {
        let mut ids = IdAllocator::default();
        ids.observe(&(u64::MAX - 1).to_string());

        assert!(ids.allocate_many(2).is_none());
        assert_eq!(ids.allocate().as_deref(), Some(u64::MAX.to_string().as_str()));
        assert!(ids.allocate().is_none());
        assert!(ids.allocate_many(1).is_none());

        let mut ids = IdAllocator::default();
        ids.observe(&u64::MAX.to_string());
        assert!(ids.allocate().is_none());
        ids.observe("5");
        assert!(ids.allocate().is_none());
    }

    #[test]
    fn test_error_envelope_conversion() {
        let envelope: QueueStackError = QueueError::QueueNotFound("zips".to_string()).into();
        assert_eq!(envelope.code, ErrorCode::QueueNotFound);
        assert_eq!(envelope.resource.as_deref(), Some("zips"));
        assert_eq!(envelope.message, "The queue zips was not found.");

        let envelope: QueueStackError = QueueError::InvalidSeed("bad".to_string()).into();
        assert_eq!(envelope.code, ErrorCode::InvalidSeed);
        assert!(envelope.resource.is_none());

        let envelope: QueueStackError = QueueError::IdsExhausted("testdb".to_string()).into();
        assert_eq!(envelope.code, ErrorCode::IdsExhausted);
        assert_eq!(envelope.resource.as_deref(), Some("testdb"));
    }

    #[test]
    fn test_select_skips_read_items_when_tracking() {
        let mut queue = Queue::new("q".to_string(), QueueOptions::fifo().with_auto_delete(false));
        for (i, read) in [true, false, true, false].into_iter().enumerate() {
            let mut item = Item::new(i.to_string(), Value::from(i));
            item.read = read;
            queue.items.push_back(item);
        }

        assert_eq!(queue.select(10, ReceiveOptions::default()), vec![1, 3]);
        assert_eq!(queue.select(10, ReceiveOptions::include_read()), vec![0, 1, 2, 3]);
        assert_eq!(queue.select(0, ReceiveOptions::include_read()), Vec::<usize>::new());
    }
}
