//! In-memory queue engine for QueueStack
//!
//! Provides named queues inside a store with support for:
//! - CreateQueue, DeleteQueue, PurgeQueue, GetQueues
//! - Send, Receive, Peek, GetMessages, RemoveMessages
//! - FIFO/LIFO ordering and auto-delete or read-tracking delivery
//! - Seeding stores from JSON/TOML and a caller-owned registry

pub mod options;
pub mod registry;
pub mod seed;
mod storage;


pub use options::{OrderingMode, QueueOptions, ReceiveOptions, StoreSettings};
pub use registry::QueueRegistry;
pub use seed::{QueueSeed, SeedItem};
pub use storage::{Item, ItemMeta, Queue, QueueError, QueueStore, StoreState};
