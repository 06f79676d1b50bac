//! Seed definitions for building a store with initial contents
//!
//! Seeds load from JSON (a top-level array of queues) or TOML (an array of
//! `[[queues]]` tables):
//!
//! ```toml
//! [[queues]]
//! name = "zips"
//! options = { orderingMode = "lifo" }
//! items = [
//!     { message = "d1", id = 11 },
//!     { message = "d2", id = 12 },
//! ]
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::options::QueueOptions;

/// Initial definition of one queue
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueueSeed {
    pub name: String,
    #[serde(default)]
    pub options: QueueOptions,
    #[serde(default)]
    pub items: Vec<SeedItem>,
}

impl QueueSeed {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: QueueOptions::default(),
            items: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: QueueOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_item(mut self, item: SeedItem) -> Self {
        self.items.push(item);
        self
    }

    /// Add plain messages that take their ids from the store allocator
    pub fn with_messages<I, M>(mut self, messages: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<Value>,
    {
        self.items
            .extend(messages.into_iter().map(|m| SeedItem::new(m.into())));
        self
    }
}

/// Initial item; unset fields are filled in when the store is built
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeedItem {
    pub message: Value,
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub read: Option<bool>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl SeedItem {
    pub fn new(message: impl Into<Value>) -> Self {
        Self {
            message: message.into(),
            id: None,
            read: None,
            timestamp: None,
        }
    }

    pub fn with_id(mut self, id: impl ToString) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_read(mut self, read: bool) -> Self {
        self.read = Some(read);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(u64),
}

/// Ids may be written as strings or as non-negative integers
fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    }))
}

#[derive(Deserialize)]
struct SeedFile {
    #[serde(default)]
    queues: Vec<QueueSeed>,
}

/// Parse seeds from a JSON array
pub fn from_json(input: &str) -> Result<Vec<QueueSeed>, serde_json::Error> {
    serde_json::from_str(input)
}

/// Parse seeds from TOML `[[queues]]` tables
pub fn from_toml(input: &str) -> Result<Vec<QueueSeed>, toml::de::Error> {
    Ok(toml::from_str::<SeedFile>(input)?.queues)
}
