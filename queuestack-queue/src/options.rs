//! Queue, receive and store settings

use serde::{Deserialize, Serialize};

/// Which end of a queue `receive` and `peek` draw from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderingMode {
    /// Oldest first
    #[default]
    #[serde(alias = "FIFO")]
    Fifo,
    /// Newest first
    #[serde(alias = "LIFO")]
    Lifo,
}

/// Per-queue options, fixed at creation
///
/// Defaults to FIFO ordering with destructive receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueOptions {
    #[serde(alias = "ordering_mode", alias = "orderingmode")]
    pub ordering_mode: OrderingMode,
    /// `true`: `receive` removes items. `false`: `receive` marks them read.
    #[serde(alias = "auto_delete", alias = "autodelete")]
    pub auto_delete: bool,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            ordering_mode: OrderingMode::Fifo,
            auto_delete: true,
        }
    }
}

impl QueueOptions {
    pub fn fifo() -> Self {
        Self::default()
    }

    pub fn lifo() -> Self {
        Self {
            ordering_mode: OrderingMode::Lifo,
            ..Self::default()
        }
    }

    pub fn with_auto_delete(mut self, auto_delete: bool) -> Self {
        self.auto_delete = auto_delete;
        self
    }
}

/// Options for `receive` and `peek`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiveOptions {
    /// Also consider items already marked read (read-tracking queues only)
    #[serde(rename = "read")]
    pub include_read: bool,
}

impl ReceiveOptions {
    pub fn include_read() -> Self {
        Self { include_read: true }
    }
}

/// Store-wide behaviour switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Fail queue operations with `StoreClosed` while the store is closed
    pub reject_when_closed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_options_defaults() {
        let options = QueueOptions::default();
        assert_eq!(options.ordering_mode, OrderingMode::Fifo);
        assert!(options.auto_delete);
    }

    #[test]
    fn test_queue_options_deserialize_partial() {
        let options: QueueOptions = serde_json::from_str(r#"{"orderingMode": "lifo"}"#).unwrap();
        assert_eq!(options, QueueOptions::lifo());

        let options: QueueOptions = serde_json::from_str(r#"{"autoDelete": false}"#).unwrap();
        assert_eq!(options, QueueOptions::fifo().with_auto_delete(false));

        let options: QueueOptions = serde_json::from_str(r#"{"orderingMode": "LIFO"}"#).unwrap();
        assert_eq!(options.ordering_mode, OrderingMode::Lifo);

        let options: QueueOptions =
            serde_json::from_str(r#"{"ordering_mode": "lifo", "auto_delete": false}"#).unwrap();
        assert_eq!(options, QueueOptions::lifo().with_auto_delete(false));
    }

    #[test]
    fn test_queue_options_reject_unknown_mode() {
        let result: Result<QueueOptions, _> = serde_json::from_str(r#"{"orderingMode": "random"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_receive_options() {
        let options: ReceiveOptions = serde_json::from_str(r#"{"read": true}"#).unwrap();
        assert_eq!(options, ReceiveOptions::include_read());
        assert!(!ReceiveOptions::default().include_read);
    }
}
