//! JSON-lines command runner
//!
//! Each input line is one command object tagged by `op`, for example
//! `{"op": "Send", "name": "sites", "message": ["a", "b"]}`. Each command
//! produces exactly one JSON line on the output.

use queuestack_core::{ErrorCode, QueueStackError, RequestId};
use queuestack_queue::{QueueOptions, QueueStore, ReceiveOptions};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A single value or a list of values
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(values) => values,
            Self::One(value) => vec![value],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op")]
pub enum Command {
    CreateQueue {
        name: String,
        #[serde(default)]
        options: QueueOptions,
    },
    DeleteQueue {
        name: String,
    },
    PurgeQueue {
        name: String,
    },
    GetQueues,
    Send {
        name: String,
        message: OneOrMany<Value>,
    },
    Receive {
        name: String,
        #[serde(default = "default_count")]
        count: usize,
        #[serde(default)]
        read: bool,
    },
    Peek {
        name: String,
        #[serde(default = "default_count")]
        count: usize,
        #[serde(default)]
        read: bool,
    },
    GetMessages {
        name: String,
        ids: OneOrMany<Value>,
    },
    RemoveMessages {
        name: String,
        ids: OneOrMany<Value>,
    },
    Open,
    Close,
}

impl Command {
    fn op(&self) -> &'static str {
        match self {
            Self::CreateQueue { .. } => "CreateQueue",
            Self::DeleteQueue { .. } => "DeleteQueue",
            Self::PurgeQueue { .. } => "PurgeQueue",
            Self::GetQueues => "GetQueues",
            Self::Send { .. } => "Send",
            Self::Receive { .. } => "Receive",
            Self::Peek { .. } => "Peek",
            Self::GetMessages { .. } => "GetMessages",
            Self::RemoveMessages { .. } => "RemoveMessages",
            Self::Open => "Open",
            Self::Close => "Close",
        }
    }
}

fn default_count() -> usize {
    1
}

/// Ids may be given as strings or numbers
fn id_strings(ids: OneOrMany<Value>) -> Vec<String> {
    ids.into_vec()
        .into_iter()
        .map(|id| match id {
            Value::String(id) => id,
            other => other.to_string(),
        })
        .collect()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SuccessResponse<'a> {
    request_id: &'a str,
    result: Value,
}

/// Executes commands against one store
pub struct Runner {
    store: Arc<QueueStore>,
}

impl Runner {
    pub fn new(store: Arc<QueueStore>) -> Self {
        Self { store }
    }

    /// Process every line of `input`, returning the number of commands run
    pub fn run<R: BufRead, W: Write>(&self, input: R, mut output: W) -> anyhow::Result<usize> {
        let mut processed = 0;
        for line in input.lines() {
            let line = line?;
            if let Some(response) = self.handle_line(&line) {
                writeln!(output, "{}", response)?;
                processed += 1;
            }
        }
        output.flush()?;
        Ok(processed)
    }

    /// Run one command line; blank lines yield no response
    pub fn handle_line(&self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let request_id = RequestId::new();
        let command = match serde_json::from_str::<Command>(line) {
            Ok(command) => command,
            Err(e) => {
                warn!(error = %e, "Invalid command");
                return Some(
                    QueueStackError::new(ErrorCode::ValidationError, format!("Invalid command: {}", e))
                        .with_request_id(request_id.id)
                        .to_json(),
                );
            }
        };

        info!(op = command.op(), request_id = %request_id, "Queue command");

        let response = match self.execute(command) {
            Ok(result) => serde_json::to_string(&SuccessResponse {
                request_id: &request_id.id,
                result,
            })
            .unwrap_or_else(|e| {
                QueueStackError::new(ErrorCode::InternalError, e.to_string())
                    .with_request_id(request_id.id.clone())
                    .to_json()
            }),
            Err(e) => {
                debug!(code = %e.code, message = %e.message, "Command failed");
                e.with_request_id(request_id.id).to_json()
            }
        };
        Some(response)
    }

    fn execute(&self, command: Command) -> Result<Value, QueueStackError> {
        let store = &self.store;
        let result = match command {
            Command::CreateQueue { name, options } => {
                store.create_queue(&name, options)?;
                json!(true)
            }
            Command::DeleteQueue { name } => {
                store.delete_queue(&name)?;
                json!(true)
            }
            Command::PurgeQueue { name } => {
                store.purge_queue(&name)?;
                json!(true)
            }
            Command::GetQueues => json!(store.get_queues()),
            Command::Send { name, message } => json!(store.send(&name, message.into_vec())?),
            Command::Receive { name, count, read } => {
                to_value(store.receive(&name, count, ReceiveOptions { include_read: read })?)?
            }
            Command::Peek { name, count, read } => {
                to_value(store.peek(&name, count, ReceiveOptions { include_read: read })?)?
            }
            Command::GetMessages { name, ids } => {
                to_value(store.get_messages(&name, id_strings(ids))?)?
            }
            Command::RemoveMessages { name, ids } => {
                store.remove_messages(&name, id_strings(ids))?;
                json!(true)
            }
            Command::Open => to_value(store.open().state())?,
            Command::Close => {
                store.close();
                to_value(store.state())?
            }
        };
        Ok(result)
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value, QueueStackError> {
    serde_json::to_value(value)
        .map_err(|e| QueueStackError::new(ErrorCode::InternalError, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use queuestack_queue::{QueueSeed, SeedItem, StoreSettings};

    fn runner() -> Runner {
        let store = QueueStore::from_seed(
            "testdb",
            vec![
                QueueSeed::new("sites").with_messages(["https://www.google.com", "https://www.apple.com"]),
                QueueSeed::new("zips")
                    .with_options(QueueOptions::lifo())
                    .with_item(SeedItem::new("d1").with_id(11))
                    .with_item(SeedItem::new("d2").with_id(12)),
            ],
            StoreSettings::default(),
        )
        .unwrap();
        store.open();
        Runner::new(Arc::new(store))
    }

    fn exec(runner: &Runner, line: &str) -> Value {
        serde_json::from_str(&runner.handle_line(line).unwrap()).unwrap()
    }

    #[test]
    fn test_send_and_receive() {
        let r = runner();

        let sent = exec(&r, r#"{"op": "Send", "name": "sites", "message": ["a", "b"]}"#);
        assert_eq!(sent["result"], json!(["13", "14"]));
        assert!(sent["requestId"].is_string());

        let one = exec(&r, r#"{"op": "Send", "name": "sites", "message": {"k": 1}}"#);
        assert_eq!(one["result"], json!(["15"]));

        let received = exec(&r, r#"{"op": "Receive", "name": "zips", "count": 2}"#);
        let messages: Vec<&Value> = received["result"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| &item["message"])
            .collect();
        assert_eq!(messages, vec![&json!("d2"), &json!("d1")]);
    }

    #[test]
    fn test_peek_and_get_messages() {
        let r = runner();

        let peeked = exec(&r, r#"{"op": "Peek", "name": "sites"}"#);
        let meta = &peeked["result"][0];
        assert_eq!(meta["id"], "0");
        assert!(meta.get("message").is_none());

        let fetched = exec(&r, r#"{"op": "GetMessages", "name": "sites", "ids": [1, "0", "99"]}"#);
        assert_eq!(fetched["result"].as_array().unwrap().len(), 2);
        assert_eq!(fetched["result"][0]["id"], "0");

        let single = exec(&r, r#"{"op": "GetMessages", "name": "sites", "ids": 1}"#);
        assert_eq!(single["result"][0]["message"], "https://www.apple.com");
    }

    #[test]
    fn test_queue_management() {
        let r = runner();

        assert_eq!(exec(&r, r#"{"op": "CreateQueue", "name": "jobs", "options": {"orderingMode": "lifo"}}"#)["result"], json!(true));
        assert_eq!(exec(&r, r#"{"op": "GetQueues"}"#)["result"], json!(["sites", "zips", "jobs"]));
        assert_eq!(exec(&r, r#"{"op": "PurgeQueue", "name": "sites"}"#)["result"], json!(true));
        assert_eq!(exec(&r, r#"{"op": "DeleteQueue", "name": "zips"}"#)["result"], json!(true));
        assert_eq!(exec(&r, r#"{"op": "RemoveMessages", "name": "sites", "ids": ["0"]}"#)["result"], json!(true));
        assert_eq!(exec(&r, r#"{"op": "GetQueues"}"#)["result"], json!(["sites", "jobs"]));
    }

    #[test]
    fn test_errors_use_envelope() {
        let r = runner();

        let duplicate = exec(&r, r#"{"op": "CreateQueue", "name": "sites"}"#);
        assert_eq!(duplicate["__type"], "DuplicateQueue");
        assert_eq!(duplicate["resource"], "sites");
        assert!(duplicate["requestId"].is_string());

        let missing = exec(&r, r#"{"op": "Receive", "name": "nope"}"#);
        assert_eq!(missing["__type"], "QueueNotFound");
    }

    #[test]
    fn test_invalid_lines() {
        let r = runner();
        assert!(r.handle_line("   ").is_none());

        let bad = exec(&r, "not json");
        assert_eq!(bad["__type"], "ValidationError");

        let unknown = exec(&r, r#"{"op": "Explode"}"#);
        assert_eq!(unknown["__type"], "ValidationError");
    }

    #[test]
    fn test_open_close() {
        let r = runner();
        assert_eq!(exec(&r, r#"{"op": "Close"}"#)["result"], "CLOSED");
        assert_eq!(exec(&r, r#"{"op": "Open"}"#)["result"], "OPEN");
    }

    #[test]
    fn test_run_script() {
        let r = runner();
        let script = concat!(
            r#"{"op": "Send", "name": "sites", "message": "x"}"#,
            "\n\n",
            r#"{"op": "GetQueues"}"#,
            "\n",
            "garbage\n",
        );

        let mut output = Vec::new();
        let processed = r.run(script.as_bytes(), &mut output).unwrap();
        assert_eq!(processed, 3);

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["result"], json!(["13"]));
        assert_eq!(lines[1]["result"], json!(["sites", "zips"]));
        assert_eq!(lines[2]["__type"], "ValidationError");
    }
}
