//! Error codes and the JSON error envelope

use serde::Serialize;
use thiserror::Error;

/// Error codes surfaced by QueueStack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Name resolution
    QueueNotFound,
    StoreNotFound,

    // Conflicts
    DuplicateQueue,
    StoreClosed,

    // Capacity
    IdsExhausted,

    // Input
    InvalidSeed,
    ValidationError,

    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QueueNotFound => "QueueNotFound",
            Self::StoreNotFound => "StoreNotFound",
            Self::DuplicateQueue => "DuplicateQueue",
            Self::StoreClosed => "StoreClosed",
            Self::IdsExhausted => "IdsExhausted",
            Self::InvalidSeed => "InvalidSeed",
            Self::ValidationError => "ValidationError",
            Self::InternalError => "InternalError",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error envelope returned to callers outside the engine
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct QueueStackError {
    pub code: ErrorCode,
    pub message: String,
    pub resource: Option<String>,
    pub request_id: String,
}

impl QueueStackError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            resource: None,
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// Format as a single-line JSON error
    pub fn to_json(&self) -> String {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct JsonError<'a> {
            #[serde(rename = "__type")]
            error_type: &'static str,
            message: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            resource: Option<&'a str>,
            request_id: &'a str,
        }

        let error = JsonError {
            error_type: self.code.as_str(),
            message: &self.message,
            resource: self.resource.as_deref(),
            request_id: &self.request_id,
        };

        serde_json::to_string(&error).unwrap_or_else(|_| {
            format!(
                r#"{{"__type":"{}","message":"{}"}}"#,
                self.code.as_str(),
                self.message
            )
        })
    }
}
