//! Core types and traits for QueueStack
//!
//! This crate provides common types used across all QueueStack crates.

pub mod error;
pub mod registry;
pub mod request_id;

pub use error::{ErrorCode, QueueStackError};
pub use registry::NamedStore;
pub use request_id::RequestId;
