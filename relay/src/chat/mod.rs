//! Conversation loop and session storage

pub mod service;
pub mod sessions;

pub use service::{ChatOutcome, ChatService, ServiceStatus, ToolCallSummary};
pub use sessions::SessionStore;
