//! LLM API client

mod client;
mod types;

pub use client::{ChatApi, LlmClient, LlmConfigSummary};
pub use types::{ChatMessage, FinishReason, FunctionCall, LlmReply, Role, ToolCallRequest};
