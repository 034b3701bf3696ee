//! Error taxonomy for the relay core
//!
//! Whether a failure may be retried is a property of the variant, not of the
//! message text: the retry loop in `mcp::connection` consults
//! [`RelayError::is_recoverable`] and nothing else.

use thiserror::Error;

/// Errors surfaced by the orchestration core and its collaborators.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Missing or invalid configuration, detected before any subprocess runs.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The transport to a server failed to open.
    #[error("failed to connect to server '{server}': {reason}")]
    Connection { server: String, reason: String },

    /// An operation that requires a Ready connection ran against one that
    /// never initialized.
    #[error("server '{server}' is not initialized")]
    NotInitialized { server: String },

    /// The connection existed but is closed, torn down, or otherwise gone.
    /// Never retried.
    #[error("server '{server}' is unavailable: {reason}")]
    Unavailable { server: String, reason: String },

    /// A tool invocation failed in a way that may be transient. Retried up
    /// to the configured bound.
    #[error("tool '{tool}' failed on server '{server}': {reason}")]
    ToolCall {
        server: String,
        tool: String,
        reason: String,
    },

    /// The chat-completions API rejected or failed a request.
    #[error("LLM request failed: {0}")]
    Llm(String),
}

impl RelayError {
    /// Whether the retry loop may attempt the operation again.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RelayError::ToolCall { .. })
    }
}
