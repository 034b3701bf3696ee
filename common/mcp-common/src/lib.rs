//! Shared glue for the relay's MCP servers.
//!
//! Every tool server in `mcps/` speaks MCP over stdio and logs to stderr.
//! This crate keeps the per-server boilerplate down to one line:
//!
//! - `serve_stdio!` expands to a complete `main` (tracing setup, server
//!   construction, stdio transport, shutdown wait)
//! - [`init_tracing`] configures stderr logging (stdout belongs to the
//!   protocol)
//! - [`text_success`] / [`json_success`] build tool responses

pub mod init;
pub mod result;

pub use init::init_tracing;
pub use result::{json_success, text_success};

// Re-export the rmcp types servers touch directly
pub use rmcp::{
    model::{CallToolResult, Content},
    ErrorData as McpError,
};
