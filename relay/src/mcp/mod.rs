//! MCP orchestration core
//!
//! Spawns the configured tool servers, aggregates their tools into one
//! qualified namespace, and dispatches calls to the owning server with
//! bounded retry.

pub mod catalog;
pub mod connection;
pub mod orchestrator;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{qualify, split_qualified, ToolCatalog, ToolSpec};
pub use connection::{ConnectionState, ServerConnection};
pub use orchestrator::{Orchestrator, ERROR_MARKER};
pub use transport::{
    ChildProcessFactory, DiscoveredTool, ToolTransport, TransportError, TransportFactory,
};
