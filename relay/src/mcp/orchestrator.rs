//! Multi-server orchestration
//!
//! Owns the set of server connections and the aggregated tool catalog.
//! Initialization is sequential and fail-fast; tool dispatch routes through
//! qualified names and always comes back as text; cleanup fans out
//! concurrently under timeouts.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::config::ServersConfig;
use crate::error::RelayError;

use super::catalog::{split_qualified, ToolCatalog, ToolSpec};
use super::connection::ServerConnection;
use super::transport::{ChildProcessFactory, DiscoveredTool, TransportFactory};

/// Fixed marker prefixing every failure text returned by [`Orchestrator::call_tool`].
pub const ERROR_MARKER: &str = "Error:";

/// Per-connection teardown budget during cleanup fan-out.
const SERVER_CLEANUP_TIMEOUT: Duration = Duration::from_secs(3);

/// Overall cleanup budget; stragglers past this are cancelled.
const CLEANUP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Orchestrator {
    factory: Arc<dyn TransportFactory>,
    connections: HashMap<String, Arc<ServerConnection>>,
    tools_by_server: HashMap<String, Vec<DiscoveredTool>>,
    catalog: ToolCatalog,
    initialized: bool,
}

impl Orchestrator {
    /// Orchestrator over real child-process servers.
    pub fn new() -> Self {
        Self::with_transport_factory(Arc::new(ChildProcessFactory))
    }

    pub fn with_transport_factory(factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            factory,
            connections: HashMap::new(),
            tools_by_server: HashMap::new(),
            catalog: ToolCatalog::new(),
            initialized: false,
        }
    }

    /// Connect every configured server and aggregate their tools. Idempotent.
    ///
    /// Servers start sequentially in config order. The first failure aborts
    /// the whole operation and propagates; connections created earlier in the
    /// same call stay as constructed and the caller is expected to invoke
    /// [`Orchestrator::cleanup`] so they do not leak. The catalog is only
    /// installed when every server came up.
    pub async fn initialize(&mut self, config: &ServersConfig) -> Result<(), RelayError> {
        if self.initialized {
            return Ok(());
        }

        let mut catalog = ToolCatalog::new();
        let mut tools_by_server = HashMap::new();

        for (name, server_config) in &config.mcp_servers {
            server_config.validate(name)?;

            let connection = Arc::new(ServerConnection::new(
                name,
                server_config.clone(),
                self.factory.clone(),
            ));
            self.connections.insert(name.clone(), connection.clone());

            connection.initialize().await?;
            let tools = connection.list_tools().await?;

            for tool in &tools {
                catalog.insert(name, tool);
            }
            tools_by_server.insert(name.clone(), tools);
        }

        self.catalog = catalog;
        self.tools_by_server = tools_by_server;
        self.initialized = true;

        tracing::info!(
            "Connected to {} MCP server(s): {}",
            self.connections.len(),
            self.connections
                .keys()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );
        tracing::info!(
            "Aggregated {} tool(s): {}",
            self.catalog.len(),
            self.catalog.names().collect::<Vec<_>>().join(", ")
        );

        Ok(())
    }

    /// Wire-ready snapshot of the catalog. Pure read, never touches a
    /// subprocess.
    pub fn available_tools(&self) -> Vec<ToolSpec> {
        self.catalog.specs()
    }

    pub fn tool_count(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Route a qualified tool call to its owning server.
    ///
    /// Always returns text: success output, or a failure description prefixed
    /// with [`ERROR_MARKER`]. One failing tool must not abort the enclosing
    /// conversation turn, so nothing escapes as an `Err`.
    pub async fn call_tool(&self, qualified: &str, args: Value) -> String {
        let Some((server, tool)) = split_qualified(qualified) else {
            return format!("{} invalid tool name '{}'", ERROR_MARKER, qualified);
        };

        let Some(connection) = self.connections.get(server) else {
            return format!("{} server not found: '{}'", ERROR_MARKER, server);
        };

        if !connection.is_ready().await {
            return format!("{} server '{}' is unavailable", ERROR_MARKER, server);
        }

        match connection.execute_tool(tool, args).await {
            Ok(output) if output.is_empty() => "tool executed with no output".to_string(),
            Ok(output) => output,
            Err(e) => format!("{} tool call failed: {}", ERROR_MARKER, e),
        }
    }

    /// Per-server connectivity snapshot.
    pub async fn server_status(&self) -> HashMap<String, String> {
        let mut status = HashMap::new();
        for (name, connection) in &self.connections {
            let label = if connection.is_ready().await {
                "connected"
            } else {
                "disconnected"
            };
            status.insert(name.clone(), label.to_string());
        }
        status
    }

    /// Tear down every connection concurrently, then reset to the
    /// not-initialized state. Idempotent.
    ///
    /// Each connection gets its own teardown timeout; the whole fan-out gets
    /// an overall one. Stragglers past the overall timeout are cancelled and
    /// awaited. The maps and catalog are cleared no matter what happened.
    pub async fn cleanup(&mut self) {
        if self.connections.is_empty() {
            self.catalog = ToolCatalog::new();
            self.initialized = false;
            return;
        }

        tracing::info!("Cleaning up {} MCP server connection(s)", self.connections.len());

        let mut handles = Vec::new();
        for (name, connection) in &self.connections {
            let name = name.clone();
            let connection = connection.clone();
            handles.push(tokio::spawn(async move {
                match tokio::time::timeout(SERVER_CLEANUP_TIMEOUT, connection.cleanup()).await {
                    Ok(()) => tracing::debug!(server = %name, "connection cleaned up"),
                    Err(_) => tracing::info!(server = %name, "connection cleanup timed out"),
                }
            }));
        }

        let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();
        let mut all = futures_util::future::join_all(handles);

        if tokio::time::timeout(CLEANUP_TIMEOUT, &mut all).await.is_err() {
            tracing::info!("Cleanup fan-out timed out, cancelling stragglers");
            for abort in aborts {
                abort.abort();
            }
            all.await;
        }

        self.connections.clear();
        self.tools_by_server.clear();
        self.catalog = ToolCatalog::new();
        self.initialized = false;

        tracing::info!("Orchestrator cleanup complete");
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}
