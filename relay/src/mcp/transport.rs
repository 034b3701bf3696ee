//! Transport seam over the MCP client session
//!
//! The wire protocol itself is rmcp's problem; this module reduces a session
//! to the four primitives the orchestration core needs (connect, list tools,
//! call tool, close) behind a trait so connection logic can be exercised
//! against scripted in-memory transports.

use std::sync::Arc;

use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParam, RawContent},
    service::RunningService,
    transport::TokioChildProcess,
    RoleClient, ServiceExt,
};
use serde_json::Value;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Mutex;

use crate::config::ServerConfig;

/// Transport-level failures, classified by variant.
///
/// `Closed` means the session is gone and a retry cannot help; everything
/// else lands in `Call` and may be transient.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is closed")]
    Closed,
    #[error("{0}")]
    Call(String),
}

/// A tool as reported by a server, before qualification.
#[derive(Debug, Clone)]
pub struct DiscoveredTool {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Option<Value>,
}

/// One bidirectional request/response channel to a tool server.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<DiscoveredTool>, TransportError>;

    /// Invoke a tool and flatten its content to text.
    async fn call_tool(&self, tool: &str, args: Value) -> Result<String, TransportError>;

    /// Close the session. Closing an already-closed transport is a no-op.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Opens transports for server configs.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn connect(
        &self,
        server: &str,
        config: &ServerConfig,
    ) -> Result<Arc<dyn ToolTransport>, TransportError>;
}

// ============================================================================
// Child-process transport (production)
// ============================================================================

/// Spawns each server as a subprocess and speaks MCP over its stdio.
pub struct ChildProcessFactory;

#[async_trait]
impl TransportFactory for ChildProcessFactory {
    async fn connect(
        &self,
        server: &str,
        config: &ServerConfig,
    ) -> Result<Arc<dyn ToolTransport>, TransportError> {
        tracing::debug!("Spawning MCP server: {}", server);

        let mut cmd = Command::new(&config.command);
        if !config.args.is_empty() {
            cmd.args(&config.args);
        }
        for (key, value) in &config.env {
            let expanded = shellexpand::env(value).unwrap_or_else(|_| value.clone().into());
            cmd.env(key, expanded.as_ref());
        }

        let transport =
            TokioChildProcess::new(cmd).map_err(|e| TransportError::Call(e.to_string()))?;
        let service = ()
            .serve(transport)
            .await
            .map_err(|e| TransportError::Call(e.to_string()))?;

        Ok(Arc::new(ChildProcessTransport {
            service: Mutex::new(Some(service)),
        }))
    }
}

struct ChildProcessTransport {
    service: Mutex<Option<RunningService<RoleClient, ()>>>,
}

#[async_trait]
impl ToolTransport for ChildProcessTransport {
    async fn list_tools(&self) -> Result<Vec<DiscoveredTool>, TransportError> {
        let guard = self.service.lock().await;
        let service = guard.as_ref().ok_or(TransportError::Closed)?;

        let response = service
            .list_tools(Default::default())
            .await
            .map_err(|e| TransportError::Call(e.to_string()))?;

        Ok(response
            .tools
            .into_iter()
            .map(|t| DiscoveredTool {
                name: t.name.to_string(),
                description: t.description.map(|d| d.to_string()),
                input_schema: Some(serde_json::to_value(&t.input_schema).unwrap_or_default()),
            })
            .collect())
    }

    async fn call_tool(&self, tool: &str, args: Value) -> Result<String, TransportError> {
        let guard = self.service.lock().await;
        let service = guard.as_ref().ok_or(TransportError::Closed)?;

        let arguments = args.as_object().cloned();
        let result = service
            .call_tool(CallToolRequestParam {
                name: tool.to_string().into(),
                arguments,
                task: None,
            })
            .await
            .map_err(|e| TransportError::Call(e.to_string()))?;

        let mut output = String::new();
        for content in &result.content {
            match &content.raw {
                RawContent::Text(text) => {
                    if !output.is_empty() {
                        output.push('\n');
                    }
                    output.push_str(&text.text);
                }
                other => {
                    if !output.is_empty() {
                        output.push('\n');
                    }
                    output.push_str(&format!("{:?}", other));
                }
            }
        }

        if result.is_error.unwrap_or(false) {
            return Err(TransportError::Call(output));
        }

        Ok(output)
    }

    async fn close(&self) -> Result<(), TransportError> {
        let service = self.service.lock().await.take();
        match service {
            Some(service) => service
                .cancel()
                .await
                .map(|_| ())
                .map_err(|e| TransportError::Call(e.to_string())),
            None => Ok(()),
        }
    }
}
