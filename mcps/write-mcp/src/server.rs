//! MCP server definition for the file writer tool

use mcp_common::{CallToolResult, McpError};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};

use crate::handlers;
use crate::params::WriteFileParams;

/// The Write MCP Server
#[derive(Clone)]
pub struct WriteMcpServer {
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl WriteMcpServer {
    pub fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Write text content to a file under the configured base directory and return the absolute path. Relative paths resolve against the base directory; writes outside it are refused."
    )]
    async fn write_file(
        &self,
        Parameters(params): Parameters<WriteFileParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::write_file(params).await
    }
}

#[tool_handler]
impl rmcp::ServerHandler for WriteMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Sandboxed file writer. Files land under the base directory \
                 (WRITE_BASE_DIR, default ./output); paths may not escape it."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

impl Default for WriteMcpServer {
    fn default() -> Self {
        Self::new()
    }
}
