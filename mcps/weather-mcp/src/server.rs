//! MCP server definition for the weather lookup tool

use mcp_common::{CallToolResult, McpError};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};

use crate::handlers;
use crate::params::QueryWeatherParams;

/// The Weather MCP Server
#[derive(Clone)]
pub struct WeatherMcpServer {
    http: reqwest::Client,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl WeatherMcpServer {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Look up the current weather for a city. City names must be in English (e.g. Beijing, Tokyo, Paris); translate non-English names before calling."
    )]
    async fn query_weather(
        &self,
        Parameters(params): Parameters<QueryWeatherParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::query_weather(&self.http, params).await
    }
}

#[tool_handler]
impl rmcp::ServerHandler for WeatherMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Current-weather lookup backed by the OpenWeather API. \
                 Requires OPENWEATHER_API_KEY in the environment."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

impl Default for WeatherMcpServer {
    fn default() -> Self {
        Self::new()
    }
}
