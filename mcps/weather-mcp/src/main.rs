//! Weather MCP - current-weather lookup backed by the OpenWeather API
//!
//! Requires `OPENWEATHER_API_KEY`; `OPENWEATHER_API_BASE` overrides the
//! endpoint (useful for tests).

mod handlers;
mod params;
mod server;
mod types;

use server::WeatherMcpServer;

mcp_common::serve_stdio!(WeatherMcpServer, "weather_mcp");
