//! Server initialization utilities
//!
//! Tracing setup and the `serve_stdio!` macro for consistent MCP server
//! startup across the `mcps/` crates.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for an MCP server.
///
/// Logs go to stderr because stdout carries the MCP protocol. Filtering is
/// controlled via `RUST_LOG`, defaulting to `info` for the given crate.
/// Set `LOG_FORMAT=json` for structured output.
pub fn init_tracing(crate_name: &str) -> anyhow::Result<()> {
    let directive = format!("{}=info", crate_name);
    let filter = EnvFilter::from_default_env().add_directive(directive.parse()?);

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);

    if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .init();
    }

    Ok(())
}

/// Expand to a complete `#[tokio::main] async fn main()` for an MCP server.
///
/// Initializes tracing to stderr, constructs the server with `::new()`,
/// serves it over the stdio transport, and waits for shutdown.
///
/// ```rust,ignore
/// use mcp_common::serve_stdio;
///
/// mod server;
/// use server::WeatherMcpServer;
///
/// serve_stdio!(WeatherMcpServer, "weather_mcp");
/// ```
#[macro_export]
macro_rules! serve_stdio {
    ($server_type:ty, $crate_name:expr) => {
        #[tokio::main]
        async fn main() -> anyhow::Result<()> {
            use rmcp::ServiceExt;

            $crate::init_tracing($crate_name)?;

            tracing::info!(concat!("Starting ", $crate_name, " MCP server"));

            let server = <$server_type>::new();
            let service = server.serve(rmcp::transport::stdio()).await?;

            service.waiting().await?;

            tracing::info!("Server shutting down");
            Ok(())
        }
    };
}
