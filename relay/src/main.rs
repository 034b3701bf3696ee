use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relay::chat::ChatService;
use relay::config::{AppFileConfig, LlmConfig, ServersConfig};
use relay::llm::{ChatApi, LlmClient};
use relay::mcp::Orchestrator;
use relay::web::{self, WebConfig};

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Web chat service whose LLM calls tools on MCP servers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to servers.json (searched for in the directory tree when omitted)
    #[arg(long, env = "RELAY_SERVERS_CONFIG", global = true)]
    servers_config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Port to listen on
        #[arg(long, env = "RELAY_PORT")]
        port: Option<u16>,
    },
    /// List the aggregated tools from all configured servers
    Tools,
    /// Call a tool directly by its qualified name
    Call {
        /// Qualified tool name (server_tool)
        tool: String,
        /// Arguments as JSON
        #[arg(long, short)]
        args: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let servers = load_servers_config(cli.servers_config.as_deref())?;

    match cli.command {
        Commands::Serve { port } => run_serve(servers, port).await,
        Commands::Tools => run_tools(servers).await,
        Commands::Call { tool, args } => run_call(servers, &tool, args).await,
    }
}

fn load_servers_config(path: Option<&Path>) -> Result<ServersConfig> {
    match path {
        Some(path) => ServersConfig::load_from_path(path)
            .with_context(|| format!("failed to load {}", path.display())),
        None => ServersConfig::load()?
            .context("no servers.json found; pass --servers-config or create one"),
    }
}

async fn run_serve(servers: ServersConfig, port: Option<u16>) -> Result<()> {
    let app_config = AppFileConfig::load()?;
    let llm_config = LlmConfig::resolve(&app_config.llm)?;

    let client = LlmClient::new(llm_config);
    let llm_summary = client.config_summary();
    let llm: Arc<dyn ChatApi> = Arc::new(client);

    let chat = Arc::new(ChatService::new(
        Orchestrator::new(),
        llm,
        llm_summary,
        app_config.chat.max_tool_rounds,
        app_config.chat.history_window,
    ));

    // Fail-fast startup: a failed attempt may have opened connections for
    // servers earlier in the config, so release them before bailing.
    if let Err(e) = chat.initialize(&servers).await {
        chat.cleanup().await;
        return Err(e.into());
    }

    let port = port.unwrap_or(app_config.http.port);
    let result = web::serve(chat.clone(), WebConfig { port }).await;

    chat.cleanup().await;
    result
}

async fn run_tools(servers: ServersConfig) -> Result<()> {
    let mut orchestrator = Orchestrator::new();
    if let Err(e) = orchestrator.initialize(&servers).await {
        orchestrator.cleanup().await;
        return Err(e.into());
    }

    for spec in orchestrator.available_tools() {
        if spec.function.description.is_empty() {
            println!("{}", spec.function.name);
        } else {
            println!("{} - {}", spec.function.name, spec.function.description);
        }
    }

    orchestrator.cleanup().await;
    Ok(())
}

async fn run_call(servers: ServersConfig, tool: &str, args: Option<String>) -> Result<()> {
    let args: serde_json::Value = match args {
        Some(s) => serde_json::from_str(&s).context("invalid JSON in --args")?,
        None => serde_json::json!({}),
    };

    let mut orchestrator = Orchestrator::new();
    if let Err(e) = orchestrator.initialize(&servers).await {
        orchestrator.cleanup().await;
        return Err(e.into());
    }

    let result = orchestrator.call_tool(tool, args).await;
    println!("{}", result);

    orchestrator.cleanup().await;
    Ok(())
}
