//! Configuration loading
//!
//! Two files feed the relay: `servers.json` (which MCP servers to spawn, in
//! the standard `mcpServers` format) and an optional `relay.toml` for
//! application settings. LLM credentials come from the environment so they
//! never land in a config file.

use anyhow::Result;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::error::RelayError;

/// Find a config file by walking up the directory tree, then checking the
/// global config directory (`~/.config/relay/`).
fn find_config_file(filename: &str) -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let candidate = current.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_path = config_dir.join("relay").join(filename);
        if global_path.exists() {
            return Some(global_path);
        }
    }

    None
}

// ============================================================================
// MCP server configuration (servers.json)
// ============================================================================

/// The set of MCP servers to spawn, keyed by server name.
///
/// A `BTreeMap` keeps startup order deterministic, which fail-fast
/// initialization depends on.
#[derive(Debug, Clone, Deserialize)]
pub struct ServersConfig {
    #[serde(rename = "mcpServers")]
    pub mcp_servers: BTreeMap<String, ServerConfig>,
}

/// How to spawn one MCP server subprocess.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl ServerConfig {
    /// Reject configs that could never spawn, before any subprocess runs.
    pub fn validate(&self, server: &str) -> Result<(), RelayError> {
        if self.command.trim().is_empty() {
            return Err(RelayError::Config(format!(
                "server '{}' has an empty command",
                server
            )));
        }
        Ok(())
    }
}

impl ServersConfig {
    /// Load from `servers.json`, searching the directory tree then the
    /// global config directory.
    pub fn load() -> Result<Option<Self>> {
        if let Some(config_path) = find_config_file("servers.json") {
            tracing::debug!("Loading server config from: {}", config_path.display());
            return Self::load_from_path(&config_path).map(Some);
        }

        tracing::debug!("No servers.json found");
        Ok(None)
    }

    /// Load from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ServersConfig = serde_json::from_str(&content)?;
        Ok(config)
    }
}

// ============================================================================
// Application configuration (relay.toml)
// ============================================================================

/// Top-level application configuration (from `relay.toml`).
#[derive(Debug, Default, Deserialize)]
pub struct AppFileConfig {
    #[serde(default)]
    pub llm: LlmSectionConfig,
    #[serde(default)]
    pub http: HttpSectionConfig,
    #[serde(default)]
    pub chat: ChatSectionConfig,
}

/// LLM defaults; the API key is environment-only.
#[derive(Debug, Deserialize)]
pub struct LlmSectionConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
}

#[derive(Debug, Deserialize)]
pub struct HttpSectionConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct ChatSectionConfig {
    /// Upper bound on tool-use rounds within one chat turn.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
    /// Number of messages retained per session.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_base_url() -> String {
    "https://api.deepseek.com".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_max_tool_rounds() -> usize {
    8
}

fn default_history_window() -> usize {
    20
}

impl Default for LlmSectionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
        }
    }
}

impl Default for HttpSectionConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Default for ChatSectionConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            history_window: default_history_window(),
        }
    }
}

impl AppFileConfig {
    /// Load from `relay.toml`, falling back to defaults when absent.
    pub fn load() -> Result<Self> {
        if let Some(config_path) = find_config_file("relay.toml") {
            tracing::debug!("Loading config from: {}", config_path.display());
            return Self::load_from_path(&config_path);
        }

        tracing::debug!("No relay.toml found, using defaults");
        Ok(Self::default())
    }

    /// Load from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppFileConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

// ============================================================================
// Resolved LLM configuration
// ============================================================================

/// Fully resolved LLM client settings.
///
/// Resolution order for base url and model: `DEEPSEEK_BASE_URL` /
/// `DEEPSEEK_MODEL` env vars, then `relay.toml`, then built-in defaults.
/// `DEEPSEEK_API_KEY` is required.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl LlmConfig {
    pub fn resolve(file: &LlmSectionConfig) -> Result<Self, RelayError> {
        let api_key = std::env::var("DEEPSEEK_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                RelayError::Config("missing required environment variable DEEPSEEK_API_KEY".into())
            })?;

        let base_url = std::env::var("DEEPSEEK_BASE_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| file.base_url.clone());

        let model = std::env::var("DEEPSEEK_MODEL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| file.model.clone());

        Ok(Self {
            api_key,
            base_url,
            model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mcp_servers_format() {
        let json = r#"{
            "mcpServers": {
                "weather": {
                    "command": "target/debug/weather-mcp",
                    "args": [],
                    "env": {"OPENWEATHER_API_KEY": "k"}
                },
                "write": {
                    "command": "target/debug/write-mcp"
                }
            }
        }"#;

        let config: ServersConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.mcp_servers.len(), 2);

        let weather = &config.mcp_servers["weather"];
        assert_eq!(weather.command, "target/debug/weather-mcp");
        assert_eq!(weather.env["OPENWEATHER_API_KEY"], "k");

        // args and env default to empty
        let write = &config.mcp_servers["write"];
        assert!(write.args.is_empty());
        assert!(write.env.is_empty());
    }

    #[test]
    fn loads_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servers.json");
        std::fs::write(&path, r#"{"mcpServers": {"calc": {"command": "bin/calc"}}}"#).unwrap();

        let config = ServersConfig::load_from_path(&path).unwrap();
        assert_eq!(config.mcp_servers["calc"].command, "bin/calc");
    }

    #[test]
    fn server_order_is_deterministic() {
        let json = r#"{"mcpServers": {
            "zulu": {"command": "z"},
            "alpha": {"command": "a"},
            "mike": {"command": "m"}
        }}"#;

        let config: ServersConfig = serde_json::from_str(json).unwrap();
        let names: Vec<_> = config.mcp_servers.keys().cloned().collect();
        assert_eq!(names, vec!["alpha", "mike", "zulu"]);
    }

    #[test]
    fn empty_command_is_rejected() {
        let config = ServerConfig {
            command: "  ".to_string(),
            args: Vec::new(),
            env: HashMap::new(),
        };
        let err = config.validate("ghost").unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn app_config_defaults() {
        let config: AppFileConfig = toml::from_str("").unwrap();
        assert_eq!(config.http.port, 5000);
        assert_eq!(config.llm.model, "deepseek-chat");
        assert_eq!(config.chat.max_tool_rounds, 8);
        assert_eq!(config.chat.history_window, 20);
    }

    #[test]
    fn app_config_overrides() {
        let toml_src = r#"
            [http]
            port = 8080

            [chat]
            max_tool_rounds = 3
        "#;
        let config: AppFileConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.chat.max_tool_rounds, 3);
        // untouched sections keep their defaults
        assert_eq!(config.chat.history_window, 20);
        assert_eq!(config.llm.base_url, "https://api.deepseek.com");
    }
}
