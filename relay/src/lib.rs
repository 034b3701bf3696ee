//! MCP multi-server chat relay
//!
//! Connects to subprocess-backed MCP servers, aggregates their tools into a
//! single qualified namespace, and drives an LLM function-calling loop that
//! dispatches tool calls back to the owning server.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod mcp;
pub mod web;
