//! Write MCP - sandboxed file writer
//!
//! Writes text files under a base directory (`WRITE_BASE_DIR`, default
//! `./output`). Paths resolve relative to the base and may not escape it.

mod handlers;
mod params;
mod server;

use server::WriteMcpServer;

mcp_common::serve_stdio!(WriteMcpServer, "write_mcp");
