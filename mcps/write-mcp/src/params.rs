//! Parameter types for Write MCP tools

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct WriteFileParams {
    #[schemars(description = "Text content to write (UTF-8)")]
    pub content: String,

    #[schemars(
        description = "Directory or file path, resolved relative to the base directory. Defaults to the base directory itself."
    )]
    pub path: Option<String>,

    #[schemars(
        description = "File name to use when path is a directory; a timestamped name is generated when omitted"
    )]
    pub filename: Option<String>,

    #[serde(default)]
    #[schemars(description = "Allow replacing an existing file (default false)")]
    pub overwrite: bool,
}
