//! Result helpers for MCP tool responses

use rmcp::{
    model::{CallToolResult, Content},
    ErrorData as McpError,
};
use serde::Serialize;

/// Build a successful plain-text response.
///
/// The relay's tool servers report both outcomes and user-facing failures
/// (bad city name, missing API key) as text so the calling model can read
/// them; protocol-level `McpError`s are reserved for malformed requests.
pub fn text_success(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

/// Build a successful JSON response from any serializable value.
pub fn json_success<T: Serialize>(data: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        name: String,
        value: i32,
    }

    #[test]
    fn text_success_is_not_error() {
        let result = text_success("done");
        assert!(!result.is_error.unwrap_or(false));
        assert_eq!(result.content.len(), 1);
    }

    #[test]
    fn json_success_serializes() {
        let data = Sample {
            name: "t".to_string(),
            value: 7,
        };
        let result = json_success(&data).unwrap();
        assert!(!result.is_error.unwrap_or(false));
    }
}
