//! Chat-completions client
//!
//! Direct HTTP against an OpenAI-compatible endpoint (DeepSeek by default).
//! The `ChatApi` trait is the seam the conversation loop depends on, so the
//! loop can be driven by a scripted model in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::RelayError;
use crate::mcp::ToolSpec;

use super::types::{ChatMessage, FinishReason, LlmReply, ToolCallRequest};

/// The LLM collaborator: one request/response round-trip.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn get_response(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<LlmReply, RelayError>;

    /// One tool-free round-trip to confirm the endpoint and key work.
    async fn probe(&self) -> Result<(), RelayError> {
        let messages = [ChatMessage::user("connection check")];
        let reply = self.get_response(&messages, &[]).await?;
        if reply.content_text().is_empty() {
            return Err(RelayError::Llm(
                "connection check returned an empty reply".to_string(),
            ));
        }
        Ok(())
    }
}

/// Non-secret summary of the client configuration, for status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct LlmConfigSummary {
    pub model: String,
    pub base_url: String,
    pub api_key_configured: bool,
}

pub struct LlmClient {
    http: reqwest::Client,
    config: LlmConfig,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolSpec]>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<FinishReason>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallRequest>>,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config_summary(&self) -> LlmConfigSummary {
        LlmConfigSummary {
            model: self.config.model.clone(),
            base_url: self.config.base_url.clone(),
            api_key_configured: self.config.api_key.len() > 10,
        }
    }
}

#[async_trait]
impl ChatApi for LlmClient {
    async fn get_response(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<LlmReply, RelayError> {
        let request = CompletionRequest {
            model: &self.config.model,
            messages,
            tools: if tools.is_empty() { None } else { Some(tools) },
        };

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        tracing::debug!(
            model = %self.config.model,
            messages = messages.len(),
            tools = tools.len(),
            "sending chat completion request"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RelayError::Llm(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Llm(format!("API error {}: {}", status, body)));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| RelayError::Llm(format!("malformed response: {}", e)))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RelayError::Llm("response contained no choices".to_string()))?;

        Ok(LlmReply {
            content: choice.message.content,
            finish_reason: choice.finish_reason.unwrap_or(FinishReason::Stop),
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_response_parses_tool_calls() {
        let body = r#"{
            "choices": [{
                "finish_reason": "tool_calls",
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "calc_add", "arguments": "{\"a\":2,\"b\":3}"}
                    }]
                }
            }]
        }"#;

        let parsed: CompletionResponse = serde_json::from_str(body).unwrap();
        let choice = &parsed.choices[0];
        assert_eq!(choice.finish_reason, Some(FinishReason::ToolCalls));
        let calls = choice.message.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "calc_add");
    }

    #[test]
    fn completion_request_omits_empty_tools() {
        let messages = [ChatMessage::user("hi")];
        let request = CompletionRequest {
            model: "deepseek-chat",
            messages: &messages,
            tools: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("tools").is_none());
    }
}
