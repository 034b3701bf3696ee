//! Conversation service
//!
//! Drives the tool-calling loop: send history + tool catalog to the model,
//! execute any requested tools in order, feed the results back, repeat until
//! the model stops asking (or the round limit trips). One failing tool or a
//! failed LLM round never escapes as an error; the turn always produces a
//! reply.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::config::ServersConfig;
use crate::error::RelayError;
use crate::llm::{ChatApi, ChatMessage, FinishReason, LlmConfigSummary, LlmReply, ToolCallRequest};
use crate::mcp::{Orchestrator, ToolSpec, ERROR_MARKER};

use super::sessions::SessionStore;

/// The outcome of one chat turn, in response shape.
#[derive(Debug, Serialize)]
pub struct ChatOutcome {
    pub reply: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub tool_calls: Vec<ToolCallSummary>,
    pub message_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ToolCallSummary {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Snapshot for the status and health endpoints.
#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub initialized: bool,
    pub mcp_servers: HashMap<String, String>,
    pub llm: LlmConfigSummary,
    pub active_sessions: usize,
    pub available_tools: usize,
}

pub struct ChatService {
    orchestrator: RwLock<Orchestrator>,
    llm: Arc<dyn ChatApi>,
    llm_summary: LlmConfigSummary,
    sessions: Mutex<SessionStore>,
    max_tool_rounds: usize,
    history_window: usize,
    initialized: AtomicBool,
}

impl ChatService {
    pub fn new(
        orchestrator: Orchestrator,
        llm: Arc<dyn ChatApi>,
        llm_summary: LlmConfigSummary,
        max_tool_rounds: usize,
        history_window: usize,
    ) -> Self {
        Self {
            orchestrator: RwLock::new(orchestrator),
            llm,
            llm_summary,
            sessions: Mutex::new(SessionStore::new()),
            max_tool_rounds,
            history_window,
            initialized: AtomicBool::new(false),
        }
    }

    /// Connect the configured servers and verify the LLM endpoint. Idempotent.
    ///
    /// Startup is fail-fast: the first server that cannot come up aborts the
    /// whole call. The caller must invoke [`ChatService::cleanup`] when this
    /// returns an error so connections opened earlier in the attempt are
    /// released.
    pub async fn initialize(&self, servers: &ServersConfig) -> Result<(), RelayError> {
        if self.initialized.load(Ordering::SeqCst) {
            return Ok(());
        }

        self.orchestrator.write().await.initialize(servers).await?;
        self.llm.probe().await?;

        self.initialized.store(true, Ordering::SeqCst);
        tracing::info!("Chat service initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Run one chat turn. Never fails: LLM errors are folded into the reply.
    pub async fn chat(&self, message: &str, session_id: Option<String>) -> ChatOutcome {
        let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut messages = self.sessions.lock().await.snapshot(&session_id);
        messages.push(ChatMessage::user(message));

        match self.chat_with_tools(&mut messages).await {
            Ok(reply) => {
                let tool_calls = summarize_tool_calls(&reply.tool_calls);
                let reply_text = reply.content.unwrap_or_default();
                messages.push(ChatMessage::assistant(reply_text.clone()));

                let message_count = {
                    let mut sessions = self.sessions.lock().await;
                    sessions.store(&session_id, messages, self.history_window);
                    sessions.message_count(&session_id)
                };

                ChatOutcome {
                    reply: reply_text,
                    session_id,
                    timestamp: Utc::now(),
                    tool_calls,
                    message_count,
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!("Chat turn failed: {}", e);
                let message_count = self.sessions.lock().await.message_count(&session_id);
                ChatOutcome {
                    reply: format!("Sorry, something went wrong handling your request: {}", e),
                    session_id,
                    timestamp: Utc::now(),
                    tool_calls: Vec::new(),
                    message_count,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// The tool-calling loop for one turn.
    ///
    /// Holds the orchestrator read lock for the duration of the turn, so the
    /// catalog and connection map cannot shift under a round.
    async fn chat_with_tools(&self, messages: &mut Vec<ChatMessage>) -> Result<LlmReply, RelayError> {
        let orchestrator = self.orchestrator.read().await;
        let tools = orchestrator.available_tools();

        let mut reply = self.llm.get_response(messages, &tools).await?;
        let mut rounds = 0;

        while reply.finish_reason.is_tool_use() && !reply.tool_calls.is_empty() {
            rounds += 1;
            if rounds > self.max_tool_rounds {
                tracing::warn!(
                    "Model kept requesting tools after {} rounds, stopping the turn",
                    self.max_tool_rounds
                );
                return Ok(LlmReply {
                    content: Some(format!(
                        "Tool-use round limit ({}) reached; giving up on this request.",
                        self.max_tool_rounds
                    )),
                    finish_reason: FinishReason::Stop,
                    tool_calls: Vec::new(),
                });
            }

            self.run_tool_round(&orchestrator, messages, &reply).await;
            reply = self.llm.get_response(messages, &tools).await?;
        }

        Ok(reply)
    }

    /// Execute one round of requested tool calls, in the order requested.
    ///
    /// Every result must be appended before the next model request goes out,
    /// so calls are dispatched sequentially, each result tagged with its
    /// originating call id.
    async fn run_tool_round(
        &self,
        orchestrator: &Orchestrator,
        messages: &mut Vec<ChatMessage>,
        reply: &LlmReply,
    ) {
        messages.push(ChatMessage::assistant_with_calls(
            reply.content.clone(),
            reply.tool_calls.clone(),
        ));

        for call in &reply.tool_calls {
            tracing::info!(tool = %call.function.name, "executing requested tool call");

            let result = match serde_json::from_str::<Value>(&call.function.arguments) {
                Ok(args) => orchestrator.call_tool(&call.function.name, args).await,
                Err(e) => format!("{} invalid tool arguments: {}", ERROR_MARKER, e),
            };

            messages.push(ChatMessage::tool(call.id.clone(), result));
        }
    }

    /// Stored history for a session, `None` when the session is unknown.
    pub async fn session_history(&self, session_id: &str) -> Option<Vec<ChatMessage>> {
        self.sessions.lock().await.history(session_id)
    }

    /// Delete a session. Reports whether it existed.
    pub async fn clear_session(&self, session_id: &str) -> bool {
        self.sessions.lock().await.clear(session_id)
    }

    /// Current tool catalog snapshot.
    pub async fn available_tools(&self) -> Vec<ToolSpec> {
        self.orchestrator.read().await.available_tools()
    }

    /// Per-server connectivity snapshot.
    pub async fn server_status(&self) -> HashMap<String, String> {
        self.orchestrator.read().await.server_status().await
    }

    pub async fn service_status(&self) -> ServiceStatus {
        let orchestrator = self.orchestrator.read().await;
        ServiceStatus {
            initialized: self.is_initialized(),
            mcp_servers: orchestrator.server_status().await,
            llm: self.llm_summary.clone(),
            active_sessions: self.sessions.lock().await.active_sessions(),
            available_tools: orchestrator.tool_count(),
        }
    }

    /// Tear everything down: server connections, catalog, sessions.
    pub async fn cleanup(&self) {
        self.orchestrator.write().await.cleanup().await;
        self.sessions.lock().await.clear_all();
        self.initialized.store(false, Ordering::SeqCst);
        tracing::info!("Chat service cleaned up");
    }
}

fn summarize_tool_calls(calls: &[ToolCallRequest]) -> Vec<ToolCallSummary> {
    calls
        .iter()
        .map(|call| ToolCallSummary {
            id: call.id.clone(),
            name: call.function.name.clone(),
            arguments: serde_json::from_str(&call.function.arguments)
                .unwrap_or_else(|_| Value::String(call.function.arguments.clone())),
        })
        .collect()
}
