//! REST API handlers
//!
//! Thin mapping from ChatService outcomes to HTTP. Chat-turn failures ride
//! inside a 200 response (the reply text carries the apology); error statuses
//! are reserved for malformed requests and unknown sessions.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::chat::{ChatOutcome, ChatService, ServiceStatus};
use crate::llm::ChatMessage;
use crate::mcp::catalog::ToolParameters;
use crate::mcp::split_qualified;

/// Standard success envelope.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    fn json(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

/// Standard error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub message: String,
}

impl ErrorBody {
    fn json(error: impl Into<String>, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: false,
            error: error.into(),
            message: message.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub session_id: Option<String>,
}

/// POST /api/chat
pub async fn chat(
    State(chat): State<Arc<ChatService>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<Envelope<ChatOutcome>>, (StatusCode, Json<ErrorBody>)> {
    let message = req.message.as_deref().map(str::trim).unwrap_or("");
    if message.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            ErrorBody::json("message must not be empty", "provide a non-empty 'message' field"),
        ));
    }

    let outcome = chat.chat(message, req.session_id).await;
    Ok(Envelope::json(outcome))
}

#[derive(Debug, Serialize)]
pub struct HistoryData {
    pub session_id: String,
    pub history: Vec<ChatMessage>,
    pub message_count: usize,
}

/// GET /api/chat/history/{session_id}
pub async fn history(
    State(chat): State<Arc<ChatService>>,
    Path(session_id): Path<String>,
) -> Result<Json<Envelope<HistoryData>>, (StatusCode, Json<ErrorBody>)> {
    match chat.session_history(&session_id).await {
        Some(history) => Ok(Envelope::json(HistoryData {
            message_count: history.len(),
            session_id,
            history,
        })),
        None => Err((
            StatusCode::NOT_FOUND,
            ErrorBody::json("session not found", format!("no session '{}'", session_id)),
        )),
    }
}

#[derive(Debug, Serialize)]
pub struct ClearedBody {
    pub success: bool,
    pub message: String,
}

/// DELETE /api/chat/clear/{session_id}
pub async fn clear(
    State(chat): State<Arc<ChatService>>,
    Path(session_id): Path<String>,
) -> Result<Json<ClearedBody>, (StatusCode, Json<ErrorBody>)> {
    if chat.clear_session(&session_id).await {
        Ok(Json(ClearedBody {
            success: true,
            message: format!("session '{}' cleared", session_id),
        }))
    } else {
        Err((
            StatusCode::NOT_FOUND,
            ErrorBody::json("session not found", format!("no session '{}'", session_id)),
        ))
    }
}

/// GET /api/chat/status
pub async fn status(State(chat): State<Arc<ChatService>>) -> Json<Envelope<ServiceStatus>> {
    Envelope::json(chat.service_status().await)
}

#[derive(Debug, Serialize)]
pub struct ToolListing {
    pub name: String,
    pub description: String,
    pub server: String,
    pub parameters: ToolParameters,
}

#[derive(Debug, Serialize)]
pub struct ToolsData {
    pub tools: Vec<ToolListing>,
    pub count: usize,
}

/// GET /api/tools
pub async fn tools(State(chat): State<Arc<ChatService>>) -> Json<Envelope<ToolsData>> {
    let listings: Vec<ToolListing> = chat
        .available_tools()
        .await
        .into_iter()
        .map(|spec| {
            let server = split_qualified(&spec.function.name)
                .map(|(server, _)| server.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            ToolListing {
                server,
                name: spec.function.name,
                description: spec.function.description,
                parameters: spec.function.parameters,
            }
        })
        .collect();

    Envelope::json(ToolsData {
        count: listings.len(),
        tools: listings,
    })
}

#[derive(Debug, Serialize)]
pub struct ToolServersData {
    pub servers: HashMap<String, String>,
    pub total_tools: usize,
}

/// GET /api/tools/servers
pub async fn tool_servers(State(chat): State<Arc<ChatService>>) -> Json<Envelope<ToolServersData>> {
    let status = chat.service_status().await;
    Envelope::json(ToolServersData {
        servers: status.mcp_servers,
        total_tools: status.available_tools,
    })
}

#[derive(Debug, Serialize)]
pub struct HealthServices {
    pub chat_service: String,
    pub mcp_servers: HashMap<String, String>,
    pub llm_client: String,
}

#[derive(Debug, Serialize)]
pub struct HealthStats {
    pub active_sessions: usize,
    pub available_tools: usize,
    pub connected_servers: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: String,
    pub services: HealthServices,
    pub statistics: HealthStats,
}

/// GET /api/health
pub async fn health(
    State(chat): State<Arc<ChatService>>,
) -> (StatusCode, Json<Envelope<HealthData>>) {
    let status: ServiceStatus = chat.service_status().await;

    let connected_servers = status
        .mcp_servers
        .values()
        .filter(|s| s.as_str() == "connected")
        .count();
    let all_connected = connected_servers == status.mcp_servers.len();
    let healthy = status.initialized && all_connected && status.llm.api_key_configured;

    let data = HealthData {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        services: HealthServices {
            chat_service: if status.initialized {
                "initialized"
            } else {
                "not_initialized"
            }
            .to_string(),
            mcp_servers: status.mcp_servers,
            llm_client: if status.llm.api_key_configured {
                "configured"
            } else {
                "not_configured"
            }
            .to_string(),
        },
        statistics: HealthStats {
            active_sessions: status.active_sessions,
            available_tools: status.available_tools,
            connected_servers,
        },
    };

    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Envelope::json(data))
}
