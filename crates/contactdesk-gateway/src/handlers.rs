// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the REST API.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use serde_json::{Value, json};

use contactdesk_core::types::{
    Conversation, ConversationFilter, ConversationStats, ConversationUpdate, Message,
    NewConversation, SendMessageRequest,
};

use crate::error::ApiResult;
use crate::server::GatewayState;

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" or "degraded".
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// POST /api/conversations
pub async fn create_conversation(
    State(state): State<GatewayState>,
    payload: Result<Json<NewConversation>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Conversation>)> {
    let Json(new) = payload?;
    let conversation = state.service.create_conversation(&new).await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// GET /api/conversations
pub async fn list_conversations(
    State(state): State<GatewayState>,
    Query(filter): Query<ConversationFilter>,
) -> ApiResult<Json<Vec<Conversation>>> {
    Ok(Json(state.service.list_conversations(&filter).await?))
}

/// GET /api/conversations/{id}
pub async fn get_conversation(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Conversation>> {
    Ok(Json(state.service.get_conversation(&id).await?))
}

/// PATCH /api/conversations/{id}
pub async fn update_conversation(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    payload: Result<Json<ConversationUpdate>, JsonRejection>,
) -> ApiResult<Json<Conversation>> {
    let Json(update) = payload?;
    Ok(Json(state.service.update_conversation(&id, &update).await?))
}

/// GET /api/conversations/{id}/messages
pub async fn list_messages(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Message>>> {
    Ok(Json(state.service.list_messages(&id).await?))
}

/// POST /api/conversations/{id}/escalate
pub async fn escalate_conversation(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.service.escalate(&id).await?;
    Ok(Json(json!({ "success": true })))
}

/// POST /api/messages
pub async fn send_message(
    State(state): State<GatewayState>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let Json(req) = payload?;
    let message = state.service.send_message(&req).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/stats/conversations
pub async fn conversation_stats(
    State(state): State<GatewayState>,
) -> ApiResult<Json<ConversationStats>> {
    Ok(Json(state.service.conversation_stats().await?))
}

/// GET /health
///
/// Unauthenticated. Reports 503 when the store does not answer.
pub async fn get_health(State(state): State<GatewayState>) -> impl IntoResponse {
    let uptime_secs = state.health.start_time.elapsed().as_secs();
    let (code, status) = match state.service.store().health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded")
        }
    };
    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
            uptime_secs: 42,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"version\":\"0.1.0\""));
        assert!(json.contains("\"uptime_secs\":42"));
    }
}
