// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime WebSocket feed, one socket per conversation.
//!
//! Server -> Client (JSON):
//! ```json
//! {"event": "SUBSCRIBED", "conversation_id": "..."}
//! {"event": "INSERT", "table": "messages", "record": {...}}
//! ```
//!
//! `SUBSCRIBED` is sent once the feed subscription exists, so every insert
//! committed after the client sees it will be delivered. Client frames other
//! than close are ignored.

use axum::{
    extract::{
        Path, Query, State,
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::{self, error::RecvError};

use contactdesk_core::RealtimeFrame;
use contactdesk_core::types::Message;

use crate::error::ApiError;
use crate::server::GatewayState;

#[derive(Debug, Default, Deserialize)]
pub struct RealtimeParams {
    #[serde(default)]
    pub token: Option<String>,
}

/// GET /api/realtime/conversations/{id}
///
/// Authenticated during the handshake, not by the API middleware.
pub async fn realtime_handler(
    ws: WebSocketUpgrade,
    Path(conversation_id): Path<String>,
    Query(params): Query<RealtimeParams>,
    headers: HeaderMap,
    State(state): State<GatewayState>,
) -> Response {
    if !state.auth.accepts(&headers, params.token.as_deref()) {
        return ApiError::unauthorized("missing or invalid bearer token").into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state, conversation_id))
}

fn encode(frame: &RealtimeFrame) -> Option<WsMessage> {
    match serde_json::to_string(frame) {
        Ok(text) => Some(WsMessage::Text(text.into())),
        Err(e) => {
            tracing::warn!("failed to encode realtime frame: {e}");
            None
        }
    }
}

async fn handle_socket(socket: WebSocket, state: GatewayState, conversation_id: String) {
    let feed = state.service.feed();
    let inserts = feed.subscribe(&conversation_id);
    // `forward` owns the receiver, so it is gone by the time this returns.
    forward(socket, inserts, &conversation_id).await;
    if feed.prune(&conversation_id) {
        tracing::trace!(%conversation_id, "released realtime topic");
    }
}

async fn forward(
    socket: WebSocket,
    mut inserts: broadcast::Receiver<Message>,
    conversation_id: &str,
) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let subscribed = RealtimeFrame::Subscribed {
        conversation_id: conversation_id.to_string(),
    };
    let Some(frame) = encode(&subscribed) else {
        return;
    };
    if ws_sender.send(frame).await.is_err() {
        return;
    }
    tracing::debug!(%conversation_id, "realtime subscriber attached");

    let topic = conversation_id.to_string();
    let mut sender_task = tokio::spawn(async move {
        loop {
            match inserts.recv().await {
                Ok(message) => {
                    let Some(frame) = encode(&RealtimeFrame::message_insert(message)) else {
                        continue;
                    };
                    if ws_sender.send(frame).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(conversation_id = %topic, skipped, "realtime subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut receiver_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            if let WsMessage::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut sender_task => receiver_task.abort(),
        _ = &mut receiver_task => {
            sender_task.abort();
            // Wait for the aborted task to drop its feed receiver.
            let _ = sender_task.await;
        }
    }
    tracing::debug!(%conversation_id, "realtime subscriber detached");
}
