// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vapi voice assistant server messages.
//!
//! Vapi wraps every event in `{"message": {"type": ..., "call": {...}}}`.
//! Only final user transcripts become messages; the end-of-call report
//! closes the call's channel state.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
};
use serde::Deserialize;
use serde_json::{Value, json};

use contactdesk_core::types::Channel;

use super::{WebhookEvent, dispatch, non_blank};
use crate::error::{ApiError, ApiResult};
use crate::server::GatewayState;
use crate::service::InboundContact;

const SECRET_HEADER: &str = "x-vapi-secret";

#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub message: ServerMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub transcript_type: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub call: Option<Call>,
}

#[derive(Debug, Deserialize)]
pub struct Call {
    pub id: String,
    #[serde(default)]
    pub customer: Option<CallCustomer>,
}

#[derive(Debug, Deserialize)]
pub struct CallCustomer {
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// POST /webhooks/vapi
pub async fn receive(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    payload: Result<Json<Envelope>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    if let Some(secret) = state.webhooks.vapi_secret.as_deref() {
        let presented = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if presented != Some(secret) {
            tracing::warn!("rejected vapi webhook with invalid secret");
            return Err(ApiError::unauthorized("invalid vapi secret"));
        }
    }

    let Json(envelope) = payload?;
    dispatch(&state.service, normalize(envelope.message)).await?;
    Ok(Json(json!({ "received": true })))
}

pub fn normalize(message: ServerMessage) -> WebhookEvent {
    match message.kind.as_str() {
        "transcript" => transcript(message),
        "end-of-call-report" => match message.call {
            Some(call) => WebhookEvent::Ended {
                channel: Channel::Voice,
                external_ref: call.id,
            },
            None => WebhookEvent::Ignored {
                reason: "end-of-call-report without call".into(),
            },
        },
        other => WebhookEvent::Ignored {
            reason: format!("vapi message type {other}"),
        },
    }
}

fn transcript(message: ServerMessage) -> WebhookEvent {
    if message.role.as_deref() != Some("user") {
        return WebhookEvent::Ignored {
            reason: "assistant transcript".into(),
        };
    }
    if message.transcript_type.as_deref() != Some("final") {
        return WebhookEvent::Ignored {
            reason: "partial transcript".into(),
        };
    }
    let Some(call) = message.call else {
        return WebhookEvent::Ignored {
            reason: "transcript without call".into(),
        };
    };
    let (number, name) = match call.customer {
        Some(customer) => (non_blank(customer.number), non_blank(customer.name)),
        None => (None, None),
    };
    let Some(address) = number else {
        return WebhookEvent::Ignored {
            reason: "transcript without caller number".into(),
        };
    };

    WebhookEvent::Contact(InboundContact {
        channel: Channel::Voice,
        address,
        display_name: name,
        external_ref: Some(call.id),
        content: message.transcript.unwrap_or_default(),
        subject: None,
    })
}
