// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound provider webhooks.
//!
//! Each provider module verifies its own signature scheme and normalizes the
//! payload into a [`WebhookEvent`]. Provider field names stop at the module
//! boundary; everything past it speaks [`InboundContact`].

pub mod resend;
pub mod twilio;
pub mod vapi;

use axum::{Router, routing::post};
use tracing::debug;

use contactdesk_core::types::{Channel, Message};
use contactdesk_core::DeskError;

use crate::server::GatewayState;
use crate::service::{DeskService, InboundContact};

/// A provider payload after normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    /// A customer said something.
    Contact(InboundContact),
    /// The provider thread or call bound to `external_ref` ended.
    Ended {
        channel: Channel,
        external_ref: String,
    },
    /// Acknowledged without any effect.
    Ignored { reason: String },
}

/// Apply a normalized event. Returns the stored message for contacts.
pub async fn dispatch(
    service: &DeskService,
    event: WebhookEvent,
) -> Result<Option<Message>, DeskError> {
    match event {
        WebhookEvent::Contact(contact) => service.ingest(contact).await.map(Some),
        WebhookEvent::Ended {
            channel,
            external_ref,
        } => {
            service.close_channel(channel, &external_ref).await?;
            Ok(None)
        }
        WebhookEvent::Ignored { reason } => {
            debug!(%reason, "webhook event ignored");
            Ok(None)
        }
    }
}

pub fn router() -> Router<GatewayState> {
    Router::new()
        .route("/webhooks/twilio/messages", post(twilio::receive))
        .route("/webhooks/vapi", post(vapi::receive))
        .route("/webhooks/resend", post(resend::receive))
}

/// Treat blank optional strings as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
