// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resend inbound email.
//!
//! Resend delivers webhooks through Svix. When a signing secret is
//! configured the `svix-id`, `svix-timestamp` and `svix-signature` headers are
//! checked against HMAC-SHA256(secret, "{id}.{timestamp}.{body}").

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::Sha256;

use contactdesk_core::DeskError;
use contactdesk_core::types::Channel;

use super::{WebhookEvent, dispatch, non_blank};
use crate::error::{ApiError, ApiResult};
use crate::server::GatewayState;
use crate::service::InboundContact;

type HmacSha256 = Hmac<Sha256>;

/// Allowed clock skew between Svix and us, in seconds.
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Option<EmailData>,
}

#[derive(Debug, Deserialize)]
pub struct EmailData {
    #[serde(default)]
    pub email_id: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// POST /webhooks/resend
pub async fn receive(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    if let Some(secret) = state.webhooks.resend_signing_secret.as_deref() {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
        };
        let verified = verify_signature(
            secret,
            header("svix-id"),
            header("svix-timestamp"),
            &body,
            header("svix-signature"),
            chrono::Utc::now().timestamp(),
        );
        if !verified {
            tracing::warn!("rejected resend webhook with invalid signature");
            return Err(ApiError::unauthorized("invalid resend signature"));
        }
    }

    let event: Event = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("invalid resend payload: {e}")))?;
    dispatch(&state.service, normalize(event)?).await?;
    Ok(Json(json!({ "received": true })))
}

pub fn normalize(event: Event) -> Result<WebhookEvent, DeskError> {
    if event.kind != "email.received" {
        return Ok(WebhookEvent::Ignored {
            reason: format!("resend event {}", event.kind),
        });
    }
    let data = event.data.ok_or_else(|| DeskError::Channel {
        message: "resend email.received without data".into(),
        source: None,
    })?;
    let (display_name, address) = data
        .from
        .as_deref()
        .and_then(parse_sender)
        .ok_or_else(|| DeskError::Channel {
            message: "resend email has no sender address".into(),
            source: None,
        })?;

    Ok(WebhookEvent::Contact(InboundContact {
        channel: Channel::Email,
        address,
        display_name,
        external_ref: non_blank(data.email_id),
        content: data.text.unwrap_or_default(),
        subject: non_blank(data.subject),
    }))
}

/// Split `Name <addr>` or a bare address into (name, address).
pub fn parse_sender(raw: &str) -> Option<(Option<String>, String)> {
    let raw = raw.trim();
    let (name, address) = match (raw.rfind('<'), raw.ends_with('>')) {
        (Some(open), true) => {
            let name = raw[..open].trim().trim_matches('"').trim();
            (
                (!name.is_empty()).then(|| name.to_string()),
                raw[open + 1..raw.len() - 1].trim(),
            )
        }
        _ => (None, raw),
    };
    (!address.is_empty()).then(|| (name, address.to_string()))
}

/// Verify Svix webhook headers.
///
/// `signatures` is the space-separated `svix-signature` header; any `v1`
/// entry may match.
pub fn verify_signature(
    secret: &str,
    id: &str,
    timestamp: &str,
    body: &[u8],
    signatures: &str,
    now: i64,
) -> bool {
    let Ok(sent_at) = timestamp.parse::<i64>() else {
        return false;
    };
    if (now - sent_at).abs() > TIMESTAMP_TOLERANCE_SECS {
        return false;
    }
    let Some(mac) = signing_mac(secret, id, timestamp, body) else {
        return false;
    };

    signatures
        .split_whitespace()
        .filter_map(|entry| entry.strip_prefix("v1,"))
        .filter_map(|sig| STANDARD.decode(sig).ok())
        .any(|sig| mac.clone().verify_slice(&sig).is_ok())
}

/// Compute the `v1,<base64>` signature entry for a payload.
pub fn compute_signature(secret: &str, id: &str, timestamp: &str, body: &[u8]) -> Option<String> {
    let mac = signing_mac(secret, id, timestamp, body)?;
    Some(format!("v1,{}", STANDARD.encode(mac.finalize().into_bytes())))
}

fn signing_mac(secret: &str, id: &str, timestamp: &str, body: &[u8]) -> Option<HmacSha256> {
    let key = STANDARD
        .decode(secret.strip_prefix("whsec_").unwrap_or(secret))
        .ok()?;
    let mut mac = HmacSha256::new_from_slice(&key).ok()?;
    mac.update(id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    Some(mac)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_c2VjcmV0LWtleS1mb3ItdGVzdHM=";

    #[test]
    fn parses_named_and_bare_senders() {
        assert_eq!(
            parse_sender("Jane Doe <jane@example.com>"),
            Some((Some("Jane Doe".into()), "jane@example.com".into()))
        );
        assert_eq!(
            parse_sender("\"Doe, Jane\" <jane@example.com>"),
            Some((Some("Doe, Jane".into()), "jane@example.com".into()))
        );
        assert_eq!(
            parse_sender("  jane@example.com "),
            Some((None, "jane@example.com".into()))
        );
        assert_eq!(parse_sender("<jane@example.com>"), Some((None, "jane@example.com".into())));
        assert_eq!(parse_sender("Jane <>"), None);
        assert_eq!(parse_sender(""), None);
    }

    #[test]
    fn email_received_becomes_contact() {
        let event: Event = serde_json::from_str(
            r#"{"type": "email.received", "data": {
                "email_id": "em_1",
                "from": "Jane <jane@example.com>",
                "to": ["support@desk.example.com"],
                "subject": "Refund",
                "text": "Where is my refund?"
            }}"#,
        )
        .unwrap();
        let WebhookEvent::Contact(contact) = normalize(event).unwrap() else {
            panic!("expected contact");
        };
        assert_eq!(contact.channel, Channel::Email);
        assert_eq!(contact.address, "jane@example.com");
        assert_eq!(contact.display_name.as_deref(), Some("Jane"));
        assert_eq!(contact.subject.as_deref(), Some("Refund"));
        assert_eq!(contact.external_ref.as_deref(), Some("em_1"));
        assert_eq!(contact.content, "Where is my refund?");
    }

    #[test]
    fn other_events_are_ignored() {
        let event: Event = serde_json::from_str(r#"{"type": "email.delivered", "data": {}}"#).unwrap();
        assert!(matches!(normalize(event).unwrap(), WebhookEvent::Ignored { .. }));
    }

    #[test]
    fn missing_sender_is_a_channel_error() {
        let event: Event =
            serde_json::from_str(r#"{"type": "email.received", "data": {"text": "hi"}}"#).unwrap();
        assert!(matches!(normalize(event), Err(DeskError::Channel { .. })));
    }

    #[test]
    fn svix_signature_verifies() {
        let body = br#"{"type":"email.received"}"#;
        let signature = compute_signature(SECRET, "msg_1", "1700000000", body).unwrap();
        let header = format!("v1,bm90LWl0 {signature}");

        assert!(verify_signature(SECRET, "msg_1", "1700000000", body, &header, 1_700_000_010));
        assert!(!verify_signature(SECRET, "msg_2", "1700000000", body, &header, 1_700_000_010));
        assert!(!verify_signature(SECRET, "msg_1", "1700000000", b"{}", &header, 1_700_000_010));
        assert!(!verify_signature(
            "whsec_b3RoZXI=",
            "msg_1",
            "1700000000",
            body,
            &header,
            1_700_000_010
        ));
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let body = b"{}";
        let signature = compute_signature(SECRET, "msg_1", "1700000000", body).unwrap();
        assert!(!verify_signature(SECRET, "msg_1", "1700000000", body, &signature, 1_700_001_000));
        assert!(!verify_signature(SECRET, "msg_1", "yesterday", body, &signature, 1_700_000_000));
    }
}
