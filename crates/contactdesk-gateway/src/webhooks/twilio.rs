// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Twilio SMS and WhatsApp messages.
//!
//! Twilio posts `application/x-www-form-urlencoded` fields. WhatsApp senders
//! arrive as `From=whatsapp:+15551234567`; anything else is SMS.
//!
//! Signature: `X-Twilio-Signature` is base64(HMAC-SHA1(auth_token, url +
//! key1 + value1 + key2 + value2 ...)) with keys in sorted order.

use std::collections::BTreeMap;

use axum::{
    Form,
    extract::{OriginalUri, State, rejection::FormRejection},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha1::Sha1;

use contactdesk_core::DeskError;
use contactdesk_core::types::Channel;

use super::{WebhookEvent, dispatch, non_blank};
use crate::error::{ApiError, ApiResult};
use crate::server::GatewayState;
use crate::service::InboundContact;

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_HEADER: &str = "x-twilio-signature";
const WHATSAPP_PREFIX: &str = "whatsapp:";
const EMPTY_TWIML: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Response></Response>"#;

/// POST /webhooks/twilio/messages
pub async fn receive(
    State(state): State<GatewayState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    form: Result<Form<BTreeMap<String, String>>, FormRejection>,
) -> ApiResult<Response> {
    let Form(params) = form.map_err(|e| ApiError::bad_request(e.body_text()))?;

    if let Some(token) = state.webhooks.twilio_auth_token.as_deref() {
        let url = signed_url(state.public_base_url.as_deref(), &headers, &uri.to_string());
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !verify_signature(token, &url, &params, signature) {
            tracing::warn!(%url, "rejected twilio webhook with invalid signature");
            return Err(ApiError::unauthorized("invalid twilio signature"));
        }
    }

    dispatch(&state.service, normalize(&params)?).await?;

    Ok(([(header::CONTENT_TYPE, "text/xml")], EMPTY_TWIML).into_response())
}

/// Map Twilio form fields onto an inbound contact.
pub fn normalize(params: &BTreeMap<String, String>) -> Result<WebhookEvent, DeskError> {
    let from = params
        .get("From")
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DeskError::Channel {
            message: "twilio payload is missing From".into(),
            source: None,
        })?;

    let (channel, address) = match from.strip_prefix(WHATSAPP_PREFIX) {
        Some(number) => (Channel::Whatsapp, number),
        None => (Channel::Sms, from),
    };

    Ok(WebhookEvent::Contact(InboundContact {
        channel,
        address: address.to_string(),
        display_name: non_blank(params.get("ProfileName").cloned()),
        external_ref: non_blank(params.get("MessageSid").cloned()),
        content: params.get("Body").cloned().unwrap_or_default(),
        subject: None,
    }))
}

/// The URL Twilio signed: the configured public base URL when present,
/// otherwise rebuilt from the forwarded scheme and `Host` header.
pub fn signed_url(public_base_url: Option<&str>, headers: &HeaderMap, path_and_query: &str) -> String {
    if let Some(base) = public_base_url {
        return format!("{}{path_and_query}", base.trim_end_matches('/'));
    }
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{scheme}://{host}{path_and_query}")
}

fn signing_mac(token: &str, url: &str, params: &BTreeMap<String, String>) -> Option<HmacSha1> {
    let mut mac = HmacSha1::new_from_slice(token.as_bytes()).ok()?;
    mac.update(url.as_bytes());
    for (key, value) in params {
        mac.update(key.as_bytes());
        mac.update(value.as_bytes());
    }
    Some(mac)
}

/// Compute the base64 signature Twilio would send.
pub fn compute_signature(token: &str, url: &str, params: &BTreeMap<String, String>) -> String {
    signing_mac(token, url, params)
        .map(|mac| STANDARD.encode(mac.finalize().into_bytes()))
        .unwrap_or_default()
}

/// Constant-time check of an `X-Twilio-Signature` value.
pub fn verify_signature(
    token: &str,
    url: &str,
    params: &BTreeMap<String, String>,
    signature: &str,
) -> bool {
    let Ok(expected) = STANDARD.decode(signature.trim()) else {
        return false;
    };
    signing_mac(token, url, params).is_some_and(|mac| mac.verify_slice(&expected).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn whatsapp_sender_is_detected() {
        let event = normalize(&params(&[
            ("From", "whatsapp:+14155550100"),
            ("Body", "hola"),
            ("ProfileName", "Ana"),
            ("MessageSid", "SM123"),
        ]))
        .unwrap();
        let WebhookEvent::Contact(contact) = event else {
            panic!("expected contact");
        };
        assert_eq!(contact.channel, Channel::Whatsapp);
        assert_eq!(contact.address, "+14155550100");
        assert_eq!(contact.display_name.as_deref(), Some("Ana"));
        assert_eq!(contact.external_ref.as_deref(), Some("SM123"));
        assert_eq!(contact.content, "hola");
    }

    #[test]
    fn plain_number_is_sms() {
        let event = normalize(&params(&[("From", "+14155550101"), ("Body", "hi")])).unwrap();
        let WebhookEvent::Contact(contact) = event else {
            panic!("expected contact");
        };
        assert_eq!(contact.channel, Channel::Sms);
        assert_eq!(contact.address, "+14155550101");
        assert!(contact.display_name.is_none());
    }

    #[test]
    fn missing_sender_is_a_channel_error() {
        let err = normalize(&params(&[("Body", "hi")])).unwrap_err();
        assert!(matches!(err, DeskError::Channel { .. }));
    }

    #[test]
    fn signature_round_trips_and_detects_tampering() {
        let url = "https://desk.example.com/webhooks/twilio/messages";
        let mut form = params(&[("From", "+14155550101"), ("Body", "hi"), ("To", "+1800")]);
        let signature = compute_signature("auth-token", url, &form);

        assert!(verify_signature("auth-token", url, &form, &signature));
        assert!(!verify_signature("other-token", url, &form, &signature));
        assert!(!verify_signature("auth-token", "https://evil.example.com/x", &form, &signature));
        assert!(!verify_signature("auth-token", url, &form, "not base64!"));

        form.insert("Body".into(), "changed".into());
        assert!(!verify_signature("auth-token", url, &form, &signature));
    }

    #[test]
    fn signed_url_prefers_public_base() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "internal:3000".parse().unwrap());
        assert_eq!(
            signed_url(Some("https://desk.example.com/"), &headers, "/webhooks/twilio/messages"),
            "https://desk.example.com/webhooks/twilio/messages"
        );
        assert_eq!(
            signed_url(None, &headers, "/webhooks/twilio/messages"),
            "http://internal:3000/webhooks/twilio/messages"
        );
    }
}
