// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router-level tests driven through `tower::ServiceExt::oneshot`.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use contactdesk_config::model::{ServerConfig, StorageConfig, WebhookConfig};
use contactdesk_core::{ChangeFeed, ChannelStateStore};
use contactdesk_gateway::webhooks::{resend, twilio};
use contactdesk_gateway::{DeskService, GatewayState, build_router};
use contactdesk_storage::SqliteStorage;

struct TestApp {
    router: Router,
    service: Arc<DeskService>,
    _dir: TempDir,
}

async fn app_with(server: ServerConfig, webhooks: WebhookConfig) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(SqliteStorage::new(StorageConfig {
        database_path: dir.path().join("api.db").to_string_lossy().into_owned(),
        wal_mode: true,
    }));
    storage.initialize().await.unwrap();
    let service = Arc::new(DeskService::new(
        storage.clone(),
        Some(storage as Arc<dyn ChannelStateStore>),
        ChangeFeed::default(),
    ));
    let state = GatewayState::new(service.clone(), &server, webhooks);
    TestApp {
        router: build_router(state),
        service,
        _dir: dir,
    }
}

async fn app() -> TestApp {
    app_with(ServerConfig::default(), WebhookConfig::default()).await
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, body)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn create_conversation(router: &Router) -> String {
    let (status, body) = call(
        router,
        json_request(
            "POST",
            "/api/conversations",
            json!({"customer_id": "cust-1", "subject": "Card blocked", "channel": "chat"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let app = app_with(
        ServerConfig {
            bearer_token: Some("secret".into()),
            ..Default::default()
        },
        WebhookConfig::default(),
    )
    .await;
    let (status, body) = call(&app.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["uptime_secs"].is_u64());
}

#[tokio::test]
async fn api_requires_bearer_token_when_configured() {
    let app = app_with(
        ServerConfig {
            bearer_token: Some("secret".into()),
            ..Default::default()
        },
        WebhookConfig::default(),
    )
    .await;

    let (status, body) = call(&app.router, get("/api/conversations")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let authorized = Request::builder()
        .uri("/api/conversations")
        .header(header::AUTHORIZATION, "Bearer secret")
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(&app.router, authorized).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn create_conversation_applies_defaults() {
    let app = app().await;
    let (status, body) = call(
        &app.router,
        json_request("POST", "/api/conversations", json!({"customer_id": "cust-9"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "open");
    assert_eq!(body["channel"], "app");
    assert_eq!(body["priority"], "medium");
    assert!(body["start_time"].is_string());
    assert!(body["last_message_time"].is_string());
}

#[tokio::test]
async fn send_and_list_messages_in_order() {
    let app = app().await;
    let conv = create_conversation(&app.router).await;

    let (status, first) = call(
        &app.router,
        json_request(
            "POST",
            "/api/messages",
            json!({
                "conversation_id": conv,
                "sender_type": "customer",
                "sender_customer_id": "cust-1",
                "content": "My card is blocked"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(first["id"].is_string());

    let (status, _) = call(
        &app.router,
        json_request(
            "POST",
            "/api/messages",
            json!({
                "conversation_id": conv,
                "sender_type": "agent",
                "sender_agent_id": "agent-1",
                "content": "Checking now",
                "is_internal": false
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, list) = call(&app.router, get(&format!("/api/conversations/{conv}/messages"))).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["id"], first["id"]);
    assert_eq!(list[1]["sender_type"], "agent");
}

#[tokio::test]
async fn send_validation_rejects_before_write() {
    let app = app().await;
    let conv = create_conversation(&app.router).await;

    let cases = [
        json!({"conversation_id": conv, "sender_type": "customer", "sender_customer_id": "c", "content": ""}),
        json!({"conversation_id": conv, "sender_type": "customer", "sender_customer_id": "c", "content": "x", "is_internal": true}),
        json!({"conversation_id": conv, "sender_type": "customer", "sender_agent_id": "a", "content": "x"}),
        json!({"conversation_id": conv, "sender_type": "agent", "content": "x"}),
        json!({"conversation_id": conv, "sender_type": "agent", "sender_agent_id": "a", "sender_customer_id": "c", "content": "x"}),
        json!({"conversation_id": conv, "sender_type": "robot", "content": "x"}),
    ];
    for case in cases {
        let (status, body) = call(&app.router, json_request("POST", "/api/messages", case.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "case {case}");
        assert!(body["error"].is_string(), "case {case}");
    }

    let (_, list) = call(&app.router, get(&format!("/api/conversations/{conv}/messages"))).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn unknown_conversation_is_404() {
    let app = app().await;

    let (status, _) = call(&app.router, get("/api/conversations/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app.router, get("/api/conversations/nope/messages")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        &app.router,
        json_request(
            "POST",
            "/api/messages",
            json!({"conversation_id": "nope", "sender_type": "agent", "sender_agent_id": "a", "content": "hi"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "conversation not found: nope");

    let (status, body) = call(
        &app.router,
        json_request("POST", "/api/conversations/nope/escalate", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn escalate_returns_success_and_updates_row() {
    let app = app().await;
    let conv = create_conversation(&app.router).await;

    let (status, body) = call(
        &app.router,
        json_request("POST", &format!("/api/conversations/{conv}/escalate"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let (_, conversation) = call(&app.router, get(&format!("/api/conversations/{conv}"))).await;
    assert_eq!(conversation["status"], "escalated");
    assert_eq!(conversation["priority"], "high");
    assert_eq!(conversation["escalation_risk"], true);
}

#[tokio::test]
async fn patch_filters_and_stats() {
    let app = app().await;
    let conv = create_conversation(&app.router).await;
    create_conversation(&app.router).await;

    let (status, updated) = call(
        &app.router,
        json_request(
            "PATCH",
            &format!("/api/conversations/{conv}"),
            json!({"status": "active", "assigned_agent_id": "agent-7", "sentiment": "negative"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "active");
    assert_eq!(updated["assigned_agent_id"], "agent-7");

    let (_, active) = call(&app.router, get("/api/conversations?status=active")).await;
    assert_eq!(active.as_array().unwrap().len(), 1);
    let (_, by_agent) = call(&app.router, get("/api/conversations?assigned_agent_id=agent-7")).await;
    assert_eq!(by_agent[0]["id"], conv.as_str());

    let (status, stats) = call(&app.router, get("/api/stats/conversations")).await;
    assert_eq!(status, StatusCode::OK);
    let by_channel = stats["by_channel"].as_array().unwrap();
    assert!(by_channel.iter().any(|b| b["name"] == "chat" && b["value"] == 2));
}

#[tokio::test]
async fn signed_twilio_whatsapp_message_is_ingested() {
    let app = app_with(
        ServerConfig {
            public_base_url: Some("https://desk.example.com".into()),
            ..Default::default()
        },
        WebhookConfig {
            twilio_auth_token: Some("twilio-token".into()),
            ..Default::default()
        },
    )
    .await;

    let mut params = BTreeMap::new();
    params.insert("Body".to_string(), "hola".to_string());
    params.insert("From".to_string(), "whatsapp:+14155550100".to_string());
    params.insert("MessageSid".to_string(), "SM1".to_string());
    let signature = twilio::compute_signature(
        "twilio-token",
        "https://desk.example.com/webhooks/twilio/messages",
        &params,
    );
    let form = "Body=hola&From=whatsapp%3A%2B14155550100&MessageSid=SM1";

    let request = |signature: &str| {
        Request::builder()
            .method("POST")
            .uri("/webhooks/twilio/messages")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("x-twilio-signature", signature)
            .body(Body::from(form))
            .unwrap()
    };

    let (status, _) = call(&app.router, request("bm9wZQ==")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let response = app.router.clone().oneshot(request(&signature)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/xml");

    let conversations = app
        .service
        .list_conversations(&Default::default())
        .await
        .unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].channel.to_string(), "whatsapp");
    let messages = app.service.list_messages(&conversations[0].id).await.unwrap();
    assert_eq!(messages[0].content, "hola");
}

#[tokio::test]
async fn vapi_secret_and_transcripts() {
    let app = app_with(
        ServerConfig::default(),
        WebhookConfig {
            vapi_secret: Some("vapi-secret".into()),
            ..Default::default()
        },
    )
    .await;
    let payload = json!({"message": {
        "type": "transcript",
        "role": "user",
        "transcriptType": "final",
        "transcript": "I need help with a transfer",
        "call": {"id": "call-77", "customer": {"number": "+15550199"}}
    }});

    let (status, _) = call(&app.router, json_request("POST", "/webhooks/vapi", payload.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut request = json_request("POST", "/webhooks/vapi", payload);
    request
        .headers_mut()
        .insert("x-vapi-secret", "vapi-secret".parse().unwrap());
    let (status, body) = call(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"received": true}));

    let mut ended = json_request(
        "POST",
        "/webhooks/vapi",
        json!({"message": {"type": "end-of-call-report", "call": {"id": "call-77"}}}),
    );
    ended
        .headers_mut()
        .insert("x-vapi-secret", "vapi-secret".parse().unwrap());
    let (status, _) = call(&app.router, ended).await;
    assert_eq!(status, StatusCode::OK);

    let conversations = app
        .service
        .list_conversations(&Default::default())
        .await
        .unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].channel.to_string(), "voice");
}

#[tokio::test]
async fn resend_email_opens_conversation_with_subject() {
    let secret = "whsec_c2VjcmV0LWtleS1mb3ItdGVzdHM=";
    let app = app_with(
        ServerConfig::default(),
        WebhookConfig {
            resend_signing_secret: Some(secret.into()),
            ..Default::default()
        },
    )
    .await;

    let body = json!({"type": "email.received", "data": {
        "email_id": "em_9",
        "from": "Jane Doe <Jane@Example.com>",
        "subject": "Refund status",
        "text": "Where is my refund?"
    }})
    .to_string();
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = resend::compute_signature(secret, "msg_1", &timestamp, body.as_bytes()).unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/resend")
        .header(header::CONTENT_TYPE, "application/json")
        .header("svix-id", "msg_1")
        .header("svix-timestamp", timestamp.as_str())
        .header("svix-signature", signature.as_str())
        .body(Body::from(body))
        .unwrap();
    let (status, _) = call(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);

    let conversations = app
        .service
        .list_conversations(&Default::default())
        .await
        .unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].subject.as_deref(), Some("Refund status"));
}
