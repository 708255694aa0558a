// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::future::Future;
use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use contactdesk_config::model::{ServerConfig, WebhookConfig};
use contactdesk_core::DeskError;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;
use crate::service::DeskService;
use crate::webhooks;
use crate::ws;

/// Health state for the unauthenticated health endpoint.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub service: Arc<DeskService>,
    pub auth: AuthConfig,
    pub health: HealthState,
    /// Provider webhook secrets.
    pub webhooks: Arc<WebhookConfig>,
    /// Externally visible base URL used for Twilio signature checks.
    pub public_base_url: Option<String>,
}

impl GatewayState {
    pub fn new(service: Arc<DeskService>, server: &ServerConfig, webhooks: WebhookConfig) -> Self {
        Self {
            service,
            auth: AuthConfig::new(server.bearer_token.clone()),
            health: HealthState {
                start_time: std::time::Instant::now(),
            },
            webhooks: Arc::new(webhooks),
            public_base_url: server.public_base_url.clone(),
        }
    }
}

/// Build the gateway router.
///
/// - GET /health (public)
/// - /api/* REST routes (bearer auth)
/// - GET /api/realtime/conversations/{id} (auth via query param or header)
/// - POST /webhooks/* (provider signatures)
pub fn build_router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();
    if !auth_state.is_enabled() {
        tracing::warn!("no bearer_token configured -- /api routes are unauthenticated");
    }

    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route(
            "/api/conversations",
            post(handlers::create_conversation).get(handlers::list_conversations),
        )
        .route(
            "/api/conversations/{id}",
            get(handlers::get_conversation).patch(handlers::update_conversation),
        )
        .route("/api/conversations/{id}/messages", get(handlers::list_messages))
        .route(
            "/api/conversations/{id}/escalate",
            post(handlers::escalate_conversation),
        )
        .route("/api/messages", post(handlers::send_message))
        .route("/api/stats/conversations", get(handlers::conversation_stats))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state.clone());

    // WebSocket route (auth happens during handshake, not via middleware).
    let ws_routes = Router::new()
        .route(
            "/api/realtime/conversations/{id}",
            get(ws::realtime_handler),
        )
        .with_state(state.clone());

    let webhook_routes = webhooks::router().with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(ws_routes)
        .merge(webhook_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve the gateway on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: GatewayState, shutdown: F) -> Result<(), DeskError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| DeskError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })
}

/// Bind `host:port` from the server config and serve.
pub async fn start_server<F>(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: F,
) -> Result<(), DeskError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| DeskError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server listening on {addr}");
    serve(listener, state, shutdown).await
}

