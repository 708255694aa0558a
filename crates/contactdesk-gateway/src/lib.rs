// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket gateway for contactdesk.
//!
//! The gateway exposes the conversation REST API, a realtime WebSocket feed
//! per conversation, and provider webhooks. All of them go through one
//! [`DeskService`], which writes to the store and publishes every inserted
//! message on the change feed.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;
pub mod service;
pub mod webhooks;
pub mod ws;

pub use auth::AuthConfig;
pub use error::ApiError;
pub use server::{GatewayState, HealthState, build_router, serve, start_server};
pub use service::{DeskService, InboundContact};
pub use webhooks::WebhookEvent;
