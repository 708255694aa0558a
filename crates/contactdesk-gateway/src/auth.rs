// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer token authentication for the `/api` routes.
//!
//! REST requests carry `Authorization: Bearer <token>`. Browsers cannot set
//! headers on a WebSocket upgrade, so the realtime route also accepts the
//! token as a `?token=` query parameter.
//!
//! When no token is configured every request is accepted.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

/// Authentication configuration for the gateway.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Expected bearer token. `None` disables authentication.
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

impl AuthConfig {
    pub fn new(bearer_token: Option<String>) -> Self {
        Self { bearer_token }
    }

    pub fn is_enabled(&self) -> bool {
        self.bearer_token.is_some()
    }

    /// Check the `Authorization` header, falling back to a query token.
    pub fn accepts(&self, headers: &HeaderMap, query_token: Option<&str>) -> bool {
        let Some(expected) = self.bearer_token.as_deref() else {
            return true;
        };

        let header_token = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        header_token.or(query_token) == Some(expected)
    }
}

/// Middleware that rejects requests without the configured bearer token.
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    if auth.accepts(request.headers(), None) {
        return Ok(next.run(request).await);
    }

    tracing::debug!(path = %request.uri().path(), "rejected unauthenticated request");
    Err(ApiError::new(StatusCode::UNAUTHORIZED, "missing or invalid bearer token").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", value.parse().unwrap());
        headers
    }

    #[test]
    fn disabled_auth_accepts_everything() {
        let auth = AuthConfig::default();
        assert!(!auth.is_enabled());
        assert!(auth.accepts(&HeaderMap::new(), None));
    }

    #[test]
    fn bearer_header_must_match() {
        let auth = AuthConfig::new(Some("secret".into()));
        assert!(auth.accepts(&headers_with("Bearer secret"), None));
        assert!(!auth.accepts(&headers_with("Bearer wrong"), None));
        assert!(!auth.accepts(&headers_with("secret"), None));
        assert!(!auth.accepts(&HeaderMap::new(), None));
    }

    #[test]
    fn query_token_is_a_fallback() {
        let auth = AuthConfig::new(Some("secret".into()));
        assert!(auth.accepts(&HeaderMap::new(), Some("secret")));
        assert!(!auth.accepts(&HeaderMap::new(), Some("nope")));
    }

    #[test]
    fn debug_redacts_token() {
        let auth = AuthConfig::new(Some("super-secret".into()));
        let debug = format!("{auth:?}");
        assert!(debug.contains("[redacted]"));
        assert!(!debug.contains("super-secret"));
    }
}
