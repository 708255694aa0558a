// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP access to the contactdesk REST API.
//!
//! [`MessageBackend`] is the narrow seam the delivery client needs.
//! [`ApiClient`] implements it with `reqwest` and also exposes the
//! conversation endpoints an agent console uses.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Response, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use contactdesk_core::DeskError;
use contactdesk_core::types::{
    Conversation, ConversationFilter, Message, NewConversation, SendMessageRequest,
};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait MessageBackend: Send + Sync + 'static {
    /// Full history of a conversation, oldest first.
    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, DeskError>;

    /// Authoritative write. Returns the stored row.
    async fn send_message(&self, req: &SendMessageRequest) -> Result<Message, DeskError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
    timeout: Duration,
}

impl ApiClient {
    /// Create a client for the API at `base_url` (e.g. `http://127.0.0.1:3000`).
    pub fn new(base_url: impl Into<String>, bearer_token: Option<String>) -> Result<Self, DeskError> {
        Self::with_timeout(base_url, bearer_token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        bearer_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DeskError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| DeskError::Config(format!("invalid API base URL {base_url}: {e}")))?;

        let mut headers = HeaderMap::new();
        if let Some(token) = &bearer_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                    DeskError::Config(format!("invalid bearer token header value: {e}"))
                })?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| DeskError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url,
            bearer_token,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn create_conversation(
        &self,
        new: &NewConversation,
    ) -> Result<Conversation, DeskError> {
        let response = self
            .execute(self.client.post(self.url("/api/conversations")).json(new))
            .await?;
        read_json(response, None).await
    }

    pub async fn get_conversation(&self, id: &str) -> Result<Conversation, DeskError> {
        let response = self
            .execute(self.client.get(self.url(&format!("/api/conversations/{id}"))))
            .await?;
        read_json(response, Some(id)).await
    }

    pub async fn list_conversations(
        &self,
        filter: &ConversationFilter,
    ) -> Result<Vec<Conversation>, DeskError> {
        let mut url = Url::parse(&self.url("/api/conversations"))
            .map_err(|e| DeskError::Internal(format!("invalid conversations URL: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(status) = filter.status {
                query.append_pair("status", &status.to_string());
            }
            if let Some(channel) = filter.channel {
                query.append_pair("channel", &channel.to_string());
            }
            if let Some(priority) = filter.priority {
                query.append_pair("priority", &priority.to_string());
            }
            if let Some(agent) = &filter.assigned_agent_id {
                query.append_pair("assigned_agent_id", agent);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        let response = self.execute(self.client.get(url)).await?;
        read_json(response, None).await
    }

    pub async fn escalate(&self, id: &str) -> Result<(), DeskError> {
        let response = self
            .execute(
                self.client
                    .post(self.url(&format!("/api/conversations/{id}/escalate"))),
            )
            .await?;
        let _: serde_json::Value = read_json(response, Some(id)).await?;
        Ok(())
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Response, DeskError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DeskError::Timeout {
                    duration: self.timeout,
                }
            } else {
                DeskError::Transport {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                }
            }
        })?;
        debug!(status = %response.status(), url = %response.url(), "API response received");
        Ok(response)
    }
}

#[async_trait]
impl MessageBackend for ApiClient {
    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, DeskError> {
        let response = self
            .execute(
                self.client
                    .get(self.url(&format!("/api/conversations/{conversation_id}/messages"))),
            )
            .await?;
        read_json(response, Some(conversation_id)).await
    }

    async fn send_message(&self, req: &SendMessageRequest) -> Result<Message, DeskError> {
        let response = self
            .execute(self.client.post(self.url("/api/messages")).json(req))
            .await?;
        read_json(response, Some(&req.conversation_id)).await
    }
}

async fn read_json<T: DeserializeOwned>(
    response: Response,
    conversation_id: Option<&str>,
) -> Result<T, DeskError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(|e| DeskError::Transport {
            message: format!("failed to decode API response: {e}"),
            source: Some(Box::new(e)),
        });
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or(body);
    Err(status_error(status, message, conversation_id))
}

/// Map a non-success API status onto the shared error type.
pub fn status_error(status: StatusCode, message: String, conversation_id: Option<&str>) -> DeskError {
    match status {
        StatusCode::BAD_REQUEST => DeskError::Validation(message),
        StatusCode::NOT_FOUND => DeskError::NotFound {
            entity: "conversation",
            id: conversation_id.unwrap_or_default().to_string(),
        },
        s if s.is_server_error() => DeskError::Transport {
            message: format!("API returned {s}: {message}"),
            source: None,
        },
        s => DeskError::Internal(format!("API returned {s}: {message}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_map_to_error_kinds() {
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, "content must be at least 1 character".into(), None),
            DeskError::Validation(m) if m == "content must be at least 1 character"
        ));
        match status_error(StatusCode::NOT_FOUND, "gone".into(), Some("conv-1")) {
            DeskError::NotFound { entity, id } => {
                assert_eq!(entity, "conversation");
                assert_eq!(id, "conv-1");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(status_error(StatusCode::SERVICE_UNAVAILABLE, "busy".into(), None).is_recoverable());
        assert!(!status_error(StatusCode::UNAUTHORIZED, "no".into(), None).is_recoverable());
    }

    #[test]
    fn base_url_is_validated_and_trimmed() {
        let client = ApiClient::new("http://127.0.0.1:3000/", Some("t".into())).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:3000");
        assert_eq!(client.bearer_token(), Some("t"));
        assert!(matches!(
            ApiClient::new("not a url", None),
            Err(DeskError::Config(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_recoverable_transport_error() {
        let client =
            ApiClient::with_timeout("http://127.0.0.1:9", None, Duration::from_secs(2)).unwrap();
        let err = client.list_messages("conv-1").await.unwrap_err();
        assert!(err.is_recoverable(), "{err:?}");
    }
}
