// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime insert subscriptions.
//!
//! [`RealtimeSource::subscribe`] resolves only after the server confirmed the
//! subscription, so no insert committed afterwards can be missed. Dropping a
//! [`Subscription`] tears the connection down.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Url;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, warn};

use contactdesk_core::DeskError;
use contactdesk_core::types::{Message, RealtimeFrame};

/// How long to wait for the upgrade and the `SUBSCRIBED` frame.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

const SUBSCRIPTION_BUFFER: usize = 64;

#[async_trait]
pub trait RealtimeSource: Send + Sync + 'static {
    async fn subscribe(&self, conversation_id: &str) -> Result<Subscription, DeskError>;
}

/// A live stream of message inserts for one conversation.
pub struct Subscription {
    rx: mpsc::Receiver<Message>,
    reader: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Wrap a channel fed by something other than a socket reader.
    pub fn from_receiver(rx: mpsc::Receiver<Message>) -> Self {
        Self { rx, reader: None }
    }

    /// Next inserted row, or `None` once the feed is gone.
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// WebSocket client for `/api/realtime/conversations/{id}`.
#[derive(Debug, Clone)]
pub struct WsRealtime {
    base_url: Url,
    bearer_token: Option<String>,
    handshake_timeout: Duration,
}

impl WsRealtime {
    /// `base_url` is the HTTP(S) base of the API; the scheme is switched to WS(S).
    pub fn new(base_url: &str, bearer_token: Option<String>) -> Result<Self, DeskError> {
        let mut url = Url::parse(base_url)
            .map_err(|e| DeskError::Config(format!("invalid realtime base URL {base_url}: {e}")))?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(DeskError::Config(format!(
                    "unsupported realtime URL scheme: {other}"
                )));
            }
        };
        url.set_scheme(scheme)
            .map_err(|()| DeskError::Config(format!("cannot use scheme {scheme} for {base_url}")))?;

        Ok(Self {
            base_url: url,
            bearer_token,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        })
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// The socket URL for one conversation.
    pub fn conversation_url(&self, conversation_id: &str) -> Result<Url, DeskError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| DeskError::Config("realtime base URL cannot have a path".into()))?
            .pop_if_empty()
            .extend(["api", "realtime", "conversations", conversation_id]);
        if let Some(token) = &self.bearer_token {
            url.query_pairs_mut().append_pair("token", token);
        }
        Ok(url)
    }
}

fn transport(message: impl Into<String>) -> DeskError {
    DeskError::Transport {
        message: message.into(),
        source: None,
    }
}

#[async_trait]
impl RealtimeSource for WsRealtime {
    async fn subscribe(&self, conversation_id: &str) -> Result<Subscription, DeskError> {
        let url = self.conversation_url(conversation_id)?;
        let timeout = self.handshake_timeout;

        let (mut stream, _) = tokio::time::timeout(timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| DeskError::Timeout { duration: timeout })?
            .map_err(|e| DeskError::Transport {
                message: format!("realtime connect failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let confirmed = tokio::time::timeout(timeout, async {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => {
                        if let Ok(RealtimeFrame::Subscribed { .. }) =
                            serde_json::from_str::<RealtimeFrame>(text.as_str())
                        {
                            return Ok(());
                        }
                    }
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        return Err(DeskError::Transport {
                            message: format!("realtime handshake failed: {e}"),
                            source: Some(Box::new(e)),
                        });
                    }
                }
            }
            Err(transport("realtime feed closed before subscription was confirmed"))
        })
        .await
        .map_err(|_| DeskError::Timeout { duration: timeout })?;
        confirmed?;
        debug!(conversation_id, "realtime subscription confirmed");

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let topic = conversation_id.to_string();
        let reader = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => {
                        match serde_json::from_str::<RealtimeFrame>(text.as_str()) {
                            Ok(RealtimeFrame::Insert { record, .. }) => {
                                if tx.send(record).await.is_err() {
                                    break;
                                }
                            }
                            Ok(RealtimeFrame::Subscribed { .. }) => {}
                            Err(e) => warn!(conversation_id = %topic, "invalid realtime frame: {e}"),
                        }
                    }
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!(conversation_id = %topic, "realtime connection lost: {e}");
                        break;
                    }
                }
            }
            debug!(conversation_id = %topic, "realtime reader stopped");
        });

        Ok(Subscription {
            rx,
            reader: Some(reader),
        })
    }
}
