// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full server stack (temp SQLite database,
//! change feed, desk service, gateway router) and serves it on
//! `127.0.0.1:0`. Clients built from the harness talk to it over real HTTP
//! and WebSocket connections.

use std::sync::Arc;
use std::time::Duration;

use contactdesk_client::{ApiClient, DeliveryClient, WsRealtime};
use contactdesk_config::model::{ServerConfig, StorageConfig, WebhookConfig};
use contactdesk_core::{ChangeFeed, DeskError};
use contactdesk_gateway::{DeskService, GatewayState, serve};
use contactdesk_storage::SqliteStorage;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    bearer_token: Option<String>,
    webhooks: WebhookConfig,
    feed_capacity: usize,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            bearer_token: None,
            webhooks: WebhookConfig::default(),
            feed_capacity: 64,
        }
    }

    /// Require this bearer token on `/api/*` routes.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_webhooks(mut self, webhooks: WebhookConfig) -> Self {
        self.webhooks = webhooks;
        self
    }

    pub fn with_feed_capacity(mut self, capacity: usize) -> Self {
        self.feed_capacity = capacity;
        self
    }

    /// Build the storage and service, then start serving.
    pub async fn build(self) -> Result<TestHarness, DeskError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| DeskError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let storage = Arc::new(SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        }));
        storage.initialize().await?;

        let service = Arc::new(DeskService::new(
            storage.clone(),
            Some(storage.clone()),
            ChangeFeed::new(self.feed_capacity),
        ));

        let server = ServerConfig {
            bearer_token: self.bearer_token.clone(),
            ..ServerConfig::default()
        };
        let state = GatewayState::new(service.clone(), &server, self.webhooks);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| DeskError::Channel {
                message: format!("failed to bind test gateway: {e}"),
                source: Some(Box::new(e)),
            })?;
        let addr = listener.local_addr().map_err(|e| DeskError::Channel {
            message: format!("failed to read test gateway address: {e}"),
            source: Some(Box::new(e)),
        })?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server_task = tokio::spawn(async move {
            let shutdown = async move {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = serve(listener, state, shutdown).await {
                debug!(error = %e, "test gateway stopped with error");
            }
        });
        debug!(%addr, "test gateway listening");

        Ok(TestHarness {
            base_url: format!("http://{addr}"),
            bearer_token: self.bearer_token,
            service,
            storage,
            shutdown: Some(shutdown_tx),
            server_task,
            _temp_dir: temp_dir,
        })
    }
}

/// A running gateway backed by a temp database.
pub struct TestHarness {
    /// `http://127.0.0.1:<port>` of the running gateway.
    pub base_url: String,
    pub bearer_token: Option<String>,
    /// The service behind the gateway, for seeding data without HTTP.
    pub service: Arc<DeskService>,
    /// SQLite storage (temp DB, removed on drop).
    pub storage: Arc<SqliteStorage>,
    shutdown: Option<oneshot::Sender<()>>,
    server_task: JoinHandle<()>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default options.
    pub async fn start() -> Result<Self, DeskError> {
        Self::builder().build().await
    }

    /// REST client pointed at this gateway.
    pub fn api_client(&self) -> Result<ApiClient, DeskError> {
        ApiClient::new(self.base_url.clone(), self.bearer_token.clone())
    }

    /// Realtime client pointed at this gateway.
    pub fn realtime(&self) -> Result<WsRealtime, DeskError> {
        WsRealtime::new(&self.base_url, self.bearer_token.clone())
    }

    /// Delivery client for `agent_id` wired to this gateway.
    pub fn delivery_client(&self, agent_id: &str) -> Result<DeliveryClient, DeskError> {
        Ok(DeliveryClient::new(
            Arc::new(self.api_client()?),
            Arc::new(self.realtime()?),
            agent_id,
        ))
    }

    /// Stop the server and wait for open connections to drain.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut self.server_task)
            .await
            .is_err()
        {
            debug!("test gateway did not drain in time, aborting");
        }
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.server_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn harness_serves_health() {
        let harness = TestHarness::start().await.unwrap();
        let body: serde_json::Value = reqwest::get(format!("{}/health", harness.base_url))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
        harness.shutdown().await;
    }

    #[tokio::test]
    async fn bearer_token_is_enforced() {
        let harness = TestHarness::builder()
            .with_bearer_token("s3cret")
            .build()
            .await
            .unwrap();
        let status = reqwest::get(format!("{}/api/conversations", harness.base_url))
            .await
            .unwrap()
            .status();
        assert_eq!(status, reqwest::StatusCode::UNAUTHORIZED);

        let conversations = harness
            .api_client()
            .unwrap()
            .list_conversations(&Default::default())
            .await
            .unwrap();
        assert!(conversations.is_empty());
    }
}
