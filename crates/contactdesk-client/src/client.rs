// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The message-delivery client.
//!
//! One [`DeliveryClient`] serves one agent and at most one active
//! conversation. Activating a conversation tears down the previous realtime
//! subscription, subscribes to the new one, then loads its history.
//!
//! Sends are optimistic: a placeholder is shown immediately and replaced by
//! the stored row, whichever of the write response or the realtime echo
//! arrives first. A send that completes after the agent switched away
//! applies to the detached log only.

use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use contactdesk_core::DeskError;
use contactdesk_core::types::{Message, SendMessageRequest, SenderType};

use crate::backend::MessageBackend;
use crate::display::DisplayMessage;
use crate::log::{MessageLog, RemoteOutcome};
use crate::realtime::{RealtimeSource, Subscription};

/// The last failure, kept for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientError {
    pub message: String,
    /// Retrying the same action may succeed.
    pub recoverable: bool,
}

impl From<&DeskError> for ClientError {
    fn from(err: &DeskError) -> Self {
        Self {
            message: err.to_string(),
            recoverable: err.is_recoverable(),
        }
    }
}

struct ActiveConversation {
    log: MessageLog,
    generation: u64,
    pump: Option<JoinHandle<()>>,
}

impl Drop for ActiveConversation {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

#[derive(Default)]
struct ClientState {
    active: Option<ActiveConversation>,
    generation: u64,
    error: Option<ClientError>,
    loading: bool,
}

impl ClientState {
    fn active_at(&mut self, generation: u64) -> Option<&mut ActiveConversation> {
        self.active
            .as_mut()
            .filter(|active| active.generation == generation)
    }
}

pub struct DeliveryClient {
    backend: Arc<dyn MessageBackend>,
    realtime: Arc<dyn RealtimeSource>,
    agent_id: String,
    inner: Arc<Mutex<ClientState>>,
    updates: Arc<watch::Sender<u64>>,
}

impl DeliveryClient {
    pub fn new(
        backend: Arc<dyn MessageBackend>,
        realtime: Arc<dyn RealtimeSource>,
        agent_id: impl Into<String>,
    ) -> Self {
        let (updates, _) = watch::channel(0);
        Self {
            backend,
            realtime,
            agent_id: agent_id.into(),
            inner: Arc::new(Mutex::new(ClientState::default())),
            updates: Arc::new(updates),
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// A counter bumped after every visible change.
    pub fn updates(&self) -> watch::Receiver<u64> {
        self.updates.subscribe()
    }

    fn bump(&self) {
        self.updates.send_modify(|v| *v += 1);
    }

    /// Switch to `conversation_id`, or to nothing.
    ///
    /// Returns the loaded history as display messages.
    pub async fn activate(
        &self,
        conversation_id: Option<&str>,
    ) -> Result<Vec<DisplayMessage>, DeskError> {
        let generation = {
            let mut state = self.inner.lock().await;
            // Dropping the previous conversation aborts its pump.
            state.active = None;
            state.error = None;
            state.loading = false;
            state.generation += 1;
            let generation = state.generation;
            if let Some(id) = conversation_id {
                state.active = Some(ActiveConversation {
                    log: MessageLog::new(id, self.agent_id.clone()),
                    generation,
                    pump: None,
                });
            }
            generation
        };
        self.bump();

        let Some(conversation_id) = conversation_id else {
            debug!("delivery client deactivated");
            return Ok(Vec::new());
        };

        let subscription = match self.realtime.subscribe(conversation_id).await {
            Ok(subscription) => subscription,
            Err(e) => {
                self.record_error(&e).await;
                return Err(e);
            }
        };

        {
            let mut state = self.inner.lock().await;
            let Some(active) = state.active_at(generation) else {
                debug!(conversation_id, "conversation switched while subscribing");
                return Ok(Vec::new());
            };
            active.pump = Some(self.spawn_pump(subscription, generation));
        }
        debug!(conversation_id, "conversation activated");

        self.load().await
    }

    /// Drop the active conversation and its subscription.
    pub async fn deactivate(&self) {
        // Deactivation cannot fail: there is nothing to subscribe or load.
        let _ = self.activate(None).await;
    }

    pub async fn conversation_id(&self) -> Option<String> {
        let state = self.inner.lock().await;
        state
            .active
            .as_ref()
            .map(|active| active.log.conversation_id().to_string())
    }

    /// Fetch the active conversation's history and apply it to the log.
    ///
    /// Rows deleted upstream disappear. Rows received while the fetch was in
    /// flight and unsent placeholders are kept. On failure the error is
    /// recorded and the current list is kept.
    pub async fn load(&self) -> Result<Vec<DisplayMessage>, DeskError> {
        let (conversation_id, generation) = {
            let mut state = self.inner.lock().await;
            let Some(active) = state.active.as_mut() else {
                return Ok(Vec::new());
            };
            active.log.begin_load();
            let target = (active.log.conversation_id().to_string(), active.generation);
            state.loading = true;
            target
        };
        self.bump();

        let result = self.backend.list_messages(&conversation_id).await;

        let mut state = self.inner.lock().await;
        let current = state.generation == generation;
        if current {
            state.loading = false;
        }
        let outcome = match result {
            Ok(rows) => {
                trace!(%conversation_id, rows = rows.len(), "history fetched");
                let view = match state.active_at(generation) {
                    Some(active) => {
                        active.log.history_loaded(rows);
                        render(&active.log)
                    }
                    None => Vec::new(),
                };
                if current {
                    state.error = None;
                }
                Ok(view)
            }
            Err(e) => {
                if current {
                    state.error = Some(ClientError::from(&e));
                }
                Err(e)
            }
        };
        drop(state);
        self.bump();
        outcome
    }

    /// Send an agent message to the active conversation.
    pub async fn send(&self, content: &str, is_internal: bool) -> Result<Message, DeskError> {
        if content.trim().is_empty() {
            return Err(DeskError::Validation(
                "message content must not be empty".into(),
            ));
        }

        let (conversation_id, generation, local_id) = {
            let mut state = self.inner.lock().await;
            let Some(active) = state.active.as_mut() else {
                return Err(DeskError::Validation("no active conversation".into()));
            };
            let local_id = active.log.begin_send(content, is_internal);
            (
                active.log.conversation_id().to_string(),
                active.generation,
                local_id,
            )
        };
        self.bump();

        let req = SendMessageRequest {
            conversation_id,
            sender_type: SenderType::Agent,
            sender_customer_id: None,
            sender_agent_id: Some(self.agent_id.clone()),
            content: content.to_string(),
            is_internal,
        };
        let result = self.backend.send_message(&req).await;

        let mut state = self.inner.lock().await;
        let outcome = match result {
            Ok(row) => {
                match state.active_at(generation) {
                    Some(active) => active.log.send_succeeded(&local_id, row.clone()),
                    None => debug!(message_id = %row.id, "send completed after switching conversations"),
                }
                Ok(row)
            }
            Err(e) => {
                if let Some(active) = state.active_at(generation) {
                    active.log.send_failed(&local_id);
                }
                state.error = Some(ClientError::from(&e));
                Err(e)
            }
        };
        drop(state);
        self.bump();
        outcome
    }

    /// The active conversation's messages in display order.
    pub async fn messages(&self) -> Vec<DisplayMessage> {
        let state = self.inner.lock().await;
        state
            .active
            .as_ref()
            .map(|active| render(&active.log))
            .unwrap_or_default()
    }

    pub async fn error(&self) -> Option<ClientError> {
        self.inner.lock().await.error.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.inner.lock().await.loading
    }

    async fn record_error(&self, err: &DeskError) {
        self.inner.lock().await.error = Some(ClientError::from(err));
        self.bump();
    }

    fn spawn_pump(&self, mut subscription: Subscription, generation: u64) -> JoinHandle<()> {
        let inner: Weak<Mutex<ClientState>> = Arc::downgrade(&self.inner);
        let updates = Arc::clone(&self.updates);
        tokio::spawn(async move {
            while let Some(row) = subscription.recv().await {
                let Some(shared) = inner.upgrade() else {
                    break;
                };
                let mut state = shared.lock().await;
                let Some(active) = state.active_at(generation) else {
                    break;
                };
                let message_id = row.id.clone();
                let outcome = active.log.remote_insert(row);
                drop(state);
                trace!(%message_id, ?outcome, "realtime insert applied");
                if matches!(
                    outcome,
                    RemoteOutcome::Inserted | RemoteOutcome::Adopted { .. }
                ) {
                    updates.send_modify(|v| *v += 1);
                }
            }
        })
    }
}

fn render(log: &MessageLog) -> Vec<DisplayMessage> {
    log.entries().map(DisplayMessage::from).collect()
}
