// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the store traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use contactdesk_config::model::StorageConfig;
use contactdesk_core::types::{
    Channel, ChannelConversationState, Conversation, ConversationFilter, ConversationStats,
    ConversationStatus, ConversationUpdate, Customer, Message, NewConversation, Priority,
    SendMessageRequest,
};
use contactdesk_core::{ChannelStateStore, ConversationStore, DeskError};

use crate::database::Database;
use crate::maintenance::{self, CleanupReport};
use crate::queries;

/// SQLite-backed storage.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is opened on the first call to
/// [`SqliteStorage::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database and run migrations.
    pub async fn initialize(&self) -> Result<(), DeskError> {
        let db =
            Database::open_with_options(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| DeskError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    /// Returns the underlying Database, or an error if not initialized.
    pub fn database(&self) -> Result<&Database, DeskError> {
        self.db.get().ok_or_else(|| DeskError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// Remove conversations with invalid timestamps and orphaned messages.
    pub async fn cleanup(&self, dry_run: bool) -> Result<CleanupReport, DeskError> {
        maintenance::cleanup_invalid_conversations(self.database()?, dry_run).await
    }
}

#[async_trait]
impl ConversationStore for SqliteStorage {
    // --- Conversation operations ---

    async fn create_conversation(&self, new: &NewConversation) -> Result<Conversation, DeskError> {
        queries::conversations::create_conversation(self.database()?, new).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, DeskError> {
        queries::conversations::get_conversation(self.database()?, id).await
    }

    async fn list_conversations(
        &self,
        filter: &ConversationFilter,
    ) -> Result<Vec<Conversation>, DeskError> {
        queries::conversations::list_conversations(self.database()?, filter).await
    }

    async fn update_conversation(
        &self,
        id: &str,
        update: &ConversationUpdate,
    ) -> Result<Option<Conversation>, DeskError> {
        queries::conversations::update_conversation(self.database()?, id, update).await
    }

    async fn escalate_conversation(&self, id: &str) -> Result<bool, DeskError> {
        queries::conversations::escalate_conversation(self.database()?, id).await
    }

    async fn conversation_stats(&self) -> Result<ConversationStats, DeskError> {
        queries::conversations::conversation_stats(self.database()?).await
    }

    async fn find_open_conversation(
        &self,
        customer_id: &str,
        channel: Channel,
    ) -> Result<Option<Conversation>, DeskError> {
        queries::conversations::find_open_conversation(self.database()?, customer_id, channel).await
    }

    // --- Message operations ---

    async fn insert_message(&self, req: &SendMessageRequest) -> Result<Message, DeskError> {
        queries::messages::insert_message(self.database()?, req)
            .await?
            .ok_or_else(|| DeskError::conversation_not_found(&req.conversation_id))
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, DeskError> {
        queries::messages::list_messages(self.database()?, conversation_id).await
    }

    // --- Customer operations ---

    async fn find_or_create_customer(
        &self,
        channel: Channel,
        address: &str,
        display_name: Option<&str>,
    ) -> Result<Customer, DeskError> {
        queries::customers::find_or_create_customer(self.database()?, channel, address, display_name)
            .await
    }

    async fn health_check(&self) -> Result<(), DeskError> {
        self.database()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)
    }

    async fn close(&self) -> Result<(), DeskError> {
        self.database()?.checkpoint().await
    }
}

#[async_trait]
impl ChannelStateStore for SqliteStorage {
    async fn upsert_channel_state(
        &self,
        conversation_id: &str,
        channel: Channel,
        external_ref: Option<&str>,
    ) -> Result<(), DeskError> {
        queries::channel_state::upsert_channel_state(
            self.database()?,
            conversation_id,
            channel,
            external_ref,
        )
        .await
    }

    async fn get_channel_state(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ChannelConversationState>, DeskError> {
        queries::channel_state::get_channel_state(self.database()?, conversation_id).await
    }

    async fn update_channel_state(
        &self,
        conversation_id: &str,
        status: ConversationStatus,
        priority: Option<Priority>,
    ) -> Result<bool, DeskError> {
        queries::channel_state::update_channel_state(
            self.database()?,
            conversation_id,
            status,
            priority,
        )
        .await
    }

    async fn find_by_external_ref(
        &self,
        channel: Channel,
        external_ref: &str,
    ) -> Result<Option<ChannelConversationState>, DeskError> {
        queries::channel_state::find_by_external_ref(self.database()?, channel, external_ref).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contactdesk_core::types::SenderType;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init_test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
        storage.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn uninitialized_storage_errors() {
        let storage = SqliteStorage::new(make_config("/nonexistent/never.db"));
        let err = storage.get_conversation("x").await.unwrap_err();
        assert!(err.to_string().contains("not initialized"));
    }

    #[tokio::test]
    async fn double_initialize_is_rejected() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("twice.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn message_into_missing_conversation_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(make_config(dir.path().join("m.db").to_str().unwrap()));
        storage.initialize().await.unwrap();

        let req = SendMessageRequest {
            conversation_id: "ghost".into(),
            sender_type: SenderType::Customer,
            sender_customer_id: Some("cust-1".into()),
            sender_agent_id: None,
            content: "hello".into(),
            is_internal: false,
        };
        let err = storage.insert_message(&req).await.unwrap_err();
        assert!(matches!(err, DeskError::NotFound { entity: "conversation", .. }));
        storage.close().await.unwrap();
    }
}
