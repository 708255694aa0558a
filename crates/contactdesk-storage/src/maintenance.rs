// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timestamp-validity cleanup.
//!
//! A conversation is invalid when `start_time` or `last_message_time` is
//! null or sits exactly at the Unix epoch origin. Cleanup runs three steps,
//! each in its own transaction:
//!
//! 1. delete conversations with a null temporal field,
//! 2. delete remaining conversations with an epoch-zero temporal field,
//! 3. delete messages and channel state whose conversation no longer exists.
//!
//! A failing step rolls back and aborts the steps after it.

use contactdesk_core::DeskError;
use contactdesk_core::types::parse_timestamp;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, params};
use tracing::{debug, info};

use crate::database::{Database, map_tr_err};

/// Outcome of a cleanup run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Nothing was deleted; removal counts are what a real run would remove.
    pub dry_run: bool,
    pub conversations_before: i64,
    pub conversations_after: i64,
    pub messages_before: i64,
    pub messages_after: i64,
    pub null_timestamp_removed: usize,
    pub epoch_zero_removed: usize,
    pub orphan_messages_removed: usize,
    /// `channel_conversations` rows left behind by removed conversations.
    pub orphan_channel_state_removed: usize,
}

impl CleanupReport {
    pub fn conversations_removed(&self) -> usize {
        self.null_timestamp_removed + self.epoch_zero_removed
    }
}

/// Run the cleanup against the database.
pub async fn cleanup_invalid_conversations(
    db: &Database,
    dry_run: bool,
) -> Result<CleanupReport, DeskError> {
    let report = db
        .connection()
        .call(move |conn| -> Result<CleanupReport, rusqlite::Error> {
            if dry_run {
                run_dry(conn)
            } else {
                run(conn)
            }
        })
        .await
        .map_err(map_tr_err)?;

    info!(
        dry_run = report.dry_run,
        null_timestamp = report.null_timestamp_removed,
        epoch_zero = report.epoch_zero_removed,
        orphan_messages = report.orphan_messages_removed,
        orphan_channel_state = report.orphan_channel_state_removed,
        conversations_after = report.conversations_after,
        messages_after = report.messages_after,
        "cleanup finished"
    );
    Ok(report)
}

fn run(conn: &mut Connection) -> Result<CleanupReport, rusqlite::Error> {
    let mut report = CleanupReport {
        conversations_before: count(conn, "conversations")?,
        messages_before: count(conn, "messages")?,
        ..Default::default()
    };

    let tx = conn.transaction()?;
    report.null_timestamp_removed = delete_null_timestamps(&tx)?;
    tx.commit()?;
    debug!(removed = report.null_timestamp_removed, "null-timestamp step committed");

    let tx = conn.transaction()?;
    report.epoch_zero_removed = delete_epoch_zero(&tx)?;
    tx.commit()?;
    debug!(removed = report.epoch_zero_removed, "epoch-zero step committed");

    let tx = conn.transaction()?;
    report.orphan_messages_removed = delete_orphan_messages(&tx)?;
    report.orphan_channel_state_removed = delete_orphan_channel_state(&tx)?;
    tx.commit()?;
    debug!(
        messages = report.orphan_messages_removed,
        channel_state = report.orphan_channel_state_removed,
        "orphan step committed"
    );

    report.conversations_after = count(conn, "conversations")?;
    report.messages_after = count(conn, "messages")?;
    Ok(report)
}

/// All three steps inside one transaction that is rolled back.
fn run_dry(conn: &mut Connection) -> Result<CleanupReport, rusqlite::Error> {
    let tx = conn.transaction()?;
    let mut report = CleanupReport {
        dry_run: true,
        conversations_before: count(&tx, "conversations")?,
        messages_before: count(&tx, "messages")?,
        ..Default::default()
    };
    report.null_timestamp_removed = delete_null_timestamps(&tx)?;
    report.epoch_zero_removed = delete_epoch_zero(&tx)?;
    report.orphan_messages_removed = delete_orphan_messages(&tx)?;
    report.orphan_channel_state_removed = delete_orphan_channel_state(&tx)?;
    report.conversations_after = report.conversations_before;
    report.messages_after = report.messages_before;
    tx.rollback()?;
    Ok(report)
}

fn count(conn: &Connection, table: &str) -> Result<i64, rusqlite::Error> {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
}

fn delete_null_timestamps(conn: &Connection) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "DELETE FROM conversations WHERE start_time IS NULL OR last_message_time IS NULL",
        [],
    )
}

fn delete_epoch_zero(conn: &Connection) -> Result<usize, rusqlite::Error> {
    let doomed: Vec<String> = {
        let mut stmt =
            conn.prepare("SELECT id, start_time, last_message_time FROM conversations")?;
        let mut rows = stmt.query([])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            if is_epoch_zero(row.get_ref(1)?) || is_epoch_zero(row.get_ref(2)?) {
                ids.push(row.get(0)?);
            }
        }
        ids
    };

    let mut stmt = conn.prepare("DELETE FROM conversations WHERE id = ?1")?;
    let mut removed = 0;
    for id in &doomed {
        removed += stmt.execute(params![id])?;
    }
    Ok(removed)
}

fn delete_orphan_messages(conn: &Connection) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "DELETE FROM messages
         WHERE NOT EXISTS (SELECT 1 FROM conversations c WHERE c.id = messages.conversation_id)",
        [],
    )
}

fn delete_orphan_channel_state(conn: &Connection) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "DELETE FROM channel_conversations
         WHERE NOT EXISTS (
             SELECT 1 FROM conversations c WHERE c.id = channel_conversations.conversation_id
         )",
        [],
    )
}

/// Whether a stored timestamp value resolves to exactly the epoch origin.
///
/// Numeric zero counts, as does text that is numeric zero or a date-time at
/// 1970-01-01T00:00:00Z. Unparseable text does not.
pub fn is_epoch_zero(value: ValueRef<'_>) -> bool {
    match value {
        ValueRef::Integer(i) => i == 0,
        ValueRef::Real(f) => f == 0.0,
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).is_ok_and(text_is_epoch_zero),
        ValueRef::Null | ValueRef::Blob(_) => false,
    }
}

fn text_is_epoch_zero(raw: &str) -> bool {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<f64>() {
        return n == 0.0;
    }
    parse_timestamp(raw).is_some_and(|ts| ts.timestamp() == 0 && ts.timestamp_subsec_nanos() == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        (db, dir)
    }

    /// Seeds five conversations with one message each plus one orphan:
    /// valid, null start, null last, integer-zero start, text-epoch last.
    /// `valid` and `null-start` also carry channel state.
    async fn seed(db: &Database) {
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                let ok = "2026-01-01T00:00:00.000Z";
                let rows: [(&str, rusqlite::types::Value, rusqlite::types::Value); 5] = [
                    ("valid", ok.to_string().into(), ok.to_string().into()),
                    ("null-start", rusqlite::types::Value::Null, ok.to_string().into()),
                    ("null-last", ok.to_string().into(), rusqlite::types::Value::Null),
                    ("int-zero", 0i64.into(), ok.to_string().into()),
                    (
                        "text-epoch",
                        ok.to_string().into(),
                        "1970-01-01 00:00:00".to_string().into(),
                    ),
                ];
                for (id, start, last) in rows {
                    conn.execute(
                        "INSERT INTO conversations (id, customer_id, start_time, last_message_time, created_at)
                         VALUES (?1, 'cust', ?2, ?3, ?4)",
                        params![id, start, last, ok],
                    )?;
                    conn.execute(
                        "INSERT INTO messages (id, conversation_id, sender_type, sender_customer_id, content, created_at)
                         VALUES (?1, ?2, 'customer', 'cust', 'hi', ?3)",
                        params![format!("msg-{id}"), id, ok],
                    )?;
                }
                conn.execute(
                    "INSERT INTO messages (id, conversation_id, sender_type, sender_customer_id, content, created_at)
                     VALUES ('msg-orphan', 'gone', 'customer', 'cust', 'hi', ?1)",
                    params![ok],
                )?;
                for id in ["valid", "null-start"] {
                    conn.execute(
                        "INSERT INTO channel_conversations (conversation_id, channel, status, priority, updated_at)
                         VALUES (?1, 'chat', 'open', 'medium', ?2)",
                        params![id, ok],
                    )?;
                }
                Ok(())
            })
            .await
            .unwrap();
    }

    /// (conversations, messages, channel_conversations)
    async fn row_counts(db: &Database) -> (i64, i64, i64) {
        db.connection()
            .call(|conn| -> Result<_, rusqlite::Error> {
                Ok((
                    count(conn, "conversations")?,
                    count(conn, "messages")?,
                    count(conn, "channel_conversations")?,
                ))
            })
            .await
            .unwrap()
    }

    #[test]
    fn epoch_zero_detection() {
        assert!(is_epoch_zero(ValueRef::Integer(0)));
        assert!(is_epoch_zero(ValueRef::Real(0.0)));
        assert!(is_epoch_zero(ValueRef::Text(b"0")));
        assert!(is_epoch_zero(ValueRef::Text(b"1970-01-01T00:00:00Z")));
        assert!(is_epoch_zero(ValueRef::Text(b"1970-01-01T00:00:00.000+00:00")));
        assert!(is_epoch_zero(ValueRef::Text(b"1970-01-01 00:00:00")));

        assert!(!is_epoch_zero(ValueRef::Null));
        assert!(!is_epoch_zero(ValueRef::Integer(1)));
        assert!(!is_epoch_zero(ValueRef::Text(b"1970-01-01T00:00:00.001Z")));
        assert!(!is_epoch_zero(ValueRef::Text(b"not a date")));
        assert!(!is_epoch_zero(ValueRef::Text(b"2999-01-01T00:00:00Z")));
    }

    #[tokio::test]
    async fn cleanup_removes_invalid_rows_and_orphans() {
        let (db, _dir) = setup_db().await;
        seed(&db).await;

        let report = cleanup_invalid_conversations(&db, false).await.unwrap();
        assert!(!report.dry_run);
        assert_eq!(report.conversations_before, 5);
        assert_eq!(report.messages_before, 6);
        assert_eq!(report.null_timestamp_removed, 2);
        assert_eq!(report.epoch_zero_removed, 2);
        assert_eq!(report.orphan_messages_removed, 5);
        assert_eq!(report.orphan_channel_state_removed, 1);
        assert_eq!(report.conversations_after, 1);
        assert_eq!(report.messages_after, 1);
        assert_eq!(
            report.conversations_before - report.conversations_after,
            report.conversations_removed() as i64
        );

        let again = cleanup_invalid_conversations(&db, false).await.unwrap();
        assert_eq!(again.conversations_removed(), 0);
        assert_eq!(again.orphan_messages_removed, 0);
        assert_eq!(again.orphan_channel_state_removed, 0);
        assert_eq!(row_counts(&db).await, (1, 1, 1));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn dry_run_deletes_nothing() {
        let (db, _dir) = setup_db().await;
        seed(&db).await;

        let report = cleanup_invalid_conversations(&db, true).await.unwrap();
        assert!(report.dry_run);
        assert_eq!(report.conversations_removed(), 4);
        assert_eq!(report.orphan_messages_removed, 5);
        assert_eq!(report.orphan_channel_state_removed, 1);
        assert_eq!(report.conversations_after, 5);
        assert_eq!(report.messages_after, 6);

        let real = cleanup_invalid_conversations(&db, false).await.unwrap();
        assert_eq!(real.conversations_before, 5);
        assert_eq!(real.conversations_removed(), 4);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn failing_step_keeps_earlier_commits_and_skips_later_steps() {
        let (db, _dir) = setup_db().await;
        seed(&db).await;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch(
                    "CREATE TRIGGER pin_int_zero BEFORE DELETE ON conversations
                     WHEN old.id = 'int-zero'
                     BEGIN SELECT RAISE(ABORT, 'row is pinned'); END;",
                )
            })
            .await
            .unwrap();

        let err = cleanup_invalid_conversations(&db, false).await.unwrap_err();
        assert!(matches!(err, DeskError::Storage { .. }), "{err:?}");

        // Null-timestamp deletions committed; the epoch step rolled back as a
        // whole, so text-epoch survives too; orphans were never swept.
        assert_eq!(row_counts(&db).await, (3, 6, 2));
        db.close().await.unwrap();
    }
}
