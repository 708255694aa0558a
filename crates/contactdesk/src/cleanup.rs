// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `contactdesk cleanup` command implementation.

use contactdesk_config::DeskConfig;
use contactdesk_core::DeskError;
use contactdesk_storage::{CleanupReport, SqliteStorage};

/// Run the timestamp cleanup against the configured database and print a summary.
pub async fn run_cleanup(config: &DeskConfig, dry_run: bool) -> Result<CleanupReport, DeskError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;

    let report = storage.cleanup(dry_run).await?;
    print!("{}", summary(&report));
    Ok(report)
}

fn summary(report: &CleanupReport) -> String {
    let verb = if report.dry_run { "would remove" } else { "removed" };
    format!(
        "conversations: {} -> {}\n\
         messages: {} -> {}\n\
         {verb} {} with null timestamps, {} with epoch-zero timestamps, {} orphaned messages, {} orphaned channel states\n",
        report.conversations_before,
        report.conversations_after,
        report.messages_before,
        report.messages_after,
        report.null_timestamp_removed,
        report.epoch_zero_removed,
        report.orphan_messages_removed,
        report.orphan_channel_state_removed,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_names_dry_run() {
        let report = CleanupReport {
            dry_run: true,
            conversations_before: 5,
            conversations_after: 5,
            messages_before: 9,
            messages_after: 9,
            null_timestamp_removed: 1,
            epoch_zero_removed: 2,
            orphan_messages_removed: 3,
            orphan_channel_state_removed: 4,
        };
        let text = summary(&report);
        assert!(text.contains("conversations: 5 -> 5"));
        assert!(text.contains("would remove 1 with null timestamps, 2 with epoch-zero"));
        assert!(text.ends_with("3 orphaned messages, 4 orphaned channel states\n"));
    }

    #[tokio::test]
    async fn cleanup_on_fresh_database_removes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DeskConfig::default();
        config.storage.database_path = dir.path().join("desk.db").to_string_lossy().to_string();

        let report = run_cleanup(&config, false).await.unwrap();
        assert!(!report.dry_run);
        assert_eq!(report.conversations_removed(), 0);
        assert_eq!(report.orphan_messages_removed, 0);
    }
}
