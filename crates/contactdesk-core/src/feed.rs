// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-conversation change feed.
//!
//! Every successful message insert is published here. Realtime subscribers
//! receive only the inserts of the conversation they subscribed to.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::types::Message;

/// Default number of frames buffered per conversation before slow
/// subscribers start lagging.
pub const DEFAULT_FEED_CAPACITY: usize = 256;

/// Fan-out of message inserts keyed by conversation id.
#[derive(Clone)]
pub struct ChangeFeed {
    topics: Arc<DashMap<String, broadcast::Sender<Message>>>,
    capacity: usize,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to inserts for one conversation.
    pub fn subscribe(&self, conversation_id: &str) -> broadcast::Receiver<Message> {
        self.topics
            .entry(conversation_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publish an inserted message to its conversation's subscribers.
    ///
    /// Returns the number of subscribers that received it. A topic with no
    /// remaining subscribers is dropped.
    pub fn publish(&self, message: &Message) -> usize {
        let conversation_id = &message.conversation_id;
        let delivered = match self.topics.get(conversation_id) {
            Some(sender) => sender.send(message.clone()).unwrap_or(0),
            None => 0,
        };
        if delivered == 0 {
            self.topics
                .remove_if(conversation_id, |_, sender| sender.receiver_count() == 0);
        }
        tracing::trace!(conversation_id = %conversation_id, delivered, "published message insert");
        delivered
    }

    /// Drop the conversation's topic if nobody is subscribed to it anymore.
    ///
    /// Call after a subscriber's receiver has been dropped. Returns true when
    /// the topic was removed.
    pub fn prune(&self, conversation_id: &str) -> bool {
        self.topics
            .remove_if(conversation_id, |_, sender| sender.receiver_count() == 0)
            .is_some()
    }

    /// Number of conversations with a live topic.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Number of live subscribers for a conversation.
    pub fn subscriber_count(&self, conversation_id: &str) -> usize {
        self.topics
            .get(conversation_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SenderType;
    use chrono::Utc;

    fn message(id: &str, conversation_id: &str) -> Message {
        Message {
            id: id.into(),
            conversation_id: conversation_id.into(),
            sender_type: SenderType::Customer,
            sender_customer_id: Some("cust-1".into()),
            sender_agent_id: None,
            content: "hi".into(),
            is_internal: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn subscribers_only_see_their_conversation() {
        let feed = ChangeFeed::new(8);
        let mut a = feed.subscribe("conv-a");
        let mut b = feed.subscribe("conv-b");

        assert_eq!(feed.publish(&message("m-1", "conv-a")), 1);
        assert_eq!(feed.publish(&message("m-2", "conv-b")), 1);

        assert_eq!(a.recv().await.unwrap().id, "m-1");
        assert_eq!(b.recv().await.unwrap().id, "m-2");
        assert!(a.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_no_op() {
        let feed = ChangeFeed::default();
        assert_eq!(feed.publish(&message("m-1", "conv-a")), 0);
        assert_eq!(feed.subscriber_count("conv-a"), 0);
    }

    #[tokio::test]
    async fn dropped_subscribers_are_pruned() {
        let feed = ChangeFeed::new(4);
        let rx = feed.subscribe("conv-a");
        assert_eq!(feed.subscriber_count("conv-a"), 1);
        drop(rx);
        assert_eq!(feed.publish(&message("m-1", "conv-a")), 0);
        assert!(feed.topics.get("conv-a").is_none());
    }

    #[test]
    fn prune_releases_topics_without_a_publish() {
        let feed = ChangeFeed::new(4);
        for n in 0..1000 {
            let id = format!("conv-{n}");
            drop(feed.subscribe(&id));
            assert!(feed.prune(&id));
        }
        assert_eq!(feed.topic_count(), 0);
    }

    #[test]
    fn prune_keeps_topics_with_live_subscribers() {
        let feed = ChangeFeed::new(4);
        let kept = feed.subscribe("conv-a");
        let dropped = feed.subscribe("conv-a");
        drop(dropped);

        assert!(!feed.prune("conv-a"));
        assert_eq!(feed.subscriber_count("conv-a"), 1);
        assert!(!feed.prune("conv-unknown"));

        drop(kept);
        assert!(feed.prune("conv-a"));
        assert_eq!(feed.topic_count(), 0);
    }
}
