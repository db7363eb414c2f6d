//! Live-line broker.
//!
//! Each explored line is fanned out to whoever is watching its
//! `(game, ply)` topic when it is stored. Topics have explicit subscriber
//! lists; a [`LineSubscription`] removes itself when dropped, so a closed
//! `WebSocket` leaves nothing behind. There is no replay: a subscriber only
//! sees lines published after it subscribed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use gambit_types::{GameId, StoredLine};
use tokio::sync::mpsc;

/// Topic name for the lines of one `(game, ply)` pair.
pub fn line_topic(game_id: GameId, ply: u32) -> String {
    format!("line-{game_id}-{ply}")
}

#[derive(Debug, Default)]
struct Topics {
    next_id: u64,
    subscribers: HashMap<String, Vec<(u64, mpsc::UnboundedSender<StoredLine>)>>,
}

/// Per-topic fan-out of stored lines.
///
/// Cheap to clone; clones share the same subscriber lists.
#[derive(Debug, Clone, Default)]
pub struct LineBroker {
    topics: Arc<Mutex<Topics>>,
}

impl LineBroker {
    /// Create a broker with no topics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start receiving lines published on `topic`.
    pub fn subscribe(&self, topic: &str) -> LineSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = match self.topics.lock() {
            Ok(mut topics) => {
                let id = topics.next_id;
                topics.next_id = topics.next_id.wrapping_add(1);
                topics
                    .subscribers
                    .entry(topic.to_owned())
                    .or_default()
                    .push((id, tx));
                id
            }
            // A poisoned broker never delivers; the receiver just sees a
            // closed channel once `tx` is dropped here.
            Err(_) => u64::MAX,
        };

        tracing::debug!(topic, id, "Line subscriber added");
        LineSubscription {
            topic: topic.to_owned(),
            id,
            rx,
            topics: Arc::clone(&self.topics),
        }
    }

    /// Deliver `line` to every current subscriber of `topic`.
    ///
    /// Returns the number of subscribers that received it. Subscribers
    /// whose receiving side is gone are pruned.
    pub fn publish(&self, topic: &str, line: &StoredLine) -> usize {
        let Ok(mut topics) = self.topics.lock() else {
            return 0;
        };
        let Some(subscribers) = topics.subscribers.get_mut(topic) else {
            return 0;
        };

        subscribers.retain(|(_, tx)| tx.send(line.clone()).is_ok());
        let delivered = subscribers.len();
        if delivered == 0 {
            topics.subscribers.remove(topic);
        }

        tracing::debug!(topic, delivered, "Line published");
        delivered
    }

    /// Number of live subscribers on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        let Ok(topics) = self.topics.lock() else {
            return 0;
        };
        topics.subscribers.get(topic).map_or(0, Vec::len)
    }

    /// Number of topics with at least one subscriber.
    pub fn topic_count(&self) -> usize {
        let Ok(topics) = self.topics.lock() else {
            return 0;
        };
        topics.subscribers.len()
    }
}

/// A live subscription to one topic. Unsubscribes on drop.
#[derive(Debug)]
pub struct LineSubscription {
    topic: String,
    id: u64,
    rx: mpsc::UnboundedReceiver<StoredLine>,
    topics: Arc<Mutex<Topics>>,
}

impl LineSubscription {
    /// The topic this subscription listens on.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the next line. Returns `None` if the broker is gone.
    pub async fn recv(&mut self) -> Option<StoredLine> {
        self.rx.recv().await
    }
}

impl Drop for LineSubscription {
    fn drop(&mut self) {
        let Ok(mut topics) = self.topics.lock() else {
            return;
        };
        if let Some(subscribers) = topics.subscribers.get_mut(&self.topic) {
            subscribers.retain(|(id, _)| *id != self.id);
            if subscribers.is_empty() {
                topics.subscribers.remove(&self.topic);
            }
        }
        tracing::debug!(topic = %self.topic, id = self.id, "Line subscriber removed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(rank: u8) -> StoredLine {
        StoredLine {
            game_id: GameId::new(),
            ply: 3,
            rank,
            score_unit: None,
            score_value: None,
            positions: Vec::new(),
        }
    }

    #[test]
    fn topic_names_game_and_ply() {
        let game_id = GameId::new();
        assert_eq!(line_topic(game_id, 12), format!("line-{game_id}-12"));
    }

    #[tokio::test]
    async fn every_subscriber_receives_once() {
        let broker = LineBroker::new();
        let mut first = broker.subscribe("line-a-1");
        let mut second = broker.subscribe("line-a-1");

        assert_eq!(broker.publish("line-a-1", &line(1)), 2);

        assert_eq!(first.recv().await.map(|l| l.rank), Some(1));
        assert_eq!(second.recv().await.map(|l| l.rank), Some(1));
        assert!(first.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn topics_are_isolated() {
        let broker = LineBroker::new();
        let mut watching = broker.subscribe("line-a-1");
        let _other = broker.subscribe("line-a-2");

        assert_eq!(broker.publish("line-a-2", &line(2)), 1);
        assert!(watching.rx.try_recv().is_err());
    }

    #[test]
    fn no_replay_for_late_subscribers() {
        let broker = LineBroker::new();
        assert_eq!(broker.publish("line-a-1", &line(1)), 0);

        let mut late = broker.subscribe("line-a-1");
        assert!(late.rx.try_recv().is_err());
    }

    #[test]
    fn drop_unsubscribes_and_removes_empty_topic() {
        let broker = LineBroker::new();
        let first = broker.subscribe("line-a-1");
        let second = broker.subscribe("line-a-1");
        assert_eq!(broker.subscriber_count("line-a-1"), 2);

        drop(first);
        assert_eq!(broker.subscriber_count("line-a-1"), 1);
        assert_eq!(second.topic(), "line-a-1");

        drop(second);
        assert_eq!(broker.subscriber_count("line-a-1"), 0);
        assert_eq!(broker.topic_count(), 0);
    }
}
