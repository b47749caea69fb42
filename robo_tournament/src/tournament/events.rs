//! Change notifications for teams, groups and matches.
//!
//! The manager publishes a [`ChangeEvent`] after every successful mutation.
//! Delivery to UIs or other processes is up to whoever subscribes.

use super::models::{Bracket, GroupId, MatchId, TeamId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default buffered events per subscriber
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// An entity that changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entity", content = "id", rename_all = "snake_case")]
pub enum ChangeEvent {
    Team(TeamId),
    Group(GroupId),
    Match(MatchId),
    /// Groups of a bracket were created or torn down in bulk
    Bracket(Bracket),
}

/// Fan-out publisher of change events
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Publish a single event; no subscribers is fine
    pub fn publish(&self, event: ChangeEvent) {
        if self.sender.send(event).is_err() {
            log::trace!("No subscribers for {:?}", event);
        }
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = ChangeEvent>) {
        for event in events {
            self.publish(event);
        }
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let notifier = ChangeNotifier::default();
        let mut rx = notifier.subscribe();
        assert_eq!(notifier.sender.receiver_count(), 1);

        let team_id = Uuid::new_v4();
        notifier.publish_all([
            ChangeEvent::Team(team_id),
            ChangeEvent::Bracket(Bracket::new(1, 1)),
        ]);

        assert_eq!(rx.recv().await.unwrap(), ChangeEvent::Team(team_id));
        assert_eq!(
            rx.recv().await.unwrap(),
            ChangeEvent::Bracket(Bracket::new(1, 1))
        );
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let notifier = ChangeNotifier::new(4);
        notifier.publish(ChangeEvent::Match(Uuid::new_v4()));
        assert_eq!(notifier.sender.receiver_count(), 0);
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(ChangeEvent::Bracket(Bracket::new(2, 3))).unwrap();
        assert_eq!(json["entity"], "bracket");
        assert_eq!(json["id"]["category_id"], 2);
    }
}
