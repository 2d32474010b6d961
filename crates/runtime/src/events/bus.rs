//! Topic-based event bus implementation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::types::{ActionEvent, CombatEvent, TurnEvent};

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Turn and round boundaries
    Turn,
    /// Resolved and rejected requests
    Action,
    /// Encounter start and end
    Combat,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::Turn, Topic::Action, Topic::Combat];
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Turn(TurnEvent),
    Action(ActionEvent),
    Combat(CombatEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Turn(_) => Topic::Turn,
            Event::Action(_) => Topic::Action,
            Event::Combat(_) => Topic::Combat,
        }
    }
}

impl From<TurnEvent> for Event {
    fn from(event: TurnEvent) -> Self {
        Event::Turn(event)
    }
}

impl From<ActionEvent> for Event {
    fn from(event: ActionEvent) -> Self {
        Event::Action(event)
    }
}

impl From<CombatEvent> for Event {
    fn from(event: CombatEvent) -> Self {
        Event::Combat(event)
    }
}

/// Topic-based event bus
///
/// Consumers subscribe to specific topics and only receive the events they
/// care about. Every topic channel exists from construction on, so cloning
/// the bus shares the same channels. A separate stream carries every event in
/// publication order for consumers that need the interleaving across topics.
#[derive(Clone)]
pub struct EventBus {
    turn: broadcast::Sender<Event>,
    action: broadcast::Sender<Event>,
    combat: broadcast::Sender<Event>,
    all: broadcast::Sender<Event>,
}

impl EventBus {
    pub const DEFAULT_CAPACITY: usize = 128;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            turn: broadcast::channel(capacity).0,
            action: broadcast::channel(capacity).0,
            combat: broadcast::channel(capacity).0,
            all: broadcast::channel(capacity).0,
        }
    }

    fn channel(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Turn => &self.turn,
            Topic::Action => &self.action,
            Topic::Combat => &self.combat,
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: impl Into<Event>) {
        let event = event.into();
        let topic = event.topic();
        if self.all.receiver_count() > 0 {
            let _ = self.all.send(event.clone());
        }
        if self.channel(topic).send(event).is_err() {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!("No subscribers for topic {:?}", topic);
        }
    }

    /// Subscribe to a specific topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.channel(topic).subscribe()
    }

    /// Every event of every topic, in publication order.
    pub fn subscribe_all(&self) -> broadcast::Receiver<Event> {
        self.all.subscribe()
    }

    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> HashMap<Topic, broadcast::Receiver<Event>> {
        topics
            .iter()
            .map(|&topic| (topic, self.subscribe(topic)))
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use combat_core::EntityId;

    #[tokio::test]
    async fn subscribers_only_see_their_topic() {
        let bus = EventBus::with_capacity(8);
        let mut turns = bus.subscribe(Topic::Turn);
        let mut combat = bus.subscribe(Topic::Combat);

        bus.publish(TurnEvent::RoundAdvanced { round: 2 });
        bus.publish(TurnEvent::Started {
            entity: EntityId(1),
            round: 2,
        });

        assert_eq!(
            turns.recv().await.unwrap(),
            Event::Turn(TurnEvent::RoundAdvanced { round: 2 })
        );
        assert!(matches!(
            turns.recv().await.unwrap(),
            Event::Turn(TurnEvent::Started { .. })
        ));
        assert!(combat.try_recv().is_err());
    }

    #[test]
    fn firehose_keeps_order_across_topics() {
        let bus = EventBus::with_capacity(8);
        let mut all = bus.subscribe_all();

        bus.publish(TurnEvent::Started {
            entity: EntityId(1),
            round: 1,
        });
        bus.publish(CombatEvent::Ended {
            phase: combat_core::Phase::Victory,
            rounds: 1,
        });
        bus.publish(TurnEvent::RoundAdvanced { round: 2 });

        let topics: Vec<_> = std::iter::from_fn(|| all.try_recv().ok())
            .map(|event| event.topic())
            .collect();
        assert_eq!(topics, vec![Topic::Turn, Topic::Combat, Topic::Turn]);
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let bus = EventBus::new();
        bus.publish(TurnEvent::RoundAdvanced { round: 1 });
        let clone = bus.clone();
        let receivers = clone.subscribe_multiple(&Topic::ALL);
        assert_eq!(receivers.len(), 3);
    }
}
