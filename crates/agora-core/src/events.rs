//! Event fan-out and in-process history.
//!
//! [`EventBus`] broadcasts every committed event to live subscribers (the
//! observer's websocket, tests, recorders). [`RecentEvents`] keeps a bounded
//! tail of the same stream for observation building and late joiners.

use std::collections::VecDeque;

use agora_types::Event;
use tokio::sync::broadcast;

/// Broadcast channel for committed events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// A bus holding at most `capacity` unread events per subscriber.
    /// Slow subscribers lag and skip rather than block the scheduler.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. No-op if there are no subscribers.
    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// Publish a batch in order.
    pub fn publish_all(&self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.publish(event);
        }
    }

    /// A new receiver that sees every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Bounded ring of the most recent events, oldest first.
#[derive(Debug, Clone)]
pub struct RecentEvents {
    events: VecDeque<Event>,
    capacity: usize,
}

impl RecentEvents {
    /// An empty history keeping at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    /// Append events, evicting the oldest past capacity.
    pub fn extend(&mut self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            if self.capacity == 0 {
                return;
            }
            if self.events.len() >= self.capacity {
                self.events.pop_front();
            }
            self.events.push_back(event);
        }
    }

    /// The retained events as one contiguous slice, oldest first.
    pub fn as_slice(&mut self) -> &[Event] {
        self.events.make_contiguous()
    }

    /// The retained events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// The last `limit` events at or after `since_tick`, oldest first.
    pub fn since(&self, since_tick: u64, limit: usize) -> Vec<Event> {
        let mut tail: Vec<Event> = self
            .events
            .iter()
            .rev()
            .take_while(|e| e.tick >= since_tick)
            .take(limit)
            .cloned()
            .collect();
        tail.reverse();
        tail
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use agora_types::EventType;
    use serde_json::json;

    use super::*;

    fn event(tick: u64) -> Event {
        Event::new(EventType::TickCompleted, tick, None, json!({}))
    }

    #[tokio::test]
    async fn subscribers_receive_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        bus.publish_all([event(1), event(2)]);
        assert_eq!(rx.recv().await.unwrap().tick, 1);
        assert_eq!(rx.recv().await.unwrap().tick, 2);
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let bus = EventBus::new(0);
        bus.publish(event(1));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn history_evicts_oldest() {
        let mut recent = RecentEvents::new(3);
        recent.extend((1..=5).map(event));
        let ticks: Vec<u64> = recent.as_slice().iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![3, 4, 5]);
        assert_eq!(recent.len(), 3);
    }

    #[test]
    fn since_returns_the_newest_tail() {
        let mut recent = RecentEvents::new(10);
        recent.extend((1..=6).map(event));
        let ticks: Vec<u64> = recent.since(3, 2).iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![5, 6]);
        assert!(recent.since(9, 10).is_empty());
        recent.clear();
        assert!(recent.is_empty());
    }
}
