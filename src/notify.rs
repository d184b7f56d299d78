use dashmap::DashMap;
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::limits::NOTIFY_CHANNEL_CAPACITY;
use crate::model::Event;

/// Per-court change feed. Every applied reservation event is broadcast to
/// the court's subscribers.
pub struct NotifyHub {
    channels: DashMap<Ulid, broadcast::Sender<Event>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to a court's events. Creates the channel if needed.
    pub fn subscribe(&self, court_id: Ulid) -> broadcast::Receiver<Event> {
        self.channels
            .entry(court_id)
            .or_insert_with(|| broadcast::channel(NOTIFY_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// No-op if nobody is listening.
    pub fn send(&self, event: &Event) {
        if let Some(sender) = self.channels.get(&event.court_id()) {
            let _ = sender.send(event.clone());
        }
    }
}
