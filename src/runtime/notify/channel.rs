use super::traits::{Notification, Notifier};
use tokio::sync::broadcast;

/// Fans notifications out to any number of UI subscribers.
///
/// Slow subscribers lag and lose the oldest events; a notification is never
/// worth blocking the save pipeline for.
pub struct ChannelNotifier {
    tx: broadcast::Sender<Notification>,
}

impl ChannelNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: &Notification) {
        // No subscribers is fine: nothing is rendering right now.
        let _ = self.tx.send(notification.clone());
    }

    fn name(&self) -> &str {
        "channel"
    }
}
