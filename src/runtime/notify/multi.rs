use super::traits::{Notification, Notifier};

/// Forwards every notification to each inner notifier in order.
pub struct MultiNotifier {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl MultiNotifier {
    pub fn new(notifiers: Vec<Box<dyn Notifier>>) -> Self {
        Self { notifiers }
    }
}

impl Notifier for MultiNotifier {
    fn notify(&self, notification: &Notification) {
        for notifier in &self.notifiers {
            notifier.notify(notification);
        }
    }

    fn name(&self) -> &str {
        "multi"
    }
}
