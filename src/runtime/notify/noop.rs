use super::traits::{Notification, Notifier};

/// Notifier that drops everything
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    #[inline(always)]
    fn notify(&self, _notification: &Notification) {}

    fn name(&self) -> &str {
        "noop"
    }
}
