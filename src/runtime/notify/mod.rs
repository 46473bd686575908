pub mod channel;
pub mod log;
pub mod multi;
pub mod noop;
pub mod traits;

pub use self::log::LogNotifier;
pub use channel::ChannelNotifier;
pub use multi::MultiNotifier;
pub use noop::NoopNotifier;
pub use traits::{Notification, NotificationKind, Notifier, Severity};

#[cfg(test)]
pub(crate) mod testing {
    use super::{Notification, Notifier};
    use std::sync::Mutex;

    /// Collects notifications so tests can assert on what the user would see.
    #[derive(Default)]
    pub(crate) struct RecordingNotifier {
        seen: Mutex<Vec<Notification>>,
    }

    impl RecordingNotifier {
        pub(crate) fn names(&self) -> Vec<&'static str> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .map(Notification::name)
                .collect()
        }

        pub(crate) fn all(&self) -> Vec<Notification> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notification: &Notification) {
            self.seen.lock().unwrap().push(notification.clone());
        }

        fn name(&self) -> &str {
            "recording"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingNotifier;
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    struct Shared(Arc<RecordingNotifier>);

    impl Notifier for Shared {
        fn notify(&self, notification: &Notification) {
            self.0.notify(notification);
        }

        fn name(&self) -> &str {
            "shared"
        }
    }

    #[test]
    fn kinds_have_stable_names_and_severities() {
        let retry = NotificationKind::SaveRetry {
            attempt: 1,
            delay: Duration::from_secs(1),
        };
        assert_eq!(retry.name(), "save-retry");
        assert_eq!(retry.severity(), Severity::Warning);
        assert!(!retry.is_persistent());

        let failed = NotificationKind::SaveFailedFinal { attempts: 3 };
        assert_eq!(failed.name(), "save-failed-final");
        assert_eq!(failed.severity(), Severity::Error);
        assert!(failed.is_persistent());
    }

    #[test]
    fn final_failure_message_asks_for_manual_save() {
        let n = Notification::new(NotificationKind::SaveFailedFinal { attempts: 3 });
        assert!(n.message.contains("save manually"));
        assert_eq!(n.severity.to_string(), "error");
    }

    #[test]
    fn with_message_overrides_default_text() {
        let n = Notification::new(NotificationKind::AutoSaved).with_message("Obituary saved");
        assert_eq!(n.message, "Obituary saved");
        assert_eq!(n.severity, Severity::Success);
    }

    #[test]
    fn multi_forwards_to_every_notifier() {
        let a = Arc::new(RecordingNotifier::default());
        let b = Arc::new(RecordingNotifier::default());
        let multi = MultiNotifier::new(vec![
            Box::new(Shared(Arc::clone(&a))),
            Box::new(NoopNotifier),
            Box::new(Shared(Arc::clone(&b))),
        ]);

        multi.notify(&Notification::new(NotificationKind::ConnectionLost));

        assert_eq!(a.names(), vec!["connection-lost"]);
        assert_eq!(b.names(), vec!["connection-lost"]);
        assert_eq!(multi.name(), "multi");
    }
}
