use super::traits::{Notification, NotificationKind, Notifier, Severity};
use tracing::{error, info, warn};

/// Routes every notification through tracing
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) {
        let event = notification.name();
        let message = notification.message.as_str();
        match &notification.kind {
            NotificationKind::SaveRetry { attempt, delay } => {
                let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                warn!(event, attempt, delay_ms = ms, "{message}");
            }
            NotificationKind::SaveFailedFinal { attempts } => {
                error!(event, attempts, "{message}");
            }
            _ => match notification.severity {
                Severity::Info | Severity::Success => info!(event, "{message}"),
                Severity::Warning => warn!(event, "{message}"),
                Severity::Error => error!(event, "{message}"),
            },
        }
    }

    fn name(&self) -> &str {
        "log"
    }
}
