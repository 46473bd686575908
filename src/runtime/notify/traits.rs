use std::time::Duration;
use strum::{Display, IntoStaticStr};

/// How loudly a notification surface should present an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Discrete user-visible events produced by the persistence pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationKind {
    AutoSaved,
    SaveRetry { attempt: u32, delay: Duration },
    SaveRejected { reason: String },
    SaveFailedFinal { attempts: u32 },
    ConnectionRestored,
    ConnectionLost,
}

impl NotificationKind {
    /// Stable event name, shared with the notification surface.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AutoSaved => "auto-saved",
            Self::SaveRetry { .. } => "save-retry",
            Self::SaveRejected { .. } => "save-rejected",
            Self::SaveFailedFinal { .. } => "save-failed-final",
            Self::ConnectionRestored => "connection-restored",
            Self::ConnectionLost => "connection-lost",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::AutoSaved => Severity::Success,
            Self::SaveRetry { .. } | Self::ConnectionLost => Severity::Warning,
            Self::SaveRejected { .. } | Self::SaveFailedFinal { .. } => Severity::Error,
            Self::ConnectionRestored => Severity::Info,
        }
    }

    /// Whether the surface should keep showing it until the user acts.
    pub fn is_persistent(&self) -> bool {
        matches!(
            self,
            Self::SaveRejected { .. } | Self::SaveFailedFinal { .. } | Self::ConnectionLost
        )
    }

    fn default_message(&self) -> String {
        match self {
            Self::AutoSaved => "All changes saved".into(),
            Self::SaveRetry { attempt, delay } => format!(
                "Save failed, retrying in {:.1}s (attempt {attempt})",
                delay.as_secs_f64()
            ),
            Self::SaveRejected { reason } => format!("The server rejected your changes: {reason}"),
            Self::SaveFailedFinal { attempts } => format!(
                "Could not save after {attempts} attempts. Your changes are kept on this device; please save manually."
            ),
            Self::ConnectionRestored => "Connection restored".into(),
            Self::ConnectionLost => {
                "You are offline. Changes will be saved when the connection returns.".into()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(kind: NotificationKind) -> Self {
        let message = kind.default_message();
        let severity = kind.severity();
        Self {
            kind,
            message,
            severity,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// Sink for user-visible notifications. Implement for any surface
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);

    /// Human-readable name of this notifier
    fn name(&self) -> &str;
}
