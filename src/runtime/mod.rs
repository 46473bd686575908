pub mod http_client;
pub mod logging;
pub mod metrics;
pub mod network;
pub mod notify;

pub use metrics::{RequestMetrics, RequestStats};
pub use network::{ConnectivityEvent, NetworkMonitor, NetworkStatus};
pub use notify::{Notification, NotificationKind, Notifier, Severity};
