mod monitor;
mod probe;
mod types;

pub use monitor::{NetworkMonitor, NetworkOptions};
pub use probe::{HttpProbe, LatencyProbe};
pub use types::{ConnectionType, ConnectivityEvent, NetworkStatus};
