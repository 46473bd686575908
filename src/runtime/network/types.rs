use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Effective connection type as reported by the host platform.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
pub enum ConnectionType {
    #[default]
    #[serde(rename = "unknown")]
    #[strum(serialize = "unknown")]
    Unknown,
    #[serde(rename = "slow-2g")]
    #[strum(serialize = "slow-2g")]
    Slow2g,
    #[serde(rename = "2g")]
    #[strum(serialize = "2g")]
    TwoG,
    #[serde(rename = "3g")]
    #[strum(serialize = "3g")]
    ThreeG,
    #[serde(rename = "4g")]
    #[strum(serialize = "4g")]
    FourG,
}

impl ConnectionType {
    pub fn is_slow(self) -> bool {
        matches!(self, Self::Slow2g | Self::TwoG)
    }
}

/// Connectivity signals pushed by the host (OS reachability, browser
/// online/offline events, network information API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    Online,
    Offline,
    EffectiveType(ConnectionType),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkStatus {
    pub is_online: bool,
    pub is_slow_connection: bool,
    pub connection_type: ConnectionType,
    /// Last moment the client was known to be online; frozen while offline
    pub last_online: Option<DateTime<Utc>>,
    pub last_rtt_ms: Option<u64>,
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self {
            is_online: true,
            is_slow_connection: false,
            connection_type: ConnectionType::Unknown,
            last_online: Some(Utc::now()),
            last_rtt_ms: None,
        }
    }
}
