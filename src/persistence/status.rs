use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

/// Phase of the persistence pipeline, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SaveStatus {
    #[default]
    Idle,
    Unsaved,
    Saving,
    Retrying,
    Saved,
    Error,
}

impl SaveStatus {
    /// A save round-trip is currently in flight.
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Saving | Self::Retrying)
    }

    /// Work exists that the server has not acknowledged.
    pub fn has_unsynced_changes(self) -> bool {
        matches!(
            self,
            Self::Unsaved | Self::Saving | Self::Retrying | Self::Error
        )
    }
}

/// Everything a status indicator needs, published as one value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveSnapshot {
    pub status: SaveStatus,
    pub last_saved_at: Option<DateTime<Utc>>,
    /// Attempt number while `status == Retrying`
    pub retry_attempt: Option<u32>,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_renders_lowercase() {
        assert_eq!(SaveStatus::Retrying.to_string(), "retrying");
        assert_eq!(
            serde_json::to_string(&SaveStatus::Unsaved).unwrap(),
            "\"unsaved\""
        );
    }

    #[test]
    fn busy_and_unsynced_flags() {
        assert!(SaveStatus::Saving.is_busy());
        assert!(!SaveStatus::Error.is_busy());
        assert!(SaveStatus::Error.has_unsynced_changes());
        assert!(!SaveStatus::Saved.has_unsynced_changes());
        assert!(!SaveStatus::Idle.has_unsynced_changes());
    }
}
