mod autosave;
mod cache;
mod core;
mod history;
mod network;
mod observability;
mod retry;

pub use autosave::{AutosaveConfig, AutosaveMode};
pub use cache::CacheConfig;
pub use self::core::Config;
pub use history::HistoryConfig;
pub use network::NetworkConfig;
pub use observability::ObservabilityConfig;
pub use retry::RetryConfig;
