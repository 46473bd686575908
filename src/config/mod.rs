pub mod schema;

pub use schema::{
    AutosaveConfig, AutosaveMode, CacheConfig, Config, HistoryConfig, NetworkConfig,
    ObservabilityConfig, RetryConfig,
};
