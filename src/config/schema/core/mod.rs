mod env_overrides;
mod loader;
mod types;

pub use types::Config;

/// Serializes tests that read or write `MEMORIA_*` variables.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::LazyLock<std::sync::Mutex<()>> =
    std::sync::LazyLock::new(|| std::sync::Mutex::new(()));
