use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `Memoria`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; glue code (config loading, wiring)
/// continues to use `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum MemoriaError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Save operation ──────────────────────────────────────────────────
    #[error("save: {0}")]
    Save(#[from] SaveError),

    // ── Autosave pipeline ───────────────────────────────────────────────
    #[error("autosave: {0}")]
    Autosave(#[from] AutosaveError),

    // ── Durable storage ─────────────────────────────────────────────────
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    // ── Network probing ─────────────────────────────────────────────────
    #[error("network: {0}")]
    Network(#[from] NetworkError),

    // ── Contract violations by the caller ───────────────────────────────
    #[error("state is not serializable: {0}")]
    Serialize(#[from] serde_json::Error),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("validation failed: {0}")]
    Validation(String),
}

// ─── Save errors ─────────────────────────────────────────────────────────────

/// Classified failure of a single save round-trip.
///
/// The save operation must pick a variant before handing the error back, so
/// the retry engine never has to guess whether another attempt can help.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    /// Network failure, timeout or dropped connection.
    #[error("transient failure: {0}")]
    Transient(String),

    /// 5xx responses plus 408/429, which resolve on their own.
    #[error("server responded {status}: {message}")]
    Server { status: u16, message: String },

    /// Validation failure (4xx). Retrying cannot change the outcome.
    #[error("rejected with {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl SaveError {
    /// Classify an HTTP status code that was not a success.
    ///
    /// 4xx client errors are non-retryable, except 408 Request Timeout and
    /// 429 Too Many Requests which are transient.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if (400..500).contains(&status) && status != 408 && status != 429 {
            Self::Rejected { status, message }
        } else {
            Self::Server { status, message }
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }
}

// ─── Retry errors ────────────────────────────────────────────────────────────

/// Terminal outcome of [`crate::persistence::retry::execute_with_retry`].
#[derive(Debug, Error)]
pub enum RetryError<E>
where
    E: std::error::Error + 'static,
{
    #[error("attempt {attempt} failed with a non-retryable error: {source}")]
    NonRetryable { attempt: u32, source: E },

    #[error("gave up after {attempts} attempt(s): {source}")]
    Exhausted { attempts: u32, source: E },

    #[error("cancelled before attempt {attempt}")]
    Cancelled { attempt: u32 },
}

impl<E> RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Number of the attempt that produced this outcome.
    pub fn attempt(&self) -> u32 {
        match self {
            Self::NonRetryable { attempt, .. } | Self::Cancelled { attempt } => *attempt,
            Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// `true` once the retry budget is spent, as opposed to "still retrying".
    pub fn gave_up(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

// ─── Autosave errors ─────────────────────────────────────────────────────────

/// Outcome of a failed `save_now` request, as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AutosaveError {
    #[error("save failed after {attempts} attempt(s): {source}")]
    Exhausted { attempts: u32, source: SaveError },

    #[error("save rejected: {0}")]
    Rejected(SaveError),

    #[error("client is offline; changes kept locally")]
    Offline,

    #[error("state could not be serialized: {0}")]
    Serialize(String),

    #[error("save cancelled")]
    Cancelled,

    #[error("autosave scheduler has shut down")]
    Closed,
}

// ─── Storage errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("quota exceeded while writing {key}")]
    QuotaExceeded { key: String },

    #[error("encoding: {0}")]
    Encoding(String),

    #[error("backend not available: {0}")]
    Unavailable(String),
}

// ─── Network errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("probe request failed: {0}")]
    Probe(String),

    #[error("probe timed out after {0}ms")]
    Timeout(u64),

    #[error("request failed: {0}")]
    Request(String),

    #[error("request returned status {0}")]
    Status(u16),

    #[error("response decode failed: {0}")]
    Decode(String),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, MemoriaError>;
