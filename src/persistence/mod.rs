//! Resilient persistence: change detection, retrying saves and the autosave
//! scheduler that drives them.

pub mod change;
pub mod http;
pub mod retry;
pub mod scheduler;
pub mod status;

pub use change::{ChangeDetector, canonical_json};
pub use http::HttpSaver;
pub use retry::{RetryAttempt, RetryPolicy, Retryable, execute_with_retry};
pub use scheduler::{AutosaveOptions, AutosaveScheduler, AutosaveSchedulerBuilder};
pub use status::{SaveSnapshot, SaveStatus};

use crate::error::SaveError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// What the server returns for an accepted save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerAck {
    #[serde(default)]
    pub revision: Option<u64>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

/// Result of a save request that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(ServerAck),
    /// The state already matched the last persisted one; nothing was sent.
    Unchanged,
}

/// The save round-trip supplied by the host.
///
/// Implementations classify their failures (see [`SaveError`]) so the
/// retry engine can tell transient problems from rejected data.
pub trait SaveOperation<S>: Send + Sync {
    fn save<'a>(
        &'a self,
        state: &'a S,
    ) -> Pin<Box<dyn Future<Output = Result<ServerAck, SaveError>> + Send + 'a>>;
}

/// Adapts an async closure taking an owned state into a [`SaveOperation`].
pub struct SaveFn<F>(pub F);

impl<S, F, Fut> SaveOperation<S> for SaveFn<F>
where
    S: Clone + Send + Sync,
    F: Fn(S) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ServerAck, SaveError>> + Send + 'static,
{
    fn save<'a>(
        &'a self,
        state: &'a S,
    ) -> Pin<Box<dyn Future<Output = Result<ServerAck, SaveError>> + Send + 'a>> {
        Box::pin((self.0)(state.clone()))
    }
}
