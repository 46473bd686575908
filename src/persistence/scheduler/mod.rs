//! Autosave scheduler: one actor task per editable entity.
//!
//! The handle sends commands over an mpsc channel and the actor owns every
//! timer, the change detector and the retry loop. Because the actor awaits
//! each save before reading the next command, at most one save round-trip is
//! in flight and edits arriving meanwhile are coalesced into the next cycle.

mod actor;

use self::actor::{Actor, Command};
use super::retry::RetryPolicy;
use super::status::{SaveSnapshot, SaveStatus};
use super::{SaveOperation, SaveOutcome, canonical_json};
use crate::cache::SnapshotCache;
use crate::config::{AutosaveConfig, AutosaveMode, Config};
use crate::error::AutosaveError;
use crate::runtime::network::NetworkStatus;
use crate::runtime::notify::{NoopNotifier, Notifier};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Runtime settings for one [`AutosaveScheduler`].
#[derive(Debug, Clone, PartialEq)]
pub struct AutosaveOptions {
    pub mode: AutosaveMode,
    pub interval: Duration,
    pub debounce: Duration,
    /// Snapshot cache key the latest draft is mirrored under
    pub entity_key: String,
    pub fallback_ttl: Duration,
    pub retry: RetryPolicy,
}

impl Default for AutosaveOptions {
    fn default() -> Self {
        Self::from(&AutosaveConfig::default())
    }
}

impl From<&AutosaveConfig> for AutosaveOptions {
    fn from(config: &AutosaveConfig) -> Self {
        Self {
            mode: config.mode,
            interval: Duration::from_secs(config.interval_secs),
            debounce: Duration::from_millis(config.debounce_ms),
            entity_key: config.entity_key.clone(),
            fallback_ttl: Duration::from_secs(config.fallback_ttl_secs),
            retry: RetryPolicy::default(),
        }
    }
}

impl AutosaveOptions {
    pub fn from_config(config: &Config) -> Self {
        Self::from(&config.autosave).with_retry(RetryPolicy::from(&config.retry))
    }

    pub fn debounce(debounce: Duration) -> Self {
        Self {
            mode: AutosaveMode::Debounce,
            debounce,
            ..Self::default()
        }
    }

    pub fn interval(interval: Duration) -> Self {
        Self {
            mode: AutosaveMode::Interval,
            interval,
            ..Self::default()
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_entity_key(mut self, key: impl Into<String>) -> Self {
        self.entity_key = key.into();
        self
    }
}

pub struct AutosaveSchedulerBuilder<S> {
    options: AutosaveOptions,
    saver: Arc<dyn SaveOperation<S>>,
    notifier: Arc<dyn Notifier>,
    network: Option<watch::Receiver<NetworkStatus>>,
    cache: Option<Arc<SnapshotCache>>,
    baseline: Option<String>,
}

impl<S> AutosaveSchedulerBuilder<S>
where
    S: Serialize + Clone + Send + Sync + 'static,
{
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Consult this connectivity feed before every save.
    pub fn network(mut self, status: watch::Receiver<NetworkStatus>) -> Self {
        self.network = Some(status);
        self
    }

    /// Mirror drafts into this cache for recovery after failures.
    pub fn cache(mut self, cache: Arc<SnapshotCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Treat `state` as already persisted, e.g. the document as loaded.
    pub fn baseline(mut self, state: &S) -> crate::error::Result<Self> {
        self.baseline = Some(canonical_json(state)?);
        Ok(self)
    }

    /// Start the actor on the current tokio runtime.
    pub fn spawn(self) -> AutosaveScheduler<S> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SaveSnapshot::default());
        let cancel = CancellationToken::new();

        tracing::debug!(
            mode = %self.options.mode,
            entity_key = %self.options.entity_key,
            "Autosave scheduler started"
        );

        let entity_key = self.options.entity_key.clone();
        let cache = self.cache.clone();
        let actor = Actor::new(
            self.options,
            self.saver,
            self.notifier,
            self.network,
            self.cache,
            self.baseline,
            status_tx,
            cancel.clone(),
        );
        let task = tokio::spawn(actor.run(command_rx));

        AutosaveScheduler {
            commands: command_tx,
            status: status_rx,
            cancel,
            task: Some(task),
            cache,
            entity_key,
        }
    }
}

/// Handle to a running autosave actor.
///
/// Dropping the handle cancels every pending timer; use
/// [`shutdown`](Self::shutdown) to also wait for the actor to stop.
pub struct AutosaveScheduler<S> {
    commands: mpsc::UnboundedSender<Command<S>>,
    status: watch::Receiver<SaveSnapshot>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    cache: Option<Arc<SnapshotCache>>,
    entity_key: String,
}

impl<S> AutosaveScheduler<S>
where
    S: Serialize + Clone + Send + Sync + 'static,
{
    pub fn builder(
        options: AutosaveOptions,
        saver: Arc<dyn SaveOperation<S>>,
    ) -> AutosaveSchedulerBuilder<S> {
        AutosaveSchedulerBuilder {
            options,
            saver,
            notifier: Arc::new(NoopNotifier),
            network: None,
            cache: None,
            baseline: None,
        }
    }

    /// Record the latest state. In debounce mode this (re)arms the quiet
    /// window; in interval mode the next tick picks it up.
    pub fn schedule_save(&self, state: S) {
        if self.commands.send(Command::Schedule(state)).is_err() {
            tracing::debug!("Autosave scheduler stopped; dropping scheduled state");
        }
    }

    /// Cancel any pending timer and save `state` right away.
    pub async fn save_now(&self, state: S) -> Result<SaveOutcome, AutosaveError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::SaveNow(state, reply_tx))
            .map_err(|_| AutosaveError::Closed)?;
        reply_rx.await.map_err(|_| AutosaveError::Closed)?
    }

    /// Save the most recently scheduled state, if any, without waiting for
    /// the timer. Used before navigating away.
    pub async fn flush(&self) -> Result<SaveOutcome, AutosaveError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Flush(reply_tx))
            .map_err(|_| AutosaveError::Closed)?;
        reply_rx.await.map_err(|_| AutosaveError::Closed)?
    }

    /// Disarm the debounce timer. The state stays unsaved.
    pub fn cancel_pending(&self) {
        let _ = self.commands.send(Command::CancelPending);
    }

    pub fn status(&self) -> SaveStatus {
        self.status.borrow().status
    }

    pub fn snapshot(&self) -> SaveSnapshot {
        self.status.borrow().clone()
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.status.borrow().last_saved_at
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveSnapshot> {
        self.status.clone()
    }

    /// Read back the draft mirrored into the snapshot cache.
    pub fn recover_draft(&self) -> Option<S>
    where
        S: DeserializeOwned,
    {
        self.cache.as_ref()?.get(&self.entity_key)
    }

    pub fn discard_draft(&self) {
        if let Some(cache) = &self.cache {
            cache.remove(&self.entity_key);
        }
    }

    /// Cancel all timers and wait for the actor to exit. A save already in
    /// flight finishes but no longer updates the status.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(err) = task.await
        {
            tracing::warn!("Autosave scheduler task ended abnormally: {err}");
        }
    }
}

impl<S> Drop for AutosaveScheduler<S> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
