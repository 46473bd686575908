use super::AutosaveOptions;
use crate::cache::SnapshotCache;
use crate::config::AutosaveMode;
use crate::error::{AutosaveError, RetryError, SaveError};
use crate::persistence::change::{ChangeDetector, canonical_json};
use crate::persistence::retry::{RetryAttempt, execute_with_retry};
use crate::persistence::status::{SaveSnapshot, SaveStatus};
use crate::persistence::{SaveOperation, SaveOutcome, ServerAck};
use crate::runtime::network::NetworkStatus;
use crate::runtime::notify::{Notification, NotificationKind, Notifier};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

type Reply = oneshot::Sender<Result<SaveOutcome, AutosaveError>>;

pub(super) enum Command<S> {
    Schedule(S),
    SaveNow(S, Reply),
    Flush(Reply),
    CancelPending,
}

struct Latest<S> {
    state: S,
    canonical: String,
}

pub(super) struct Actor<S> {
    options: AutosaveOptions,
    saver: Arc<dyn SaveOperation<S>>,
    notifier: Arc<dyn Notifier>,
    network: Option<watch::Receiver<NetworkStatus>>,
    cache: Option<Arc<SnapshotCache>>,
    detector: ChangeDetector,
    latest: Option<Latest<S>>,
    /// Canonical form the server refused, with the refusal.
    rejected: Option<(String, SaveError)>,
    deadline: Option<Instant>,
    was_online: bool,
    status: watch::Sender<SaveSnapshot>,
    cancel: CancellationToken,
}

impl<S> Actor<S>
where
    S: Serialize + Clone + Send + Sync + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        options: AutosaveOptions,
        saver: Arc<dyn SaveOperation<S>>,
        notifier: Arc<dyn Notifier>,
        network: Option<watch::Receiver<NetworkStatus>>,
        cache: Option<Arc<SnapshotCache>>,
        baseline: Option<String>,
        status: watch::Sender<SaveSnapshot>,
        cancel: CancellationToken,
    ) -> Self {
        let was_online = network.as_ref().is_none_or(|rx| rx.borrow().is_online);
        let detector = baseline.map_or_else(ChangeDetector::new, |canonical| {
            let mut detector = ChangeDetector::new();
            detector.mark_saved(canonical);
            detector
        });
        Self {
            options,
            saver,
            notifier,
            network,
            cache,
            detector,
            latest: None,
            rejected: None,
            deadline: None,
            was_online,
            status,
            cancel,
        }
    }

    pub(super) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command<S>>) {
        let cancel = self.cancel.clone();
        let mut connectivity = self.network.clone();
        let mut ticker = match self.options.mode {
            AutosaveMode::Interval => {
                let period = self.options.interval.max(Duration::from_millis(1));
                let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                Some(ticker)
            }
            AutosaveMode::Debounce => None,
        };

        loop {
            let deadline = self.deadline;
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                command = commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                () = sleep_until(deadline) => {
                    self.deadline = None;
                    let _ = self.save_latest(false).await;
                }
                () = tick(&mut ticker) => {
                    let _ = self.save_latest(false).await;
                }
                online = connectivity_changed(&mut connectivity) => match online {
                    Some(online) => self.on_connectivity(online),
                    None => connectivity = None,
                },
            }
        }

        tracing::debug!(entity_key = %self.options.entity_key, "Autosave scheduler stopped");
    }

    async fn handle(&mut self, command: Command<S>) {
        match command {
            Command::Schedule(state) => self.on_schedule(state),
            Command::SaveNow(state, reply) => {
                self.deadline = None;
                let outcome = match self.remember(state) {
                    Ok(()) => self.save_latest(true).await,
                    Err(err) => Err(err),
                };
                let _ = reply.send(outcome);
            }
            Command::Flush(reply) => {
                self.deadline = None;
                let _ = reply.send(self.save_latest(true).await);
            }
            Command::CancelPending => {
                if self.deadline.take().is_some() {
                    tracing::debug!("Pending autosave cancelled");
                }
            }
        }
    }

    fn remember(&mut self, state: S) -> Result<(), AutosaveError> {
        let canonical =
            canonical_json(&state).map_err(|err| AutosaveError::Serialize(err.to_string()))?;
        if self
            .rejected
            .as_ref()
            .is_some_and(|(refused, _)| *refused != canonical)
        {
            self.rejected = None;
        }
        self.latest = Some(Latest { state, canonical });
        Ok(())
    }

    fn is_dirty(&self) -> bool {
        self.latest
            .as_ref()
            .is_some_and(|latest| self.detector.is_dirty_canonical(&latest.canonical))
    }

    fn on_schedule(&mut self, state: S) {
        if let Err(err) = self.remember(state) {
            tracing::error!("Ignoring scheduled state: {err}");
            return;
        }

        if self.is_dirty() {
            self.publish(|snapshot| snapshot.status = SaveStatus::Unsaved);
            if self.options.mode == AutosaveMode::Debounce {
                self.deadline = Some(Instant::now() + self.options.debounce);
            }
            return;
        }

        // Edited back to what the server already has.
        self.deadline = None;
        self.publish(|snapshot| {
            if matches!(snapshot.status, SaveStatus::Unsaved | SaveStatus::Error) {
                snapshot.status = if snapshot.last_saved_at.is_some() {
                    SaveStatus::Saved
                } else {
                    SaveStatus::Idle
                };
                snapshot.last_error = None;
            }
        });
    }

    fn on_connectivity(&mut self, online: bool) {
        let reconnected = online && !self.was_online;
        self.was_online = online;
        if reconnected && self.is_dirty() && self.options.mode == AutosaveMode::Debounce {
            tracing::info!("Connection restored; flushing unsaved changes");
            self.deadline = Some(Instant::now());
        }
    }

    fn is_online(&self) -> bool {
        self.network
            .as_ref()
            .is_none_or(|status| status.borrow().is_online)
    }

    fn publish(&self, update: impl FnOnce(&mut SaveSnapshot)) {
        self.status.send_if_modified(|snapshot| {
            let before = snapshot.clone();
            update(snapshot);
            *snapshot != before
        });
    }

    fn notify(&self, kind: NotificationKind) {
        self.notifier.notify(&Notification::new(kind));
    }

    fn write_draft(&self, state: &S) {
        let Some(cache) = &self.cache else {
            return;
        };
        if let Err(err) = cache.set(&self.options.entity_key, state, self.options.fallback_ttl) {
            tracing::warn!(key = %self.options.entity_key, "Failed to mirror draft: {err}");
        }
    }

    /// Saves the newest state if it differs from the server's copy.
    ///
    /// Timer-driven saves (`force == false`) do not resend a state the
    /// server already refused; only an edit or an explicit save does.
    async fn save_latest(&mut self, force: bool) -> Result<SaveOutcome, AutosaveError> {
        let Some(latest) = self.latest.as_ref() else {
            return Ok(SaveOutcome::Unchanged);
        };
        if !self.detector.is_dirty_canonical(&latest.canonical) {
            return Ok(SaveOutcome::Unchanged);
        }
        if !force
            && let Some((refused, err)) = &self.rejected
            && *refused == latest.canonical
        {
            tracing::debug!(
                entity_key = %self.options.entity_key,
                "Skipping autosave of a state the server rejected"
            );
            return Err(AutosaveError::Rejected(err.clone()));
        }
        let state = latest.state.clone();
        let canonical = latest.canonical.clone();

        if !self.is_online() {
            tracing::info!(
                entity_key = %self.options.entity_key,
                "Offline; keeping changes locally until the connection returns"
            );
            self.write_draft(&state);
            self.publish(|snapshot| snapshot.status = SaveStatus::Unsaved);
            return Err(AutosaveError::Offline);
        }

        self.publish(|snapshot| {
            snapshot.status = SaveStatus::Saving;
            snapshot.retry_attempt = None;
        });

        let result = self.run_save(&state).await;

        if self.cancel.is_cancelled() {
            tracing::debug!("Save resolved after shutdown; status left untouched");
            return Err(AutosaveError::Cancelled);
        }

        match result {
            Ok(ack) => {
                self.rejected = None;
                self.detector.mark_saved(canonical);
                let saved_at = ack.saved_at.unwrap_or_else(Utc::now);
                self.publish(|snapshot| {
                    snapshot.status = SaveStatus::Saved;
                    snapshot.last_saved_at = Some(saved_at);
                    snapshot.retry_attempt = None;
                    snapshot.last_error = None;
                });
                self.write_draft(&state);
                self.notify(NotificationKind::AutoSaved);
                Ok(SaveOutcome::Saved(ack))
            }
            Err(RetryError::Cancelled { .. }) => Err(AutosaveError::Cancelled),
            Err(RetryError::NonRetryable { source, .. }) => {
                self.fail(&state, &source);
                self.rejected = Some((canonical, source.clone()));
                self.notify(NotificationKind::SaveRejected {
                    reason: source.to_string(),
                });
                Err(AutosaveError::Rejected(source))
            }
            Err(RetryError::Exhausted { attempts, source }) => {
                self.fail(&state, &source);
                self.notify(NotificationKind::SaveFailedFinal { attempts });
                Err(AutosaveError::Exhausted { attempts, source })
            }
        }
    }

    async fn run_save(&self, state: &S) -> Result<ServerAck, RetryError<SaveError>> {
        let saver = self.saver.as_ref();
        execute_with_retry(
            &self.options.retry,
            &self.cancel,
            move |_attempt| saver.save(state),
            |retry: &RetryAttempt, _err: &SaveError| {
                if self.cancel.is_cancelled() {
                    return;
                }
                self.publish(|snapshot| {
                    snapshot.status = SaveStatus::Retrying;
                    snapshot.retry_attempt = Some(retry.attempt_number);
                });
                self.notify(NotificationKind::SaveRetry {
                    attempt: retry.attempt_number,
                    delay: retry.scheduled_delay,
                });
            },
        )
        .await
    }

    fn fail(&self, state: &S, err: &SaveError) {
        self.publish(|snapshot| {
            snapshot.status = SaveStatus::Error;
            snapshot.retry_attempt = None;
            snapshot.last_error = Some(err.to_string());
        });
        self.write_draft(state);
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Resolves with the new online flag; `None` once the monitor is gone.
async fn connectivity_changed(status: &mut Option<watch::Receiver<NetworkStatus>>) -> Option<bool> {
    match status {
        Some(status) => {
            status.changed().await.ok()?;
            Some(status.borrow_and_update().is_online)
        }
        None => std::future::pending().await,
    }
}
