use super::probe::{HttpProbe, LatencyProbe};
use super::types::{ConnectivityEvent, NetworkStatus};
use crate::config::NetworkConfig;
use crate::error::NetworkError;
use crate::runtime::notify::{Notification, NotificationKind, Notifier};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkOptions {
    pub probe_interval: Duration,
    pub slow_threshold: Duration,
    /// Consecutive failed probes before reporting offline
    pub offline_after_failures: u32,
}

impl Default for NetworkOptions {
    fn default() -> Self {
        Self::from(&NetworkConfig::default())
    }
}

impl From<&NetworkConfig> for NetworkOptions {
    fn from(config: &NetworkConfig) -> Self {
        Self {
            probe_interval: Duration::from_secs(config.probe_interval_secs.max(1)),
            slow_threshold: Duration::from_millis(config.slow_threshold_ms),
            offline_after_failures: config.offline_after_failures.max(1),
        }
    }
}

struct Shared {
    status: watch::Sender<NetworkStatus>,
    notifier: Arc<dyn Notifier>,
    options: NetworkOptions,
    failed_probes: AtomicU32,
    slow_rtt: AtomicBool,
}

impl Shared {
    fn set_online(&self, online: bool) {
        let mut transition = None;
        self.status.send_modify(|status| {
            if status.is_online != online {
                transition = Some(online);
            }
            status.is_online = online;
            if online {
                status.last_online = Some(Utc::now());
            }
        });

        match transition {
            Some(true) => {
                tracing::info!("Network connection restored");
                self.notifier
                    .notify(&Notification::new(NotificationKind::ConnectionRestored));
            }
            Some(false) => {
                tracing::warn!("Network connection lost");
                self.notifier
                    .notify(&Notification::new(NotificationKind::ConnectionLost));
            }
            None => {}
        }
    }

    fn refresh_slow(&self) {
        let slow_rtt = self.slow_rtt.load(Ordering::Relaxed);
        let mut became_slow = false;
        self.status.send_if_modified(|status| {
            let slow = slow_rtt || status.connection_type.is_slow();
            if status.is_slow_connection == slow {
                return false;
            }
            became_slow = slow;
            status.is_slow_connection = slow;
            true
        });
        if became_slow {
            tracing::info!("Slow connection detected; saves may be delayed");
        }
    }

    fn apply_event(&self, event: ConnectivityEvent) {
        match event {
            ConnectivityEvent::Online => {
                self.failed_probes.store(0, Ordering::Relaxed);
                self.set_online(true);
            }
            ConnectivityEvent::Offline => self.set_online(false),
            ConnectivityEvent::EffectiveType(kind) => {
                self.status.send_if_modified(|status| {
                    let changed = status.connection_type != kind;
                    status.connection_type = kind;
                    changed
                });
                self.refresh_slow();
            }
        }
    }

    fn apply_probe(&self, result: &Result<Duration, NetworkError>) {
        match result {
            Ok(rtt) => {
                let rtt_ms = u64::try_from(rtt.as_millis()).unwrap_or(u64::MAX);
                tracing::debug!(rtt_ms, "Latency probe succeeded");
                self.failed_probes.store(0, Ordering::Relaxed);
                self.slow_rtt
                    .store(*rtt > self.options.slow_threshold, Ordering::Relaxed);
                self.status.send_modify(|status| status.last_rtt_ms = Some(rtt_ms));
                self.refresh_slow();
                self.set_online(true);
            }
            Err(err) => {
                let failures = self.failed_probes.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(failures, "Latency probe failed: {err}");
                if failures >= self.options.offline_after_failures {
                    self.set_online(false);
                }
            }
        }
    }
}

/// Process-wide view of connectivity quality.
///
/// Construct one per application (or per test), call [`init`](Self::init)
/// to start periodic probing and [`dispose`](Self::dispose) on teardown.
/// Consumers read the current [`NetworkStatus`] or [`subscribe`](Self::subscribe)
/// to transitions.
pub struct NetworkMonitor {
    shared: Arc<Shared>,
    probe: Option<Arc<dyn LatencyProbe>>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl NetworkMonitor {
    pub fn new(mut options: NetworkOptions, notifier: Arc<dyn Notifier>) -> Self {
        // A zero period would make the background interval panic.
        options.probe_interval = options.probe_interval.max(Duration::from_millis(1));
        let (status, _) = watch::channel(NetworkStatus::default());
        Self {
            shared: Arc::new(Shared {
                status,
                notifier,
                options,
                failed_probes: AtomicU32::new(0),
                slow_rtt: AtomicBool::new(false),
            }),
            probe: None,
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    pub fn from_config(config: &NetworkConfig, notifier: Arc<dyn Notifier>) -> Self {
        let monitor = Self::new(NetworkOptions::from(config), notifier);
        match &config.probe_url {
            Some(url) => monitor.with_probe(Arc::new(HttpProbe::new(
                url.clone(),
                Duration::from_millis(config.probe_timeout_ms),
            ))),
            None => monitor,
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn LatencyProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Start periodic probing. A no-op without a probe or when already running.
    pub fn init(&self) {
        let Some(probe) = self.probe.clone() else {
            tracing::debug!("No latency probe configured; relying on reported events");
            return;
        };
        let Ok(mut task) = self.task.lock() else {
            return;
        };
        if task.is_some() {
            return;
        }

        let shared = Arc::clone(&self.shared);
        let cancel = self.cancel.clone();
        tracing::info!(
            probe = probe.name(),
            interval_secs = shared.options.probe_interval.as_secs(),
            "Network monitor started"
        );
        *task = Some(tokio::spawn(run_probe_loop(shared, probe, cancel)));
    }

    /// Stop probing and wait for the probe task to finish.
    pub async fn dispose(&self) {
        self.cancel.cancel();
        let task = self.task.lock().ok().and_then(|mut task| task.take());
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    pub fn report(&self, event: ConnectivityEvent) {
        self.shared.apply_event(event);
    }

    /// Run the probe once, outside the periodic schedule.
    pub async fn probe_now(&self) -> Result<Duration, NetworkError> {
        let probe = self
            .probe
            .as_ref()
            .ok_or_else(|| NetworkError::Probe("no latency probe configured".into()))?;
        let result = probe.probe().await;
        self.shared.apply_probe(&result);
        result
    }

    pub fn status(&self) -> NetworkStatus {
        self.shared.status.borrow().clone()
    }

    pub fn is_online(&self) -> bool {
        self.shared.status.borrow().is_online
    }

    pub fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.shared.status.subscribe()
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_probe_loop(
    shared: Arc<Shared>,
    probe: Arc<dyn LatencyProbe>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(shared.options.probe_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        // Offline hosts keep probing so recovery is noticed without an event.
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = probe.probe() => shared.apply_probe(&result),
        }
    }
    tracing::debug!("Network monitor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::network::ConnectionType;
    use crate::runtime::notify::testing::RecordingNotifier;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;

    /// Replays scripted probe results, then keeps returning the last one.
    struct ScriptedProbe {
        results: Mutex<VecDeque<Result<Duration, ()>>>,
        calls: AtomicU32,
    }

    impl ScriptedProbe {
        fn new(results: Vec<Result<Duration, ()>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                calls: AtomicU32::new(0),
            }
        }
    }

    impl LatencyProbe for ScriptedProbe {
        fn probe(
            &self,
        ) -> Pin<Box<dyn Future<Output = Result<Duration, NetworkError>> + Send + '_>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut results = self.results.lock().unwrap();
            let next = if results.len() > 1 {
                results.pop_front().unwrap()
            } else {
                *results.front().unwrap()
            };
            Box::pin(async move { next.map_err(|()| NetworkError::Probe("unreachable".into())) })
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn monitor(notifier: &Arc<RecordingNotifier>) -> NetworkMonitor {
        NetworkMonitor::new(
            NetworkOptions::default(),
            Arc::clone(notifier) as Arc<dyn Notifier>,
        )
    }

    #[test]
    fn offline_then_online_emits_both_notifications() {
        let notifier = Arc::new(RecordingNotifier::default());
        let monitor = monitor(&notifier);

        monitor.report(ConnectivityEvent::Offline);
        assert!(!monitor.is_online());
        monitor.report(ConnectivityEvent::Offline);
        monitor.report(ConnectivityEvent::Online);
        assert!(monitor.is_online());

        assert_eq!(
            notifier.names(),
            vec!["connection-lost", "connection-restored"]
        );
    }

    #[test]
    fn last_online_freezes_while_offline() {
        let notifier = Arc::new(RecordingNotifier::default());
        let monitor = monitor(&notifier);

        monitor.report(ConnectivityEvent::Offline);
        let frozen = monitor.status().last_online;
        std::thread::sleep(Duration::from_millis(5));
        monitor.report(ConnectivityEvent::Offline);
        assert_eq!(monitor.status().last_online, frozen);

        monitor.report(ConnectivityEvent::Online);
        assert!(monitor.status().last_online > frozen);
    }

    #[test]
    fn effective_type_marks_connection_slow() {
        let notifier = Arc::new(RecordingNotifier::default());
        let monitor = monitor(&notifier);

        monitor.report(ConnectivityEvent::EffectiveType(ConnectionType::TwoG));
        let status = monitor.status();
        assert!(status.is_slow_connection);
        assert!(status.is_online, "slow is not offline");

        monitor.report(ConnectivityEvent::EffectiveType(ConnectionType::FourG));
        assert!(!monitor.status().is_slow_connection);
    }

    #[tokio::test]
    async fn slow_probe_classifies_connection_as_slow() {
        let notifier = Arc::new(RecordingNotifier::default());
        let probe = Arc::new(ScriptedProbe::new(vec![Ok(Duration::from_millis(2_500))]));
        let monitor = monitor(&notifier).with_probe(probe);

        let rtt = monitor.probe_now().await.unwrap();
        assert_eq!(rtt, Duration::from_millis(2_500));
        let status = monitor.status();
        assert!(status.is_slow_connection);
        assert_eq!(status.last_rtt_ms, Some(2_500));
    }

    #[tokio::test]
    async fn consecutive_probe_failures_flip_offline_and_success_restores() {
        let notifier = Arc::new(RecordingNotifier::default());
        let probe = Arc::new(ScriptedProbe::new(vec![
            Err(()),
            Err(()),
            Ok(Duration::from_millis(40)),
        ]));
        let monitor = monitor(&notifier).with_probe(probe);

        assert!(monitor.probe_now().await.is_err());
        assert!(monitor.is_online(), "one failure is not enough");
        assert!(monitor.probe_now().await.is_err());
        assert!(!monitor.is_online());
        assert!(monitor.probe_now().await.is_ok());
        assert!(monitor.is_online());
        assert!(!monitor.status().is_slow_connection);

        assert_eq!(
            notifier.names(),
            vec!["connection-lost", "connection-restored"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn init_probes_on_interval_until_disposed() {
        let notifier = Arc::new(RecordingNotifier::default());
        let probe = Arc::new(ScriptedProbe::new(vec![Ok(Duration::from_millis(10))]));
        let monitor = monitor(&notifier).with_probe(Arc::clone(&probe) as Arc<dyn LatencyProbe>);

        monitor.init();
        monitor.init();
        tokio::time::sleep(Duration::from_secs(65)).await;
        // Immediate first probe, then one every 30s.
        assert_eq!(probe.calls.load(Ordering::SeqCst), 3);

        monitor.dispose().await;
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(probe.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_keeps_the_background_loop_alive() {
        let notifier = Arc::new(RecordingNotifier::default());
        let latency = Arc::new(ScriptedProbe::new(vec![Ok(Duration::from_millis(10))]));
        let options = NetworkOptions {
            probe_interval: Duration::ZERO,
            ..NetworkOptions::default()
        };
        let monitor = NetworkMonitor::new(options, Arc::clone(&notifier) as Arc<dyn Notifier>)
            .with_probe(Arc::clone(&latency) as Arc<dyn LatencyProbe>);

        monitor.init();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(latency.calls.load(Ordering::SeqCst) >= 2);
        assert!(monitor.is_online());

        monitor.dispose().await;
    }

    #[tokio::test]
    async fn probe_now_without_probe_is_an_error() {
        let notifier = Arc::new(RecordingNotifier::default());
        let monitor = monitor(&notifier);
        let err = monitor.probe_now().await.unwrap_err();
        assert!(err.to_string().contains("no latency probe"));
        assert!(monitor.is_online());
    }
}
