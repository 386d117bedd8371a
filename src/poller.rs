//! Health-data poll loop
//!
//! Drives the snapshot source on a fixed interval, feeds each successful
//! snapshot through the threshold evaluator and the deduplicator, pushes
//! newly-surfaced conditions into the notification center, and hands
//! heatwave/flood conditions to the side-effect dispatcher. Two states:
//! idle (not started, or torn down) and running (interval active).
//!
//! Concurrency is cooperative: while a fetch is outstanding the interval
//! is not re-entered, so fetches never overlap. Teardown is synchronous
//! and idempotent; an in-flight fetch that resolves after teardown is
//! discarded and never reaches the notification center.

use crate::alerts::{evaluate, AlertKind, NotificationCenter, SeenSet};
use crate::config::Thresholds;
use crate::dispatch::Dispatcher;
use crate::error::ScheduleError;
use crate::snapshot::HealthSnapshot;
use crate::source::SnapshotSource;
use crate::store::HealthStore;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Interval-driven poll loop over a snapshot source
pub struct PollLoop {
    interval: Duration,
    thresholds: Thresholds,
    source: Arc<dyn SnapshotSource>,
    store: Arc<HealthStore>,
    notifications: Arc<Mutex<NotificationCenter>>,
    dispatcher: Arc<Dispatcher>,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl PollLoop {
    /// Create an idle poll loop
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::InvalidInterval` for a zero interval; an
    /// unusable schedule fails fast instead of silently defaulting.
    pub fn new(
        interval: Duration,
        thresholds: Thresholds,
        source: Arc<dyn SnapshotSource>,
        store: Arc<HealthStore>,
        notifications: Arc<Mutex<NotificationCenter>>,
        dispatcher: Arc<Dispatcher>,
    ) -> Result<Self, ScheduleError> {
        if interval.is_zero() {
            return Err(ScheduleError::InvalidInterval(interval.as_millis() as u64));
        }
        Ok(Self {
            interval,
            thresholds,
            source,
            store,
            notifications,
            dispatcher,
            shutdown: None,
            task: None,
        })
    }

    /// Whether the loop is currently running
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Transition idle -> running and perform an immediate first poll
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::AlreadyRunning` if the loop is running.
    pub fn start(&mut self) -> Result<(), ScheduleError> {
        if self.is_running() {
            return Err(ScheduleError::AlreadyRunning);
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(Self::run(
            self.interval,
            self.thresholds.clone(),
            Arc::clone(&self.source),
            Arc::clone(&self.store),
            Arc::clone(&self.notifications),
            Arc::clone(&self.dispatcher),
            shutdown_rx,
        ));

        self.shutdown = Some(shutdown_tx);
        self.task = Some(task);
        Ok(())
    }

    /// Transition running -> idle
    ///
    /// Synchronous and idempotent: pending and future ticks stop, and an
    /// in-flight fetch is discarded when it settles. Dispatch tasks
    /// already spawned are left to finish on their own; they hold no
    /// reference to the notification center.
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
            info!("Poll loop teardown requested");
        }
        self.task.take();
    }

    async fn run(
        interval: Duration,
        thresholds: Thresholds,
        source: Arc<dyn SnapshotSource>,
        store: Arc<HealthStore>,
        notifications: Arc<Mutex<NotificationCenter>>,
        dispatcher: Arc<Dispatcher>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        // The seen-set lives exactly as long as the running loop's session
        let mut seen = SeenSet::new();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Poll loop started, polling every {:?}", interval);

        loop {
            // First tick completes immediately, giving the immediate
            // first invocation on start
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }

            let fetched = tokio::select! {
                _ = shutdown.changed() => break,
                fetched = source.fetch() => fetched,
            };
            if *shutdown.borrow() {
                // The fetch raced teardown; its result is discarded
                break;
            }

            match fetched {
                Ok(snapshot) => Self::handle_snapshot(
                    snapshot,
                    &thresholds,
                    &mut seen,
                    &store,
                    &notifications,
                    &dispatcher,
                ),
                Err(e) => {
                    warn!("Health data poll failed: {}", e);
                    store.set_poll_error(e.to_string());
                }
            }
        }

        info!("Poll loop stopped");
    }

    fn handle_snapshot(
        snapshot: HealthSnapshot,
        thresholds: &Thresholds,
        seen: &mut SeenSet,
        store: &HealthStore,
        notifications: &Mutex<NotificationCenter>,
        dispatcher: &Arc<Dispatcher>,
    ) {
        let conditions = evaluate(&snapshot, thresholds);
        let fresh = seen.filter_new(&conditions);
        debug!(
            "Poll cycle: {} condition(s) true, {} new",
            conditions.len(),
            fresh.len()
        );

        if !fresh.is_empty() {
            if let Ok(mut center) = notifications.lock() {
                for condition in &fresh {
                    info!(
                        "New alert condition [{}]: {}",
                        condition.kind, condition.message
                    );
                    center.add(condition.message.clone());
                }
            }
        }

        // Weather conditions additionally go out through the email
        // channel, fire-and-forget
        for condition in fresh
            .into_iter()
            .filter(|c| matches!(c.kind, AlertKind::Heatwave | AlertKind::FloodForecast))
        {
            let dispatcher = Arc::clone(dispatcher);
            let snapshot = snapshot.clone();
            tokio::spawn(async move {
                dispatcher.dispatch(&condition, &snapshot).await;
            });
        }

        store.set_snapshot(snapshot);
    }
}

impl Drop for PollLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{DispatchChannel, EmailMessage, MockDispatchChannel};
    use crate::error::DispatchError;
    use crate::snapshot::tests::nominal_snapshot;
    use crate::snapshot::{
        AffectedArea, DiseaseOutbreak, GeoLocation, OutbreakStatus, Severity,
    };
    use crate::source::MockSource;
    use crate::store::PollStatus;
    use std::future::Future;
    use std::pin::Pin;

    /// Channel that accepts and ignores everything
    struct NullChannel;

    impl DispatchChannel for NullChannel {
        fn send(
            &self,
            _message: EmailMessage,
        ) -> Pin<Box<dyn Future<Output = Result<(), DispatchError>> + Send>> {
            Box::pin(async { Ok(()) })
        }
    }

    struct Harness {
        store: Arc<HealthStore>,
        notifications: Arc<Mutex<NotificationCenter>>,
        poll: PollLoop,
    }

    fn harness_with_channel(
        source: MockSource,
        interval: Duration,
        channel: Arc<dyn DispatchChannel>,
    ) -> Harness {
        let store = Arc::new(HealthStore::new());
        let notifications = Arc::new(Mutex::new(NotificationCenter::new()));
        let dispatcher = Arc::new(Dispatcher::new(channel, "ops@example.org".to_string(), 40.0));
        let poll = PollLoop::new(
            interval,
            Thresholds::default(),
            Arc::new(source),
            Arc::clone(&store),
            Arc::clone(&notifications),
            dispatcher,
        )
        .unwrap();
        Harness {
            store,
            notifications,
            poll,
        }
    }

    fn harness(source: MockSource, interval: Duration) -> Harness {
        harness_with_channel(source, interval, Arc::new(NullChannel))
    }

    fn critical_outbreak_snapshot() -> crate::snapshot::HealthSnapshot {
        let mut snapshot = nominal_snapshot();
        snapshot.disease_outbreaks = vec![DiseaseOutbreak {
            id: "o1".to_string(),
            disease: "dengue".to_string(),
            severity: Severity::Critical,
            affected_areas: vec![AffectedArea {
                name: "Dharavi".to_string(),
                location: GeoLocation {
                    latitude: 19.04,
                    longitude: 72.85,
                },
                case_count: 320,
            }],
            start_date: "2025-03-01".to_string(),
            status: OutbreakStatus::Active,
            symptoms: vec!["fever".to_string()],
            prevention_measures: Vec::new(),
            source: None,
            expert_verified: None,
        }];
        snapshot
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let store = Arc::new(HealthStore::new());
        let notifications = Arc::new(Mutex::new(NotificationCenter::new()));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(NullChannel),
            "ops@example.org".to_string(),
            40.0,
        ));
        // new() only validates, nothing is spawned yet
        let result = PollLoop::new(
            Duration::ZERO,
            Thresholds::default(),
            Arc::new(MockSource::with_snapshot(nominal_snapshot())),
            store,
            notifications,
            dispatcher,
        );
        assert!(matches!(
            result,
            Err(ScheduleError::InvalidInterval(0))
        ));
    }

    #[tokio::test]
    async fn test_immediate_first_poll_notifies_new_condition() {
        let source = MockSource::with_snapshot(critical_outbreak_snapshot());
        let calls = source.call_counter();
        let mut h = harness(source, Duration::from_secs(60));

        h.poll.start().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        h.poll.stop();

        // First invocation happened on start, not on the first interval
        assert_eq!(*calls.lock().unwrap(), 1);

        let center = h.notifications.lock().unwrap();
        assert_eq!(center.len(), 1);
        assert_eq!(center.unread_count(), 1);
        assert!(center.list()[0].message.contains("dengue"));
        drop(center);

        assert!(h.store.latest().is_some());
        assert!(matches!(h.store.status(), PollStatus::Healthy { .. }));
    }

    #[tokio::test]
    async fn test_repeated_identical_snapshot_notifies_once() {
        let source = MockSource::with_snapshot(critical_outbreak_snapshot());
        let calls = source.call_counter();
        let mut h = harness(source, Duration::from_millis(25));

        h.poll.start().unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        h.poll.stop();

        assert!(*calls.lock().unwrap() >= 3, "expected several polls");
        assert_eq!(h.notifications.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_changing_aqi_value_is_still_one_occurrence() {
        let mut first = nominal_snapshot();
        first.environmental_data.air_quality.aqi = 160.0;
        let mut second = nominal_snapshot();
        second.environmental_data.air_quality.aqi = 170.0;

        let source = MockSource::with_responses(vec![Ok(first), Ok(second)]);
        let mut h = harness(source, Duration::from_millis(25));

        h.poll.start().unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        h.poll.stop();

        let center = h.notifications.lock().unwrap();
        assert_eq!(center.len(), 1);
        assert!(center.list()[0].message.contains("160"));
    }

    #[tokio::test]
    async fn test_fetch_failure_surfaces_without_notification() {
        let source = MockSource::failing("connection refused");
        let mut h = harness(source, Duration::from_millis(25));

        h.poll.start().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        h.poll.stop();

        assert!(h.notifications.lock().unwrap().is_empty());
        assert!(h.store.latest().is_none());
        assert!(matches!(h.store.status(), PollStatus::Failed { .. }));
    }

    #[tokio::test]
    async fn test_failure_then_recovery() {
        let source = MockSource::with_responses(vec![
            Err("transient failure".to_string()),
            Ok(critical_outbreak_snapshot()),
        ]);
        let mut h = harness(source, Duration::from_millis(25));

        h.poll.start().unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        h.poll.stop();

        // The failing cycle did not block the next one
        assert_eq!(h.notifications.lock().unwrap().len(), 1);
        assert!(h.store.latest().is_some());
    }

    #[tokio::test]
    async fn test_teardown_discards_in_flight_fetch() {
        let source = MockSource::with_snapshot(critical_outbreak_snapshot())
            .with_delay(Duration::from_millis(200));
        let calls = source.call_counter();
        let mut h = harness(source, Duration::from_millis(25));

        h.poll.start().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        // Fetch is in flight now
        h.poll.stop();
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(*calls.lock().unwrap(), 1, "no ticks after teardown");
        assert!(h.notifications.lock().unwrap().is_empty());
        assert!(h.store.latest().is_none());
    }

    #[tokio::test]
    async fn test_slow_fetch_does_not_overlap() {
        // Fetch takes longer than the interval; ticks must not pile up
        let source = MockSource::with_snapshot(nominal_snapshot())
            .with_delay(Duration::from_millis(60));
        let calls = source.call_counter();
        let mut h = harness(source, Duration::from_millis(20));

        h.poll.start().unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        h.poll.stop();

        // At ~60ms per fetch in a 200ms window, cooperative scheduling
        // allows at most 4 sequential fetches
        assert!(*calls.lock().unwrap() <= 4);
    }

    #[tokio::test]
    async fn test_start_is_rejected_while_running() {
        let source = MockSource::with_snapshot(nominal_snapshot());
        let mut h = harness(source, Duration::from_secs(60));

        h.poll.start().unwrap();
        assert!(h.poll.is_running());
        assert_eq!(h.poll.start(), Err(ScheduleError::AlreadyRunning));
        h.poll.stop();
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_restart_works() {
        let source = MockSource::with_snapshot(critical_outbreak_snapshot());
        let mut h = harness(source, Duration::from_millis(25));

        h.poll.start().unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        h.poll.stop();
        h.poll.stop();
        assert!(!h.poll.is_running());

        // Restart begins a fresh session with a fresh seen-set
        h.poll.start().unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        h.poll.stop();

        // Same outbreak notified once per session
        assert_eq!(h.notifications.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_heatwave_condition_reaches_dispatcher_once() {
        let mut snapshot = nominal_snapshot();
        snapshot.environmental_data.sensors[0].reading = 41.2;

        let mut channel = MockDispatchChannel::new();
        channel
            .expect_send()
            .withf(|message: &EmailMessage| message.subject == "Heatwave Alert")
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let source = MockSource::with_snapshot(snapshot);
        let mut h = harness_with_channel(source, Duration::from_millis(25), Arc::new(channel));

        h.poll.start().unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        h.poll.stop();
        // Give the detached dispatch task time to settle before the mock
        // verifies expectations on drop
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The heatwave also lands in the notification center
        assert_eq!(h.notifications.lock().unwrap().len(), 1);
    }
}
