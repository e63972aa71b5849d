//! Polling refresh loop.
//!
//! One background task owns the fetch cycle, so at most one request is in
//! flight at a time. Consumers watch a [`DashboardState`] channel: each
//! successful fetch replaces the state wholesale, and a failed fetch keeps
//! the last good snapshot with the failure recorded alongside it.

use crate::domain::snapshot::DashboardSnapshot;
use crate::ingest::client::{DashboardSource, FailureKind, FetchFailure};
use crate::ingest::normalize::{normalize, NormalizedDashboard};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::time::MissedTickBehavior;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    /// Last successfully normalized snapshot, if any fetch ever succeeded.
    pub snapshot: Option<Arc<DashboardSnapshot>>,
    /// Degraded field paths reported by the normalizer for that snapshot.
    pub degraded: Vec<String>,
    /// Failure of the most recent fetch; cleared by the next success.
    pub error: Option<FetchFailure>,
    pub last_success: Option<DateTime<Utc>>,
}

impl DashboardState {
    /// True when the snapshot on display is older than the latest attempt.
    pub fn is_stale(&self) -> bool {
        self.error.is_some() && self.snapshot.is_some()
    }
}

/// Fold one fetch outcome into the previous state.
///
/// Success replaces the snapshot wholesale and clears any standing error;
/// failure retains the previous snapshot untouched and records the failure.
pub fn apply_fetch_result(
    prev: &DashboardState,
    result: anyhow::Result<Value>,
    now: DateTime<Utc>,
) -> DashboardState {
    match result {
        Ok(doc) => {
            let NormalizedDashboard { snapshot, degraded } = normalize(&doc, now);
            if !degraded.is_empty() {
                tracing::warn!(
                    count = degraded.len(),
                    fields = ?degraded,
                    "dashboard payload degraded; conservative defaults substituted"
                );
            }
            DashboardState {
                snapshot: Some(Arc::new(snapshot)),
                degraded,
                error: None,
                last_success: Some(now),
            }
        }
        Err(err) => {
            let failure = match err.downcast_ref::<FetchFailure>() {
                Some(f) => f.clone(),
                None => FetchFailure {
                    kind: FailureKind::Backend,
                    detail: err.to_string(),
                },
            };
            tracing::warn!(error = %failure, "dashboard refresh failed; retaining last snapshot");
            DashboardState {
                snapshot: prev.snapshot.clone(),
                degraded: prev.degraded.clone(),
                error: Some(failure),
                last_success: prev.last_success,
            }
        }
    }
}

pub struct Poller;

impl Poller {
    /// Spawn the refresh loop. The first fetch fires immediately; later
    /// fetches follow the interval or an explicit [`PollerHandle::refresh_now`].
    pub fn spawn(source: Arc<dyn DashboardSource>, interval: Duration) -> PollerHandle {
        let (tx, rx) = watch::channel(DashboardState::default());
        let refresh = Arc::new(Notify::new());
        let stopped = Arc::new(AtomicBool::new(false));

        let task_refresh = refresh.clone();
        let task_stopped = stopped.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = task_refresh.notified() => {
                        // Manual refresh restarts the cadence.
                        ticker.reset();
                    }
                }
                if task_stopped.load(Ordering::SeqCst) {
                    break;
                }

                let result = source.fetch_dashboard().await;

                // A stop issued mid-request discards the in-flight response
                // instead of publishing it.
                if task_stopped.load(Ordering::SeqCst) {
                    break;
                }

                let prev = tx.borrow().clone();
                tx.send_replace(apply_fetch_result(&prev, result, Utc::now()));
            }
        });

        PollerHandle {
            rx,
            refresh,
            stopped,
        }
    }
}

#[derive(Clone)]
pub struct PollerHandle {
    rx: watch::Receiver<DashboardState>,
    refresh: Arc<Notify>,
    stopped: Arc<AtomicBool>,
}

impl PollerHandle {
    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.rx.clone()
    }

    pub fn current(&self) -> DashboardState {
        self.rx.borrow().clone()
    }

    /// Request an out-of-band fetch without waiting for the next tick.
    pub fn refresh_now(&self) {
        self.refresh.notify_one();
    }

    /// Stop the loop. Idempotent; any response already in flight is dropped.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.refresh.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::ChainExpiry;
    use anyhow::Result;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 5, 10, 30, 0).unwrap()
    }

    #[test]
    fn success_replaces_state_and_clears_error() {
        let errored = DashboardState {
            error: Some(FetchFailure {
                kind: FailureKind::Network,
                detail: "timeout".to_string(),
            }),
            ..DashboardState::default()
        };

        let next = apply_fetch_result(&errored, Ok(json!({})), now());
        assert!(next.snapshot.is_some());
        assert!(next.error.is_none());
        assert_eq!(next.last_success, Some(now()));
        assert!(!next.is_stale());
    }

    #[test]
    fn failure_retains_last_snapshot_and_flags_staleness() {
        let good = apply_fetch_result(&DashboardState::default(), Ok(json!({})), now());
        let failed = apply_fetch_result(
            &good,
            Err(FetchFailure {
                kind: FailureKind::Network,
                detail: "connection refused".to_string(),
            }
            .into()),
            now() + chrono::Duration::seconds(30),
        );

        assert!(failed.is_stale());
        assert!(failed.snapshot.is_some());
        assert_eq!(failed.last_success, good.last_success);
        assert_eq!(
            failed.error.as_ref().map(|e| e.kind),
            Some(FailureKind::Network)
        );
        // The retained snapshot is the same allocation, not a refetch.
        assert!(Arc::ptr_eq(
            failed.snapshot.as_ref().unwrap(),
            good.snapshot.as_ref().unwrap()
        ));
    }

    #[test]
    fn failure_before_any_success_leaves_no_snapshot() {
        let failed = apply_fetch_result(
            &DashboardState::default(),
            Err(anyhow::anyhow!("boom")),
            now(),
        );
        assert!(failed.snapshot.is_none());
        assert!(failed.error.is_some());
        assert!(!failed.is_stale());
    }

    #[derive(Default)]
    struct MockSource {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl DashboardSource for MockSource {
        fn source_name(&self) -> &'static str {
            "mock"
        }

        async fn fetch_dashboard(&self) -> Result<Value> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(json!({ "vol_metrics": { "spot": n as f64 } }))
        }

        async fn fetch_option_chain(&self, _expiry: ChainExpiry) -> Result<Value> {
            Ok(json!([]))
        }
    }

    #[tokio::test]
    async fn poller_publishes_an_initial_snapshot() {
        let source = Arc::new(MockSource::default());
        let handle = Poller::spawn(source, Duration::from_secs(3600));

        let mut rx = handle.subscribe();
        rx.changed().await.unwrap();
        let state = rx.borrow().clone();
        assert_eq!(state.snapshot.as_ref().map(|s| s.vol_metrics.spot), Some(1.0));

        handle.stop();
    }

    #[tokio::test]
    async fn refresh_now_fetches_without_waiting_for_the_tick() {
        let source = Arc::new(MockSource::default());
        let handle = Poller::spawn(source.clone(), Duration::from_secs(3600));

        let mut rx = handle.subscribe();
        rx.changed().await.unwrap();

        handle.refresh_now();
        rx.changed().await.unwrap();
        let state = rx.borrow().clone();
        assert_eq!(state.snapshot.as_ref().map(|s| s.vol_metrics.spot), Some(2.0));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        handle.stop();
    }

    #[tokio::test]
    async fn stopped_poller_stops_publishing() {
        let source = Arc::new(MockSource::default());
        let handle = Poller::spawn(source.clone(), Duration::from_millis(5));

        let mut rx = handle.subscribe();
        rx.changed().await.unwrap();
        handle.stop();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let calls_at_stop = source.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), calls_at_stop);
    }
}
