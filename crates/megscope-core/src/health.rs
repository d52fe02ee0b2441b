//! Connection health monitoring.
//!
//! [`ConnectionHealthMonitor`] probes the service's status endpoint on a fixed
//! interval, independent of whether acquisition is running, and publishes each
//! result as a [`ConnectionHealth`] snapshot on a `watch` channel. The
//! acquisition scheduler gates on that channel.

use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use megscope_types::ConnectionHealth;

use crate::error::{Error, Result};
use crate::timer::TimerHandle;
use crate::traits::{AcquisitionService, SharedService};

/// Shortest accepted probe interval.
pub const MIN_HEALTH_INTERVAL: Duration = Duration::from_secs(2);
/// Longest accepted probe interval.
pub const MAX_HEALTH_INTERVAL: Duration = Duration::from_secs(5);

/// Options for the health monitor.
#[derive(Debug, Clone)]
pub struct HealthOptions {
    /// Time between status probes. Default: 2 seconds.
    pub interval: Duration,
}

impl Default for HealthOptions {
    fn default() -> Self {
        Self {
            interval: MIN_HEALTH_INTERVAL,
        }
    }
}

impl HealthOptions {
    /// Options with the given probe interval.
    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }

    /// Check that the interval lies in the 2-5 second range.
    pub fn validate(&self) -> Result<()> {
        if self.interval < MIN_HEALTH_INTERVAL || self.interval > MAX_HEALTH_INTERVAL {
            return Err(Error::InvalidConfig(format!(
                "health interval must be between {}s and {}s, got {}ms",
                MIN_HEALTH_INTERVAL.as_secs(),
                MAX_HEALTH_INTERVAL.as_secs(),
                self.interval.as_millis()
            )));
        }
        Ok(())
    }
}

/// Probe the status endpoint once.
///
/// A failed probe yields a non-viable, poor-quality snapshot that keeps
/// `previous_seen` as its `last_seen`.
pub async fn probe(
    service: &dyn AcquisitionService,
    previous_seen: Option<OffsetDateTime>,
) -> (ConnectionHealth, Option<Error>) {
    match service.status().await {
        Ok(payload) => (payload.into_health(OffsetDateTime::now_utc()), None),
        Err(e) => (ConnectionHealth::unreachable(previous_seen), Some(e)),
    }
}

/// Periodic status prober publishing [`ConnectionHealth`] snapshots.
#[derive(Debug)]
pub struct ConnectionHealthMonitor {
    receiver: watch::Receiver<ConnectionHealth>,
    timer: TimerHandle,
}

impl ConnectionHealthMonitor {
    /// Validate `options` and start probing.
    ///
    /// The first probe runs immediately. Until it completes the published
    /// health is the non-viable default.
    pub fn start(service: SharedService, options: HealthOptions) -> Result<Self> {
        options.validate()?;

        let (sender, receiver) = watch::channel(ConnectionHealth::default());
        let timer = TimerHandle::spawn("health", move |token| {
            health_loop(service, options, sender, token)
        });

        Ok(Self { receiver, timer })
    }

    /// Snapshot of the latest health, by value.
    pub fn current_health(&self) -> ConnectionHealth {
        self.receiver.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionHealth> {
        self.receiver.clone()
    }

    /// Whether the probe loop is still running.
    pub fn is_running(&self) -> bool {
        self.timer.is_active()
    }

    /// Stop probing. Subscribers see the channel close.
    pub fn stop(self) {
        self.timer.cancel();
    }
}

async fn health_loop(
    service: SharedService,
    options: HealthOptions,
    sender: watch::Sender<ConnectionHealth>,
    token: CancellationToken,
) {
    info!(interval_ms = options.interval.as_millis() as u64, "Health monitor started");
    let mut ticker = tokio::time::interval(options.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let previous = sender.borrow().clone();
        let (health, error) = tokio::select! {
            _ = token.cancelled() => break,
            result = probe(service.as_ref(), previous.last_seen) => result,
        };

        match (&error, previous.viable, health.viable) {
            (Some(e), true, _) => warn!(error = %e, "Status probe failed, connection not viable"),
            (Some(e), false, _) => debug!(error = %e, "Status probe failed"),
            (None, false, true) => info!(quality = %health.quality, "Connection became viable"),
            (None, true, false) => warn!(quality = %health.quality, "Connection no longer viable"),
            (None, _, _) => debug!(viable = health.viable, quality = %health.quality, "Status probe ok"),
        }

        if previous.quality != health.quality && error.is_none() {
            info!(from = %previous.quality, to = %health.quality, "Quality changed");
        }

        sender.send_replace(health);
    }

    info!("Health monitor stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use megscope_types::QualityTier;

    use super::*;
    use crate::mock::MockService;

    #[test]
    fn test_options_validate_range() {
        assert!(HealthOptions::default().validate().is_ok());
        assert!(HealthOptions::with_interval(Duration::from_secs(5)).validate().is_ok());
        assert!(HealthOptions::with_interval(Duration::from_secs(1)).validate().is_err());
        assert!(HealthOptions::with_interval(Duration::from_secs(6)).validate().is_err());
    }

    #[tokio::test]
    async fn test_probe_failure_keeps_last_seen() {
        let service = MockService::default();
        service.set_should_fail(true, None).await;

        let seen = OffsetDateTime::UNIX_EPOCH;
        let (health, error) = probe(&service, Some(seen)).await;
        assert!(!health.viable);
        assert_eq!(health.quality, QualityTier::Poor);
        assert_eq!(health.last_seen, Some(seen));
        assert!(error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_publishes_viable_health() {
        let service = Arc::new(MockService::builder().quality("excellent").build());
        let monitor = ConnectionHealthMonitor::start(service.clone(), HealthOptions::default())
            .unwrap();
        let mut rx = monitor.subscribe();

        rx.changed().await.unwrap();
        let health = monitor.current_health();
        assert!(health.viable);
        assert_eq!(health.quality, QualityTier::Excellent);
        assert!(health.last_seen.is_some());
        assert_eq!(health.sampling_rate, Some(375.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_failure_marks_non_viable() {
        let service = Arc::new(MockService::default());
        let monitor = ConnectionHealthMonitor::start(service.clone(), HealthOptions::default())
            .unwrap();
        let mut rx = monitor.subscribe();

        rx.changed().await.unwrap();
        assert!(monitor.current_health().viable);

        service.set_transient_failures(1);
        rx.changed().await.unwrap();
        let health = monitor.current_health();
        assert!(!health.viable);
        assert_eq!(health.quality, QualityTier::Poor);
        assert!(health.last_seen.is_some());

        rx.changed().await.unwrap();
        assert!(monitor.current_health().viable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probes_on_interval() {
        let service = Arc::new(MockService::default());
        let _monitor = ConnectionHealthMonitor::start(
            service.clone(),
            HealthOptions::with_interval(Duration::from_secs(2)),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(4100)).await;
        // Immediate first probe, then at 2 s and 4 s.
        assert_eq!(service.status_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_closes_channel() {
        let service = Arc::new(MockService::default());
        let monitor = ConnectionHealthMonitor::start(service, HealthOptions::default()).unwrap();
        let mut rx = monitor.subscribe();
        rx.changed().await.unwrap();

        monitor.stop();
        assert!(rx.changed().await.is_err());
    }
}
