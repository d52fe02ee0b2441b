//! Health-gated sample acquisition.
//!
//! The [`AcquisitionScheduler`] pulls sample batches from the service while the
//! connection is viable and makes no requests at all while it is not.
//!
//! ```text
//!            health watch
//!                 |
//!  non-viable --> wait (no requests) --> Suspended
//!  viable     --> poll every poll_interval --> Batch
//!  viable -> non-viable mid-request --> discard response, Suspended
//!  non-viable -> viable --> Resumed, poll immediately
//! ```
//!
//! The loop awaits each request before the next tick, so at most one request
//! is in flight per scheduler. Missed ticks are delayed rather than burst.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use megscope_types::{ConnectionHealth, SampleBatch};

use crate::error::{Error, Result};
use crate::timer::TimerHandle;
use crate::traits::SharedService;

/// Events emitted by the acquisition loop.
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionEvent {
    /// A fresh batch arrived.
    Batch(SampleBatch),
    /// The connection is not viable; no data will arrive until `Resumed`.
    Suspended,
    /// The connection became viable again and polling restarted.
    Resumed,
}

/// Options for the acquisition scheduler.
///
/// Use the builder pattern for convenient configuration:
///
/// ```
/// use std::time::Duration;
/// use megscope_core::SchedulerOptions;
///
/// let options = SchedulerOptions::builder()
///     .poll_interval(Duration::from_millis(100))
///     .staleness(Duration::from_millis(50))
///     .build();
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Time between polls while viable.
    /// Default: 100 ms.
    pub poll_interval: Duration,
    /// Age after which the last batch is stale and due for refetch.
    /// Default: 50 ms.
    pub staleness: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            staleness: Duration::from_millis(50),
        }
    }
}

impl SchedulerOptions {
    /// Create a new builder for SchedulerOptions.
    pub fn builder() -> SchedulerOptionsBuilder {
        SchedulerOptionsBuilder::default()
    }

    /// Validate the options and return an error if invalid.
    ///
    /// Checks that:
    /// - `poll_interval` is > 0
    /// - `staleness` is < `poll_interval`
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidConfig("poll_interval must be > 0".to_string()));
        }
        if self.staleness >= self.poll_interval {
            return Err(Error::InvalidConfig(
                "staleness must be shorter than poll_interval".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for SchedulerOptions.
#[derive(Debug, Clone, Default)]
pub struct SchedulerOptionsBuilder {
    options: SchedulerOptions,
}

impl SchedulerOptionsBuilder {
    /// Set the polling interval.
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.options.poll_interval = interval;
        self
    }

    /// Set the staleness threshold.
    #[must_use]
    pub fn staleness(mut self, staleness: Duration) -> Self {
        self.options.staleness = staleness;
        self
    }

    /// Build the SchedulerOptions.
    #[must_use]
    pub fn build(self) -> SchedulerOptions {
        self.options
    }
}

/// Health-gated polling loop for sample batches.
pub struct AcquisitionScheduler {
    service: SharedService,
    health: watch::Receiver<ConnectionHealth>,
    events: mpsc::Sender<AcquisitionEvent>,
    options: SchedulerOptions,
    timer: Option<TimerHandle>,
}

impl std::fmt::Debug for AcquisitionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquisitionScheduler")
            .field("options", &self.options)
            .field("running", &self.is_running())
            .finish()
    }
}

impl AcquisitionScheduler {
    /// Create a stopped scheduler.
    ///
    /// Batches and gate transitions are sent to `events`.
    pub fn new(
        service: SharedService,
        health: watch::Receiver<ConnectionHealth>,
        events: mpsc::Sender<AcquisitionEvent>,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            service,
            health,
            events,
            options,
            timer: None,
        }
    }

    /// Start polling. Calling `start` on a running scheduler does nothing.
    pub fn start(&mut self) -> Result<()> {
        self.options.validate()?;
        if self.is_running() {
            return Ok(());
        }

        let service = self.service.clone();
        let health = self.health.clone();
        let events = self.events.clone();
        let options = self.options.clone();
        self.timer = Some(TimerHandle::spawn("acquisition", move |token| {
            acquisition_loop(service, health, events, options, token)
        }));
        Ok(())
    }

    /// Stop polling and drop any in-flight request.
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    /// Whether the loop is running.
    pub fn is_running(&self) -> bool {
        self.timer.as_ref().is_some_and(TimerHandle::is_active)
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }
}

impl Drop for AcquisitionScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

enum PollExit {
    /// Health turned non-viable.
    Suspended,
    /// Cancelled, or a channel closed.
    Stopped,
}

/// Wait until viability equals `viable`. Returns `false` if the monitor is gone.
async fn wait_for_viability(health: &mut watch::Receiver<ConnectionHealth>, viable: bool) -> bool {
    health.wait_for(|h| h.viable == viable).await.is_ok()
}

async fn acquisition_loop(
    service: SharedService,
    mut health: watch::Receiver<ConnectionHealth>,
    events: mpsc::Sender<AcquisitionEvent>,
    options: SchedulerOptions,
    token: CancellationToken,
) {
    info!(
        poll_ms = options.poll_interval.as_millis() as u64,
        staleness_ms = options.staleness.as_millis() as u64,
        "Acquisition started"
    );

    loop {
        let viable = health.borrow_and_update().viable;
        if !viable {
            info!("Connection not viable, acquisition suspended");
            if events.send(AcquisitionEvent::Suspended).await.is_err() {
                break;
            }
            let open = tokio::select! {
                _ = token.cancelled() => break,
                open = wait_for_viability(&mut health, true) => open,
            };
            if !open {
                break;
            }
            info!("Connection viable, acquisition resumed");
            if events.send(AcquisitionEvent::Resumed).await.is_err() {
                break;
            }
        }

        match poll_while_viable(&service, &mut health, &events, &options, &token).await {
            PollExit::Suspended => continue,
            PollExit::Stopped => break,
        }
    }

    info!("Acquisition stopped");
}

async fn poll_while_viable(
    service: &SharedService,
    health: &mut watch::Receiver<ConnectionHealth>,
    events: &mpsc::Sender<AcquisitionEvent>,
    options: &SchedulerOptions,
    token: &CancellationToken,
) -> PollExit {
    // First tick fires immediately, so resuming polls without delay.
    let mut ticker = tokio::time::interval(options.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_fetch: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = token.cancelled() => return PollExit::Stopped,
            open = wait_for_viability(health, false) => {
                return if open { PollExit::Suspended } else { PollExit::Stopped };
            }
            _ = ticker.tick() => {}
        }

        if last_fetch.is_some_and(|at| at.elapsed() < options.staleness) {
            trace!("Samples still fresh, skipping tick");
            continue;
        }

        let result = tokio::select! {
            _ = token.cancelled() => return PollExit::Stopped,
            open = wait_for_viability(health, false) => {
                debug!("Connection lost mid-request, discarding response");
                return if open { PollExit::Suspended } else { PollExit::Stopped };
            }
            result = service.latest_samples() => result,
        };

        match result {
            Ok(batch) => {
                last_fetch = Some(Instant::now());
                trace!(samples = batch.samples.len(), "Batch received");
                if events.send(AcquisitionEvent::Batch(batch)).await.is_err() {
                    debug!("Event receiver dropped, stopping");
                    return PollExit::Stopped;
                }
            }
            Err(e) => {
                warn!(error = %e, "Sample request failed, retrying next tick");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use megscope_types::QualityTier;

    use super::*;
    use crate::mock::MockService;

    fn viable(viable: bool) -> ConnectionHealth {
        ConnectionHealth {
            viable,
            quality: if viable {
                QualityTier::Good
            } else {
                QualityTier::Poor
            },
            ..Default::default()
        }
    }

    fn setup(
        service: Arc<MockService>,
        initially_viable: bool,
    ) -> (
        AcquisitionScheduler,
        watch::Sender<ConnectionHealth>,
        mpsc::Receiver<AcquisitionEvent>,
    ) {
        let (health_tx, health_rx) = watch::channel(viable(initially_viable));
        let (events_tx, events_rx) = mpsc::channel(64);
        let scheduler =
            AcquisitionScheduler::new(service, health_rx, events_tx, SchedulerOptions::default());
        (scheduler, health_tx, events_rx)
    }

    #[test]
    fn test_options_default() {
        let opts = SchedulerOptions::default();
        assert_eq!(opts.poll_interval, Duration::from_millis(100));
        assert_eq!(opts.staleness, Duration::from_millis(50));
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_options_validate() {
        let opts = SchedulerOptions::builder()
            .poll_interval(Duration::ZERO)
            .build();
        assert!(opts.validate().is_err());

        let opts = SchedulerOptions::builder()
            .poll_interval(Duration::from_millis(100))
            .staleness(Duration::from_millis(100))
            .build();
        assert!(opts.validate().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_requests_while_not_viable() {
        let service = Arc::new(MockService::default());
        let (mut scheduler, _health, mut events) = setup(service.clone(), false);
        scheduler.start().unwrap();

        assert_eq!(events.recv().await, Some(AcquisitionEvent::Suspended));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(service.sample_count(), 0);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_every_interval_while_viable() {
        let service = Arc::new(MockService::builder().channels(2).synthetic(true).build());
        let (mut scheduler, _health, mut events) = setup(service.clone(), true);
        scheduler.start().unwrap();

        tokio::time::sleep(Duration::from_millis(1050)).await;
        // Immediate first poll, then one every 100 ms.
        assert_eq!(service.sample_count(), 11);

        let mut batches = 0;
        while let Ok(event) = events.try_recv() {
            assert!(matches!(event, AcquisitionEvent::Batch(_)));
            batches += 1;
        }
        assert_eq!(batches, 11);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resumes_immediately_when_viable() {
        let service = Arc::new(MockService::default());
        let (mut scheduler, health, mut events) = setup(service.clone(), false);
        scheduler.start().unwrap();
        assert_eq!(events.recv().await, Some(AcquisitionEvent::Suspended));

        tokio::time::sleep(Duration::from_secs(3)).await;
        health.send_replace(viable(true));

        assert_eq!(events.recv().await, Some(AcquisitionEvent::Resumed));
        let started = Instant::now();
        assert!(matches!(events.recv().await, Some(AcquisitionEvent::Batch(_))));
        assert!(started.elapsed() < Duration::from_millis(1));
        assert_eq!(service.sample_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_response_discarded_on_loss() {
        let service = Arc::new(MockService::default());
        service.set_latency(Duration::from_millis(500));
        let (mut scheduler, health, mut events) = setup(service.clone(), true);
        scheduler.start().unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(service.sample_count(), 1);
        health.send_replace(viable(false));

        assert_eq!(events.recv().await, Some(AcquisitionEvent::Suspended));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(events.try_recv().is_err());
        assert_eq!(service.sample_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_retry_next_tick() {
        let service = Arc::new(MockService::default());
        service.set_transient_failures(3);
        let (mut scheduler, _health, mut events) = setup(service.clone(), true);
        scheduler.start().unwrap();

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(service.sample_count(), 4);
        assert!(matches!(events.try_recv(), Ok(AcquisitionEvent::Batch(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_polling() {
        let service = Arc::new(MockService::default());
        let (mut scheduler, _health, _events) = setup(service.clone(), true);
        scheduler.start().unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(scheduler.is_running());

        scheduler.stop();
        let count = service.sample_count();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(service.sample_count(), count);
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_rejects_invalid_options() {
        let service = Arc::new(MockService::default());
        let (health_tx, health_rx) = watch::channel(viable(true));
        let (events_tx, _events_rx) = mpsc::channel(4);
        let options = SchedulerOptions::builder()
            .staleness(Duration::from_secs(1))
            .build();
        let mut scheduler = AcquisitionScheduler::new(service, health_rx, events_tx, options);

        assert!(matches!(scheduler.start(), Err(Error::InvalidConfig(_))));
        assert!(!scheduler.is_running());
        drop(health_tx);
    }
}
