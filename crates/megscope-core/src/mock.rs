//! Mock acquisition service for testing and simulation.
//!
//! [`MockService`] implements [`AcquisitionService`] without a network, so the
//! pipeline can be exercised in unit tests and in the CLI's `--simulate` mode.
//!
//! # Features
//!
//! - **Scripted responses**: queue sample batches, set status and sensor snapshots
//! - **Synthetic signal**: generate sine-plus-noise batches when the queue is empty
//! - **Failure injection**: fail every request, or the next `n` requests
//! - **Latency simulation**: delay every request to model a slow service
//! - **Request counters**: count calls per endpoint

use std::collections::{BTreeMap, VecDeque};
use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use megscope_types::payload::ReportedState;
use megscope_types::{
    DEFAULT_CHANNEL_COUNT, SENSOR_COUNT, SampleBatch, SensorSnapshot, SensorState, StatusPayload,
};

use crate::error::{Error, Result};
use crate::traits::{AcquisitionService, ConnectRequest};

/// A mock acquisition service.
///
/// # Example
///
/// ```
/// use megscope_core::{AcquisitionService, MockService};
///
/// #[tokio::main]
/// async fn main() {
///     let service = MockService::builder().channels(4).synthetic(true).build();
///     let batch = service.latest_samples().await.unwrap();
///     assert_eq!(batch.channel_count, 4);
///     assert!(!batch.is_empty());
/// }
/// ```
pub struct MockService {
    channels: usize,
    sampling_rate: f64,
    connected: AtomicBool,
    quality: RwLock<String>,
    batches: Mutex<VecDeque<SampleBatch>>,
    sensors: RwLock<SensorSnapshot>,
    synthetic: AtomicBool,
    samples_per_request: AtomicUsize,
    /// Index of the next synthetic sample, so traces stay continuous.
    sample_clock: AtomicU64,
    status_count: AtomicU32,
    sample_count: AtomicU32,
    sensor_count: AtomicU32,
    command_count: AtomicU32,
    should_fail: AtomicBool,
    fail_message: RwLock<String>,
    /// Simulated latency in milliseconds (0 = no delay).
    latency_ms: AtomicU64,
    /// Number of upcoming requests that fail before succeeding again.
    remaining_failures: AtomicU32,
}

impl std::fmt::Debug for MockService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockService")
            .field("channels", &self.channels)
            .field("sampling_rate", &self.sampling_rate)
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MockService {
    fn default() -> Self {
        MockServiceBuilder::default().build()
    }
}

impl MockService {
    /// Create a builder for a mock service.
    pub fn builder() -> MockServiceBuilder {
        MockServiceBuilder::default()
    }

    /// Channel count the mock reports.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Sampling rate the mock reports.
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    async fn check_should_fail(&self) -> Result<()> {
        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.remaining_failures.load(Ordering::Relaxed) > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(self.failure().await);
        }

        if self.should_fail.load(Ordering::Relaxed) {
            Err(self.failure().await)
        } else {
            Ok(())
        }
    }

    async fn failure(&self) -> Error {
        Error::NotReachable {
            url: "mock://service".to_string(),
            message: self.fail_message.read().await.clone(),
        }
    }

    fn synthesize(&self) -> SampleBatch {
        let count = self.samples_per_request.load(Ordering::Relaxed);
        let start = self.sample_clock.fetch_add(count as u64, Ordering::Relaxed);
        let rate = if self.sampling_rate > 0.0 {
            self.sampling_rate
        } else {
            1.0
        };

        let samples = (0..count as u64)
            .map(|n| {
                let t = (start + n) as f64 / rate;
                (0..self.channels)
                    .map(|ch| {
                        // 5-14 Hz carrier per channel plus a little noise.
                        let freq = 5.0 + (ch % 10) as f64;
                        let noise = (rand::random::<f64>() - 0.5) * 0.1;
                        (TAU * freq * t).sin() + noise
                    })
                    .collect()
            })
            .collect();

        SampleBatch {
            samples,
            sampling_rate: self.sampling_rate,
            channel_count: self.channels,
        }
    }

    // --- Test control methods ---

    /// Set whether the status endpoint reports a healthy connection.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    /// Whether the mock currently reports a healthy connection.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Set the reported quality label.
    pub async fn set_quality(&self, quality: &str) {
        *self.quality.write().await = quality.to_string();
    }

    /// Queue a batch to be returned by the next sample request.
    pub async fn push_batch(&self, batch: SampleBatch) {
        self.batches.lock().await.push_back(batch);
    }

    /// Replace the sensor snapshot.
    pub async fn set_sensors(&self, snapshot: SensorSnapshot) {
        *self.sensors.write().await = snapshot;
    }

    /// Enable or disable synthetic batches when the queue is empty.
    pub fn set_synthetic(&self, synthetic: bool) {
        self.synthetic.store(synthetic, Ordering::Relaxed);
    }

    /// Make every request fail (or succeed again).
    pub async fn set_should_fail(&self, fail: bool, message: Option<&str>) {
        self.should_fail.store(fail, Ordering::Relaxed);
        if let Some(msg) = message {
            *self.fail_message.write().await = msg.to_string();
        }
    }

    /// Fail the next `count` requests, then succeed.
    pub fn set_transient_failures(&self, count: u32) {
        self.remaining_failures.store(count, Ordering::Relaxed);
    }

    /// Set simulated latency for every request.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Number of status requests served (including failures).
    pub fn status_count(&self) -> u32 {
        self.status_count.load(Ordering::Relaxed)
    }

    /// Number of sample requests served (including failures).
    pub fn sample_count(&self) -> u32 {
        self.sample_count.load(Ordering::Relaxed)
    }

    /// Number of sensor snapshot requests served (including failures).
    pub fn sensor_count(&self) -> u32 {
        self.sensor_count.load(Ordering::Relaxed)
    }

    /// Number of sensor and connection commands received.
    pub fn command_count(&self) -> u32 {
        self.command_count.load(Ordering::Relaxed)
    }

    /// Reset all request counters.
    pub fn reset_counts(&self) {
        self.status_count.store(0, Ordering::Relaxed);
        self.sample_count.store(0, Ordering::Relaxed);
        self.sensor_count.store(0, Ordering::Relaxed);
        self.command_count.store(0, Ordering::Relaxed);
    }
}

#[async_trait]
impl AcquisitionService for MockService {
    async fn status(&self) -> Result<StatusPayload> {
        self.status_count.fetch_add(1, Ordering::Relaxed);
        self.check_should_fail().await?;

        let connected = self.connected.load(Ordering::Relaxed);
        Ok(StatusPayload {
            connected: Some(ReportedState::Flag(connected)),
            state: Some(if connected { "streaming" } else { "disconnected" }.to_string()),
            quality: Some(self.quality.read().await.clone()),
            sampling_rate: Some(self.sampling_rate),
            channels: Some(self.channels as u32),
        })
    }

    async fn latest_samples(&self) -> Result<SampleBatch> {
        self.sample_count.fetch_add(1, Ordering::Relaxed);
        self.check_should_fail().await?;

        if let Some(batch) = self.batches.lock().await.pop_front() {
            return Ok(batch);
        }
        if self.synthetic.load(Ordering::Relaxed) && self.connected.load(Ordering::Relaxed) {
            return Ok(self.synthesize());
        }
        Ok(SampleBatch {
            samples: Vec::new(),
            sampling_rate: self.sampling_rate,
            channel_count: self.channels,
        })
    }

    async fn sensor_status(&self) -> Result<SensorSnapshot> {
        self.sensor_count.fetch_add(1, Ordering::Relaxed);
        self.check_should_fail().await?;
        Ok(self.sensors.read().await.clone())
    }

    async fn set_sensor_active(&self, sensor_id: u16, activate: bool) -> Result<()> {
        self.command_count.fetch_add(1, Ordering::Relaxed);
        self.check_should_fail().await?;

        let mut snapshot = self.sensors.write().await;
        match snapshot.sensors.get_mut(&sensor_id) {
            Some(state) => {
                state.active = activate;
                Ok(())
            }
            None => Err(Error::Api {
                status: 404,
                message: format!("Sensor {sensor_id} not found"),
            }),
        }
    }

    async fn set_all_sensors(&self, activate: bool) -> Result<()> {
        self.command_count.fetch_add(1, Ordering::Relaxed);
        self.check_should_fail().await?;

        for state in self.sensors.write().await.sensors.values_mut() {
            state.active = activate;
        }
        Ok(())
    }

    async fn connect(&self, _request: &ConnectRequest) -> Result<()> {
        self.command_count.fetch_add(1, Ordering::Relaxed);
        self.check_should_fail().await?;
        self.connected.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.command_count.fetch_add(1, Ordering::Relaxed);
        self.check_should_fail().await?;
        self.connected.store(false, Ordering::Relaxed);
        Ok(())
    }
}

/// Builder for creating mock services with custom settings.
#[derive(Debug)]
pub struct MockServiceBuilder {
    channels: usize,
    sampling_rate: f64,
    connected: bool,
    quality: String,
    synthetic: bool,
    samples_per_request: usize,
    sensor_count: u16,
    sensors_active: bool,
}

impl Default for MockServiceBuilder {
    fn default() -> Self {
        Self {
            channels: DEFAULT_CHANNEL_COUNT,
            sampling_rate: 375.0,
            connected: true,
            quality: "good".to_string(),
            synthetic: false,
            // About 100 ms of data at 375 Hz.
            samples_per_request: 38,
            sensor_count: SENSOR_COUNT,
            sensors_active: true,
        }
    }
}

impl MockServiceBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reported channel count.
    #[must_use]
    pub fn channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    /// Set the reported sampling rate.
    #[must_use]
    pub fn sampling_rate(mut self, rate: f64) -> Self {
        self.sampling_rate = rate;
        self
    }

    /// Set whether the service starts connected.
    #[must_use]
    pub fn connected(mut self, connected: bool) -> Self {
        self.connected = connected;
        self
    }

    /// Set the reported quality label.
    #[must_use]
    pub fn quality(mut self, quality: &str) -> Self {
        self.quality = quality.to_string();
        self
    }

    /// Generate synthetic batches when no batch is queued.
    #[must_use]
    pub fn synthetic(mut self, synthetic: bool) -> Self {
        self.synthetic = synthetic;
        self
    }

    /// Number of samples in each synthetic batch.
    #[must_use]
    pub fn samples_per_request(mut self, count: usize) -> Self {
        self.samples_per_request = count;
        self
    }

    /// Number of sensors in the initial snapshot (ids 1..=count).
    #[must_use]
    pub fn sensor_count(mut self, count: u16) -> Self {
        self.sensor_count = count;
        self
    }

    /// Initial ACT flag for every sensor.
    #[must_use]
    pub fn sensors_active(mut self, active: bool) -> Self {
        self.sensors_active = active;
        self
    }

    /// Build the mock service.
    #[must_use]
    pub fn build(self) -> MockService {
        let sensors: BTreeMap<u16, SensorState> = (1..=self.sensor_count)
            .map(|id| {
                (
                    id,
                    SensorState {
                        active: self.sensors_active,
                        lls: true,
                        sls: true,
                        fault: false,
                    },
                )
            })
            .collect();

        MockService {
            channels: self.channels,
            sampling_rate: self.sampling_rate,
            connected: AtomicBool::new(self.connected),
            quality: RwLock::new(self.quality),
            batches: Mutex::new(VecDeque::new()),
            sensors: RwLock::new(SensorSnapshot { sensors }),
            synthetic: AtomicBool::new(self.synthetic),
            samples_per_request: AtomicUsize::new(self.samples_per_request),
            sample_clock: AtomicU64::new(0),
            status_count: AtomicU32::new(0),
            sample_count: AtomicU32::new(0),
            sensor_count: AtomicU32::new(0),
            command_count: AtomicU32::new(0),
            should_fail: AtomicBool::new(false),
            fail_message: RwLock::new("Mock failure".to_string()),
            latency_ms: AtomicU64::new(0),
            remaining_failures: AtomicU32::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_status_reflects_connection() {
        let service = MockService::builder().quality("excellent").build();
        let status = service.status().await.unwrap();
        assert!(status.is_healthy());
        assert_eq!(status.quality.as_deref(), Some("excellent"));

        service.set_connected(false);
        assert!(!service.status().await.unwrap().is_healthy());
        assert_eq!(service.status_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_queued_batches_come_first() {
        let service = MockService::builder().channels(2).synthetic(true).build();
        let scripted = SampleBatch {
            samples: vec![vec![1.0, 2.0]],
            sampling_rate: 100.0,
            channel_count: 2,
        };
        service.push_batch(scripted.clone()).await;

        assert_eq!(service.latest_samples().await.unwrap(), scripted);
        let synthetic = service.latest_samples().await.unwrap();
        assert_eq!(synthetic.samples.len(), 38);
        assert!(synthetic.samples.iter().all(|s| s.len() == 2));
    }

    #[tokio::test]
    async fn test_mock_empty_batch_without_synthetic() {
        let service = MockService::builder().channels(3).build();
        let batch = service.latest_samples().await.unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.channel_count, 3);
        assert_eq!(batch.sampling_rate, 375.0);
    }

    #[tokio::test]
    async fn test_mock_transient_failures() {
        let service = MockService::default();
        service.set_transient_failures(2);

        assert!(service.status().await.is_err());
        assert!(service.status().await.is_err());
        assert!(service.status().await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_should_fail_message() {
        let service = MockService::default();
        service.set_should_fail(true, Some("service down")).await;

        let err = service.latest_samples().await.unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("service down"));

        service.set_should_fail(false, None).await;
        assert!(service.latest_samples().await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_sensor_commands_update_snapshot() {
        let service = MockService::builder().sensors_active(false).build();
        assert_eq!(service.sensor_status().await.unwrap().len(), 64);

        service.set_sensor_active(7, true).await.unwrap();
        let snapshot = service.sensor_status().await.unwrap();
        assert!(snapshot.get(7).unwrap().active);
        assert_eq!(snapshot.active_count(), 1);

        service.set_all_sensors(true).await.unwrap();
        assert_eq!(service.sensor_status().await.unwrap().active_count(), 64);
        assert_eq!(service.command_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_unknown_sensor_is_api_error() {
        let service = MockService::builder().sensor_count(4).build();
        let err = service.set_sensor_active(37, true).await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_mock_connect_disconnect() {
        let service = MockService::builder().connected(false).build();
        service.connect(&ConnectRequest::default()).await.unwrap();
        assert!(service.is_connected());
        service.disconnect().await.unwrap();
        assert!(!service.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_latency() {
        let service = MockService::default();
        service.set_latency(Duration::from_millis(250));

        let start = tokio::time::Instant::now();
        service.status().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[test]
    fn test_mock_debug() {
        let service = MockService::builder().channels(8).build();
        let debug = format!("{:?}", service);
        assert!(debug.contains("MockService"));
        assert!(debug.contains("channels: 8"));
    }
}
