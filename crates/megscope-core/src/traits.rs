//! Trait abstraction over the acquisition service.
//!
//! The pipeline components are generic over [`AcquisitionService`] so they can
//! run against the HTTP [`ServiceClient`](crate::service_client::ServiceClient)
//! in production and against [`MockService`](crate::mock::MockService) in tests
//! and in simulation mode.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use megscope_types::{SampleBatch, SensorSnapshot, StatusPayload};

use crate::error::Result;

/// Device connection parameters sent with a connect request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    pub host: String,
    pub port: u16,
    pub sampling_rate: u32,
    pub channels: u32,
    /// Connect timeout in milliseconds.
    pub timeout: u64,
}

impl Default for ConnectRequest {
    fn default() -> Self {
        Self {
            host: "192.168.0.10".to_string(),
            port: 8089,
            sampling_rate: 375,
            channels: 192,
            timeout: 10_000,
        }
    }
}

/// Operations the console needs from the service that owns the device.
///
/// # Example
///
/// ```ignore
/// use megscope_core::{AcquisitionService, Result};
///
/// async fn print_status<S: AcquisitionService>(service: &S) -> Result<()> {
///     let status = service.status().await?;
///     println!("healthy: {}", status.is_healthy());
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait AcquisitionService: Send + Sync {
    /// Query the connection status endpoint.
    async fn status(&self) -> Result<StatusPayload>;

    /// Fetch the next batch of samples.
    async fn latest_samples(&self) -> Result<SampleBatch>;

    /// Fetch a full sensor status snapshot.
    async fn sensor_status(&self) -> Result<SensorSnapshot>;

    /// Activate or deactivate a single sensor.
    async fn set_sensor_active(&self, sensor_id: u16, activate: bool) -> Result<()>;

    /// Activate or deactivate every sensor with one aggregate command.
    async fn set_all_sensors(&self, activate: bool) -> Result<()>;

    /// Ask the service to connect to the device and start streaming.
    async fn connect(&self, request: &ConnectRequest) -> Result<()>;

    /// Ask the service to drop the device connection.
    async fn disconnect(&self) -> Result<()>;
}

/// Shared handle to a service, as held by the background loops.
pub type SharedService = std::sync::Arc<dyn AcquisitionService>;
