//! HTTP client for the acquisition service REST API.
//!
//! The service owns the device connection and exposes connection status,
//! sample batches and sensor status. This client wraps those endpoints and
//! implements [`AcquisitionService`] so it can drive the pipeline.
//!
//! # Example
//!
//! ```no_run
//! use megscope_core::service_client::ServiceClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ServiceClient::new("http://localhost:8000")?;
//!
//! let status = client.status().await?;
//! println!("healthy: {}", status.is_healthy());
//!
//! let batch = client.latest_samples().await?;
//! println!("{} samples at {} Hz", batch.samples.len(), batch.sampling_rate);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use megscope_types::{
    SampleBatch, SamplePayload, SensorSnapshot, SensorStatusPayload, StatusPayload,
};

use crate::error::Error;
use crate::traits::{AcquisitionService, ConnectRequest};

/// Default number of samples requested per poll.
pub const DEFAULT_MAX_SAMPLES: usize = 100;

/// HTTP client for the acquisition service API.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    client: Client,
    base_url: String,
    max_samples: usize,
}

/// Error type for service client operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceClientError {
    /// The service is not reachable.
    #[error("Service not reachable at {url}: {source}")]
    NotReachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// API returned an error response.
    #[error("API error: {message}")]
    ApiError { status: u16, message: String },
}

/// Result type for service client operations.
pub type Result<T> = std::result::Result<T, ServiceClientError>;

impl From<ServiceClientError> for Error {
    fn from(err: ServiceClientError) -> Self {
        match err {
            ServiceClientError::NotReachable { url, source } => Error::NotReachable {
                url,
                message: source.to_string(),
            },
            ServiceClientError::Request(e) if e.is_decode() => {
                Error::InvalidResponse(e.to_string())
            }
            ServiceClientError::Request(e) => Error::NotReachable {
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
                message: e.to_string(),
            },
            ServiceClientError::InvalidUrl(url) => Error::InvalidConfig(url),
            ServiceClientError::ApiError { status, message } => Error::Api { status, message },
        }
    }
}

impl ServiceClient {
    /// Create a new service client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the service (e.g., "http://localhost:8000")
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(ServiceClientError::Request)?;

        Self::with_client(base_url, client)
    }

    /// Create a client with a custom reqwest Client.
    pub fn with_client(base_url: &str, client: Client) -> Result<Self> {
        // Normalize URL (remove trailing slash)
        let base_url = base_url.trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ServiceClientError::InvalidUrl(format!(
                "URL must start with http:// or https://, got: {}",
                base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            max_samples: DEFAULT_MAX_SAMPLES,
        })
    }

    /// Set how many samples each poll asks for.
    #[must_use]
    pub fn max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples.max(1);
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Get connection status.
    pub async fn status(&self) -> Result<StatusPayload> {
        self.fetch("/api/meg/status").await
    }

    /// Fetch the samples queued since the last poll.
    pub async fn latest_samples(&self) -> Result<SampleBatch> {
        let path = format!("/api/meg/data/monitor?max_samples={}", self.max_samples);
        self.fetch::<SamplePayload>(&path).await.map(SampleBatch::from)
    }

    /// Fetch the latest sensor status snapshot.
    pub async fn sensor_status(&self) -> Result<SensorSnapshot> {
        self.fetch::<SensorStatusPayload>("/api/system/sensor_status")
            .await
            .map(SensorSnapshot::from)
    }

    /// Activate or deactivate one sensor's stream.
    pub async fn toggle_sensor_stream(&self, sensor_id: u16, activate: bool) -> Result<()> {
        let path = format!("/api/system/sensors/{sensor_id}/toggle_stream?activate={activate}");
        self.post(&path, None).await
    }

    /// Activate or deactivate every sensor with one request.
    pub async fn set_all_streams(&self, activate: bool) -> Result<()> {
        let path = if activate {
            "/api/system/sensors/activate_all"
        } else {
            "/api/system/sensors/deactivate_all"
        };
        self.post(path, None).await
    }

    /// Connect the service to the device.
    pub async fn connect_device(&self, request: &ConnectRequest) -> Result<()> {
        self.post("/api/meg/connect", Some(request)).await
    }

    /// Disconnect the service from the device.
    pub async fn disconnect_device(&self) -> Result<()> {
        self.post("/api/meg/disconnect", None).await
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path);
        let response = self.send(self.client.get(&url), &url).await?;
        response.json().await.map_err(ServiceClientError::Request)
    }

    async fn post(&self, path: &str, body: Option<&ConnectRequest>) -> Result<()> {
        let url = self.endpoint(path);
        let mut request = self.client.post(&url);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send(request, &url).await.map(drop)
    }

    /// Send a request and turn non-2xx answers into [`ServiceClientError::ApiError`].
    async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|source| ServiceClientError::NotReachable {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // FastAPI reports errors under "detail"; other services use "error".
        let body = response.json::<serde_json::Value>().await.ok();
        let message = body
            .as_ref()
            .and_then(|v| v.get("detail").or_else(|| v.get("error")))
            .and_then(|e| e.as_str())
            .map_or_else(|| status.to_string(), String::from);

        Err(ServiceClientError::ApiError {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl AcquisitionService for ServiceClient {
    async fn status(&self) -> crate::Result<StatusPayload> {
        Ok(ServiceClient::status(self).await?)
    }

    async fn latest_samples(&self) -> crate::Result<SampleBatch> {
        Ok(ServiceClient::latest_samples(self).await?)
    }

    async fn sensor_status(&self) -> crate::Result<SensorSnapshot> {
        Ok(ServiceClient::sensor_status(self).await?)
    }

    async fn set_sensor_active(&self, sensor_id: u16, activate: bool) -> crate::Result<()> {
        Ok(self.toggle_sensor_stream(sensor_id, activate).await?)
    }

    async fn set_all_sensors(&self, activate: bool) -> crate::Result<()> {
        Ok(self.set_all_streams(activate).await?)
    }

    async fn connect(&self, request: &ConnectRequest) -> crate::Result<()> {
        Ok(self.connect_device(request).await?)
    }

    async fn disconnect(&self) -> crate::Result<()> {
        Ok(self.disconnect_device().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ServiceClient::new("http://localhost:8000");
        assert!(client.is_ok());

        let client = client.unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_client_normalizes_url() {
        let client = ServiceClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_client_invalid_url() {
        let result = ServiceClient::new("localhost:8000");
        assert!(result.is_err());
        assert!(matches!(result, Err(ServiceClientError::InvalidUrl(_))));
    }

    #[test]
    fn test_max_samples_is_at_least_one() {
        let client = ServiceClient::new("http://localhost:8000")
            .unwrap()
            .max_samples(0);
        assert_eq!(client.max_samples, 1);
    }

    #[test]
    fn test_invalid_url_maps_to_invalid_config() {
        let err: Error = ServiceClientError::InvalidUrl("ftp://x".to_string()).into();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_api_error_maps_to_api() {
        let err: Error = ServiceClientError::ApiError {
            status: 404,
            message: "No sensor status data available yet.".to_string(),
        }
        .into();
        assert!(matches!(err, Error::Api { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        // Port 9 (discard) is not expected to host an HTTP service.
        let client = ServiceClient::new("http://127.0.0.1:9").unwrap();
        let err: Error = ServiceClient::status(&client).await.unwrap_err().into();
        assert!(err.is_transport());
    }
}
