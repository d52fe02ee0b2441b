//! Command implementations for the CLI.

mod capture;
mod config;
mod sensors;
mod status;

use std::sync::Arc;

use anyhow::{Context, Result};
use megscope_core::{MockService, ServiceClient, SharedService};
use tracing::info;

use crate::config::Config;

pub use capture::cmd_capture;
pub use config::cmd_config;
pub use sensors::cmd_sensors;
pub use status::cmd_status;

/// Build the service the pipeline talks to.
///
/// `simulate` swaps the HTTP client for a synthetic in-process service.
pub fn connect_service(config: &Config, simulate: bool) -> Result<SharedService> {
    if simulate {
        info!(channels = config.channel_count, "Using simulated acquisition service");
        let service = MockService::builder()
            .channels(config.channel_count)
            .synthetic(true)
            .build();
        return Ok(Arc::new(service));
    }

    let client = ServiceClient::new(&config.service_url)
        .with_context(|| format!("Invalid service URL: {}", config.service_url))?
        .max_samples(config.max_samples);
    info!(url = %client.base_url(), "Using acquisition service");
    Ok(Arc::new(client))
}
