//! Real-time acquisition pipeline for the megscope console.
//!
//! This crate decides when to pull multichannel sample data from the
//! acquisition service, keeps a fixed time-span window of it per channel, and
//! paints that window as stacked waveforms onto an abstract drawing surface.
//!
//! # Components
//!
//! | Component | Role |
//! |-----------|------|
//! | [`ConnectionHealthMonitor`] | Probes the status endpoint every 2-5 s and publishes [`ConnectionHealth`] |
//! | [`AcquisitionScheduler`] | Polls for sample batches only while the connection is viable |
//! | [`ChannelStateStore`] | Per-channel visibility, color, gain and offset |
//! | [`SampleWindowBuffer`] | Rolling per-channel windows of `time_window_secs × sampling_rate` samples |
//! | [`WaveformRenderer`] | Paints a [`FrameSnapshot`] onto any [`Surface`] |
//! | [`SensorGrid`] / [`SensorPoller`] | 8×8 sensor activation panel state |
//! | [`export`] | Delimited-text export of the buffered window |
//!
//! Every background loop is owned by a [`TimerHandle`], which cancels its task
//! when dropped.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use megscope_core::{
//!     AcquisitionEvent, AcquisitionScheduler, ChannelStateStore, ConnectionHealthMonitor,
//!     DisplaySettings, HealthOptions, MockService, SampleWindowBuffer, SchedulerOptions,
//! };
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = Arc::new(MockService::builder().synthetic(true).build());
//!     let monitor = ConnectionHealthMonitor::start(service.clone(), HealthOptions::default())?;
//!
//!     let (tx, mut rx) = mpsc::channel(64);
//!     let mut scheduler =
//!         AcquisitionScheduler::new(service, monitor.subscribe(), tx, SchedulerOptions::default());
//!     scheduler.start()?;
//!
//!     let channels = ChannelStateStore::new(192);
//!     let settings = DisplaySettings::default();
//!     let mut buffer = SampleWindowBuffer::new();
//!     while let Some(event) = rx.recv().await {
//!         if let AcquisitionEvent::Batch(batch) = event {
//!             buffer.ingest(&batch, &channels, &settings);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod channels;
pub mod error;
pub mod export;
pub mod health;
pub mod messages;
pub mod mock;
pub mod render;
pub mod scheduler;
pub mod sensors;
#[cfg(feature = "service-client")]
pub mod service_client;
pub mod settings;
pub mod timer;
pub mod traits;
pub mod window;

pub use megscope_types as types;

pub use channels::ChannelStateStore;
pub use error::{Error, Result};
pub use health::{ConnectionHealthMonitor, HealthOptions};
pub use messages::{Command, ConsoleEvent};
pub use mock::{MockService, MockServiceBuilder};
pub use render::{
    DrawOp, FrameSnapshot, FrameStats, RecordingSurface, RenderStyle, Surface, TextAnchor,
    WaveformRenderer,
};
pub use scheduler::{AcquisitionEvent, AcquisitionScheduler, SchedulerOptions};
pub use sensors::{SensorCommand, SensorGrid, SensorPoller, SensorTile};
#[cfg(feature = "service-client")]
pub use service_client::{ServiceClient, ServiceClientError};
pub use settings::DisplaySettings;
pub use timer::TimerHandle;
pub use traits::{AcquisitionService, ConnectRequest, SharedService};
pub use window::SampleWindowBuffer;

pub use megscope_types::{ConnectionHealth, QualityTier, SampleBatch, SensorSnapshot};
