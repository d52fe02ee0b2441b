//! Platform-agnostic data model for the megscope acquisition console.
//!
//! This crate holds the values that flow through the acquisition pipeline:
//! channel identifiers and display configuration, sample batches, connection
//! health snapshots and sensor status snapshots, plus (with the default
//! `serde` feature) the permissive decoders for the service's JSON payloads.
//!
//! # Example
//!
//! ```
//! use megscope_types::{ChannelColor, ChannelConfig, ChannelId};
//!
//! let id = ChannelId::new(1).unwrap();
//! let config = ChannelConfig::new(ChannelColor::for_index(id.index()));
//! assert!(config.visible);
//! ```

pub mod error;
#[cfg(feature = "serde")]
pub mod payload;
pub mod types;

pub use error::{ParseError, ParseResult};
#[cfg(feature = "serde")]
pub use payload::{SamplePayload, SensorStatusPayload, StatusPayload};
pub use types::{
    ChannelColor, ChannelConfig, ChannelId, ConnectionHealth, DEFAULT_CHANNEL_COUNT, QualityTier,
    SENSOR_COUNT, Sample, SampleBatch, SensorSnapshot, SensorState,
};
