//! Wire payloads returned by the acquisition service.
//!
//! Every payload decodes permissively: absent or `null` fields fall back to
//! empty/zero values instead of failing, so downstream code can always assume
//! a complete shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{ConnectionHealth, QualityTier, SampleBatch, SensorSnapshot, SensorState};

/// Connection state labels treated as healthy.
pub const HEALTHY_STATES: [&str; 3] = ["healthy", "connected", "streaming"];

/// A connection state reported either as a flag or as a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportedState {
    Flag(bool),
    Label(String),
}

impl ReportedState {
    /// Whether this state permits acquisition.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        match self {
            Self::Flag(connected) => *connected,
            Self::Label(label) => {
                let label = label.trim().to_ascii_lowercase();
                HEALTHY_STATES.contains(&label.as_str())
            }
        }
    }
}

/// Response of the connection status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    #[serde(default, alias = "isConnected", alias = "megConnection")]
    pub connected: Option<ReportedState>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub sampling_rate: Option<f64>,
    #[serde(default)]
    pub channels: Option<u32>,
}

impl StatusPayload {
    /// Whether the reported connection state is a recognized healthy state.
    ///
    /// `connected` wins when present; the free-form `state` label is only
    /// consulted when it is absent.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        match (&self.connected, &self.state) {
            (Some(connected), _) => connected.is_healthy(),
            (None, Some(state)) => ReportedState::Label(state.clone()).is_healthy(),
            (None, None) => false,
        }
    }

    /// Convert into a health snapshot observed at `now`.
    #[must_use]
    pub fn into_health(self, now: OffsetDateTime) -> ConnectionHealth {
        let viable = self.is_healthy();
        let quality = self
            .quality
            .as_deref()
            .map(QualityTier::from_label)
            .unwrap_or_default();
        ConnectionHealth {
            viable,
            quality,
            last_seen: Some(now),
            sampling_rate: self.sampling_rate.filter(|r| r.is_finite() && *r > 0.0),
            channels: self.channels.map(|c| c as usize),
        }
    }
}

/// Response of the sample endpoint.
///
/// `data` holds rows of samples by columns of channels. Individual `null`
/// cells (non-finite values serialized by the service) read as 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplePayload {
    #[serde(default)]
    pub data: Option<Vec<Vec<Option<f64>>>>,
    #[serde(default)]
    pub sampling_rate: Option<f64>,
    #[serde(default)]
    pub channels: Option<u32>,
}

impl From<SamplePayload> for SampleBatch {
    fn from(payload: SamplePayload) -> Self {
        let samples = payload
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|v| v.filter(|v| v.is_finite()).unwrap_or(0.0))
                    .collect()
            })
            .collect();
        let sampling_rate = payload
            .sampling_rate
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or(0.0);
        SampleBatch {
            samples,
            sampling_rate,
            channel_count: payload.channels.unwrap_or(0) as usize,
        }
    }
}

/// Flags for one sensor as sent on the wire (each 0/1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorFlagsPayload {
    #[serde(rename = "ACT", default)]
    pub act: i64,
    #[serde(rename = "LLS", default)]
    pub lls: i64,
    #[serde(rename = "SLS", default)]
    pub sls: i64,
    #[serde(rename = "FLS", default)]
    pub fls: i64,
}

impl From<SensorFlagsPayload> for SensorState {
    fn from(flags: SensorFlagsPayload) -> Self {
        SensorState {
            active: flags.act != 0,
            lls: flags.lls != 0,
            sls: flags.sls != 0,
            fault: flags.fls != 0,
        }
    }
}

/// Response of the sensor status endpoint.
///
/// The service wraps the per-sensor map in a frame record; a bare map is
/// accepted as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SensorStatusPayload {
    Framed {
        parsed_sensor_statuses: BTreeMap<String, SensorFlagsPayload>,
    },
    Bare(BTreeMap<String, SensorFlagsPayload>),
}

impl From<SensorStatusPayload> for SensorSnapshot {
    fn from(payload: SensorStatusPayload) -> Self {
        let map = match payload {
            SensorStatusPayload::Framed {
                parsed_sensor_statuses,
            } => parsed_sensor_statuses,
            SensorStatusPayload::Bare(map) => map,
        };
        let sensors = map
            .into_iter()
            .filter_map(|(key, flags)| {
                key.trim()
                    .parse::<u16>()
                    .ok()
                    .map(|id| (id, SensorState::from(flags)))
            })
            .collect();
        SensorSnapshot { sensors }
    }
}
