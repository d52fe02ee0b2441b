//! Core types for the acquisition pipeline.

use core::fmt;
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{ParseError, ParseResult};

/// Number of sensor positions on the observed device.
pub const SENSOR_COUNT: u16 = 64;

/// Default number of acquisition channels exposed by the device.
pub const DEFAULT_CHANNEL_COUNT: usize = 192;

/// Stable identifier for one acquisition channel (1..=N).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u32", into = "u32"))]
pub struct ChannelId(u32);

impl ChannelId {
    /// Create a channel id, rejecting 0.
    ///
    /// # Examples
    ///
    /// ```
    /// use megscope_types::ChannelId;
    ///
    /// assert_eq!(ChannelId::new(3).unwrap().get(), 3);
    /// assert!(ChannelId::new(0).is_err());
    /// ```
    pub fn new(id: u32) -> ParseResult<Self> {
        if id == 0 {
            return Err(ParseError::InvalidChannelId(id));
        }
        Ok(Self(id))
    }

    /// Channel id for a zero-based arena index.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self(index as u32 + 1)
    }

    /// The raw 1-based id.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }

    /// Zero-based index into dense per-channel storage.
    #[must_use]
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl TryFrom<u32> for ChannelId {
    type Error = ParseError;

    fn try_from(value: u32) -> ParseResult<Self> {
        Self::new(value)
    }
}

impl From<ChannelId> for u32 {
    fn from(id: ChannelId) -> Self {
        id.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ch{}", self.0)
    }
}

/// RGB color token used to draw a channel trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ChannelColor {
    /// Trace palette, cycled by channel index.
    pub const PALETTE: [ChannelColor; 8] = [
        ChannelColor::rgb(34, 211, 238),  // cyan
        ChannelColor::rgb(251, 191, 36),  // amber
        ChannelColor::rgb(74, 222, 128),  // green
        ChannelColor::rgb(232, 121, 249), // fuchsia
        ChannelColor::rgb(96, 165, 250),  // blue
        ChannelColor::rgb(248, 113, 113), // red
        ChannelColor::rgb(163, 230, 53),  // lime
        ChannelColor::rgb(251, 146, 60),  // orange
    ];

    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Palette color for the channel at `index`.
    #[must_use]
    pub fn for_index(index: usize) -> Self {
        Self::PALETTE[index % Self::PALETTE.len()]
    }
}

/// Display configuration for one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelConfig {
    /// Whether the channel is drawn.
    pub visible: bool,
    /// Trace color.
    pub color: ChannelColor,
    /// Amplitude multiplier (never negative).
    pub scale: f64,
    /// Vertical shift applied after scaling, in surface units.
    pub offset: f64,
}

impl ChannelConfig {
    /// Visible channel with unit gain and no offset.
    #[must_use]
    pub fn new(color: ChannelColor) -> Self {
        Self {
            visible: true,
            color,
            scale: 1.0,
            offset: 0.0,
        }
    }

    /// Set the amplitude multiplier, clamping negatives (and NaN) to 0.
    pub fn set_scale(&mut self, scale: f64) {
        self.scale = if scale.is_nan() { 0.0 } else { scale.max(0.0) };
    }
}

/// Per-channel scalar readings captured at one instant, in channel order.
pub type Sample = Vec<f64>;

/// One acquisition response.
///
/// Every field is always populated; absent payload fields decode to an empty
/// sample list, a sampling rate of 0 and a channel count of 0.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SampleBatch {
    pub samples: Vec<Sample>,
    pub sampling_rate: f64,
    pub channel_count: usize,
}

impl SampleBatch {
    /// Whether the batch carries no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of channels each sample should be read as.
    ///
    /// Uses the reported channel count, falling back to the widest row when
    /// the service reported 0.
    #[must_use]
    pub fn effective_channel_count(&self) -> usize {
        if self.channel_count > 0 {
            self.channel_count
        } else {
            self.samples.iter().map(Vec::len).max().unwrap_or(0)
        }
    }

    /// Value of channel `index` in sample `row`, 0 when the row is short.
    #[must_use]
    pub fn value(&self, row: usize, index: usize) -> f64 {
        self.samples
            .get(row)
            .and_then(|sample| sample.get(index))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Coarse connection/signal quality classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum QualityTier {
    #[default]
    Poor,
    Fair,
    Good,
    Excellent,
}

impl QualityTier {
    /// Parse a service-reported label; unknown labels are `Poor`.
    ///
    /// # Examples
    ///
    /// ```
    /// use megscope_types::QualityTier;
    ///
    /// assert_eq!(QualityTier::from_label("Excellent"), QualityTier::Excellent);
    /// assert_eq!(QualityTier::from_label("weird"), QualityTier::Poor);
    /// ```
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "excellent" => Self::Excellent,
            "good" => Self::Good,
            "fair" => Self::Fair,
            _ => Self::Poor,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot of the link to the acquisition service.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConnectionHealth {
    /// Whether sample polling is permitted.
    pub viable: bool,
    /// Reported quality tier.
    pub quality: QualityTier,
    /// When the status endpoint last answered.
    #[cfg_attr(feature = "serde", serde(default, with = "time::serde::rfc3339::option"))]
    pub last_seen: Option<OffsetDateTime>,
    /// Sampling rate advertised by the status endpoint, if any.
    pub sampling_rate: Option<f64>,
    /// Channel count advertised by the status endpoint, if any.
    pub channels: Option<usize>,
}

impl ConnectionHealth {
    /// Health after a failed status probe.
    ///
    /// Keeps the previous `last_seen` so the UI can show how long the
    /// service has been silent.
    #[must_use]
    pub fn unreachable(last_seen: Option<OffsetDateTime>) -> Self {
        Self {
            viable: false,
            quality: QualityTier::Poor,
            last_seen,
            sampling_rate: None,
            channels: None,
        }
    }
}

/// Status flags reported for one sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorState {
    /// ACT: sensor is streaming.
    pub active: bool,
    /// LLS line-quality flag.
    pub lls: bool,
    /// SLS line-quality flag.
    pub sls: bool,
    /// FLS fault flag.
    pub fault: bool,
}

/// Full sensor status snapshot keyed by sensor id.
///
/// Each poll replaces the previous snapshot wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorSnapshot {
    pub sensors: BTreeMap<u16, SensorState>,
}

impl SensorSnapshot {
    #[must_use]
    pub fn get(&self, id: u16) -> Option<&SensorState> {
        self.sensors.get(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Number of reported sensors with the ACT flag set.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.sensors.values().filter(|s| s.active).count()
    }
}
