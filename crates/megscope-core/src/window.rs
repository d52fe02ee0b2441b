//! Rolling per-channel sample windows.
//!
//! [`SampleWindowBuffer`] turns the unbounded batch stream into a fixed
//! time-span view: each configured channel keeps at most
//! `W = round(time_window_secs × sampling_rate)` values, appended at the tail
//! and evicted from the head.
//!
//! The buffer is owned by a single writer (the UI loop). The renderer and the
//! exporter only ever borrow it.

use std::collections::VecDeque;

use megscope_types::{ChannelId, SampleBatch};
use tracing::{debug, trace};

use crate::channels::ChannelStateStore;
use crate::settings::DisplaySettings;

static EMPTY_WINDOW: VecDeque<f64> = VecDeque::new();

/// Per-channel rolling windows in an index-addressed arena.
#[derive(Debug, Clone, Default)]
pub struct SampleWindowBuffer {
    windows: Vec<VecDeque<f64>>,
    sampling_rate: f64,
    total_samples: u64,
}

impl SampleWindowBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch to the windows of every configured channel.
    ///
    /// Visibility does not matter; hidden channels keep filling so toggling
    /// them back on shows a full window. A short row reads as 0 for the
    /// missing channels. Channels past the batch's effective channel count
    /// are emptied. An empty batch leaves everything untouched.
    pub fn ingest(
        &mut self,
        batch: &SampleBatch,
        channels: &ChannelStateStore,
        settings: &DisplaySettings,
    ) {
        if batch.is_empty() {
            return;
        }

        self.sampling_rate = batch.sampling_rate;
        self.total_samples += batch.samples.len() as u64;
        self.windows.resize_with(channels.len(), VecDeque::new);

        let limit = settings.window_len(self.sampling_rate);
        let effective = batch.effective_channel_count();
        trace!(
            samples = batch.samples.len(),
            effective,
            limit,
            "Ingesting batch"
        );

        for (index, window) in self.windows.iter_mut().enumerate() {
            if index >= effective || limit == 0 {
                window.clear();
                continue;
            }

            // Only the last `limit` rows can survive the trim.
            let skip = batch.samples.len().saturating_sub(limit);
            for row in skip..batch.samples.len() {
                window.push_back(batch.value(row, index));
            }
            while window.len() > limit {
                window.pop_front();
            }
        }
    }

    /// Trim every window to the current `W`, e.g. after the time window shrank.
    pub fn retrim(&mut self, settings: &DisplaySettings) {
        let limit = settings.window_len(self.sampling_rate);
        for window in &mut self.windows {
            while window.len() > limit {
                window.pop_front();
            }
        }
    }

    /// Drop every window and forget the sampling rate.
    pub fn clear(&mut self) {
        for window in &mut self.windows {
            window.clear();
        }
        self.sampling_rate = 0.0;
        debug!("Sample windows cleared");
    }

    /// Window for `id`, oldest value first. Unknown channels read empty.
    pub fn window_for(&self, id: ChannelId) -> &VecDeque<f64> {
        self.windows.get(id.index()).unwrap_or(&EMPTY_WINDOW)
    }

    /// Number of values currently buffered for `id`.
    pub fn len_for(&self, id: ChannelId) -> usize {
        self.window_for(id).len()
    }

    /// Whether `id` has any buffered values.
    pub fn has_data(&self, id: ChannelId) -> bool {
        self.len_for(id) > 0
    }

    /// Sampling rate of the last non-empty batch, 0 when unknown.
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Samples ingested since startup, across all batches.
    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    /// Longest window across all channels.
    pub fn max_len(&self) -> usize {
        self.windows.iter().map(VecDeque::len).max().unwrap_or(0)
    }
}
