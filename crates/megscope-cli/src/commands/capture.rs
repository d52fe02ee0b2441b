//! Capture command implementation.
//!
//! Runs the health monitor and acquisition scheduler headless for a fixed
//! duration, buffering everything, then exports the window.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use megscope_core::export::{export_file_name, export_window};
use megscope_core::{
    AcquisitionEvent, AcquisitionScheduler, ChannelStateStore, ConnectionHealthMonitor,
    DisplaySettings, SampleWindowBuffer, SharedService,
};
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::Delimiter;
use crate::config::Config;

/// Result of a headless capture.
#[derive(Debug)]
pub(crate) struct Capture {
    pub channels: ChannelStateStore,
    pub buffer: SampleWindowBuffer,
    pub suspensions: usize,
}

pub async fn cmd_capture(
    service: SharedService,
    config: &Config,
    duration: Duration,
    output: Option<PathBuf>,
    delimiter: Delimiter,
    quiet: bool,
) -> Result<()> {
    let capture = capture(service, config, duration).await?;
    let text = export_window(&capture.buffer, &capture.channels, delimiter.byte())
        .context("Failed to export captured window")?;

    let path = match output {
        Some(path) => path,
        None => config.export_dir().join(export_file_name(
            OffsetDateTime::now_utc(),
            delimiter.extension(),
        )),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;

    if !quiet {
        println!(
            "Captured {} samples on {} channels to {}",
            capture.buffer.max_len(),
            capture
                .channels
                .iter()
                .filter(|(id, _)| capture.buffer.has_data(*id))
                .count(),
            path.display()
        );
    }
    if capture.suspensions > 0 {
        warn!(
            suspensions = capture.suspensions,
            "Connection was not viable for part of the capture"
        );
    }
    Ok(())
}

/// Acquire for `duration` with a window wide enough to keep all of it.
pub(crate) async fn capture(
    service: SharedService,
    config: &Config,
    duration: Duration,
) -> Result<Capture> {
    let monitor = ConnectionHealthMonitor::start(service.clone(), config.health_options())?;
    let (tx, mut rx) = mpsc::channel(64);
    let mut scheduler =
        AcquisitionScheduler::new(service, monitor.subscribe(), tx, config.scheduler_options());
    scheduler.start()?;
    info!(seconds = duration.as_secs_f64(), "Capture started");

    let mut channels = ChannelStateStore::new(config.channel_count);
    let settings = DisplaySettings::new(duration.as_secs_f64(), config.amplitude);
    let mut buffer = SampleWindowBuffer::new();
    let mut suspensions = 0;

    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            event = rx.recv() => match event {
                Some(AcquisitionEvent::Batch(batch)) => {
                    if channels.ensure_count(batch.effective_channel_count()) {
                        debug!(channels = channels.len(), "Channel set re-initialized");
                    }
                    buffer.ingest(&batch, &channels, &settings);
                }
                Some(AcquisitionEvent::Suspended) => suspensions += 1,
                Some(AcquisitionEvent::Resumed) => {}
                None => break,
            },
        }
    }

    scheduler.stop();
    monitor.stop();
    info!(samples = buffer.total_samples(), "Capture finished");
    Ok(Capture {
        channels,
        buffer,
        suspensions,
    })
}
