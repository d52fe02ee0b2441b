//! Application state for the TUI.
//!
//! [`App`] is the single writer of the channel store and the sample window
//! buffer. Batches, health snapshots and worker outcomes arrive over channels
//! and are applied in [`App::drain_events`] right before each frame, so the
//! renderer always sees a consistent borrow.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use megscope_core::export::{export_file_name, export_window};
use megscope_core::sensors::{GRID_COLUMNS, SensorCommand};
use megscope_core::{
    ChannelStateStore, ConnectRequest, ConnectionHealth, DisplaySettings, FrameSnapshot,
    SampleWindowBuffer, SensorGrid, SensorPoller, SharedService, WaveformRenderer,
};
use megscope_types::{ChannelId, SENSOR_COUNT};
use time::OffsetDateTime;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::messages::{AcquisitionEvent, Command, ConsoleEvent};
use crate::config::Config;

/// How long a status message stays in the status bar.
const STATUS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum number of queued status messages.
const MAX_STATUS_MESSAGES: usize = 5;

/// Console tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Waveforms,
    Sensors,
}

impl Tab {
    pub fn label(self) -> &'static str {
        match self {
            Self::Waveforms => "Waveforms",
            Self::Sensors => "Sensors",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Waveforms => Self::Sensors,
            Self::Sensors => Self::Waveforms,
        }
    }
}

/// A blocking alert. Input is limited to dismissing it while it is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// What was attempted.
    pub action: String,
    /// Raw error text.
    pub error: String,
}

/// Main application state.
pub struct App {
    service: SharedService,
    health_rx: watch::Receiver<ConnectionHealth>,
    acquisition_rx: mpsc::Receiver<AcquisitionEvent>,
    event_rx: mpsc::Receiver<ConsoleEvent>,

    pub channels: ChannelStateStore,
    pub buffer: SampleWindowBuffer,
    pub settings: DisplaySettings,
    pub renderer: WaveformRenderer,

    pub active_tab: Tab,
    /// Index of the selected channel row.
    pub selected_channel: usize,
    /// Selected sensor id (1-based).
    pub selected_sensor: u16,
    /// Whether the acquisition loop is running.
    pub acquiring: bool,
    /// Whether the scheduler reported a non-viable link.
    pub suspended: bool,
    pub alert: Option<Alert>,
    pub status_messages: Vec<(String, Instant)>,

    /// Present only while the Sensors tab is shown.
    sensor_poller: Option<SensorPoller>,
    sensor_interval: Duration,
    export_dir: PathBuf,
    connect_request: ConnectRequest,
    should_quit: bool,
}

impl App {
    pub fn new(
        service: SharedService,
        config: &Config,
        health_rx: watch::Receiver<ConnectionHealth>,
        acquisition_rx: mpsc::Receiver<AcquisitionEvent>,
        event_rx: mpsc::Receiver<ConsoleEvent>,
    ) -> Self {
        Self {
            service,
            health_rx,
            acquisition_rx,
            event_rx,
            channels: ChannelStateStore::new(config.channel_count),
            buffer: SampleWindowBuffer::new(),
            settings: config.display_settings(),
            renderer: WaveformRenderer::default(),
            active_tab: Tab::default(),
            selected_channel: 0,
            selected_sensor: 1,
            acquiring: false,
            suspended: false,
            alert: None,
            status_messages: Vec::new(),
            sensor_poller: None,
            sensor_interval: config.sensor_interval(),
            export_dir: config.export_dir(),
            connect_request: config.connect_request(),
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
        self.sensor_poller = None;
    }

    /// Latest published connection health.
    pub fn health(&self) -> ConnectionHealth {
        self.health_rx.borrow().clone()
    }

    /// Apply everything the scheduler and the worker sent since the last frame.
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.acquisition_rx.try_recv() {
            self.handle_acquisition_event(event);
        }
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_console_event(event);
        }
        self.clean_expired_messages();
    }

    pub fn handle_acquisition_event(&mut self, event: AcquisitionEvent) {
        match event {
            AcquisitionEvent::Batch(batch) => {
                if batch.is_empty() {
                    return;
                }
                if self.channels.ensure_count(batch.effective_channel_count()) {
                    info!(channels = self.channels.len(), "Channel set re-initialized");
                    self.selected_channel = self
                        .selected_channel
                        .min(self.channels.len().saturating_sub(1));
                }
                self.buffer.ingest(&batch, &self.channels, &self.settings);
                self.suspended = false;
            }
            AcquisitionEvent::Suspended => {
                if !self.suspended {
                    self.push_status_message("No data: connection not viable".to_string());
                }
                self.buffer.clear();
                self.suspended = true;
            }
            AcquisitionEvent::Resumed => {
                self.suspended = false;
                self.push_status_message("Acquisition resumed".to_string());
            }
        }
    }

    pub fn handle_console_event(&mut self, event: ConsoleEvent) {
        match event {
            ConsoleEvent::CommandSucceeded { action } => {
                self.push_status_message(format!("Done: {action}"));
            }
            ConsoleEvent::CommandFailed { action, error } => {
                warn!(%action, %error, "Showing command failure");
                self.alert = Some(Alert { action, error });
            }
            ConsoleEvent::AcquisitionChanged { running } => {
                self.acquiring = running;
                if !running {
                    self.suspended = false;
                }
                self.push_status_message(
                    if running {
                        "Acquisition running"
                    } else {
                        "Acquisition paused"
                    }
                    .to_string(),
                );
            }
        }
    }

    // --- Tabs ---

    /// Switch tabs, mounting or unmounting the sensor panel.
    pub fn next_tab(&mut self) {
        self.active_tab = self.active_tab.next();
        match self.active_tab {
            Tab::Sensors => self.mount_sensor_panel(),
            Tab::Waveforms => {
                if self.sensor_poller.take().is_some() {
                    debug!("Sensor panel unmounted");
                }
            }
        }
    }

    fn mount_sensor_panel(&mut self) {
        match SensorPoller::start(self.service.clone(), self.sensor_interval) {
            Ok(poller) => {
                debug!("Sensor panel mounted");
                self.sensor_poller = Some(poller);
            }
            Err(e) => {
                self.alert = Some(Alert {
                    action: "start sensor polling".to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    pub fn sensor_panel_mounted(&self) -> bool {
        self.sensor_poller.is_some()
    }

    /// Grid for the latest sensor snapshot (all `NoData` before the first poll).
    pub fn sensor_grid(&self) -> SensorGrid {
        self.sensor_poller
            .as_ref()
            .map(SensorPoller::grid)
            .unwrap_or_default()
    }

    // --- Waveform controls ---

    pub fn selected_channel_id(&self) -> Option<ChannelId> {
        (self.selected_channel < self.channels.len())
            .then(|| ChannelId::from_index(self.selected_channel))
    }

    pub fn select_next_channel(&mut self) {
        if self.selected_channel + 1 < self.channels.len() {
            self.selected_channel += 1;
        }
    }

    pub fn select_previous_channel(&mut self) {
        self.selected_channel = self.selected_channel.saturating_sub(1);
    }

    pub fn toggle_selected_channel(&mut self) {
        let Some(id) = self.selected_channel_id() else {
            return;
        };
        if let Some(visible) = self.channels.toggle_visible(id) {
            self.push_status_message(format!(
                "{id} {}",
                if visible { "shown" } else { "hidden" }
            ));
        }
    }

    pub fn show_all_channels(&mut self) {
        self.channels.show_all();
        self.push_status_message(format!("All {} channels shown", self.channels.len()));
    }

    /// Smaller full-scale amplitude, larger traces.
    pub fn zoom_in(&mut self) {
        self.settings.amplitude_down();
        self.push_status_message(format!("Amplitude ±{}", self.settings.amplitude));
    }

    pub fn zoom_out(&mut self) {
        self.settings.amplitude_up();
        self.push_status_message(format!("Amplitude ±{}", self.settings.amplitude));
    }

    pub fn shorten_window(&mut self) {
        self.settings.window_down();
        self.buffer.retrim(&self.settings);
        self.push_status_message(format!("Window {}s", self.settings.time_window_secs));
    }

    pub fn lengthen_window(&mut self) {
        self.settings.window_up();
        self.push_status_message(format!("Window {}s", self.settings.time_window_secs));
    }

    pub fn adjust_gain(&mut self, up: bool) {
        let Some(id) = self.selected_channel_id() else {
            return;
        };
        if let Some(scale) = self.channels.adjust_scale(id, up) {
            self.push_status_message(format!("{id} gain ×{scale:.2}"));
        }
    }

    pub fn nudge_offset(&mut self, steps: f64) {
        let Some(id) = self.selected_channel_id() else {
            return;
        };
        if let Some(offset) = self.channels.nudge_offset(id, steps) {
            self.push_status_message(format!("{id} offset {offset:+}"));
        }
    }

    /// Everything the renderer needs for one frame.
    pub fn frame_snapshot(&self) -> FrameSnapshot<'_> {
        FrameSnapshot {
            channels: &self.channels,
            buffer: &self.buffer,
            settings: &self.settings,
            selected: self.selected_channel_id(),
        }
    }

    /// Write the buffered window to a timestamped CSV file.
    pub fn export(&mut self) {
        match self.write_export() {
            Ok(path) => {
                info!(path = %path.display(), "Window exported");
                self.push_status_message(format!("Exported to {}", path.display()));
            }
            Err(e) => {
                self.alert = Some(Alert {
                    action: "export window".to_string(),
                    error: format!("{e:#}"),
                });
            }
        }
    }

    fn write_export(&self) -> Result<PathBuf> {
        let text = export_window(&self.buffer, &self.channels, b',')?;
        fs::create_dir_all(&self.export_dir).with_context(|| {
            format!("Failed to create export directory: {}", self.export_dir.display())
        })?;
        let path = self
            .export_dir
            .join(export_file_name(OffsetDateTime::now_utc(), "csv"));
        fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    // --- Commands ---

    pub fn toggle_acquisition(&self) -> Command {
        Command::SetAcquisition {
            running: !self.acquiring,
        }
    }

    pub fn connect_command(&self) -> Command {
        Command::Connect(self.connect_request.clone())
    }

    // --- Sensor panel ---

    /// Move the sensor cursor by whole tiles, clamped to the grid.
    pub fn move_sensor(&mut self, dx: i32, dy: i32) {
        let columns = GRID_COLUMNS as i32;
        let rows = i32::from(SENSOR_COUNT) / columns;
        let index = i32::from(self.selected_sensor) - 1;
        let col = (index % columns + dx).clamp(0, columns - 1);
        let row = (index / columns + dy).clamp(0, rows - 1);
        self.selected_sensor = (row * columns + col + 1) as u16;
    }

    /// Command that inverts the selected sensor, if it has reported state.
    pub fn toggle_selected_sensor(&mut self) -> Option<Command> {
        let command = self.sensor_grid().toggle_command(self.selected_sensor);
        if command.is_none() {
            self.push_status_message(format!("Sensor {} has no data", self.selected_sensor));
        }
        command.map(Command::Sensor)
    }

    pub fn set_all_sensors(&self, activate: bool) -> Command {
        Command::Sensor(SensorCommand::SetAll { activate })
    }

    // --- Alerts and status line ---

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    pub fn push_status_message(&mut self, message: String) {
        self.status_messages.push((message, Instant::now()));
        while self.status_messages.len() > MAX_STATUS_MESSAGES {
            self.status_messages.remove(0);
        }
    }

    pub fn clean_expired_messages(&mut self) {
        self.status_messages
            .retain(|(_, at)| at.elapsed() < STATUS_MESSAGE_TIMEOUT);
    }

    pub fn current_status_message(&self) -> Option<&str> {
        self.status_messages.last().map(|(msg, _)| msg.as_str())
    }
}
