//! End-to-end tests: mock service -> health monitor -> scheduler -> buffer -> renderer.

use std::sync::Arc;
use std::time::Duration;

use megscope_core::export::export_window;
use megscope_core::render::NO_SIGNAL;
use megscope_core::{
    AcquisitionEvent, AcquisitionScheduler, ChannelStateStore, ConnectionHealthMonitor,
    DisplaySettings, FrameSnapshot, HealthOptions, MockService, RecordingSurface,
    SampleWindowBuffer, SchedulerOptions, WaveformRenderer,
};
use megscope_types::ChannelId;
use tokio::sync::mpsc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

struct Pipeline {
    service: Arc<MockService>,
    _monitor: ConnectionHealthMonitor,
    scheduler: AcquisitionScheduler,
    events: mpsc::Receiver<AcquisitionEvent>,
    channels: ChannelStateStore,
    settings: DisplaySettings,
    buffer: SampleWindowBuffer,
}

impl Pipeline {
    fn start(service: MockService, settings: DisplaySettings) -> Self {
        let service = Arc::new(service);
        let monitor =
            ConnectionHealthMonitor::start(service.clone(), HealthOptions::default()).unwrap();
        let (tx, events) = mpsc::channel(64);
        let mut scheduler = AcquisitionScheduler::new(
            service.clone(),
            monitor.subscribe(),
            tx,
            SchedulerOptions::default(),
        );
        scheduler.start().unwrap();

        let channels = ChannelStateStore::new(service.channels());
        Self {
            service,
            _monitor: monitor,
            scheduler,
            events,
            channels,
            settings,
            buffer: SampleWindowBuffer::new(),
        }
    }

    /// Apply events until `done` holds for the buffer.
    async fn run_until(&mut self, done: impl Fn(&SampleWindowBuffer) -> bool) {
        while !done(&self.buffer) {
            match self.events.recv().await.expect("scheduler stopped") {
                AcquisitionEvent::Batch(batch) => {
                    self.buffer.ingest(&batch, &self.channels, &self.settings);
                }
                AcquisitionEvent::Suspended => self.buffer.clear(),
                AcquisitionEvent::Resumed => {}
            }
        }
    }

    /// Apply events until the scheduler reports a suspension.
    async fn run_until_suspended(&mut self) {
        loop {
            match self.events.recv().await.expect("scheduler stopped") {
                AcquisitionEvent::Batch(batch) => {
                    self.buffer.ingest(&batch, &self.channels, &self.settings);
                }
                AcquisitionEvent::Suspended => {
                    self.buffer.clear();
                    return;
                }
                AcquisitionEvent::Resumed => {}
            }
        }
    }
}

#[tokio::test(start_paused = true)]
async fn synthetic_stream_fills_the_window() {
    init_tracing();
    let service = MockService::builder().channels(4).synthetic(true).build();
    let mut pipeline = Pipeline::start(service, DisplaySettings::new(1.0, 1.0));

    pipeline.run_until(|buffer| buffer.total_samples() >= 1000).await;

    // 1 s at 375 Hz.
    for index in 0..4 {
        assert_eq!(pipeline.buffer.len_for(ChannelId::from_index(index)), 375);
    }
    assert_eq!(pipeline.buffer.sampling_rate(), 375.0);
}

#[tokio::test(start_paused = true)]
async fn buffered_window_renders_and_exports() {
    init_tracing();
    let service = MockService::builder().channels(3).synthetic(true).build();
    let mut pipeline = Pipeline::start(service, DisplaySettings::new(1.0, 1.0));
    pipeline.run_until(|buffer| buffer.max_len() == 375).await;

    let mut surface = RecordingSurface::new(800.0, 600.0);
    let stats = WaveformRenderer::default().paint(
        &mut surface,
        &FrameSnapshot {
            channels: &pipeline.channels,
            buffer: &pipeline.buffer,
            settings: &pipeline.settings,
            selected: None,
        },
    );
    assert_eq!(stats.rows, 3);
    assert_eq!(stats.traces, 3);
    assert!(surface.polylines().iter().all(|(points, _)| points.len() == 375));

    let text = export_window(&pipeline.buffer, &pipeline.channels, b',').unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("sample,time_s,ch1,ch2,ch3"));
    assert_eq!(lines.count(), 375);
}

#[tokio::test(start_paused = true)]
async fn hidden_channel_keeps_filling() {
    init_tracing();
    let service = MockService::builder().channels(2).synthetic(true).build();
    let mut pipeline = Pipeline::start(service, DisplaySettings::new(1.0, 1.0));

    let hidden = ChannelId::from_index(1);
    pipeline.channels.toggle_visible(hidden);
    pipeline.run_until(|buffer| buffer.total_samples() >= 500).await;

    assert_eq!(pipeline.buffer.len_for(hidden), 375);

    let mut surface = RecordingSurface::new(400.0, 200.0);
    let stats = WaveformRenderer::default().paint(
        &mut surface,
        &FrameSnapshot {
            channels: &pipeline.channels,
            buffer: &pipeline.buffer,
            settings: &pipeline.settings,
            selected: None,
        },
    );
    assert_eq!(stats.rows, 1);
    assert_eq!(stats.traces, 1);
}

#[tokio::test(start_paused = true)]
async fn lost_connection_stops_sample_requests() {
    init_tracing();
    let service = MockService::builder().channels(2).synthetic(true).build();
    let mut pipeline = Pipeline::start(service, DisplaySettings::default());
    pipeline.run_until(|buffer| buffer.total_samples() > 0).await;

    pipeline.service.set_connected(false);
    pipeline.run_until_suspended().await;

    // The next frame shows the placeholder, not the last traces.
    assert_eq!(pipeline.buffer.max_len(), 0);
    let mut surface = RecordingSurface::new(400.0, 200.0);
    let stats = WaveformRenderer::default().paint(
        &mut surface,
        &FrameSnapshot {
            channels: &pipeline.channels,
            buffer: &pipeline.buffer,
            settings: &pipeline.settings,
            selected: None,
        },
    );
    assert_eq!(stats.traces, 0);
    assert_eq!(surface.texts(), vec![NO_SIGNAL]);

    pipeline.service.reset_counts();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(pipeline.service.sample_count(), 0);
    assert!(pipeline.service.status_count() >= 2);

    // Reconnecting resumes polling on the next health probe.
    pipeline.service.set_connected(true);
    let before = pipeline.buffer.total_samples();
    pipeline.run_until(|buffer| buffer.total_samples() > before).await;
    assert!(pipeline.service.sample_count() > 0);
}

#[tokio::test(start_paused = true)]
async fn stopping_the_scheduler_closes_the_event_stream() {
    init_tracing();
    let service = MockService::builder().channels(1).synthetic(true).build();
    let mut pipeline = Pipeline::start(service, DisplaySettings::default());
    pipeline.run_until(|buffer| buffer.total_samples() > 0).await;

    pipeline.scheduler.stop();
    assert!(!pipeline.scheduler.is_running());
    drop(pipeline.scheduler);

    // Drain whatever was already queued; the sender side is gone.
    while pipeline.events.recv().await.is_some() {}
}
