//! Background worker for service operations.
//!
//! [`ConsoleWorker`] owns the health monitor and the acquisition scheduler and
//! performs every service call the user triggers, so the paint loop never
//! awaits network I/O. It communicates with the UI loop via channels:
//!
//! - Receives [`Command`]s from the UI
//! - Sends [`ConsoleEvent`]s back to report outcomes
//!
//! Device and sensor commands run in their own tasks so a slow connect does
//! not hold up pause/resume or shutdown.

use megscope_core::{AcquisitionScheduler, ConnectionHealthMonitor, SharedService};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::messages::{Command, ConsoleEvent};

/// Background worker that handles service commands.
pub struct ConsoleWorker {
    service: SharedService,
    monitor: ConnectionHealthMonitor,
    scheduler: AcquisitionScheduler,
    command_rx: mpsc::Receiver<Command>,
    event_tx: mpsc::Sender<ConsoleEvent>,
}

impl ConsoleWorker {
    pub fn new(
        service: SharedService,
        monitor: ConnectionHealthMonitor,
        scheduler: AcquisitionScheduler,
        command_rx: mpsc::Receiver<Command>,
        event_tx: mpsc::Sender<ConsoleEvent>,
    ) -> Self {
        Self {
            service,
            monitor,
            scheduler,
            command_rx,
            event_tx,
        }
    }

    /// Run until [`Command::Shutdown`] or until the command channel closes.
    ///
    /// Stops the scheduler and the monitor on the way out.
    pub async fn run(mut self) {
        info!("Console worker started");

        while let Some(cmd) = self.command_rx.recv().await {
            if matches!(cmd, Command::Shutdown) {
                info!("Console worker received shutdown command");
                break;
            }
            self.handle_command(cmd).await;
        }

        self.scheduler.stop();
        self.monitor.stop();
        info!("Console worker stopped");
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::SetAcquisition { running } => self.set_acquisition(running).await,
            Command::Shutdown => {}
            cmd => {
                let service = self.service.clone();
                let event_tx = self.event_tx.clone();
                tokio::spawn(async move {
                    let event = run_service_command(&service, cmd).await;
                    let _ = event_tx.send(event).await;
                });
            }
        }
    }

    async fn set_acquisition(&mut self, running: bool) {
        if running {
            if let Err(e) = self.scheduler.start() {
                error!(error = %e, "Failed to start acquisition");
                self.send(ConsoleEvent::CommandFailed {
                    action: Command::SetAcquisition { running }.describe(),
                    error: e.to_string(),
                })
                .await;
                return;
            }
            info!("Acquisition running");
        } else {
            self.scheduler.stop();
            info!("Acquisition paused");
        }

        self.send(ConsoleEvent::AcquisitionChanged {
            running: self.scheduler.is_running(),
        })
        .await;
    }

    async fn send(&self, event: ConsoleEvent) {
        if self.event_tx.send(event).await.is_err() {
            warn!("UI event channel closed");
        }
    }
}

/// Perform a device or sensor command and describe its outcome.
async fn run_service_command(service: &SharedService, cmd: Command) -> ConsoleEvent {
    let action = cmd.describe();
    let result = match cmd {
        Command::Connect(request) => service.connect(&request).await,
        Command::Disconnect => service.disconnect().await,
        Command::Sensor(command) => command.execute(service.as_ref()).await,
        Command::SetAcquisition { .. } | Command::Shutdown => Ok(()),
    };

    match result {
        Ok(()) => {
            info!(%action, "Command succeeded");
            ConsoleEvent::CommandSucceeded { action }
        }
        Err(e) => {
            error!(%action, error = %e, "Command failed");
            ConsoleEvent::CommandFailed {
                action,
                error: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use megscope_core::sensors::SensorCommand;
    use megscope_core::{ConnectRequest, HealthOptions, MockService, SchedulerOptions};
    use tokio::task::JoinHandle;

    use super::*;

    struct Harness {
        service: Arc<MockService>,
        cmd_tx: mpsc::Sender<Command>,
        event_rx: mpsc::Receiver<ConsoleEvent>,
        _acquisition_rx: mpsc::Receiver<megscope_core::AcquisitionEvent>,
        handle: JoinHandle<()>,
    }

    fn spawn_worker(service: MockService) -> Harness {
        let service = Arc::new(service);
        let monitor =
            ConnectionHealthMonitor::start(service.clone(), HealthOptions::default()).unwrap();
        let (acq_tx, acq_rx) = mpsc::channel(64);
        let scheduler = AcquisitionScheduler::new(
            service.clone(),
            monitor.subscribe(),
            acq_tx,
            SchedulerOptions::default(),
        );
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (event_tx, event_rx) = mpsc::channel(8);
        let worker = ConsoleWorker::new(service.clone(), monitor, scheduler, cmd_rx, event_tx);
        Harness {
            service,
            cmd_tx,
            event_rx,
            _acquisition_rx: acq_rx,
            handle: tokio::spawn(worker.run()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_acquisition_reports_state() {
        let mut h = spawn_worker(MockService::default());

        h.cmd_tx
            .send(Command::SetAcquisition { running: true })
            .await
            .unwrap();
        assert_eq!(
            h.event_rx.recv().await,
            Some(ConsoleEvent::AcquisitionChanged { running: true })
        );

        h.cmd_tx
            .send(Command::SetAcquisition { running: false })
            .await
            .unwrap();
        assert_eq!(
            h.event_rx.recv().await,
            Some(ConsoleEvent::AcquisitionChanged { running: false })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sensor_command_failure_is_reported() {
        let mut h = spawn_worker(MockService::default());

        h.cmd_tx
            .send(Command::Sensor(SensorCommand::Toggle {
                id: 99,
                activate: true,
            }))
            .await
            .unwrap();

        match h.event_rx.recv().await {
            Some(ConsoleEvent::CommandFailed { action, error }) => {
                assert_eq!(action, "activate sensor 99");
                assert!(error.contains("404"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_and_disconnect() {
        let mut h = spawn_worker(MockService::builder().connected(false).build());

        h.cmd_tx
            .send(Command::Connect(ConnectRequest::default()))
            .await
            .unwrap();
        assert!(matches!(
            h.event_rx.recv().await,
            Some(ConsoleEvent::CommandSucceeded { .. })
        ));
        assert!(h.service.is_connected());

        h.cmd_tx.send(Command::Disconnect).await.unwrap();
        assert_eq!(
            h.event_rx.recv().await,
            Some(ConsoleEvent::CommandSucceeded {
                action: "disconnect".to_string()
            })
        );
        assert!(!h.service.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_worker() {
        let h = spawn_worker(MockService::default());
        h.cmd_tx.send(Command::Shutdown).await.unwrap();
        h.handle.await.unwrap();
    }
}
