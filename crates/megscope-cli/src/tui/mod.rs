//! Interactive waveform console.
//!
//! This module ties the TUI together:
//!
//! - Terminal setup and restoration
//! - The health monitor, the acquisition scheduler and the worker that owns them
//! - The frame loop: input, event draining and painting at the configured rate
//! - Graceful shutdown coordination

pub mod app;
pub mod errors;
pub mod input;
pub mod messages;
pub mod ui;
pub mod worker;

pub use app::App;
pub use messages::{AcquisitionEvent, Command, ConsoleEvent};
pub use worker::ConsoleWorker;

use std::io::{self, stdout};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use megscope_core::{AcquisitionScheduler, ConnectionHealthMonitor, SharedService};
use ratatui::prelude::*;
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::info;

use crate::config::Config;

/// Set up the terminal for TUI rendering.
///
/// Enables raw mode and switches to the alternate screen buffer.
pub fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to its original state.
pub fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

/// Run the console until the user quits.
///
/// Starts the health monitor, hands it and the scheduler to a background
/// [`ConsoleWorker`], requests acquisition and then runs the frame loop.
pub async fn run(service: SharedService, config: &Config) -> Result<()> {
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>(32);
    let (event_tx, event_rx) = mpsc::channel::<ConsoleEvent>(32);
    let (acquisition_tx, acquisition_rx) = mpsc::channel::<AcquisitionEvent>(256);

    let monitor = ConnectionHealthMonitor::start(service.clone(), config.health_options())?;
    let health_rx = monitor.subscribe();
    let scheduler = AcquisitionScheduler::new(
        service.clone(),
        monitor.subscribe(),
        acquisition_tx,
        config.scheduler_options(),
    );

    let worker = ConsoleWorker::new(service.clone(), monitor, scheduler, cmd_rx, event_tx);
    let worker_handle = tokio::spawn(worker.run());

    let mut app = App::new(service, config, health_rx, acquisition_rx, event_rx);
    let mut terminal = setup_terminal()?;

    let _ = cmd_tx.try_send(Command::SetAcquisition { running: true });

    info!(frame_interval = ?config.frame_interval(), "Console started");
    let result = run_event_loop(&mut terminal, &mut app, &cmd_tx, config.frame_interval()).await;

    let _ = cmd_tx.try_send(Command::Shutdown);
    restore_terminal()?;
    let _ = worker_handle.await;

    result
}

/// Frame loop: read pending keys, apply incoming events, paint.
async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    command_tx: &mpsc::Sender<Command>,
    frame_interval: Duration,
) -> Result<()> {
    let mut frames = time::interval(frame_interval);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    while !app.should_quit() {
        frames.tick().await;

        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                let action = input::handle_key(key.code, app.active_tab, app.alert.is_some());
                if let Some(cmd) = input::apply_action(app, action) {
                    let _ = command_tx.try_send(cmd);
                }
            }
        }

        app.drain_events();
        terminal.draw(|f| ui::draw(f, app))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyCode;
    use ratatui::backend::TestBackend;

    fn press(app: &mut App, code: KeyCode) -> Option<Command> {
        let action = input::handle_key(code, app.active_tab, app.alert.is_some());
        input::apply_action(app, action)
    }

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[tokio::test]
    async fn test_keys_drive_frames() {
        let mut t = app::tests::test_app(&Config::default());
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();

        terminal.draw(|f| ui::draw(f, &t.app)).unwrap();
        assert!(screen(&terminal).contains("No signal"));

        assert!(press(&mut t.app, KeyCode::Tab).is_none());
        t.app.drain_events();
        terminal.draw(|f| ui::draw(f, &t.app)).unwrap();
        assert!(t.app.sensor_panel_mounted());
        assert!(screen(&terminal).contains("active /"));

        assert_eq!(
            press(&mut t.app, KeyCode::Char('p')),
            Some(Command::SetAcquisition { running: true })
        );

        press(&mut t.app, KeyCode::Char('q'));
        assert!(t.app.should_quit());
    }

    #[test]
    fn test_input_handling_quit() {
        let action = input::handle_key(KeyCode::Char('q'), app::Tab::Waveforms, false);
        assert_eq!(action, input::Action::Quit);
    }

    #[test]
    fn test_input_handling_sensor_bulk() {
        let action = input::handle_key(KeyCode::Char('A'), app::Tab::Sensors, false);
        assert_eq!(action, input::Action::SetAllSensors(true));

        let action = input::handle_key(KeyCode::Char('D'), app::Tab::Sensors, false);
        assert_eq!(action, input::Action::SetAllSensors(false));
    }
}
