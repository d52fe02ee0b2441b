//! Keyboard input handling for the TUI.
//!
//! Keys map to an [`Action`] first; [`apply_action`] then changes the app
//! state and returns a [`Command`] when the worker has to talk to the service.
//!
//! # Key Bindings
//!
//! | Key              | Action                          |
//! |------------------|---------------------------------|
//! | `q`              | Quit                            |
//! | `Tab` / `BackTab`| Switch tab                      |
//! | `p`              | Pause / resume acquisition      |
//! | `c` / `d`        | Connect / disconnect the device |
//! | `e`              | Export the buffered window      |
//!
//! Waveforms tab:
//!
//! | Key              | Action                          |
//! |------------------|---------------------------------|
//! | `↓` / `j`        | Select next channel             |
//! | `↑` / `k`        | Select previous channel         |
//! | `Space`          | Show / hide selected channel    |
//! | `a`              | Show all channels               |
//! | `+` / `=`        | Zoom in (smaller amplitude)     |
//! | `-`              | Zoom out                        |
//! | `[` / `]`        | Shorter / longer time window    |
//! | `g` / `G`        | Gain down / up                  |
//! | `o` / `O`        | Offset down / up                |
//!
//! Sensors tab:
//!
//! | Key              | Action                          |
//! |------------------|---------------------------------|
//! | arrows / `hjkl`  | Move sensor cursor              |
//! | `Enter` / `Space`| Toggle selected sensor          |
//! | `A` / `D`        | Activate / deactivate all       |
//!
//! While an alert is shown only `Enter` and `Esc` (dismiss) are handled.

use crossterm::event::KeyCode;

use super::app::{App, Tab};
use super::messages::Command;

/// User actions that can be triggered by keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    NextTab,
    ToggleAcquisition,
    Connect,
    Disconnect,
    Export,
    DismissAlert,

    SelectNextChannel,
    SelectPreviousChannel,
    ToggleChannel,
    ShowAllChannels,
    ZoomIn,
    ZoomOut,
    ShorterWindow,
    LongerWindow,
    /// `true` raises the gain.
    Gain(bool),
    /// Offset change in whole steps.
    Offset(i8),

    /// Move the sensor cursor by `(dx, dy)` tiles.
    MoveSensor(i8, i8),
    ToggleSensor,
    SetAllSensors(bool),

    /// No action (unrecognized key).
    None,
}

/// Map a key code to an action for the active tab.
pub fn handle_key(key: KeyCode, tab: Tab, alert_open: bool) -> Action {
    if alert_open {
        return match key {
            KeyCode::Enter | KeyCode::Esc => Action::DismissAlert,
            _ => Action::None,
        };
    }

    match key {
        KeyCode::Char('q') => return Action::Quit,
        KeyCode::Tab | KeyCode::BackTab => return Action::NextTab,
        KeyCode::Char('p') => return Action::ToggleAcquisition,
        KeyCode::Char('c') => return Action::Connect,
        KeyCode::Char('d') => return Action::Disconnect,
        KeyCode::Char('e') => return Action::Export,
        _ => {}
    }

    match tab {
        Tab::Waveforms => match key {
            KeyCode::Down | KeyCode::Char('j') => Action::SelectNextChannel,
            KeyCode::Up | KeyCode::Char('k') => Action::SelectPreviousChannel,
            KeyCode::Char(' ') => Action::ToggleChannel,
            KeyCode::Char('a') => Action::ShowAllChannels,
            KeyCode::Char('+') | KeyCode::Char('=') => Action::ZoomIn,
            KeyCode::Char('-') => Action::ZoomOut,
            KeyCode::Char('[') => Action::ShorterWindow,
            KeyCode::Char(']') => Action::LongerWindow,
            KeyCode::Char('g') => Action::Gain(false),
            KeyCode::Char('G') => Action::Gain(true),
            KeyCode::Char('o') => Action::Offset(-1),
            KeyCode::Char('O') => Action::Offset(1),
            _ => Action::None,
        },
        Tab::Sensors => match key {
            KeyCode::Left | KeyCode::Char('h') => Action::MoveSensor(-1, 0),
            KeyCode::Right | KeyCode::Char('l') => Action::MoveSensor(1, 0),
            KeyCode::Up | KeyCode::Char('k') => Action::MoveSensor(0, -1),
            KeyCode::Down | KeyCode::Char('j') => Action::MoveSensor(0, 1),
            KeyCode::Enter | KeyCode::Char(' ') => Action::ToggleSensor,
            KeyCode::Char('A') => Action::SetAllSensors(true),
            KeyCode::Char('D') => Action::SetAllSensors(false),
            _ => Action::None,
        },
    }
}

/// Apply an action to the application state.
///
/// Returns `Some(Command)` if the background worker has to act on it.
pub fn apply_action(app: &mut App, action: Action) -> Option<Command> {
    match action {
        Action::Quit => {
            app.quit();
            None
        }
        Action::NextTab => {
            app.next_tab();
            None
        }
        Action::ToggleAcquisition => Some(app.toggle_acquisition()),
        Action::Connect => Some(app.connect_command()),
        Action::Disconnect => Some(Command::Disconnect),
        Action::Export => {
            app.export();
            None
        }
        Action::DismissAlert => {
            app.dismiss_alert();
            None
        }
        Action::SelectNextChannel => {
            app.select_next_channel();
            None
        }
        Action::SelectPreviousChannel => {
            app.select_previous_channel();
            None
        }
        Action::ToggleChannel => {
            app.toggle_selected_channel();
            None
        }
        Action::ShowAllChannels => {
            app.show_all_channels();
            None
        }
        Action::ZoomIn => {
            app.zoom_in();
            None
        }
        Action::ZoomOut => {
            app.zoom_out();
            None
        }
        Action::ShorterWindow => {
            app.shorten_window();
            None
        }
        Action::LongerWindow => {
            app.lengthen_window();
            None
        }
        Action::Gain(up) => {
            app.adjust_gain(up);
            None
        }
        Action::Offset(steps) => {
            app.nudge_offset(f64::from(steps));
            None
        }
        Action::MoveSensor(dx, dy) => {
            app.move_sensor(i32::from(dx), i32::from(dy));
            None
        }
        Action::ToggleSensor => app.toggle_selected_sensor(),
        Action::SetAllSensors(activate) => Some(app.set_all_sensors(activate)),
        Action::None => None,
    }
}
