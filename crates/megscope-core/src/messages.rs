//! Message types for UI/worker communication.
//!
//! The console's paint loop never awaits network I/O. User actions that need
//! the service are sent to a background worker as [`Command`]s and their
//! outcome comes back as a [`ConsoleEvent`].
//!
//! ```text
//! +------------------+     Command      +------------------+
//! |    UI loop       | --------------> |  ConsoleWorker   |
//! |   (ratatui)      |                 |  (tokio runtime) |
//! |                  | <-------------- |                  |
//! +------------------+  ConsoleEvent   +------------------+
//!          ^
//!          |  AcquisitionEvent (mpsc), ConnectionHealth (watch)
//!          +---- scheduler / health monitor
//! ```

use crate::sensors::SensorCommand;
use crate::traits::ConnectRequest;

/// Commands sent from the UI loop to the background worker.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Ask the service to connect to the device.
    Connect(ConnectRequest),

    /// Ask the service to drop the device connection.
    Disconnect,

    /// Start or stop the acquisition loop.
    SetAcquisition {
        /// Whether acquisition should run.
        running: bool,
    },

    /// Send a sensor activation command.
    Sensor(SensorCommand),

    /// Stop the worker and every loop it owns.
    Shutdown,
}

impl Command {
    /// Short description for status lines and alerts.
    pub fn describe(&self) -> String {
        match self {
            Self::Connect(request) => format!("connect to {}:{}", request.host, request.port),
            Self::Disconnect => "disconnect".to_string(),
            Self::SetAcquisition { running: true } => "resume acquisition".to_string(),
            Self::SetAcquisition { running: false } => "pause acquisition".to_string(),
            Self::Sensor(command) => command.describe(),
            Self::Shutdown => "shutdown".to_string(),
        }
    }
}

/// Events sent from the worker back to the UI loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleEvent {
    /// A command completed.
    CommandSucceeded {
        /// What was done.
        action: String,
    },

    /// A command failed. The UI shows a blocking alert.
    CommandFailed {
        /// What was attempted.
        action: String,
        /// Error description.
        error: String,
    },

    /// The acquisition loop was started or stopped.
    AcquisitionChanged {
        /// Whether acquisition is now running.
        running: bool,
    },
}
