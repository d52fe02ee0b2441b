//! Message types for communication between the UI loop and the worker.
//!
//! This module re-exports the shared message types from `megscope-core::messages`:
//!
//! - [`Command`]: requests sent from the UI loop to the background worker
//! - [`ConsoleEvent`]: outcomes sent from the worker back to the UI loop
//! - [`AcquisitionEvent`]: batches and gate changes from the scheduler

pub use megscope_core::messages::{Command, ConsoleEvent};
pub use megscope_core::scheduler::AcquisitionEvent;
