//! Command layer for serial laboratory devices.
//!
//! This library drives Arduino-fronted lab hardware (heating stages,
//! sonicators) over a line-oriented serial protocol and wraps every device
//! operation in a self-describing [`Command`](command::Command) whose
//! success/failure outcome is recorded for recipe logs. Commands compose
//! into [`CompositeCommand`](command::CompositeCommand)s that stop at the
//! first failure.
//!
//! Layers, leaves first:
//!
//! - [`adapters`] - blocking line transports (real serial port, mock)
//! - [`protocol`] - the ack/success handshake and reply parsing
//! - [`instrument`] - device drivers and their lifecycle
//! - [`command`] - commands, composites and outcomes
//!
//! # Example
//!
//! ```no_run
//! use lab_commands::command::{Command, CompositeCommand, HeatingStageCommand};
//! use lab_commands::instrument::{shared, HeatingStage};
//!
//! let stage = shared(HeatingStage::on_port("hs1", "/dev/ttyACM0", 9600));
//! let mut recipe = CompositeCommand::new()
//!     .then(HeatingStageCommand::connect(&stage))
//!     .then(HeatingStageCommand::initialize(&stage))
//!     .then(HeatingStageCommand::set_temp(&stage, 60.0).with_delay(30.0))
//!     .then(HeatingStageCommand::deinitialize(&stage));
//!
//! recipe.execute();
//! println!("{} -> {:?}", recipe.name(), recipe.outcome());
//! ```

pub mod adapters;
pub mod command;
pub mod config;
pub mod error;
pub mod instrument;
pub mod logging;
pub mod protocol;
