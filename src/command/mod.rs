//! Commands: self-describing units of work for experiment recipes
//!
//! A [`Command`] binds a receiver device and typed parameters. Executing it
//! performs exactly one device operation and records the outcome; the
//! outcome is then read back through [`Command::was_successful`] and
//! [`Command::result_message`] rather than returned, so composites and
//! recipe runners can inspect already-executed commands uniformly.
//!
//! ## Command Kinds
//!
//! - [`DeviceCommand`] - a thin shim over one device operation, generic
//!   over a sealed set of actions ([`HeatingStageAction`], [`SonicatorAction`])
//! - [`CompositeCommand`] - an ordered sequence of commands that stops at
//!   the first failure
//!
//! ## Names
//!
//! Names are derived on every call from the current parameters, e.g.
//! `HeatingStageSetTemp receiver_name=hs1 temperature=60.0 delay=2.5`.
//! `delay` is always rendered last, and only when it is a positive number
//! of seconds or a symbolic placeholder.

pub mod composite;
pub mod device_command;
pub mod heating_stage;
pub mod sonicator;

pub use composite::CompositeCommand;
pub use device_command::{DeviceAction, DeviceCommand};
pub use heating_stage::{HeatingStageAction, HeatingStageCommand};
pub use sonicator::{SonicatorAction, SonicatorCommand};

use crate::error::DeviceResult;
use crate::protocol::format_number;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pause a recipe runner observes around a command.
///
/// Commands only store and display the delay; waiting is up to the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Delay {
    /// A fixed number of seconds
    Seconds(f64),
    /// A symbolic marker the runner resolves later (e.g. `"$soak"`)
    Placeholder(String),
}

impl Delay {
    /// Whether the delay appears in command names.
    pub fn is_displayed(&self) -> bool {
        match self {
            Delay::Seconds(seconds) => *seconds > 0.0,
            Delay::Placeholder(_) => true,
        }
    }
}

impl Default for Delay {
    fn default() -> Self {
        Delay::Seconds(0.0)
    }
}

impl From<f64> for Delay {
    fn from(seconds: f64) -> Self {
        Delay::Seconds(seconds)
    }
}

impl From<&str> for Delay {
    fn from(marker: &str) -> Self {
        Delay::Placeholder(marker.to_string())
    }
}

impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delay::Seconds(seconds) => f.write_str(&format_number(*seconds)),
            Delay::Placeholder(marker) => f.write_str(marker),
        }
    }
}

/// Result of one execution: success flag plus a descriptive message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Whether the execution succeeded
    pub success: bool,
    /// Device-reported or descriptive message
    pub message: String,
}

impl Outcome {
    /// A successful outcome.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// A failed outcome.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl From<DeviceResult<String>> for Outcome {
    fn from(result: DeviceResult<String>) -> Self {
        match result {
            Ok(message) => Outcome::success(message),
            Err(e) => Outcome::failure(e.to_string()),
        }
    }
}

/// Serializable snapshot of a command, for recipe logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReport {
    /// Derived command name
    pub name: String,
    /// Static description of what the command does
    pub description: String,
    /// `None` before the first execution
    pub was_successful: Option<bool>,
    /// `None` before the first execution
    pub result_message: Option<String>,
}

/// A unit of work bound to a receiver.
///
/// `execute` never fails: every error is folded into the recorded
/// [`Outcome`], and a failed command simply reports failure.
pub trait Command: Send {
    /// Run the command and record its outcome, replacing any previous one.
    fn execute(&mut self);

    /// Outcome of the most recent execution.
    fn outcome(&self) -> Option<&Outcome>;

    /// Name derived from the command kind and its current parameters.
    fn name(&self) -> String;

    /// What the command does.
    fn description(&self) -> &'static str;

    /// Delay a runner observes around this command.
    fn delay(&self) -> &Delay;

    /// `None` until executed, then whether the last execution succeeded.
    fn was_successful(&self) -> Option<bool> {
        self.outcome().map(|outcome| outcome.success)
    }

    /// `None` until executed, then the message of the last execution.
    fn result_message(&self) -> Option<&str> {
        self.outcome().map(|outcome| outcome.message.as_str())
    }

    /// Snapshot for logging.
    fn report(&self) -> CommandReport {
        CommandReport {
            name: self.name(),
            description: self.description().to_string(),
            was_successful: self.was_successful(),
            result_message: self.result_message().map(str::to_string),
        }
    }
}

/// Render `class key=value ... delay=value`.
pub fn format_name(class_name: &str, parameters: &[(&str, String)], delay: &Delay) -> String {
    let mut name = class_name.to_string();
    for (key, value) in parameters {
        name.push_str(&format!(" {key}={value}"));
    }
    if delay.is_displayed() {
        name.push_str(&format!(" delay={delay}"));
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_delay_hidden() {
        let name = format_name("Probe", &[("receiver_name", "hs1".into())], &Delay::default());
        assert_eq!(name, "Probe receiver_name=hs1");
        assert!(!name.contains("delay="));
    }

    #[test]
    fn test_positive_delay_last() {
        let params = [("receiver_name", "hs1".to_string()), ("temperature", "60.0".to_string())];
        let name = format_name("Probe", &params, &Delay::from(2.5));
        assert_eq!(name, "Probe receiver_name=hs1 temperature=60.0 delay=2.5");
        assert!(name.ends_with("delay=2.5"));
    }

    #[test]
    fn test_placeholder_delay_always_shown() {
        let name = format_name("Probe", &[], &Delay::from("$soak"));
        assert_eq!(name, "Probe delay=$soak");
    }

    #[test]
    fn test_negative_delay_hidden() {
        assert!(!Delay::Seconds(-1.0).is_displayed());
    }

    #[test]
    fn test_delay_serde_untagged() {
        assert_eq!(serde_json::to_string(&Delay::from(1.5)).unwrap(), "1.5");
        assert_eq!(serde_json::to_string(&Delay::from("$soak")).unwrap(), "\"$soak\"");
        let parsed: Delay = serde_json::from_str("\"$wait\"").unwrap();
        assert_eq!(parsed, Delay::Placeholder("$wait".into()));
    }

    #[test]
    fn test_outcome_from_result() {
        let ok: Outcome = Ok::<_, crate::error::DeviceError>("done".to_string()).into();
        assert_eq!(ok, Outcome::success("done"));

        let err: Outcome = Err(crate::error::DeviceError::NotInitialized("Heating stage")).into();
        assert_eq!(err, Outcome::failure("Heating stage is not initialized."));
    }
}
