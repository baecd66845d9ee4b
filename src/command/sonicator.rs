//! Sonicator commands.

use super::device_command::{DeviceAction, DeviceCommand};
use crate::error::DeviceResult;
use crate::instrument::{Device, SharedDevice, Sonicator};

/// Operations a recipe can run against a [`Sonicator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SonicatorAction {
    /// Open the serial port
    Connect,
    /// Check power and make sure the bath is stopped
    Initialize,
    /// Check power and stop the bath
    Deinitialize,
    /// Start sonicating
    StartSonicating,
    /// Stop sonicating
    StopSonicating,
    /// Query whether the bath is running
    CheckStatus,
    /// Press the front-panel button
    PressButton,
}

/// A command acting on a sonicator.
pub type SonicatorCommand = DeviceCommand<SonicatorAction>;

impl DeviceAction for SonicatorAction {
    type Receiver = Sonicator;

    fn class_name(&self) -> &'static str {
        match self {
            Self::Connect => "SonicatorConnect",
            Self::Initialize => "SonicatorInitialize",
            Self::Deinitialize => "SonicatorDeinitialize",
            Self::StartSonicating => "SonicatorStartSonicating",
            Self::StopSonicating => "SonicatorStopSonicating",
            Self::CheckStatus => "SonicatorCheckStatus",
            Self::PressButton => "SonicatorPressButton",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::Connect => "Open the serial port of the sonicator controlled by an Arduino.",
            Self::Initialize => {
                "Initialize the sonicator by checking the power connection and stopping it if in motion."
            }
            Self::Deinitialize => {
                "Deinitialize the sonicator by checking the power connection and stopping it."
            }
            Self::StartSonicating => "Start sonicating.",
            Self::StopSonicating => "Stop sonicating.",
            Self::CheckStatus => "Report whether the sonicator is running.",
            Self::PressButton => "Press the sonicator front-panel button.",
        }
    }

    fn parameters(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    fn apply(&self, sonicator: &mut Sonicator) -> DeviceResult<String> {
        match self {
            Self::Connect => sonicator.connect(),
            Self::Initialize => sonicator.initialize(),
            Self::Deinitialize => sonicator.deinitialize(),
            Self::StartSonicating => sonicator.start_sonicating(),
            Self::StopSonicating => sonicator.stop_sonicating(),
            Self::CheckStatus => sonicator.check_status(),
            Self::PressButton => sonicator.press_button(),
        }
    }
}

impl SonicatorCommand {
    /// Bind `action` to `sonicator`.
    pub fn of(sonicator: &SharedDevice<Sonicator>, action: SonicatorAction) -> Self {
        Self::new(sonicator, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockTransport;
    use crate::command::Command;
    use crate::instrument::shared;

    #[test]
    fn test_initialize_then_start() {
        let transport = MockTransport::new("/dev/ttyUSB1");
        let sonicator = shared(Sonicator::new("sonic", Box::new(transport.clone())));
        transport.push_reply("PIO");
        transport.push_reply("SAF");
        transport.push_reply("STN");

        let mut init = SonicatorCommand::of(&sonicator, SonicatorAction::Initialize);
        let mut start = SonicatorCommand::of(&sonicator, SonicatorAction::StartSonicating).with_delay(30.0);
        init.execute();
        start.execute();

        assert_eq!(init.result_message(), Some("Sonicator is on and is ready."));
        assert_eq!(start.was_successful(), Some(true));
        assert_eq!(start.name(), "SonicatorStartSonicating receiver_name=sonic delay=30.0");
    }
}
